use opencv::core::Mat;

/// COCO-80 class index of `dog`. Tied to the label set of the detection model;
/// a model with a different taxonomy needs a different value.
pub const DOG_CLASS_ID: usize = 16;

/// Axis-aligned box in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// A single model detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BBox,
}

impl Detection {
    /// Human-readable class name from the COCO-80 label set.
    pub fn class_name(&self) -> &'static str {
        usls::NAMES_COCO_80
            .get(self.class_id)
            .copied()
            .unwrap_or("unknown")
    }

    /// Text drawn above the box, e.g. `dog: 0.87`.
    pub fn label(&self) -> String {
        format!("{}: {:.2}", self.class_name(), self.confidence)
    }
}

/// A decoded frame tagged with its position in the stream
pub struct RawFrame {
    pub id: usize,
    pub mat: Mat,
}
