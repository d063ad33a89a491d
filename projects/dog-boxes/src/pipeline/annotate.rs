use crate::error::JobResult;
use crate::pipeline::types::{BBox, Detection};
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc::{put_text, rectangle_points, FONT_HERSHEY_SIMPLEX, LINE_8};

const BOX_THICKNESS: i32 = 2;
const LABEL_OFFSET: i32 = 10;
const LABEL_SCALE: f64 = 0.9;
const LABEL_THICKNESS: i32 = 2;

fn box_color() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0) // Green
}

/// Top-left and bottom-right corners of `bbox`, both inclusive.
fn box_corners(bbox: &BBox) -> (Point, Point) {
    (
        Point::new(bbox.x1 as i32, bbox.y1 as i32),
        Point::new(bbox.x2 as i32, bbox.y2 as i32),
    )
}

/// Draws every detection of `target_class` onto `frame`. Frames with no
/// matching detection are left untouched. Returns the number of boxes drawn.
pub fn annotate_frame(
    frame: &mut Mat,
    detections: &[Detection],
    target_class: usize,
) -> JobResult<usize> {
    let mut drawn = 0;

    for d in detections.iter().filter(|d| d.class_id == target_class) {
        let (top_left, bottom_right) = box_corners(&d.bbox);
        rectangle_points(
            frame,
            top_left,
            bottom_right,
            box_color(),
            BOX_THICKNESS,
            LINE_8,
            0,
        )?;

        put_text(
            frame,
            &d.label(),
            Point::new(top_left.x, top_left.y - LABEL_OFFSET),
            FONT_HERSHEY_SIMPLEX,
            LABEL_SCALE,
            box_color(),
            LABEL_THICKNESS,
            LINE_8,
            false,
        )?;

        drawn += 1;
    }

    Ok(drawn)
}
