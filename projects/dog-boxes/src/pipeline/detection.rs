use crate::error::{JobError, JobResult};
use crate::pipeline::types::{BBox, Detection};
use image::{DynamicImage, ImageBuffer, Rgb};
use opencv::core::Mat;
use opencv::prelude::*;
use std::path::Path;
use usls::models::RTDETR;
use usls::{Config, Image};

/// Anything that can find objects in a decoded BGR frame.
///
/// Detections come back in model order and unfiltered; choosing which classes
/// to keep is the caller's job.
pub trait FrameDetector {
    fn detect(&mut self, frame: &Mat) -> JobResult<Vec<Detection>>;
}

/// A wrapper around the USLS RT-DETR model that handles BGR-to-RGB conversion
/// and corrects for aspect-ratio padding bugs in the underlying model library.
pub struct UslsDetector {
    model: RTDETR,
}

impl UslsDetector {
    /// Create a new detector with the given model path.
    pub fn new(model_path: &Path) -> JobResult<Self> {
        let model_file = model_path
            .to_str()
            .ok_or_else(|| JobError::inference(format!("Invalid model path: {:?}", model_path)))?;

        let config = Config::default()
            .with_model_file(model_file)
            .with_class_names(&usls::NAMES_COCO_80);

        #[cfg(target_os = "macos")]
        let config = config.with_model_device(usls::Device::CoreMl);

        let config = config
            .commit()
            .map_err(|e| JobError::inference(format!("Failed to configure model: {}", e)))?;
        let model = RTDETR::new(config)
            .map_err(|e| JobError::inference(format!("Failed to load model: {}", e)))?;

        tracing::info!(model = %model_path.display(), "Loaded detection model");
        Ok(Self { model })
    }
}

impl FrameDetector for UslsDetector {
    fn detect(&mut self, frame: &Mat) -> JobResult<Vec<Detection>> {
        let dynamic_image = mat_to_dynamic_image(frame)?;

        // Correction calculations (USLS RT-DETR bug workaround)
        let size = frame.size()?;
        let (x_corr, y_corr) = aspect_correction(size.width as f32, size.height as f32);

        let results = self
            .model
            .forward(&[Image::from(dynamic_image)])
            .map_err(|e| JobError::inference(e.to_string()))?;

        let detections = results
            .into_iter()
            .next()
            .map(|y| {
                y.hbbs
                    .iter()
                    .map(|hbb| {
                        let x1 = hbb.xmin() * x_corr;
                        let y1 = hbb.ymin() * y_corr;
                        Detection {
                            class_id: hbb.id().unwrap_or(usize::MAX),
                            confidence: hbb.confidence().unwrap_or(0.0),
                            bbox: BBox {
                                x1,
                                y1,
                                x2: x1 + hbb.width() * x_corr,
                                y2: y1 + hbb.height() * y_corr,
                            },
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(detections)
    }
}

/// Scale factors that undo the square padding applied by the model wrapper.
fn aspect_correction(img_w: f32, img_h: f32) -> (f32, f32) {
    if img_w > img_h {
        (img_w / img_h, 1.0)
    } else if img_h > img_w {
        (1.0, img_h / img_w)
    } else {
        (1.0, 1.0)
    }
}

/// Convert an OpenCV Mat (BGR) to an image::DynamicImage (RGB)
fn mat_to_dynamic_image(mat: &Mat) -> JobResult<DynamicImage> {
    let mut rgb_mat = Mat::default();
    opencv::imgproc::cvt_color_def(mat, &mut rgb_mat, opencv::imgproc::COLOR_BGR2RGB)?;

    let size = rgb_mat.size()?;
    let width = size.width as u32;
    let height = size.height as u32;

    if !rgb_mat.is_continuous() {
        return Err(JobError::inference("Mat is not continuous"));
    }

    let buffer = rgb_mat.data_bytes()?.to_vec();

    let img_buffer = ImageBuffer::<Rgb<u8>, _>::from_vec(width, height, buffer)
        .ok_or_else(|| JobError::inference("Failed to create ImageBuffer from Mat data"))?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC3};

    #[test]
    fn test_aspect_correction() {
        assert_eq!(aspect_correction(1920.0, 1080.0), (1920.0 / 1080.0, 1.0));
        assert_eq!(aspect_correction(720.0, 1280.0), (1.0, 1280.0 / 720.0));
        assert_eq!(aspect_correction(640.0, 640.0), (1.0, 1.0));
    }

    #[test]
    fn test_mat_to_dynamic_image_swaps_channels() {
        // Pure blue in BGR
        let mat =
            Mat::new_rows_cols_with_default(4, 6, CV_8UC3, Scalar::new(255.0, 0.0, 0.0, 0.0))
                .unwrap();

        let img = mat_to_dynamic_image(&mat).unwrap();
        let rgb = img.to_rgb8();
        assert_eq!(rgb.dimensions(), (6, 4));
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 255]);
    }
}
