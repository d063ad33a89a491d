// Video processing pipeline: detect, annotate, re-encode

pub mod annotate;
pub mod detection;
pub mod reader;
pub mod types;

use crate::error::JobResult;
use crate::video::processor::{process_video, ProcessingStats};
use annotate::annotate_frame;
use detection::FrameDetector;
use opencv::core::Mat;
use std::path::Path;
use types::DOG_CLASS_ID;

/// Runs a detector over every frame of a video and boxes the target class.
pub struct VideoPipeline<D> {
    detector: D,
    target_class: usize,
    pipelined: bool,
}

impl<D: FrameDetector> VideoPipeline<D> {
    pub fn new(detector: D, pipelined: bool) -> Self {
        Self {
            detector,
            target_class: DOG_CLASS_ID,
            pipelined,
        }
    }

    pub fn target_class(&self) -> usize {
        self.target_class
    }

    /// Produces `output` from `input`. The input file is deleted once its
    /// handles are released, whether or not processing succeeded.
    pub fn process(&mut self, input: &Path, output: &Path) -> JobResult<ProcessingStats> {
        let target_class = self.target_class;
        let detector = &mut self.detector;

        process_video(
            input,
            output,
            self.pipelined,
            |frame: &mut Mat| -> JobResult<usize> {
                let detections = detector.detect(frame)?;
                annotate_frame(frame, &detections, target_class)
            },
        )
    }
}
