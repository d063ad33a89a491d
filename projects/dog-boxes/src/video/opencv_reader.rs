use super::VideoInfo;
use crate::error::{JobError, JobResult};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{
        VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT,
        CAP_PROP_FRAME_WIDTH,
    },
};
use std::path::Path;

const FALLBACK_FPS: f64 = 30.0;

pub struct OpencvReader {
    capture: VideoCapture,
    info: VideoInfo,
}

impl OpencvReader {
    pub fn open(path: &Path) -> JobResult<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| JobError::open(format!("{:?}", path)))?;

        let capture = VideoCapture::from_file(path_str, CAP_ANY)
            .map_err(|e| JobError::open(format!("{}: {}", path_str, e)))?;
        if !capture.is_opened()? {
            return Err(JobError::open(path_str));
        }

        let width = capture.get(CAP_PROP_FRAME_WIDTH)? as i32;
        let height = capture.get(CAP_PROP_FRAME_HEIGHT)? as i32;
        let mut fps = capture.get(CAP_PROP_FPS)?;
        if fps <= 0.0 {
            tracing::warn!(
                "OpencvReader: Failed to get FPS from metadata, falling back to {}",
                FALLBACK_FPS
            );
            fps = FALLBACK_FPS;
        }
        let frame_count = capture.get(CAP_PROP_FRAME_COUNT)?.max(0.0) as usize;

        tracing::info!(
            "OpencvReader: opened {}, {}x{}, fps={:.2}, stream_frames={}",
            path_str,
            width,
            height,
            fps,
            frame_count
        );

        Ok(Self {
            capture,
            info: VideoInfo {
                width,
                height,
                fps,
                frame_count,
            },
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    /// Next decoded frame, `None` at end of stream.
    pub fn next_frame(&mut self) -> JobResult<Option<Mat>> {
        let mut frame = Mat::default();
        let success = self.capture.read(&mut frame)?;
        if !success || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    /// Reads the next frame, treating a decode error as end of stream.
    pub fn read_or_end(&mut self) -> Option<Mat> {
        match self.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("OpencvReader: read failed, ending stream early: {}", e);
                None
            }
        }
    }

    pub fn release(&mut self) -> JobResult<()> {
        self.capture.release()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::testing::write_clip;

    #[test]
    fn test_reads_metadata_and_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.avi");
        write_clip(&path, 160, 120, 12.0, 5);

        let mut reader = OpencvReader::open(&path).unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (160, 120));
        assert!((info.fps - 12.0).abs() < 0.01);

        let mut frames = 0;
        while let Some(frame) = reader.read_or_end() {
            assert_eq!(frame.cols(), 160);
            frames += 1;
        }
        assert_eq!(frames, 5);
        reader.release().unwrap();
    }

    #[test]
    fn test_garbage_file_cannot_be_opened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"this is not a video container").unwrap();

        let result = OpencvReader::open(&path);
        assert!(matches!(result, Err(JobError::Open(_))));
    }
}
