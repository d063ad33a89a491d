use super::{fourcc_for, VideoInfo};
use crate::error::{JobError, JobResult};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::VideoWriter,
};
use std::path::Path;

/// Encoder mirroring the geometry and frame rate of a source stream.
pub struct OpencvWriter {
    writer: VideoWriter,
}

impl OpencvWriter {
    pub fn create(path: &Path, info: &VideoInfo) -> JobResult<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| JobError::open(format!("{:?}", path)))?;

        let [c1, c2, c3, c4] = fourcc_for(path);
        let fourcc = VideoWriter::fourcc(c1, c2, c3, c4)?;

        let writer = VideoWriter::new(
            path_str,
            fourcc,
            info.fps,
            Size::new(info.width, info.height),
            true,
        )?;
        if !writer.is_opened()? {
            return Err(JobError::open(format!("cannot create output {}", path_str)));
        }

        tracing::debug!(
            "OpencvWriter: writing {} as {}{}{}{} at {}x{}, fps={:.2}",
            path_str,
            c1,
            c2,
            c3,
            c4,
            info.width,
            info.height,
            info.fps
        );

        Ok(Self { writer })
    }

    pub fn write(&mut self, frame: &Mat) -> JobResult<()> {
        self.writer.write(frame)?;
        Ok(())
    }

    pub fn release(&mut self) -> JobResult<()> {
        self.writer.release()?;
        Ok(())
    }
}
