//! Job error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Errors that can end a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to retrieve video: {0}")]
    Retrieval(String),

    #[error("Video file not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not open video file: {0}")]
    Open(String),

    #[error("Video error: {0}")]
    Video(#[from] opencv::Error),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Callback failed: {0}")]
    Callback(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Task(String),
}

impl JobError {
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }

    pub fn open(msg: impl Into<String>) -> Self {
        Self::Open(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }
}

impl From<reqwest::Error> for JobError {
    fn from(e: reqwest::Error) -> Self {
        Self::Retrieval(e.to_string())
    }
}
