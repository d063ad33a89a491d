use crate::config::{JobConfig, StorageConfig};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Process a video for dog detection", long_about = None)]
pub struct Args {
    /// URL or local path of the video to process
    #[arg(long, alias = "video_url")]
    pub video_url: String,

    /// Callback URL for job completion notification
    #[arg(long, alias = "callback_url")]
    pub callback_url: String,

    /// Bucket receiving the processed video. An empty bucket fails at upload
    /// time so the failure is reported through the callback.
    #[arg(long, env = "S3_BUCKET", default_value = "")]
    pub bucket: String,

    /// Storage region (SDK default chain when unset)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible storage
    #[arg(long, env = "S3_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Path to the RT-DETR ONNX model
    #[arg(long, env = "DOG_BOXES_MODEL", default_value = "models/rtdetr-v2-s.onnx")]
    pub model: PathBuf,

    /// Parent directory for the per-job working directory
    #[arg(long, env = "DOG_BOXES_WORK_ROOT")]
    pub work_root: Option<PathBuf>,

    /// Decode frames on a separate reader thread
    #[arg(long)]
    pub pipelined: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn job_config(&self) -> JobConfig {
        JobConfig {
            storage: StorageConfig {
                bucket: self.bucket.clone(),
                region: self.region.clone(),
                endpoint_url: self.endpoint_url.clone(),
            },
            model_path: self.model.clone(),
            work_root: self.work_root.clone(),
            pipelined: self.pipelined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_underscore_aliases() {
        let args = Args::try_parse_from([
            "dog-boxes",
            "--video_url",
            "clip.mp4",
            "--callback_url",
            "http://localhost/cb",
            "--bucket",
            "b",
        ])
        .unwrap();

        assert_eq!(args.video_url, "clip.mp4");
        assert_eq!(args.callback_url, "http://localhost/cb");

        let config = args.job_config();
        assert_eq!(config.storage.bucket, "b");
        assert!(!config.pipelined);
        assert_eq!(config.model_path, PathBuf::from("models/rtdetr-v2-s.onnx"));
    }

    #[test]
    fn test_missing_bucket_still_parses() {
        let args = Args::try_parse_from([
            "dog-boxes",
            "--video_url",
            "clip.mp4",
            "--callback_url",
            "http://cb",
        ])
        .unwrap();

        if std::env::var_os("S3_BUCKET").is_none() {
            assert_eq!(args.job_config().storage.bucket, "");
        }
    }

    #[test]
    fn test_requires_callback_url() {
        let result = Args::try_parse_from(["dog-boxes", "--video-url", "clip.mp4", "--bucket", "b"]);
        assert!(result.is_err());
    }
}
