//! Storage uploader for processed videos.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{JobError, JobResult};

/// Prefix under which processed videos are stored.
pub const KEY_PREFIX: &str = "processed_videos";

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub url: String,
}

/// Storage key for `filename` uploaded at `timestamp`.
pub fn object_key(filename: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{}/{}_{}",
        KEY_PREFIX,
        timestamp.format("%Y%m%d_%H%M%S"),
        filename
    )
}

/// Virtual-hosted-style URL for `key` in `bucket`. Constructed, not verified.
pub fn public_url(bucket: &str, key: &str) -> String {
    format!("https://{}.s3.amazonaws.com/{}", bucket, key)
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Something that can store a whole file under a key.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    fn bucket(&self) -> &str;

    /// Single-shot upload of `path` to `key`.
    async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> JobResult<()>;

    /// Uploads `path` under a freshly timestamped key and returns its URL.
    async fn upload(&self, path: &Path) -> JobResult<UploadResult> {
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| JobError::upload(format!("Invalid file name: {}", path.display())))?;

        let key = object_key(filename, Local::now().naive_local());
        self.put_file(path, &key, content_type_for(path)).await?;

        let result = UploadResult {
            bucket: self.bucket().to_string(),
            url: public_url(self.bucket(), &key),
            key,
        };
        info!("File uploaded successfully to {}", result.url);
        Ok(result)
    }
}

/// S3 uploader.
#[derive(Clone)]
pub struct S3Uploader {
    client: Client,
    bucket: String,
}

impl S3Uploader {
    /// Builds a client from the SDK's default credential chain.
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_file(&self, path: &Path, key: &str, content_type: &str) -> JobResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(JobError::upload("no bucket configured (set S3_BUCKET)"));
        }
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| JobError::upload(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| JobError::upload(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory uploaders.

    use super::*;
    use std::sync::Mutex;

    /// Records every key it is asked to store, optionally keeping a copy of
    /// the uploaded file in `copy_to`.
    #[derive(Default)]
    pub struct RecordingUploader {
        pub keys: Mutex<Vec<String>>,
        pub copy_to: Option<std::path::PathBuf>,
    }

    #[async_trait]
    impl ObjectUploader for RecordingUploader {
        fn bucket(&self) -> &str {
            "test-bucket"
        }

        async fn put_file(&self, path: &Path, key: &str, _content_type: &str) -> JobResult<()> {
            assert!(path.exists(), "uploaded file must exist");
            if let Some(dir) = &self.copy_to {
                std::fs::copy(path, dir.join(path.file_name().unwrap())).unwrap();
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    /// Rejects every upload.
    pub struct FailingUploader;

    #[async_trait]
    impl ObjectUploader for FailingUploader {
        fn bucket(&self) -> &str {
            "test-bucket"
        }

        async fn put_file(&self, _path: &Path, _key: &str, _content_type: &str) -> JobResult<()> {
            Err(JobError::upload("Access Denied"))
        }
    }
}
