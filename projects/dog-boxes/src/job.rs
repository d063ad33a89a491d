// Job orchestrator: fetch -> process -> upload -> notify
//
// Owns the per-job working directory, drives the stage transitions and makes
// sure exactly one callback goes out per job.

use crate::callback::{CallbackClient, JobOutcome};
use crate::config::JobConfig;
use crate::error::{JobError, JobResult};
use crate::fetch::SourceFetcher;
use crate::pipeline::detection::FrameDetector;
use crate::pipeline::VideoPipeline;
use crate::storage::{ObjectUploader, UploadResult};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const OUTPUT_STEM: &str = "processed_video";
const WORK_DIR_PREFIX: &str = "dog-boxes-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Started,
    Fetching,
    Processing,
    Uploading,
    Notifying,
    Done,
    Failed,
}

impl JobStage {
    /// Stages from which a failure is reported through the error callback.
    pub fn reports_failure(self) -> bool {
        matches!(
            self,
            Self::Started | Self::Fetching | Self::Processing | Self::Uploading
        )
    }
}

/// One end-to-end run: a single video reference to a single callback.
///
/// The detector is built lazily by `make_detector` on the blocking worker, so
/// nothing model-related happens until the source has been fetched.
pub struct Job<F, U> {
    video_url: String,
    callback: CallbackClient,
    http: reqwest::Client,
    uploader: U,
    make_detector: Option<F>,
    pipelined: bool,
    work_root: Option<PathBuf>,
    work_dir: Option<TempDir>,
    output: Option<PathBuf>,
    stage: JobStage,
}

impl<F, D, U> Job<F, U>
where
    F: FnOnce() -> JobResult<D> + Send + 'static,
    D: FrameDetector,
    U: ObjectUploader,
{
    pub fn new(
        video_url: impl Into<String>,
        callback_url: impl Into<String>,
        config: &JobConfig,
        http: reqwest::Client,
        uploader: U,
        make_detector: F,
    ) -> Self {
        Self {
            video_url: video_url.into(),
            callback: CallbackClient::new(http.clone(), callback_url),
            http,
            uploader,
            make_detector: Some(make_detector),
            pipelined: config.pipelined,
            work_root: config.work_root.clone(),
            work_dir: None,
            output: None,
            stage: JobStage::Started,
        }
    }

    /// Runs the job to completion and returns the uploaded video's URL.
    ///
    /// Failures before notification are reported through the error callback
    /// and then returned. The working directory is removed on every path.
    pub async fn run(mut self) -> JobResult<String> {
        tracing::info!(video = %self.video_url, "Processing video");

        let upload = match self.produce().await {
            Ok(upload) => upload,
            Err(e) => return Err(self.fail(e).await),
        };

        tracing::info!(bucket = %upload.bucket, key = %upload.key, "Stored processed video");

        self.advance(JobStage::Notifying);
        self.callback.send(&JobOutcome::success(&upload.url)).await?;
        tracing::info!("Callback sent to: {}", self.callback.url());

        if let Some(output) = self.output.take() {
            if output.exists() {
                std::fs::remove_file(&output)?;
            }
        }

        self.advance(JobStage::Done);
        tracing::info!("Processing completed successfully");
        Ok(upload.url)
    }

    async fn produce(&mut self) -> JobResult<UploadResult> {
        let work_dir = self.create_work_dir()?;

        self.advance(JobStage::Fetching);
        let fetcher = SourceFetcher::new(self.http.clone(), work_dir.path());
        let input = fetcher.fetch(&self.video_url).await?;
        self.work_dir = Some(work_dir);

        self.advance(JobStage::Processing);
        let output = self.process(input).await?;

        self.advance(JobStage::Uploading);
        tracing::info!("Uploading processed video to bucket {}", self.uploader.bucket());
        self.uploader.upload(&output).await
    }

    async fn process(&mut self, input: PathBuf) -> JobResult<PathBuf> {
        let output = output_path_for(&input);
        self.output = Some(output.clone());

        let make_detector = self
            .make_detector
            .take()
            .ok_or_else(|| JobError::Task("job already ran".to_string()))?;
        let pipelined = self.pipelined;
        let out = output.clone();

        let stats = tokio::task::spawn_blocking(move || {
            let detector = make_detector()?;
            let mut pipeline = VideoPipeline::new(detector, pipelined);
            tracing::info!(
                target_class = pipeline.target_class(),
                pipelined,
                "Running detection"
            );
            pipeline.process(&input, &out)
        })
        .await
        .map_err(|e| JobError::Task(e.to_string()))??;

        tracing::info!(
            frames = stats.processed_frames,
            annotated_frames = stats.annotated_frames,
            boxes = stats.boxes_drawn,
            elapsed = ?stats.duration,
            "Video processed"
        );
        Ok(output)
    }

    /// Reports `error` through the error callback and hands it back.
    async fn fail(&mut self, error: JobError) -> JobError {
        debug_assert!(self.stage.reports_failure());
        tracing::error!(stage = ?self.stage, "Error processing video: {}", error);
        self.advance(JobStage::Failed);

        if let Err(e) = self.callback.send(&JobOutcome::failure(error.to_string())).await {
            tracing::warn!("Failed to deliver error callback: {}", e);
        }
        error
    }

    fn create_work_dir(&self) -> JobResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORK_DIR_PREFIX);

        let dir = match &self.work_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        tracing::debug!("Working directory {}", dir.path().display());
        Ok(dir)
    }

    fn advance(&mut self, next: JobStage) {
        tracing::info!(from = ?self.stage, to = ?next, "Job stage");
        self.stage = next;
    }
}

/// Output lives next to the input and keeps its container.
fn output_path_for(input: &Path) -> PathBuf {
    let ext = input
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("mp4");
    input.with_file_name(format!("{}.{}", OUTPUT_STEM, ext))
}
