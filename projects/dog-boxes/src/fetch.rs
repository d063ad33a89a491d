// Source fetcher: resolves a video reference into a local file

use crate::error::{JobError, JobResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

const INPUT_STEM: &str = "input_video";
const DEFAULT_EXTENSION: &str = "mp4";

/// Containers the output writer has a FOURCC for.
const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "avi", "mkv"];

/// Where a video reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Remote(Url),
    Local(PathBuf),
}

impl VideoSource {
    /// Classifies a reference. Only `http` and `https` count as remote; anything
    /// else is a path relative to the current directory.
    pub fn parse(reference: &str) -> Self {
        match Url::parse(reference) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            _ => Self::Local(PathBuf::from(reference)),
        }
    }

    /// Lower-cased container extension of the referenced file. Anything the
    /// writer cannot produce (no extension, `.php`, `.webm`, ...) becomes `mp4`.
    pub fn extension(&self) -> String {
        let ext = match self {
            Self::Remote(url) => url
                .path_segments()
                .and_then(|segments| segments.last())
                .and_then(|name| Path::new(name).extension())
                .and_then(|s| s.to_str())
                .map(str::to_lowercase),
            Self::Local(path) => path
                .extension()
                .and_then(|s| s.to_str())
                .map(str::to_lowercase),
        };
        ext.filter(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }
}

/// Fetches video references into a single well-known file inside `work_dir`.
pub struct SourceFetcher {
    client: reqwest::Client,
    work_dir: PathBuf,
}

impl SourceFetcher {
    pub fn new(client: reqwest::Client, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            work_dir: work_dir.into(),
        }
    }

    /// Destination for a given source; repeated fetches overwrite it.
    pub fn target_path(&self, source: &VideoSource) -> PathBuf {
        self.work_dir
            .join(format!("{}.{}", INPUT_STEM, source.extension()))
    }

    pub async fn fetch(&self, reference: &str) -> JobResult<PathBuf> {
        let source = VideoSource::parse(reference);
        let target = self.target_path(&source);

        match &source {
            VideoSource::Remote(url) => self.download(url, &target).await?,
            VideoSource::Local(path) => copy_local(path, &target).await?,
        }

        Ok(target)
    }

    async fn download(&self, url: &Url, target: &Path) -> JobResult<()> {
        tracing::info!(%url, "Downloading video");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        let pb = match response.content_length() {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Downloading video [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                .map_err(|e| JobError::retrieval(e.to_string()))?
                .progress_chars("#>-"),
        );

        let mut file = tokio::fs::File::create(target).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }
        file.flush().await?;
        pb.finish_and_clear();

        tracing::info!(path = %target.display(), bytes = pb.position(), "Download complete");
        Ok(())
    }
}

async fn copy_local(reference: &Path, target: &Path) -> JobResult<()> {
    let local_path = std::env::current_dir()?.join(reference);
    if !tokio::fs::try_exists(&local_path).await? {
        return Err(JobError::NotFound(local_path));
    }

    tracing::info!(path = %local_path.display(), "Copying local video");
    tokio::fs::copy(&local_path, target)
        .await
        .map_err(|e| JobError::retrieval(format!("{}: {}", local_path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_video_source_parse() {
        assert!(matches!(
            VideoSource::parse("https://example.com/videos/dog.mp4"),
            VideoSource::Remote(_)
        ));
        assert!(matches!(
            VideoSource::parse("http://example.com/a"),
            VideoSource::Remote(_)
        ));
        assert_eq!(
            VideoSource::parse("videos/dog.mp4"),
            VideoSource::Local(PathBuf::from("videos/dog.mp4"))
        );
        // Non-network schemes are treated as paths
        assert!(matches!(
            VideoSource::parse("ftp://example.com/dog.mp4"),
            VideoSource::Local(_)
        ));
    }

    #[test]
    fn test_extension() {
        assert_eq!(
            VideoSource::parse("https://example.com/v/clip.AVI?sig=abc").extension(),
            "avi"
        );
        assert_eq!(VideoSource::parse("https://example.com/").extension(), "mp4");
        assert_eq!(VideoSource::parse("clip.mov").extension(), "mov");
        assert_eq!(VideoSource::parse("clip").extension(), "mp4");
        assert_eq!(VideoSource::parse("clip.MKV").extension(), "mkv");
    }

    #[test]
    fn test_unsupported_container_falls_back_to_mp4() {
        assert_eq!(
            VideoSource::parse("https://example.com/stream.php?id=7").extension(),
            "mp4"
        );
        assert_eq!(
            VideoSource::parse("https://example.com/v/clip.webm").extension(),
            "mp4"
        );
        assert_eq!(VideoSource::parse("videos/clip.webm").extension(), "mp4");
    }

    #[tokio::test]
    async fn test_download_of_script_url_lands_as_mp4() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stream.php"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video".to_vec()))
            .mount(&server)
            .await;

        let work_dir = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new(reqwest::Client::new(), work_dir.path());
        let path = fetcher
            .fetch(&format!("{}/stream.php?id=7", server.uri()))
            .await
            .unwrap();

        assert_eq!(path, work_dir.path().join("input_video.mp4"));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_not_found() {
        let work_dir = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new(reqwest::Client::new(), work_dir.path());

        let err = fetcher
            .fetch("definitely/not/here/clip.mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::NotFound(_)));
        assert!(!work_dir.path().join("input_video.mp4").exists());
    }

    #[tokio::test]
    async fn test_local_file_is_copied() {
        let src_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("clip.avi");
        std::fs::write(&src, b"not really a video").unwrap();

        let work_dir = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new(reqwest::Client::new(), work_dir.path());

        let path = fetcher.fetch(src.to_str().unwrap()).await.unwrap();
        assert_eq!(path, work_dir.path().join("input_video.avi"));
        assert_eq!(std::fs::read(&path).unwrap(), b"not really a video");
        // Source is left in place
        assert!(src.exists());
    }

    #[tokio::test]
    async fn test_download_overwrites_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos/dog.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let work_dir = tempfile::tempdir().unwrap();
        std::fs::write(work_dir.path().join("input_video.mp4"), b"stale content here").unwrap();

        let fetcher = SourceFetcher::new(reqwest::Client::new(), work_dir.path());
        let path = fetcher
            .fetch(&format!("{}/videos/dog.mp4", server.uri()))
            .await
            .unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"fresh bytes");
    }

    #[tokio::test]
    async fn test_download_non_success_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let work_dir = tempfile::tempdir().unwrap();
        let fetcher = SourceFetcher::new(reqwest::Client::new(), work_dir.path());
        let err = fetcher
            .fetch(&format!("{}/missing.mp4", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Retrieval(_)));
    }
}
