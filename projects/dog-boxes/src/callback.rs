//! Job completion callback.

use serde::Serialize;

use crate::error::{JobError, JobResult};

/// Final result of a job, reported once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    Success { processed_video_url: String },
    Error { error: String },
}

impl JobOutcome {
    pub fn success(url: impl Into<String>) -> Self {
        Self::Success {
            processed_video_url: url.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Posts job outcomes to a caller-supplied URL.
#[derive(Clone)]
pub struct CallbackClient {
    client: reqwest::Client,
    url: String,
}

impl CallbackClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Single best-effort POST. The response status is not inspected.
    pub async fn send(&self, outcome: &JobOutcome) -> JobResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(outcome)
            .send()
            .await
            .map_err(|e| JobError::Callback(e.to_string()))?;

        tracing::info!(
            url = %self.url,
            status = %response.status(),
            success = outcome.is_success(),
            "Callback sent"
        );
        Ok(())
    }
}
