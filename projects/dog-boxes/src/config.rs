// Job configuration
//
// Built once from CLI arguments and environment, then handed to each
// component at construction.

use std::path::PathBuf;

/// Object storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    /// `None` defers to the SDK's default region chain.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub storage: StorageConfig,
    pub model_path: PathBuf,
    /// Parent for the per-job working directory; system temp dir when `None`.
    pub work_root: Option<PathBuf>,
    pub pipelined: bool,
}
