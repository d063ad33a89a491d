mod callback;
mod cli;
mod config;
mod error;
mod fetch;
mod job;
mod pipeline;
mod storage;
mod video;

use anyhow::Result;
use cli::Args;
use job::Job;
use pipeline::detection::UslsDetector;
use storage::S3Uploader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries only the result URL
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse_args();
    let config = args.job_config();

    let http = reqwest::Client::new();
    let uploader = S3Uploader::new(&config.storage).await;
    let model_path = config.model_path.clone();

    let job = Job::new(
        args.video_url,
        args.callback_url,
        &config,
        http,
        uploader,
        move || UslsDetector::new(&model_path),
    );

    let url = job.run().await?;
    println!("{}", url);

    Ok(())
}
