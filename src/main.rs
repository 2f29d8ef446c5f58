use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use summarize::{ChatSummarizer, DigestOrchestrator, StubSummarizer, Summarizer};
use tracing_subscriber::EnvFilter;
use vdigest::captions::normalize_captions_with;
use vdigest::{Collaborators, Pipeline, PollOutcome, VdigestConfig, poll_for_digest};

/// Digest a local caption file, or a source URL through the full pipeline,
/// and print the result as JSON.
#[derive(Parser, Debug)]
#[command(name = "vdigest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// WebVTT caption file, or a source URL with `--pipeline`
    input: String,

    /// Pipeline YAML configuration
    config: Option<PathBuf>,

    /// Use the offline deterministic summarizer regardless of configuration
    #[arg(long)]
    stub: bool,

    /// Submit INPUT to the pipeline (acquire, digest, store) and wait for
    /// the stored digest on the configured `poll:` schedule
    #[arg(long)]
    pipeline: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => VdigestConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => VdigestConfig::default(),
    };
    if cli.stub {
        config.summarizer.provider = "stub".to_string();
    }

    let json = if cli.pipeline {
        run_pipeline(&cli.input, &config).await?
    } else {
        digest_file(&cli.input, &config).await?
    };
    println!("{json}");
    Ok(())
}

async fn digest_file(path: &str, config: &VdigestConfig) -> anyhow::Result<String> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {path}"))?;
    let (transcript, _) = normalize_captions_with(&raw, &config.captions)?;

    let summarizer: Arc<dyn Summarizer> = if config.summarizer.provider == "stub" {
        Arc::new(StubSummarizer)
    } else {
        Arc::new(ChatSummarizer::new(config.summarizer.chat.clone())?)
    };
    let orchestrator =
        DigestOrchestrator::new(summarizer, config.windowing.to_orchestrator_config())?;
    let digest = orchestrator.digest(transcript.as_str()).await?;
    Ok(serde_json::to_string_pretty(&digest)?)
}

async fn run_pipeline(source_url: &str, config: &VdigestConfig) -> anyhow::Result<String> {
    let pipeline = Pipeline::start(config, Collaborators::from_config(config)?).await?;
    let request_id = pipeline.enqueue(source_url)?;
    let outcome = poll_for_digest(&pipeline, &request_id, &config.poll.to_poll_config()).await;
    pipeline.shutdown().await;

    match outcome {
        PollOutcome::Found(digest) => Ok(serde_json::to_string_pretty(&digest)?),
        PollOutcome::GaveUp { attempts } => {
            anyhow::bail!("no digest for request {request_id} after {attempts} polls")
        }
    }
}
