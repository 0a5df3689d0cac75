use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use visitcoach_core::{AnalysisRequest, AnalysisSession, PromptVariant, ReplayBackend};

use super::render::{ThinkingPrinter, report};
use crate::config::ConfigLoader;

#[derive(Args)]
pub struct ReplayArgs {
    /// Recorded NDJSON response stream
    pub path: PathBuf,

    /// Verdict shape to extract
    #[arg(long, default_value = "caseworker")]
    pub variant: PromptVariant,

    /// Bytes per replayed chunk, 0 for a single chunk (overrides config)
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let chunk_size = args.chunk_size.unwrap_or(config.replay.chunk_size);

    let body = std::fs::read(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let backend = ReplayBackend::new(body, chunk_size);
    let mut session = AnalysisSession::new(Arc::new(backend));

    let mut printer = ThinkingPrinter::new();
    let outcome = session
        .submit(replay_request(args.variant), |snapshot| {
            printer.observe(snapshot)
        })
        .await?;

    report(outcome, &session)
}

/// Placeholder request; a replay never sends it anywhere
fn replay_request(variant: PromptVariant) -> AnalysisRequest {
    match variant {
        PromptVariant::Caseworker => AnalysisRequest::caseworker(Vec::new(), Default::default()),
        PromptVariant::Supervisor => AnalysisRequest::supervisor(Vec::new(), String::new()),
    }
}
