use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::warn;
use visitcoach_core::{
    ASSESSMENT_CRITERIA, AnalysisRequest, AnalysisSession, HttpBackend, SelfAssessment,
    TranscriptMessage,
};

use super::render::{ThinkingPrinter, report, save_raw_log};
use crate::config::{ConfigLoader, ENDPOINT_ENV};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Transcript JSON file: an array of {"role", "parts"} messages
    #[arg(long)]
    pub transcript: PathBuf,

    /// Self-assessment JSON file: criterion key to reflection
    #[arg(
        long,
        conflicts_with = "supervisor_feedback",
        required_unless_present = "supervisor_feedback"
    )]
    pub assessment: Option<PathBuf>,

    /// Supervisor feedback to review instead of a self-assessment
    #[arg(long)]
    pub supervisor_feedback: Option<String>,

    /// Analysis endpoint (overrides config)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds (overrides config)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Write the raw response records to this file
    #[arg(long)]
    pub save_raw: Option<PathBuf>,
}

pub async fn run(args: AnalyzeArgs) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    if let Some(endpoint) = args.endpoint.clone() {
        config.backend.endpoint = Some(endpoint);
    }
    if let Some(timeout) = args.timeout {
        config.backend.timeout_secs = timeout;
    }
    if config.backend.endpoint.is_none() {
        bail!(
            "No analysis endpoint configured. Set [backend] endpoint in config, {} or --endpoint",
            ENDPOINT_ENV
        );
    }

    let request = build_request(&args)?;
    let backend = HttpBackend::new(config.backend)?;
    let mut session = AnalysisSession::new(Arc::new(backend));

    // Ctrl+C abandons the session rather than killing the process
    let cancel = session.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    println!("Analyzing... (Ctrl+C to cancel)\n");
    let mut printer = ThinkingPrinter::new();
    let outcome = session
        .submit(request, |snapshot| printer.observe(snapshot))
        .await;
    ctrl_c.abort();
    let outcome = outcome?;

    if let Some(path) = &args.save_raw {
        save_raw_log(&session, path)?;
    }
    report(outcome, &session)
}

fn build_request(args: &AnalyzeArgs) -> Result<AnalysisRequest> {
    let transcript = read_transcript(&args.transcript)?;

    match (&args.assessment, &args.supervisor_feedback) {
        (Some(path), _) => {
            let assessment = read_assessment(path)?;
            Ok(AnalysisRequest::caseworker(transcript, assessment))
        }
        (None, Some(feedback)) => Ok(AnalysisRequest::supervisor(transcript, feedback.clone())),
        (None, None) => bail!("Either --assessment or --supervisor-feedback is required"),
    }
}

fn read_transcript(path: &Path) -> Result<Vec<TranscriptMessage>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;
    let transcript: Vec<TranscriptMessage> = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid transcript in {}", path.display()))?;
    if transcript.is_empty() {
        bail!("Transcript {} has no messages", path.display());
    }
    Ok(transcript)
}

fn read_assessment(path: &Path) -> Result<SelfAssessment> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read self-assessment {}", path.display()))?;
    let assessment: SelfAssessment = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid self-assessment in {}", path.display()))?;

    for criterion in &ASSESSMENT_CRITERIA {
        let answered = assessment
            .get(criterion.key)
            .is_some_and(|text| !text.trim().is_empty());
        if !answered {
            warn!(criterion = criterion.key, title = criterion.title, "No self-assessment entry");
        }
    }
    Ok(assessment)
}
