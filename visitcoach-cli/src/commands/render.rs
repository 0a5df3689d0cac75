//! Terminal output shared by `analyze` and `replay`

use std::path::Path;

use anyhow::{Result, bail};
use visitcoach_core::{AnalysisSession, SessionOutcome, StreamSnapshot};

/// Prints reasoning paragraphs once they can no longer grow
#[derive(Debug, Default)]
pub struct ThinkingPrinter {
    printed: usize,
    announced_answer: bool,
}

impl ThinkingPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraphs that became final since the last call
    ///
    /// While the model is still thinking the last paragraph may still be
    /// extended, so it is held back.
    fn take_new(&mut self, snapshot: &StreamSnapshot) -> Vec<String> {
        let paragraphs = &snapshot.thinking_paragraphs;
        let settled = if snapshot.is_thinking {
            paragraphs.len().saturating_sub(1)
        } else {
            paragraphs.len()
        };
        if settled <= self.printed {
            return Vec::new();
        }
        let fresh = paragraphs[self.printed..settled].to_vec();
        self.printed = settled;
        fresh
    }

    pub fn observe(&mut self, snapshot: &StreamSnapshot) {
        for paragraph in self.take_new(snapshot) {
            println!("\x1b[2m{}\x1b[0m\n", paragraph);
        }
        if snapshot.thinking_complete && !self.announced_answer {
            self.announced_answer = true;
            println!("\x1b[36m── Thinking complete, writing feedback ──\x1b[0m\n");
        }
    }
}

/// Print the terminal outcome, failing the command unless it succeeded
pub fn report(outcome: SessionOutcome, session: &AnalysisSession) -> Result<()> {
    match outcome {
        SessionOutcome::Succeeded(verdict) => {
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            Ok(())
        }
        SessionOutcome::Failed { failure, snapshot } => {
            if !snapshot.answer_text.is_empty() {
                eprintln!("\x1b[33mPartial answer:\x1b[0m\n{}\n", snapshot.answer_text);
            }
            if failure.is_retryable() {
                eprintln!("\x1b[33mThe request can be retried.\x1b[0m");
            }
            bail!("analysis failed: {failure}")
        }
        SessionOutcome::Abandoned { .. } => {
            println!("\n\x1b[33mAnalysis cancelled\x1b[0m");
            if let Some(verdict) = session.provisional_verdict() {
                println!("Last complete verdict seen before cancelling:");
                println!("{}", serde_json::to_string_pretty(verdict)?);
            }
            Ok(())
        }
    }
}

/// Write the session's raw record log as NDJSON
pub fn save_raw_log(session: &AnalysisSession, path: &Path) -> Result<()> {
    let raw_log = session.snapshot().raw_log;
    let mut body = raw_log.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    std::fs::write(path, body)?;
    println!("Saved {} records to {}", raw_log.len(), path.display());
    Ok(())
}
