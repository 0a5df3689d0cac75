//! Phase tracking and append-only buffers for one response stream
//!
//! The accumulator owns the reasoning text, the answer text, the raw record
//! log and the latest grounding batch. Buffers only ever grow, and once the
//! first answer fragment arrives the stream never goes back to thinking.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::parser::{ClassifiedRecord, ContentFragment, DecodedRecord, GroundingBatch, classify};

/// Phase of a response stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamPhase {
    /// Only reasoning received so far
    Thinking,
    /// First answer fragment seen within the current batch
    Transitioning,
    /// Answer text is streaming
    Answering,
    /// Stream ended with answer text
    Done,
    /// Stream ended without a usable answer, or was failed from outside
    Failed,
}

impl StreamPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamPhase::Done | StreamPhase::Failed)
    }
}

/// Read-only view published after every chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSnapshot {
    pub thinking_paragraphs: Vec<String>,
    pub answer_text: String,
    pub is_thinking: bool,
    pub thinking_complete: bool,
    pub raw_log: Vec<String>,
}

/// Accumulates classified records into phase-aware buffers
#[derive(Debug)]
pub struct StreamAccumulator {
    thinking_text: String,
    answer_text: String,
    raw_log: Vec<String>,
    grounding: Option<GroundingBatch>,
    phase: StreamPhase,
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self {
            thinking_text: String::new(),
            answer_text: String::new(),
            raw_log: Vec::new(),
            grounding: None,
            phase: StreamPhase::Thinking,
        }
    }

    /// Log a decoded record and apply its classified content
    pub fn ingest(&mut self, record: &DecodedRecord) {
        if self.phase.is_terminal() {
            warn!(phase = ?self.phase, "Ignoring record after stream end");
            return;
        }
        self.raw_log.push(record.raw.clone());
        self.apply(classify(record));
    }

    /// Apply fragments in order, then replace grounding if the record had any
    pub fn apply(&mut self, classified: ClassifiedRecord) {
        for fragment in classified.fragments {
            self.push_fragment(fragment);
        }
        if let Some(batch) = classified.grounding {
            if self.phase.is_terminal() {
                return;
            }
            debug!(sources = batch.len(), "Grounding batch received");
            self.grounding = Some(batch);
        }
    }

    /// Append one fragment to the buffer for its kind
    pub fn push_fragment(&mut self, fragment: ContentFragment) {
        if self.phase.is_terminal() {
            warn!(phase = ?self.phase, "Ignoring fragment after stream end");
            return;
        }
        if fragment.text.is_empty() {
            return;
        }

        if fragment.is_thought {
            trace!(len = fragment.text.len(), "Reasoning fragment");
            self.thinking_text.push_str(&fragment.text);
            return;
        }

        if self.phase == StreamPhase::Thinking {
            debug!(
                thinking_len = self.thinking_text.len(),
                "First answer fragment, thinking complete"
            );
            self.phase = StreamPhase::Transitioning;
        }
        self.answer_text.push_str(&fragment.text);
    }

    /// Close out a batch; returns true when this settled the transition
    pub fn settle(&mut self) -> bool {
        if self.phase == StreamPhase::Transitioning {
            self.phase = StreamPhase::Answering;
            true
        } else {
            false
        }
    }

    /// Mark the natural end of the stream
    ///
    /// Ends in `Done` when answer text arrived, `Failed` otherwise. Calling
    /// it on an already terminal accumulator leaves the phase unchanged.
    pub fn finish(&mut self) -> StreamPhase {
        self.settle();
        if !self.phase.is_terminal() {
            self.phase = if self.answer_text.trim().is_empty() {
                StreamPhase::Failed
            } else {
                StreamPhase::Done
            };
        }
        self.phase
    }

    /// Force the stream into `Failed`, keeping every buffer intact
    pub fn fail(&mut self) {
        self.phase = StreamPhase::Failed;
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn thinking_text(&self) -> &str {
        &self.thinking_text
    }

    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    pub fn raw_log(&self) -> &[String] {
        &self.raw_log
    }

    /// Most recent non-empty grounding batch
    pub fn grounding(&self) -> Option<&GroundingBatch> {
        self.grounding.as_ref()
    }

    /// True once the stream has left `Thinking`, whether by answering or by ending
    ///
    /// Always the negation of the snapshot's `is_thinking`.
    pub fn thinking_complete(&self) -> bool {
        self.phase != StreamPhase::Thinking
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            thinking_paragraphs: split_paragraphs(&self.thinking_text),
            answer_text: self.answer_text.clone(),
            is_thinking: self.phase == StreamPhase::Thinking,
            thinking_complete: self.thinking_complete(),
            raw_log: self.raw_log.clone(),
        }
    }
}

/// Split text into paragraphs on runs of two or more newlines
///
/// Whitespace-only lines count as paragraph breaks. Each paragraph is
/// trimmed and empty ones are dropped.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        if line.trim().is_empty() {
            push_paragraph(&mut paragraphs, &mut current);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    push_paragraph(&mut paragraphs, &mut current);

    paragraphs
}

fn push_paragraph(paragraphs: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        paragraphs.push(trimmed.to_string());
    }
    current.clear();
}
