//! Required-field validation and citation access for verdict shapes
//!
//! Validation runs against the raw JSON object before typed decoding so
//! that every rejection carries a specific reason.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::markers::{CitationRef, referenced};
use super::types::{
    AnalysisVerdict, CurriculumCitation, SupervisorVerdict, TranscriptCitation, Verdict,
};

/// A citation resolved from a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedCitation<'a> {
    Curriculum(&'a CurriculumCitation),
    Transcript(&'a TranscriptCitation),
}

/// A verdict type the extractor can produce
pub trait VerdictShape: DeserializeOwned {
    /// Name used in rejection reasons
    const NAME: &'static str;

    /// Check required fields, returning the first violation
    fn validate(object: &Map<String, Value>) -> Result<(), String>;

    /// Replace curriculum citations with grounding-derived ones
    fn attach_citations(&mut self, citations: Vec<CurriculumCitation>);

    fn curriculum_citations(&self) -> &[CurriculumCitation];

    fn transcript_citations(&self) -> &[TranscriptCitation];

    /// Free-text fields that may carry citation markers
    fn text_fields(&self) -> Vec<&str>;

    fn resolve(&self, reference: &CitationRef) -> Option<ResolvedCitation<'_>> {
        match *reference {
            CitationRef::Curriculum(number) => self
                .curriculum_citations()
                .iter()
                .find(|c| c.number == number)
                .map(ResolvedCitation::Curriculum),
            CitationRef::Transcript(number) => {
                let marker = reference.marker();
                self.transcript_citations()
                    .iter()
                    .find(|c| {
                        c.marker == marker || (c.marker.is_empty() && c.number == Some(number))
                    })
                    .map(ResolvedCitation::Transcript)
            }
        }
    }

    /// Distinct markers in the text fields with no matching citation
    fn unresolved_markers(&self) -> Vec<CitationRef> {
        let cited: BTreeSet<CitationRef> = self
            .text_fields()
            .into_iter()
            .flat_map(referenced)
            .collect();
        cited
            .into_iter()
            .filter(|r| self.resolve(r).is_none())
            .collect()
    }
}

impl VerdictShape for AnalysisVerdict {
    const NAME: &'static str = "analysis";

    fn validate(object: &Map<String, Value>) -> Result<(), String> {
        require_text(object, "overallSummary")?;

        let strengths = require_items(object, "strengths")?;
        for (i, strength) in strengths.iter().enumerate() {
            if !strength.is_string() {
                return Err(format!("strengths[{i}] must be a string"));
            }
        }

        let areas = require_items(object, "areasForImprovement")?;
        for (i, area) in areas.iter().enumerate() {
            let Some(item) = area.as_object() else {
                return Err(format!("areasForImprovement[{i}] must be an object"));
            };
            for field in ["area", "suggestion"] {
                if !item.get(field).is_some_and(Value::is_string) {
                    return Err(format!("areasForImprovement[{i}] is missing '{field}'"));
                }
            }
        }

        Ok(())
    }

    fn attach_citations(&mut self, citations: Vec<CurriculumCitation>) {
        self.citations = Some(citations);
    }

    fn curriculum_citations(&self) -> &[CurriculumCitation] {
        self.citations.as_deref().unwrap_or_default()
    }

    fn transcript_citations(&self) -> &[TranscriptCitation] {
        self.transcript_citations.as_deref().unwrap_or_default()
    }

    fn text_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.overall_summary.as_str()];
        fields.extend(self.strengths.iter().map(String::as_str));
        for item in &self.areas_for_improvement {
            fields.push(&item.area);
            fields.push(&item.suggestion);
        }
        for criterion in self.criteria_analysis.iter().flatten() {
            fields.push(&criterion.evidence);
            fields.push(&criterion.feedback);
        }
        fields
    }
}

impl VerdictShape for SupervisorVerdict {
    const NAME: &'static str = "supervisor";

    fn validate(object: &Map<String, Value>) -> Result<(), String> {
        require_text(object, "feedbackOnStrengths")?;
        require_text(object, "feedbackOnCritique")?;
        require_text(object, "overallTone")?;
        Ok(())
    }

    fn attach_citations(&mut self, citations: Vec<CurriculumCitation>) {
        self.citations = Some(citations);
    }

    fn curriculum_citations(&self) -> &[CurriculumCitation] {
        self.citations.as_deref().unwrap_or_default()
    }

    fn transcript_citations(&self) -> &[TranscriptCitation] {
        self.transcript_citations.as_deref().unwrap_or_default()
    }

    fn text_fields(&self) -> Vec<&str> {
        vec![
            self.feedback_on_strengths.as_str(),
            self.feedback_on_critique.as_str(),
            self.overall_tone.as_str(),
        ]
    }
}

impl Verdict {
    pub fn resolve(&self, reference: &CitationRef) -> Option<ResolvedCitation<'_>> {
        match self {
            Verdict::Caseworker(verdict) => verdict.resolve(reference),
            Verdict::Supervisor(verdict) => verdict.resolve(reference),
        }
    }

    pub fn unresolved_markers(&self) -> Vec<CitationRef> {
        match self {
            Verdict::Caseworker(verdict) => verdict.unresolved_markers(),
            Verdict::Supervisor(verdict) => verdict.unresolved_markers(),
        }
    }
}

fn require_text(object: &Map<String, Value>, field: &str) -> Result<(), String> {
    match object.get(field) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(format!("'{field}' is empty")),
        Some(_) => Err(format!("'{field}' must be a string")),
        None => Err(format!("missing '{field}'")),
    }
}

fn require_items<'a>(object: &'a Map<String, Value>, field: &str) -> Result<&'a [Value], String> {
    match object.get(field) {
        Some(Value::Array(items)) if !items.is_empty() => Ok(items),
        Some(Value::Array(_)) => Err(format!("'{field}' is empty")),
        Some(_) => Err(format!("'{field}' must be an array")),
        None => Err(format!("missing '{field}'")),
    }
}
