//! Structured verdicts produced from the model's answer text

use serde::{Deserialize, Serialize};

use crate::parser::GroundingBatch;

/// Caseworker-facing analysis of one interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisVerdict {
    pub overall_summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<Improvement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_analysis: Option<Vec<CriterionAssessment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_citations: Option<Vec<TranscriptCitation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<CurriculumCitation>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Improvement {
    pub area: String,
    pub suggestion: String,
}

/// Scoring of one rubric criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionAssessment {
    pub criterion: String,
    pub met: bool,
    /// Rating label such as "Good" or "Not Demonstrated"
    #[serde(default)]
    pub score: String,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub feedback: String,
}

/// Supervisor-facing feedback on a caseworker's self-review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorVerdict {
    pub feedback_on_strengths: String,
    pub feedback_on_critique: String,
    pub overall_tone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_citations: Option<Vec<TranscriptCitation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<CurriculumCitation>>,
}

/// A transcript quote the model cites as `[Tn]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptCitation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    /// Literal marker, e.g. `[T1]`
    #[serde(default)]
    pub marker: String,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub quote: String,
}

/// A curriculum source the model cites as `[n]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumCitation {
    pub number: u32,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Human-readable range, e.g. `Pages 12-14`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Map a grounding batch to citations, keeping the classifier's numbering
pub fn curriculum_citations(batch: &GroundingBatch) -> Vec<CurriculumCitation> {
    batch
        .sources
        .iter()
        .map(|source| CurriculumCitation {
            number: source.index,
            source: source.title.clone(),
            text: source.text.clone(),
            pages: source.pages.map(|range| range.to_string()),
            uri: source.uri.clone(),
        })
        .collect()
}

/// A verdict of either prompt variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Verdict {
    Caseworker(AnalysisVerdict),
    Supervisor(SupervisorVerdict),
}

impl Verdict {
    pub fn as_caseworker(&self) -> Option<&AnalysisVerdict> {
        match self {
            Verdict::Caseworker(verdict) => Some(verdict),
            Verdict::Supervisor(_) => None,
        }
    }

    pub fn as_supervisor(&self) -> Option<&SupervisorVerdict> {
        match self {
            Verdict::Supervisor(verdict) => Some(verdict),
            Verdict::Caseworker(_) => None,
        }
    }
}
