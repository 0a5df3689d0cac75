//! What a caller submits for analysis

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which analysis the model is asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    /// Feedback on a caseworker's interview and self-assessment
    #[default]
    Caseworker,
    /// Feedback on a supervisor's review of an interview
    Supervisor,
}

impl PromptVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptVariant::Caseworker => "caseworker",
            PromptVariant::Supervisor => "supervisor",
        }
    }
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "caseworker" => Ok(PromptVariant::Caseworker),
            "supervisor" => Ok(PromptVariant::Supervisor),
            other => Err(format!("unknown prompt variant: {other}")),
        }
    }
}

/// Speaker side of a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The trainee
    User,
    /// The simulated client
    Model,
}

/// One turn of the role-play transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    pub parts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl TranscriptMessage {
    pub fn user(parts: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: parts.into(),
            speaker: None,
        }
    }

    pub fn model(parts: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: parts.into(),
            speaker: None,
        }
    }
}

/// Criterion key to the trainee's own reflection
pub type SelfAssessment = BTreeMap<String, String>;

/// A practice-behaviour rubric criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criterion {
    pub key: &'static str,
    pub title: &'static str,
}

/// The home-visit rubric, in interview order
pub const ASSESSMENT_CRITERIA: [Criterion; 6] = [
    Criterion {
        key: "introduction",
        title: "Introduction & Identification",
    },
    Criterion {
        key: "reasonForContact",
        title: "Reason for Contact",
    },
    Criterion {
        key: "responsiveToParent",
        title: "Responsive to Parent Needs",
    },
    Criterion {
        key: "permissionToEnter",
        title: "Permission to Enter",
    },
    Criterion {
        key: "gatheringInformation",
        title: "Information Gathering",
    },
    Criterion {
        key: "processAndNextSteps",
        title: "Process & Next Steps",
    },
];

/// The caller's own input alongside the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Submission {
    SelfAssessment(SelfAssessment),
    SupervisorFeedback(String),
}

/// Everything needed to start one analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub transcript: Vec<TranscriptMessage>,
    pub submission: Submission,
    pub variant: PromptVariant,
}

impl AnalysisRequest {
    pub fn caseworker(transcript: Vec<TranscriptMessage>, assessment: SelfAssessment) -> Self {
        Self {
            transcript,
            submission: Submission::SelfAssessment(assessment),
            variant: PromptVariant::Caseworker,
        }
    }

    pub fn supervisor(transcript: Vec<TranscriptMessage>, feedback: impl Into<String>) -> Self {
        Self {
            transcript,
            submission: Submission::SupervisorFeedback(feedback.into()),
            variant: PromptVariant::Supervisor,
        }
    }

    pub fn self_assessment(&self) -> Option<&SelfAssessment> {
        match &self.submission {
            Submission::SelfAssessment(assessment) => Some(assessment),
            Submission::SupervisorFeedback(_) => None,
        }
    }

    pub fn supervisor_feedback(&self) -> Option<&str> {
        match &self.submission {
            Submission::SupervisorFeedback(feedback) => Some(feedback),
            Submission::SelfAssessment(_) => None,
        }
    }
}
