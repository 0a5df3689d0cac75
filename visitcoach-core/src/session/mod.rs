//! Analysis sessions: requests and the session state machine

pub mod request;
pub mod state;

pub use request::{
    ASSESSMENT_CRITERIA, AnalysisRequest, Criterion, PromptVariant, Role, SelfAssessment,
    Submission, TranscriptMessage,
};
pub use state::{AnalysisSession, FailureKind, SessionOutcome, SessionState};
