//! visitcoach-core: Core library for the visitcoach analysis pipeline
//!
//! This crate turns a streamed model response into structured interview
//! feedback:
//!
//! - **Chunk decoding** - [`ChunkDecoder`] buffers NDJSON lines across arbitrary chunk boundaries
//! - **Classification** - [`classify`] splits parts into reasoning and answer fragments and numbers grounding sources
//! - **Accumulation** - [`StreamAccumulator`] tracks the thinking/answering phase and publishes [`StreamSnapshot`]s
//! - **Extraction** - [`try_extract`] rebuilds an [`AnalysisVerdict`] from answer text and attaches citations
//! - **Sessions** - [`AnalysisSession`] drives one request from submit to a verdict or typed failure
//! - **Backends** - [`AnalysisBackend`] trait with HTTP, replay and mock implementations
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use visitcoach_core::{
//!     AnalysisRequest, AnalysisSession, BackendConfig, HttpBackend, SessionOutcome,
//!     TranscriptMessage,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = HttpBackend::new(BackendConfig {
//!         endpoint: Some("https://example.invalid/analyze".to_string()),
//!         ..Default::default()
//!     })?;
//!     let mut session = AnalysisSession::new(Arc::new(backend));
//!
//!     let request = AnalysisRequest::supervisor(
//!         vec![TranscriptMessage::user("Knock, knock.")],
//!         "The worker rushed the introduction.",
//!     );
//!     let outcome = session
//!         .submit(request, |snapshot| {
//!             println!("{} thinking paragraphs", snapshot.thinking_paragraphs.len());
//!         })
//!         .await?;
//!
//!     if let SessionOutcome::Succeeded(verdict) = outcome {
//!         println!("{}", serde_json::to_string_pretty(&verdict)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     AnalysisSession                      │
//! │                                                          │
//! │  AnalysisBackend ──chunks──▶ ChunkDecoder ──records──┐   │
//! │                                                      ▼   │
//! │  StructuredResultExtractor ◀── StreamAccumulator ◀── classify
//! │          │                          │                    │
//! │          ▼                          ▼                    │
//! │       Verdict                 StreamSnapshot ──▶ caller  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod parser;
pub mod session;
pub mod stream;
pub mod verdict;

// Re-export key types for convenience
pub use backend::{
    AnalysisBackend, BackendConfig, ChunkStream, HttpBackend, MockBackend, ReplayBackend,
};
pub use error::{CoachError, RecordError, SessionError, TransportError};
pub use parser::{
    ChunkDecoder, ClassifiedRecord, ContentFragment, DecodedRecord, GroundingBatch,
    GroundingSource, PageRange, classify,
};
pub use session::{
    ASSESSMENT_CRITERIA, AnalysisRequest, AnalysisSession, FailureKind, PromptVariant,
    SelfAssessment, SessionOutcome, SessionState, TranscriptMessage,
};
pub use stream::{StreamAccumulator, StreamPhase, StreamSnapshot};
pub use verdict::{
    AnalysisVerdict, CitationRef, CurriculumCitation, Extraction, SupervisorVerdict,
    TranscriptCitation, Verdict, VerdictShape, try_extract, try_extract_as, try_extract_for,
};
