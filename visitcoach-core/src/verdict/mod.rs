//! Structured verdict extraction and citation handling

pub mod extract;
pub mod markers;
pub mod shape;
pub mod types;

pub use extract::{Extraction, strip_code_fences, try_extract, try_extract_as, try_extract_for};
pub use markers::{CitationRef, MarkerGroup, referenced, scan_markers};
pub use shape::{ResolvedCitation, VerdictShape};
pub use types::{
    AnalysisVerdict, CriterionAssessment, CurriculumCitation, Improvement, SupervisorVerdict,
    TranscriptCitation, Verdict, curriculum_citations,
};
