//! Wire types for the model service's streamed response records
//!
//! Each NDJSON line is one `StreamResponse`. Only the fields the pipeline
//! reads are modelled; everything else is ignored. Both the snake_case and
//! camelCase spellings the service emits are accepted.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One streamed response record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl StreamResponse {
    /// The candidate the pipeline consumes (the service streams a single one)
    pub fn primary_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// A candidate completion within a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,

    #[serde(
        default,
        alias = "groundingMetadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub grounding_metadata: Option<GroundingMetadata>,
}

/// Ordered content parts of a candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single content part
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Set on reasoning parts; absent or false marks answer text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingMetadata {
    #[serde(default, alias = "groundingChunks")]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(
        default,
        alias = "retrievedContext",
        skip_serializing_if = "Option::is_none"
    )]
    pub retrieved_context: Option<RetrievedContext>,
}

/// A curriculum passage retrieved by the model service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, alias = "pageSpan", skip_serializing_if = "Option::is_none")]
    pub page_span: Option<PageSpan>,

    #[serde(default, alias = "ragChunk", skip_serializing_if = "Option::is_none")]
    pub rag_chunk: Option<RagChunk>,
}

impl RetrievedContext {
    /// Page span, preferring the top-level one over the RAG chunk's
    ///
    /// Spans with neither page set are skipped.
    pub fn pages(&self) -> Option<PageSpan> {
        self.page_span
            .filter(PageSpan::has_pages)
            .or_else(|| {
                self.rag_chunk
                    .as_ref()
                    .and_then(|chunk| chunk.page_span)
                    .filter(PageSpan::has_pages)
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagChunk {
    #[serde(default, alias = "pageSpan", skip_serializing_if = "Option::is_none")]
    pub page_span: Option<PageSpan>,
}

/// Page numbers as sent; either may be missing or unreadable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpan {
    #[serde(
        default,
        alias = "firstPage",
        deserialize_with = "lenient_page",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_page: Option<u32>,
    #[serde(
        default,
        alias = "lastPage",
        deserialize_with = "lenient_page",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_page: Option<u32>,
}

impl PageSpan {
    pub fn has_pages(&self) -> bool {
        self.first_page.is_some() || self.last_page.is_some()
    }
}

/// Accept a page as a number or numeric string; anything else reads as absent
///
/// Int64 fields can arrive as strings in JSON-mapped protobuf output.
fn lenient_page<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let page = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(page)
}
