//! Classification of record parts into reasoning and answer fragments
//!
//! The model service marks reasoning parts with a structural `thought`
//! flag. Everything else with text is answer output. Grounding metadata
//! attached to a record is lifted into a numbered `GroundingBatch`.

use serde::{Deserialize, Serialize};

use super::decoder::DecodedRecord;
use super::wire::{GroundingMetadata, PageSpan};

/// Title used for grounding sources the service left untitled
pub const FALLBACK_SOURCE_TITLE: &str = "Training Material";

/// A unit of text from one part, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFragment {
    pub text: String,
    pub is_thought: bool,
}

impl ContentFragment {
    pub fn thought(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_thought: true,
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_thought: false,
        }
    }
}

/// Inclusive page range of a curriculum passage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRange {
    pub first_page: u32,
    pub last_page: u32,
}

impl PageRange {
    /// A span with one page missing covers just the page that is present
    pub fn from_span(span: PageSpan) -> Option<Self> {
        let first_page = span.first_page.or(span.last_page)?;
        let last_page = span.last_page.unwrap_or(first_page).max(first_page);
        Some(Self {
            first_page,
            last_page,
        })
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pages {}-{}", self.first_page, self.last_page)
    }
}

/// One curriculum source the model may cite as `[index]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    /// 1-based position in the batch, matching the model's citation markers
    pub index: u32,
    pub title: String,
    pub text: Option<String>,
    pub pages: Option<PageRange>,
    pub uri: Option<String>,
}

/// Ordered grounding sources delivered with one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingBatch {
    pub sources: Vec<GroundingSource>,
}

impl GroundingBatch {
    /// Number every grounding chunk by its delivery position
    ///
    /// Chunks without a retrieved context still consume a number so later
    /// sources stay aligned with the markers in the answer.
    pub fn from_metadata(metadata: &GroundingMetadata) -> Self {
        let sources = metadata
            .grounding_chunks
            .iter()
            .zip(1u32..)
            .map(|(chunk, index)| {
                let context = chunk.retrieved_context.as_ref();
                GroundingSource {
                    index,
                    title: context
                        .and_then(|c| c.title.clone())
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| FALLBACK_SOURCE_TITLE.to_string()),
                    text: context.and_then(|c| c.text.clone()),
                    pages: context.and_then(|c| c.pages()).and_then(PageRange::from_span),
                    uri: context.and_then(|c| c.uri.clone()),
                }
            })
            .collect();
        Self { sources }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Look up a source by its 1-based index
    pub fn get(&self, index: u32) -> Option<&GroundingSource> {
        self.sources.iter().find(|s| s.index == index)
    }
}

/// Everything one record contributes to the accumulator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedRecord {
    pub fragments: Vec<ContentFragment>,
    pub grounding: Option<GroundingBatch>,
}

/// Classify the parts of a decoded record
///
/// Parts keep their delivery order and may mix kinds within one record.
/// Parts without text are ignored. An empty grounding list yields `None`.
pub fn classify(record: &DecodedRecord) -> ClassifiedRecord {
    let Some(candidate) = record.response.primary_candidate() else {
        return ClassifiedRecord::default();
    };

    let fragments = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| {
            let text = part.text.as_deref().filter(|t| !t.is_empty())?;
            Some(ContentFragment {
                text: text.to_string(),
                is_thought: part.thought.unwrap_or(false),
            })
        })
        .collect();

    let grounding = candidate
        .grounding_metadata
        .as_ref()
        .map(GroundingBatch::from_metadata)
        .filter(|batch| !batch.is_empty());

    ClassifiedRecord {
        fragments,
        grounding,
    }
}
