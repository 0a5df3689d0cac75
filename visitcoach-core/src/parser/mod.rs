//! Streamed response parsing: line decoding, wire types, part classification

pub mod classifier;
pub mod decoder;
pub mod wire;

pub use classifier::{
    ClassifiedRecord, ContentFragment, FALLBACK_SOURCE_TITLE, GroundingBatch, GroundingSource,
    PageRange, classify,
};
pub use decoder::{ChunkDecoder, DecodedRecord};
pub use wire::StreamResponse;
