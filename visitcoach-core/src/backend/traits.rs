//! AnalysisBackend trait and related types
//!
//! A backend is the transport collaborator: it turns an analysis request
//! into an ordered stream of raw body chunks. Decoding and interpretation
//! happen above it, so HTTP, recorded replays and scripted tests all share
//! one pipeline.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::error::TransportError;
use crate::session::AnalysisRequest;

/// Ordered raw chunks of a streamed response body
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Trait for analysis transports
///
/// Implementations must deliver chunks in order. Dropping the returned
/// stream releases the underlying connection.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Start an analysis and return its body stream
    async fn open_stream(&self, request: &AnalysisRequest) -> Result<ChunkStream, TransportError>;
}
