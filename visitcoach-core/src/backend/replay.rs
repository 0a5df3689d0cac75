//! Replay of a recorded response stream
//!
//! Feeds a saved NDJSON body (for example a session's raw log) back
//! through the pipeline in fixed-size chunks.

use async_trait::async_trait;
use futures_util::stream;

use super::traits::{AnalysisBackend, ChunkStream};
use crate::error::TransportError;
use crate::session::AnalysisRequest;

/// Default replay chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

pub struct ReplayBackend {
    body: Vec<u8>,
    chunk_size: usize,
}

impl ReplayBackend {
    /// A chunk size of zero replays the body as a single chunk
    pub fn new(body: impl Into<Vec<u8>>, chunk_size: usize) -> Self {
        Self {
            body: body.into(),
            chunk_size,
        }
    }

    /// Rebuild a body from raw log lines
    pub fn from_raw_log(lines: &[String], chunk_size: usize) -> Self {
        let mut body = lines.join("\n");
        body.push('\n');
        Self::new(body, chunk_size)
    }

    fn chunks(&self) -> Vec<Vec<u8>> {
        if self.body.is_empty() {
            return Vec::new();
        }
        let size = if self.chunk_size == 0 {
            self.body.len()
        } else {
            self.chunk_size
        };
        self.body.chunks(size).map(<[u8]>::to_vec).collect()
    }
}

#[async_trait]
impl AnalysisBackend for ReplayBackend {
    fn name(&self) -> &str {
        "replay"
    }

    async fn open_stream(&self, _request: &AnalysisRequest) -> Result<ChunkStream, TransportError> {
        Ok(Box::pin(stream::iter(self.chunks().into_iter().map(Ok))))
    }
}
