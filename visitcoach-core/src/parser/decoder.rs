//! NDJSON line buffering for streamed response bodies
//!
//! Transport chunks arrive with arbitrary boundaries: a chunk may hold
//! several records, a fraction of one, or split a multi-byte character.
//! `ChunkDecoder` buffers bytes until a full line is available and only
//! then decodes it, so the records it yields do not depend on how the
//! body was sliced.

use tracing::{debug, warn};

use super::wire::StreamResponse;
use crate::error::RecordError;

/// Characters of a rejected line included in log output
const LOG_PREVIEW_CHARS: usize = 80;

/// One decoded stream record
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// The line exactly as received (whitespace-trimmed)
    pub raw: String,
    /// Typed view of the record
    pub response: StreamResponse,
}

impl DecodedRecord {
    /// Parse a single trimmed line
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let response = serde_json::from_str(line)?;
        Ok(Self {
            raw: line.to_string(),
            response,
        })
    }
}

/// Splits a chunked byte stream into decoded records
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline
    scanned: usize,
    dropped: usize,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record completed by it
    ///
    /// Malformed lines are logged and skipped; they never fail the call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodedRecord> {
        self.pending.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.pending[search_from..]
            .iter()
            .position(|b| *b == b'\n')
        {
            let end = search_from + offset;
            let line = &self.pending[start..end];
            match decode_line(line) {
                Some(Ok(record)) => records.push(record),
                Some(Err(e)) => {
                    self.dropped += 1;
                    warn!(error = %e, line = %preview(line), "Dropping malformed stream record");
                }
                None => {}
            }
            start = end + 1;
            search_from = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();

        records
    }

    /// Convenience wrapper over [`feed`](Self::feed) for text chunks
    pub fn feed_str(&mut self, chunk: &str) -> Vec<DecodedRecord> {
        self.feed(chunk.as_bytes())
    }

    /// Give any unterminated trailing line one final parse attempt
    ///
    /// Called once the stream has ended. Leftover text that does not parse
    /// is discarded without error.
    pub fn finish(&mut self) -> Option<DecodedRecord> {
        let leftover = std::mem::take(&mut self.pending);
        self.scanned = 0;
        match decode_line(&leftover)? {
            Ok(record) => Some(record),
            Err(e) => {
                self.dropped += 1;
                debug!(error = %e, line = %preview(&leftover), "Discarding incomplete trailing line");
                None
            }
        }
    }

    /// Bytes buffered while waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of lines dropped as malformed so far
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }
}

/// Decode one line; `None` for blank lines
fn decode_line(bytes: &[u8]) -> Option<Result<DecodedRecord, RecordError>> {
    let line = match std::str::from_utf8(bytes) {
        Ok(line) => line.trim(),
        Err(_) => return Some(Err(RecordError::InvalidUtf8)),
    };
    if line.is_empty() {
        return None;
    }
    Some(DecodedRecord::parse(line))
}

fn preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(LOG_PREVIEW_CHARS)
        .collect()
}
