//! Mock backend for testing
//!
//! MockBackend plays back scripted chunk sequences, enabling fast,
//! deterministic testing of session logic without a network.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};

use super::traits::{AnalysisBackend, ChunkStream};
use crate::error::TransportError;
use crate::session::AnalysisRequest;

/// How a scripted stream ends after its chunks
#[derive(Debug, Clone)]
enum Ending {
    Close,
    Error(TransportError),
    /// Never yields again; used to exercise cancellation
    Hang,
}

#[derive(Debug, Clone)]
enum Script {
    Stream { chunks: Vec<Vec<u8>>, ending: Ending },
    OpenError(TransportError),
}

/// Mock implementation of AnalysisBackend for testing
///
/// Queue scripts before submitting. Each `open_stream()` consumes one.
#[derive(Debug, Default)]
pub struct MockBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stream that yields `chunks` and then closes normally
    pub fn queue_chunks<I, C>(&self, chunks: I)
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        self.push(Script::Stream {
            chunks: collect_chunks(chunks),
            ending: Ending::Close,
        });
    }

    /// Queue a stream that yields `chunks` and then fails mid-stream
    pub fn queue_error_after<I, C>(&self, chunks: I, message: &str)
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        self.push(Script::Stream {
            chunks: collect_chunks(chunks),
            ending: Ending::Error(TransportError::Stream(message.to_string())),
        });
    }

    /// Queue a stream that yields `chunks` and then never finishes
    pub fn queue_hanging<I, C>(&self, chunks: I)
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        self.push(Script::Stream {
            chunks: collect_chunks(chunks),
            ending: Ending::Hang,
        });
    }

    /// Queue a failure to open the stream at all
    pub fn queue_open_error(&self, error: TransportError) {
        self.push(Script::OpenError(error));
    }

    pub fn has_queued_responses(&self) -> bool {
        !lock(&self.scripts).is_empty()
    }

    pub fn queued_response_count(&self) -> usize {
        lock(&self.scripts).len()
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        lock(&self.requests).clone()
    }

    fn push(&self, script: Script) {
        lock(&self.scripts).push_back(script);
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open_stream(&self, request: &AnalysisRequest) -> Result<ChunkStream, TransportError> {
        lock(&self.requests).push(request.clone());

        let script = lock(&self.scripts).pop_front().ok_or_else(|| {
            TransportError::Request("No queued response in MockBackend".to_string())
        })?;

        let (chunks, ending) = match script {
            Script::OpenError(error) => return Err(error),
            Script::Stream { chunks, ending } => (chunks, ending),
        };

        let tail: ChunkStream = match ending {
            Ending::Close => Box::pin(stream::empty()),
            Ending::Error(error) => Box::pin(stream::once(async move { Err(error) })),
            Ending::Hang => Box::pin(stream::pending()),
        };

        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok)).chain(tail)))
    }
}

fn collect_chunks<I, C>(chunks: I) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    chunks.into_iter().map(|c| c.as_ref().to_vec()).collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
