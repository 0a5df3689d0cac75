//! AnalysisSession struct and state machine
//!
//! A session runs exactly one analysis: it opens a chunk stream on its
//! backend, drives decode → classify → accumulate for every chunk, hands the
//! caller a snapshot after each one, and settles on a verdict or a typed
//! failure when the stream ends.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::request::{AnalysisRequest, PromptVariant};
use crate::backend::AnalysisBackend;
use crate::error::{SessionError, TransportError};
use crate::parser::ChunkDecoder;
use crate::stream::{StreamAccumulator, StreamPhase, StreamSnapshot};
use crate::verdict::{Extraction, Verdict, try_extract_for};

/// Why a session ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// The stream finished but its answer was missing or not a valid verdict
    MalformedResult { reason: String },
    /// The transport failed before the stream finished
    Transport { message: String },
}

impl FailureKind {
    /// Transport failures are worth retrying with the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Transport { .. })
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::MalformedResult { reason } => write!(f, "Malformed result: {reason}"),
            FailureKind::Transport { message } => write!(f, "Transport error: {message}"),
        }
    }
}

impl From<TransportError> for FailureKind {
    fn from(error: TransportError) -> Self {
        FailureKind::Transport {
            message: error.to_string(),
        }
    }
}

/// State of an analysis session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, nothing submitted yet
    Idle,
    /// Pulling chunks from the backend
    Streaming,
    /// Finished with a verdict
    Succeeded,
    /// Finished without a verdict
    Failed { failure: FailureKind },
    /// Cancelled by the caller before finishing
    Abandoned,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Succeeded | SessionState::Failed { .. } | SessionState::Abandoned
        )
    }
}

/// What `submit` hands back once the session stops
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Succeeded(Verdict),
    Failed {
        failure: FailureKind,
        snapshot: StreamSnapshot,
    },
    Abandoned {
        snapshot: StreamSnapshot,
    },
}

/// One streaming analysis over an injected backend
pub struct AnalysisSession {
    /// Unique session identifier
    id: String,
    /// Transport delivering response chunks
    backend: Arc<dyn AnalysisBackend>,
    /// Current state
    state: SessionState,
    accumulator: StreamAccumulator,
    request: Option<AnalysisRequest>,
    verdict: Option<Verdict>,
    /// Latest verdict parsed while the answer was still streaming
    provisional: Option<Verdict>,
    cancel: CancellationToken,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl AnalysisSession {
    /// Create a session with a generated id
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), backend)
    }

    pub fn with_id(id: impl Into<String>, backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            id: id.into(),
            backend,
            state: SessionState::Idle,
            accumulator: StreamAccumulator::new(),
            request: None,
            verdict: None,
            provisional: None,
            cancel: CancellationToken::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state.clone()
    }

    /// The request this session was submitted with
    pub fn request(&self) -> Option<&AnalysisRequest> {
        self.request.as_ref()
    }

    /// Final verdict, once `Succeeded`
    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    /// Most recent verdict parsed mid-stream; not final until the stream ends
    pub fn provisional_verdict(&self) -> Option<&Verdict> {
        self.provisional.as_ref()
    }

    /// Current view of the accumulated stream
    pub fn snapshot(&self) -> StreamSnapshot {
        self.accumulator.snapshot()
    }

    pub fn accumulator(&self) -> &StreamAccumulator {
        &self.accumulator
    }

    /// Token that abandons this session when cancelled
    ///
    /// Take it before calling `submit`; cancelling stops chunk delivery and
    /// releases the transport without reporting an error.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Run the analysis to completion
    ///
    /// `on_snapshot` is called synchronously after every chunk. Terminal
    /// data conditions come back as `SessionOutcome`; `Err` only signals
    /// misuse, such as submitting twice.
    pub async fn submit(
        &mut self,
        request: AnalysisRequest,
        mut on_snapshot: impl FnMut(&StreamSnapshot),
    ) -> Result<SessionOutcome, SessionError> {
        // Can only submit from Idle state
        if !matches!(self.state, SessionState::Idle) {
            return Err(SessionError::InvalidState {
                expected: "Idle".to_string(),
                actual: format!("{:?}", self.state),
            });
        }

        let variant = request.variant;
        self.state = SessionState::Streaming;
        self.started_at = Some(Utc::now());
        info!(
            session_id = %self.id,
            %variant,
            backend = self.backend.name(),
            "Analysis started"
        );

        let backend = Arc::clone(&self.backend);
        let cancel = self.cancel.clone();
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = backend.open_stream(&request) => Some(result),
        };
        self.request = Some(request);

        let mut stream = match opened {
            None => return Ok(self.abandon()),
            Some(Err(e)) => return Ok(self.fail_transport(e)),
            Some(Ok(stream)) => stream,
        };

        let mut decoder = ChunkDecoder::new();
        let mut chunks = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = stream.next() => Some(next),
            };

            match next {
                None => {
                    drop(stream);
                    return Ok(self.abandon());
                }
                Some(Some(Ok(chunk))) => {
                    chunks += 1;
                    self.process_chunk(&mut decoder, &chunk, variant);
                    on_snapshot(&self.accumulator.snapshot());
                }
                Some(Some(Err(e))) => {
                    drop(stream);
                    return Ok(self.fail_transport(e));
                }
                Some(None) => break,
            }
        }
        drop(stream);

        if let Some(record) = decoder.finish() {
            self.accumulator.ingest(&record);
            self.accumulator.settle();
            on_snapshot(&self.accumulator.snapshot());
        }
        debug!(
            session_id = %self.id,
            chunks,
            records = self.accumulator.raw_log().len(),
            dropped = decoder.dropped_count(),
            "Stream ended"
        );

        Ok(self.finalize(variant))
    }

    /// Run one chunk through the pipeline
    fn process_chunk(&mut self, decoder: &mut ChunkDecoder, chunk: &[u8], variant: PromptVariant) {
        let records = decoder.feed(chunk);
        for record in &records {
            trace!(session_id = %self.id, len = record.raw.len(), "Record");
            self.accumulator.ingest(record);
        }
        if self.accumulator.settle() {
            info!(session_id = %self.id, "Thinking complete, answer streaming");
        }
        if !records.is_empty() {
            self.refresh_provisional(variant);
        }
    }

    fn refresh_provisional(&mut self, variant: PromptVariant) {
        let answer = self.accumulator.answer_text().trim_end();
        if !(answer.ends_with('}') || answer.ends_with("```")) {
            return;
        }
        match try_extract_for(variant, answer, self.accumulator.grounding()) {
            Extraction::Complete(verdict) => self.provisional = Some(verdict),
            Extraction::Invalid(reason) => {
                trace!(session_id = %self.id, %reason, "Provisional verdict rejected");
            }
            Extraction::Incomplete => {}
        }
    }

    /// Decide the terminal state after the stream closed normally
    fn finalize(&mut self, variant: PromptVariant) -> SessionOutcome {
        if self.accumulator.finish() == StreamPhase::Failed {
            return self.fail_malformed("stream ended without answer text".to_string());
        }

        let extraction = try_extract_for(
            variant,
            self.accumulator.answer_text(),
            self.accumulator.grounding(),
        );
        match extraction {
            Extraction::Complete(verdict) => self.succeed(verdict),
            Extraction::Incomplete => {
                self.fail_malformed("answer is not a complete JSON object".to_string())
            }
            Extraction::Invalid(reason) => self.fail_malformed(reason),
        }
    }

    fn succeed(&mut self, verdict: Verdict) -> SessionOutcome {
        let unresolved = verdict.unresolved_markers();
        if !unresolved.is_empty() {
            let markers: Vec<String> = unresolved.iter().map(|r| r.marker()).collect();
            warn!(session_id = %self.id, ?markers, "Citation markers without a matching citation");
        }

        self.state = SessionState::Succeeded;
        self.finished_at = Some(Utc::now());
        self.provisional = None;
        self.verdict = Some(verdict.clone());
        info!(session_id = %self.id, elapsed_ms = self.elapsed_ms(), "Analysis succeeded");
        SessionOutcome::Succeeded(verdict)
    }

    fn fail_malformed(&mut self, reason: String) -> SessionOutcome {
        self.fail(FailureKind::MalformedResult { reason })
    }

    fn fail_transport(&mut self, error: TransportError) -> SessionOutcome {
        self.accumulator.fail();
        self.fail(error.into())
    }

    fn fail(&mut self, failure: FailureKind) -> SessionOutcome {
        warn!(session_id = %self.id, %failure, elapsed_ms = self.elapsed_ms(), "Analysis failed");
        self.state = SessionState::Failed {
            failure: failure.clone(),
        };
        self.finished_at = Some(Utc::now());
        SessionOutcome::Failed {
            failure,
            snapshot: self.accumulator.snapshot(),
        }
    }

    fn abandon(&mut self) -> SessionOutcome {
        info!(session_id = %self.id, elapsed_ms = self.elapsed_ms(), "Analysis abandoned");
        self.state = SessionState::Abandoned;
        self.finished_at = Some(Utc::now());
        SessionOutcome::Abandoned {
            snapshot: self.accumulator.snapshot(),
        }
    }

    fn elapsed_ms(&self) -> i64 {
        self.started_at
            .map(|start| (Utc::now() - start).num_milliseconds())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::session::TranscriptMessage;

    const THINKING: &str = r#"{"candidates":[{"content":{"parts":[{"text":"**Reviewing**\n\nThe worker introduced themselves.","thought":true}]}}]}"#;
    const ANSWER: &str = r#"{"candidates":[{"content":{"parts":[{"text":"{\"overallSummary\":\"Good start.\",\"strengths\":[\"Clear ID [T1]\"],\"areasForImprovement\":[{\"area\":\"Permission\",\"suggestion\":\"Ask to enter [1].\"}]}"}]}}]}"#;
    const SUPERVISOR_ANSWER: &str = r#"{"candidates":[{"content":{"parts":[{"text":"{\"feedbackOnStrengths\":\"Accurate.\",\"feedbackOnCritique\":\"Specific.\",\"overallTone\":\"Supportive\"}"}]}}]}"#;

    fn line(record: &str) -> String {
        format!("{record}\n")
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::caseworker(
            vec![TranscriptMessage::user("Hi, I'm Willis from Child Welfare.")],
            Default::default(),
        )
    }

    fn session_with(backend: MockBackend) -> AnalysisSession {
        AnalysisSession::with_id("test-session", Arc::new(backend))
    }

    // ==================== SessionState Tests ====================

    #[test]
    fn session_state_failed_debug() {
        let state = SessionState::Failed {
            failure: FailureKind::Transport {
                message: "reset".to_string(),
            },
        };
        let debug = format!("{:?}", state);
        assert!(debug.contains("Failed"));
        assert!(debug.contains("reset"));
    }

    #[test]
    fn session_state_serialization_roundtrip() {
        let states = vec![
            SessionState::Idle,
            SessionState::Streaming,
            SessionState::Succeeded,
            SessionState::Failed {
                failure: FailureKind::MalformedResult {
                    reason: "missing 'strengths'".to_string(),
                },
            },
            SessionState::Abandoned,
        ];

        for state in states {
            let json = serde_json::to_string(&state).unwrap();
            let parsed: SessionState = serde_json::from_str(&json).unwrap();
            assert_eq!(state, parsed);
        }
    }

    #[test]
    fn only_finished_states_are_terminal() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
        assert!(SessionState::Succeeded.is_terminal());
        assert!(SessionState::Abandoned.is_terminal());
    }

    #[test]
    fn failure_kind_retryability() {
        assert!(FailureKind::from(TransportError::NotConfigured).is_retryable());
        assert!(
            !FailureKind::MalformedResult {
                reason: "x".to_string()
            }
            .is_retryable()
        );
    }

    // ==================== Creation Tests ====================

    #[test]
    fn new_session_starts_in_idle_state() {
        let session = AnalysisSession::new(Arc::new(MockBackend::new()));
        assert!(matches!(session.state(), SessionState::Idle));
        assert!(!session.id().is_empty());
        assert!(session.request().is_none());
        assert!(session.started_at().is_none());
    }

    // ==================== Submit Tests ====================

    #[tokio::test]
    async fn submit_streams_to_success() {
        let backend = MockBackend::new();
        backend.queue_chunks([line(THINKING), line(ANSWER)]);
        let mut session = session_with(backend);

        let mut snapshots = Vec::new();
        let outcome = session
            .submit(request(), |s| snapshots.push(s.clone()))
            .await
            .unwrap();

        assert!(matches!(outcome, SessionOutcome::Succeeded(Verdict::Caseworker(_))));
        assert!(matches!(session.state(), SessionState::Succeeded));
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].is_thinking);
        assert_eq!(
            snapshots[0].thinking_paragraphs,
            vec!["**Reviewing**", "The worker introduced themselves."]
        );
        assert!(snapshots[1].thinking_complete);
        assert!(session.verdict().is_some());
        assert!(session.finished_at().is_some());
    }

    #[tokio::test]
    async fn second_submit_is_invalid_state() {
        let backend = MockBackend::new();
        backend.queue_chunks([line(ANSWER)]);
        let mut session = session_with(backend);
        session.submit(request(), |_| {}).await.unwrap();

        let result = session.submit(request(), |_| {}).await;
        match result {
            Err(SessionError::InvalidState { expected, actual }) => {
                assert_eq!(expected, "Idle");
                assert_eq!(actual, "Succeeded");
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn supervisor_variant_yields_supervisor_verdict() {
        let backend = MockBackend::new();
        backend.queue_chunks([line(SUPERVISOR_ANSWER)]);
        let mut session = session_with(backend);

        let outcome = session
            .submit(AnalysisRequest::supervisor(vec![], "Fair review."), |_| {})
            .await
            .unwrap();

        let SessionOutcome::Succeeded(verdict) = outcome else {
            panic!("expected success");
        };
        assert_eq!(verdict.as_supervisor().unwrap().overall_tone, "Supportive");
    }

    #[tokio::test]
    async fn provisional_verdict_survives_abandonment() {
        let backend = MockBackend::new();
        backend.queue_hanging([line(THINKING), line(ANSWER)]);
        let mut session = session_with(backend);
        let cancel = session.cancel_handle();

        let outcome = session
            .submit(request(), |s| {
                if s.thinking_complete {
                    cancel.cancel();
                }
            })
            .await
            .unwrap();

        assert!(matches!(outcome, SessionOutcome::Abandoned { .. }));
        assert!(session.verdict().is_none());
        let provisional = session.provisional_verdict().unwrap();
        assert_eq!(
            provisional.as_caseworker().unwrap().overall_summary,
            "Good start."
        );
    }

    #[tokio::test]
    async fn unterminated_final_record_is_flushed() {
        let backend = MockBackend::new();
        backend.queue_chunks([ANSWER]);
        let mut session = session_with(backend);

        let mut calls = 0;
        let outcome = session.submit(request(), |_| calls += 1).await.unwrap();

        assert!(matches!(outcome, SessionOutcome::Succeeded(_)));
        assert_eq!(calls, 2);
    }

    // ==================== Failure Tests ====================

    #[tokio::test]
    async fn open_error_fails_with_transport() {
        let backend = MockBackend::new();
        backend.queue_open_error(TransportError::Status {
            status: 503,
            body: "unavailable".to_string(),
        });
        let mut session = session_with(backend);

        let outcome = session.submit(request(), |_| {}).await.unwrap();

        assert!(matches!(
            outcome,
            SessionOutcome::Failed {
                failure: FailureKind::Transport { .. },
                ..
            }
        ));
        assert!(matches!(
            session.state(),
            SessionState::Failed {
                failure: FailureKind::Transport { .. }
            }
        ));
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_partial_snapshot() {
        let backend = MockBackend::new();
        backend.queue_error_after([line(THINKING)], "connection reset");
        let mut session = session_with(backend);

        let outcome = session.submit(request(), |_| {}).await.unwrap();

        let SessionOutcome::Failed { failure, snapshot } = outcome else {
            panic!("expected failure");
        };
        assert!(failure.to_string().contains("connection reset"));
        assert_eq!(snapshot.thinking_paragraphs.len(), 2);
        assert_eq!(snapshot.raw_log.len(), 1);
        assert_eq!(session.accumulator().phase(), StreamPhase::Failed);
        assert!(!snapshot.is_thinking);
        assert!(snapshot.thinking_complete);
    }

    #[tokio::test]
    async fn thinking_only_stream_is_malformed_result() {
        let backend = MockBackend::new();
        backend.queue_chunks([line(THINKING)]);
        let mut session = session_with(backend);

        let outcome = session.submit(request(), |_| {}).await.unwrap();

        let SessionOutcome::Failed { failure, snapshot } = outcome else {
            panic!("expected failure");
        };
        assert!(matches!(failure, FailureKind::MalformedResult { .. }));
        assert!(!failure.is_retryable());
        assert_eq!(snapshot.answer_text, "");
        assert!(!snapshot.thinking_paragraphs.is_empty());
    }

    #[tokio::test]
    async fn shape_violation_reports_reason() {
        let backend = MockBackend::new();
        backend.queue_chunks([line(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"overallSummary\":\"ok\",\"strengths\":[],\"areasForImprovement\":[]}"}]}}]}"#,
        )]);
        let mut session = session_with(backend);

        let outcome = session.submit(request(), |_| {}).await.unwrap();

        assert_eq!(
            outcome,
            SessionOutcome::Failed {
                failure: FailureKind::MalformedResult {
                    reason: "'strengths' is empty".to_string()
                },
                snapshot: session.snapshot(),
            }
        );
    }

    // ==================== Cancellation Tests ====================

    #[tokio::test]
    async fn cancel_during_stream_abandons() {
        let backend = MockBackend::new();
        backend.queue_hanging([line(THINKING)]);
        let mut session = session_with(backend);
        let cancel = session.cancel_handle();

        let outcome = session
            .submit(request(), |_| cancel.cancel())
            .await
            .unwrap();

        let SessionOutcome::Abandoned { snapshot } = outcome else {
            panic!("expected abandonment");
        };
        assert_eq!(snapshot.raw_log.len(), 1);
        assert!(matches!(session.state(), SessionState::Abandoned));
    }

    #[tokio::test]
    async fn cancel_before_submit_abandons_without_opening() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_chunks([line(ANSWER)]);
        let mut session = AnalysisSession::new(backend.clone());
        session.cancel_handle().cancel();

        let outcome = session.submit(request(), |_| {}).await.unwrap();

        assert!(matches!(outcome, SessionOutcome::Abandoned { .. }));
        assert!(backend.requests().is_empty());
        assert!(backend.has_queued_responses());
    }
}
