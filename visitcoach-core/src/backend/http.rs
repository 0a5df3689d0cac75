//! HTTP backend for the analysis endpoint
//!
//! POSTs the request as JSON and streams the NDJSON response body back as
//! raw chunks. The endpoint is injected through `BackendConfig`; nothing is
//! read from the process environment here.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::traits::{AnalysisBackend, ChunkStream};
use crate::error::TransportError;
use crate::session::{AnalysisRequest, PromptVariant, SelfAssessment, TranscriptMessage};

/// Default whole-request timeout, covering the full streamed body
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection settings for `HttpBackend`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Analysis endpoint URL
    pub endpoint: Option<String>,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// JSON body sent to the analysis endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    action: &'static str,
    variant: PromptVariant,
    transcript: &'a [TranscriptMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    assessment: Option<&'a SelfAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supervisor_feedback: Option<&'a str>,
}

impl<'a> From<&'a AnalysisRequest> for RequestBody<'a> {
    fn from(request: &'a AnalysisRequest) -> Self {
        Self {
            action: "analyze",
            variant: request.variant,
            transcript: &request.transcript,
            assessment: request.self_assessment(),
            supervisor_feedback: request.supervisor_feedback(),
        }
    }
}

/// Streams analyses from a remote endpoint over HTTP
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn open_stream(&self, request: &AnalysisRequest) -> Result<ChunkStream, TransportError> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or(TransportError::NotConfigured)?;

        info!(%endpoint, variant = %request.variant, "Requesting analysis");
        let response = self
            .client
            .post(endpoint)
            .json(&RequestBody::from(request))
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(%status, "Analysis stream opened");

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::Stream(e.to_string()))
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response, returning the request body received
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/analyze", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "{status_line}\r\nContent-Type: application/x-ndjson\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });

        (url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return String::from_utf8_lossy(&buf[header_end + 4..]).to_string();
                }
            }
        }
        String::new()
    }

    fn request() -> AnalysisRequest {
        let mut assessment = SelfAssessment::new();
        assessment.insert("introduction".to_string(), "Stated my name.".to_string());
        AnalysisRequest::caseworker(vec![TranscriptMessage::user("Knock, knock.")], assessment)
    }

    // ==================== Request Body Tests ====================

    #[test]
    fn request_body_for_caseworker() {
        let json = serde_json::to_value(RequestBody::from(&request())).unwrap();

        assert_eq!(json["action"], "analyze");
        assert_eq!(json["variant"], "caseworker");
        assert_eq!(json["transcript"][0]["role"], "user");
        assert_eq!(json["assessment"]["introduction"], "Stated my name.");
        assert!(json.get("supervisorFeedback").is_none());
    }

    #[test]
    fn request_body_for_supervisor() {
        let request = AnalysisRequest::supervisor(vec![], "Too vague.");
        let json = serde_json::to_value(RequestBody::from(&request)).unwrap();

        assert_eq!(json["variant"], "supervisor");
        assert_eq!(json["supervisorFeedback"], "Too vague.");
        assert!(json.get("assessment").is_none());
    }

    // ==================== Transport Tests ====================

    #[tokio::test]
    async fn missing_endpoint_is_not_configured() {
        let backend = HttpBackend::new(BackendConfig::default()).unwrap();
        let result = backend.open_stream(&request()).await;
        assert!(matches!(result, Err(TransportError::NotConfigured)));
    }

    #[tokio::test]
    async fn streams_response_body() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", "{\"candidates\":[]}\n").await;
        let backend = HttpBackend::new(BackendConfig {
            endpoint: Some(url),
            ..Default::default()
        })
        .unwrap();

        let mut stream = backend.open_stream(&request()).await.unwrap();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend(chunk.unwrap());
        }

        assert_eq!(body, b"{\"candidates\":[]}\n");
        let sent = server.await.unwrap();
        assert!(sent.contains("\"action\":\"analyze\""));
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let (url, _server) = serve_once("HTTP/1.1 500 Internal Server Error", "boom").await;
        let backend = HttpBackend::new(BackendConfig {
            endpoint: Some(url),
            ..Default::default()
        })
        .unwrap();

        let result = backend.open_stream(&request()).await;
        match result {
            Err(TransportError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected status error"),
        }
    }
}
