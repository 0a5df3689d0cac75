//! Error types for visitcoach-core

use thiserror::Error;

/// Top-level error type for visitcoach-core
#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),
}

/// Errors related to analysis session management
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

/// Errors raised by the transport that delivers response chunks
///
/// Cloneable so a failed session can keep a copy in its outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Stream interrupted: {0}")]
    Stream(String),

    #[error("No endpoint configured")]
    NotConfigured,
}

/// A single stream line that could not be decoded
///
/// These never escape the decoder; they are logged and the line is dropped.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid JSON record: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Record is not valid UTF-8")]
    InvalidUtf8,
}
