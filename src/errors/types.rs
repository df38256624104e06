//! Error type definitions for vod-probe

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Probe step failures that escaped to the top level
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Report writing errors
    #[error("Report error: {message}")]
    Report { message: String },

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of a single network-bound probe step (search, detail, stream, manifest)
///
/// These are always local to one query: the runner records them as
/// `success = false` with the rendered message and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The scoped timer expired and the request was dropped
    #[error("Request timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    /// Upstream answered with an error status
    #[error("HTTP error: {status} - {url}")]
    Http { status: u16, url: String },

    /// Connection, TLS or body read failures
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// Payload could not be decoded
    #[error("Parse error: {format} - {message}")]
    Parse { format: String, message: String },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a report error
    pub fn report<S: Into<String>>(message: S) -> Self {
        Self::Report {
            message: message.into(),
        }
    }
}

impl ProbeError {
    /// Create a connection error from any displayable cause
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a parse error for the given payload format
    pub fn parse<F: Into<String>, M: Into<String>>(format: F, message: M) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
        }
    }
}
