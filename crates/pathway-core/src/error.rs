use thiserror::Error;

use crate::types::NodeStatus;

/// Every failure a Pathway operation can surface.
///
/// The enum is `Clone` so that all callers collapsed onto one deduplicated
/// request observe the same failure value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PathwayError {
    // Graph errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid status transition for {node_id}: {from} -> {to}")]
    InvalidTransition {
        node_id: String,
        from: NodeStatus,
        to: NodeStatus,
    },

    // Request errors
    #[error("Client error ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // Job errors
    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Job {job_id} lost after {consecutive_404s} consecutive 404 responses")]
    JobLost {
        job_id: String,
        consecutive_404s: u32,
    },

    #[error("Job {job_id} did not finish within {attempts} attempts")]
    JobTimeout { job_id: String, attempts: u32 },

    #[error("Lost connectivity while polling job {job_id} ({consecutive_errors} consecutive errors)")]
    Connectivity {
        job_id: String,
        consecutive_errors: u32,
    },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl PathwayError {
    /// Whether a request that failed with this error may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PathwayError::Server { .. } | PathwayError::Network(_) | PathwayError::Timeout { .. }
        )
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            PathwayError::Client { status, .. } | PathwayError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Build a `Client` or `Server` error from a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status >= 500 {
            PathwayError::Server { status, message }
        } else {
            PathwayError::Client { status, message }
        }
    }
}

impl From<std::io::Error> for PathwayError {
    fn from(e: std::io::Error) -> Self {
        PathwayError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PathwayError {
    fn from(e: serde_json::Error) -> Self {
        PathwayError::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PathwayError>;
