//! Dispatcher error types

use thiserror::Error;

/// Outcome of an abandoned collector send
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Every attempt failed with a retryable condition
    #[error("gave up after {attempts} attempts: {reason}")]
    Transient { attempts: u32, reason: String },

    /// Collector answered with a non-retryable status
    #[error("collector rejected payload with status {status}")]
    Rejected { status: u16 },

    /// HTTP client could not be built
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
}

impl DispatchError {
    pub fn transient(attempts: u32, reason: impl Into<String>) -> Self {
        Self::Transient {
            attempts,
            reason: reason.into(),
        }
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// A single failed request, before retry policy is applied
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}
