use thiserror::Error;
use tracing::{error, warn};

/// Why a single request produced no body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("{0}")]
    Transport(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("request task panicked: {0}")]
    Panicked(String),
}

impl From<String> for RequestError {
    fn from(cause: String) -> Self {
        RequestError::Transport(cause)
    }
}

impl From<&str> for RequestError {
    fn from(cause: &str) -> Self {
        RequestError::Transport(cause.to_string())
    }
}

/// A single request that did not produce a body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request to {url} failed: {error}")]
pub struct RequestFailure {
    pub url: String,
    pub error: RequestError,
}

impl RequestFailure {
    pub fn new(url: impl Into<String>, error: impl Into<RequestError>) -> Self {
        Self {
            url: url.into(),
            error: error.into(),
        }
    }

    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::new(url, RequestError::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.error == RequestError::Cancelled
    }
}

fn join_failures(failures: &[RequestFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{} of the batch requests failed: {}", .failures.len(), join_failures(.failures))]
    BatchFailure { failures: Vec<RequestFailure> },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl FetchError {
    /// Individual failures carried by this error, in request order.
    pub fn failures(&self) -> &[RequestFailure] {
        match self {
            FetchError::BatchFailure { failures } => failures.as_slice(),
            _ => &[],
        }
    }

    pub fn log(&self) {
        match self {
            FetchError::InvalidInput(e) => {
                warn!(error = %e, "Rejected request set");
            }
            FetchError::BatchFailure { failures } => {
                for failure in failures {
                    error!(url = %failure.url, error = %failure.error, "Batch request failed");
                }
                error!(failed = failures.len(), "Batch failed");
            }
            FetchError::ClientBuild(e) => {
                error!(error = %e, "HTTP client construction failed");
            }
            FetchError::Runtime(e) => {
                error!(error = %e, "Async runtime construction failed");
            }
        }
    }
}
