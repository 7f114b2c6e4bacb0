use std::time::Duration;

use thiserror::Error;

/// Application-wide error types for Multiplex.
#[derive(Error, Debug)]
pub enum AppError {
    /// A submission carried an empty link list.
    #[error("At least 1 link per request should be provided")]
    NoLinks,

    /// A submission carried more links than allowed.
    #[error("Maximum {max} links per request are allowed, got {count}")]
    TooManyLinks { count: usize, max: usize },

    /// A submitted string is not an absolute URL.
    #[error("Invalid link {url:?}: {reason}")]
    InvalidLink { url: String, reason: String },

    /// A job id in a request path is not a decimal u64.
    #[error("Invalid job ID {0:?}")]
    InvalidJobId(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Admission controller refused a new job.
    #[error("Too many requests in progress, please try again later")]
    RateLimitExceeded,

    /// No running job and no stored result for the id.
    #[error("Job not found: {0}")]
    NotFound(u64),

    /// HTTP request failed (fetching a link).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Fetch did not finish before its deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The job scope was cancelled while the fetch was pending.
    #[error("Cancelled")]
    Cancelled,

    /// Result store I/O failed.
    #[error("Storage error: {0}")]
    StorageError(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Returns true for errors caused by a malformed client request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::NoLinks
                | AppError::TooManyLinks { .. }
                | AppError::InvalidLink { .. }
                | AppError::InvalidJobId(_)
                | AppError::SerializationError(_)
        )
    }
}
