//! Error types for the coauthor timeline pipeline.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

/// Errors from the HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by the OpenAlex API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Server { .. })
    }

    /// Get the retry-after duration if this is a rate limit error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Errors from the relationship and author stores.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Filesystem error while reading or appending a store file
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored line could not be decoded
    #[error("Corrupt store record at line {line}: {source}")]
    Corrupt {
        /// 1-based line number
        line: usize,
        /// Decoding error
        source: serde_json::Error,
    },

    /// Serialization error while writing
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while deriving one target's timeline.
///
/// None of these abort a batch: `Skipped` is an upstream inconsistency and
/// everything else aborts only the current target.
#[derive(thiserror::Error, Debug)]
pub enum TimelineError {
    /// The target cannot be processed with the data available
    #[error("Target {target} skipped: {reason}")]
    Skipped {
        /// Target author ID
        target: String,
        /// Why the target was skipped
        reason: String,
    },

    /// A publication record has a shape the engine cannot accept
    #[error("Malformed record for {target} in {year}: {reason}")]
    Malformed {
        /// Target author ID
        target: String,
        /// Year being processed
        year: i32,
        /// What was wrong with the record
        reason: String,
    },

    /// Error from a collaborator's HTTP client
    #[error("API error: {0}")]
    Client(#[from] ClientError),

    /// Error from a store collaborator
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TimelineError {
    /// Create a skipped-target error.
    #[must_use]
    pub fn skipped(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Skipped { target: target.into(), reason: reason.into() }
    }

    /// Create a malformed-record error.
    #[must_use]
    pub fn malformed(target: impl Into<String>, year: i32, reason: impl Into<String>) -> Self {
        Self::Malformed { target: target.into(), year, reason: reason.into() }
    }

    /// Returns true for upstream inconsistencies that only skip the target.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// The year in which processing stopped, if known.
    #[must_use]
    pub const fn year(&self) -> Option<i32> {
        match self {
            Self::Malformed { year, .. } => Some(*year),
            _ => None,
        }
    }

    /// True when the target failed on a transient API error and a later run may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Client(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// How long the API asked us to back off, if it did.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Client(e) => e.retry_after(),
            _ => None,
        }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for timeline derivation.
pub type TimelineResult<T> = Result<T, TimelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_retryable() {
        assert!(ClientError::rate_limited(60).is_retryable());
        assert!(ClientError::server(500, "Internal error").is_retryable());

        assert!(!ClientError::not_found("A123").is_retryable());
        assert!(!ClientError::bad_request("invalid filter").is_retryable());
    }

    #[test]
    fn test_client_error_retry_after() {
        let err = ClientError::rate_limited(60);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));

        let err = ClientError::not_found("work");
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_timeline_error_taxonomy() {
        let skip = TimelineError::skipped("A1", "no career span");
        assert!(skip.is_skip());
        assert_eq!(skip.year(), None);

        let bad = TimelineError::malformed("A1", 2019, "empty work id");
        assert!(!bad.is_skip());
        assert_eq!(bad.year(), Some(2019));
        assert!(bad.to_string().contains("2019"));
        assert!(bad.to_string().contains("A1"));
        assert!(!bad.is_retryable());
    }

    #[test]
    fn test_timeline_error_exposes_client_backoff() {
        let limited = TimelineError::from(ClientError::rate_limited(30));
        assert!(limited.is_retryable());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(30)));

        let down = TimelineError::from(ClientError::server(503, "down"));
        assert!(down.is_retryable());
        assert_eq!(down.retry_after(), None);

        assert!(!TimelineError::skipped("A1", "no span").is_retryable());
    }
}
