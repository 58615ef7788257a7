//! Error Types
//!
//! Every failure the client can surface, one variant per distinguishable kind.

use std::time::Duration;

use reqwest::StatusCode;

/// Main error type for client operations.
///
/// The client never recovers silently: apart from the documented pre-request
/// pacing wait, every failure is returned to the caller as one of these
/// variants, carrying the original status code and response body where they
/// are available.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server rejected the credentials (401 or 403).
    #[error("authentication failed ({status}): {body}")]
    Authentication { status: StatusCode, body: String },

    /// The requested resource does not exist (404).
    #[error("resource not found: {body}")]
    NotFound { body: String },

    /// The server returned 429 despite client-side pacing.
    ///
    /// This is surfaced rather than retried so that a server-side limit
    /// stricter than the advertised one does not turn into an invisible
    /// retry loop. The `Retry-After` value, when given, has already been
    /// folded into the client's rate limit state.
    #[error("rate limit exceeded, retry after {retry_after:?}: {body}")]
    RateLimitExceeded {
        retry_after: Option<Duration>,
        body: String,
    },

    /// A 2xx response body did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any other non-2xx status.
    #[error("remote service error ({status}): {body}")]
    RemoteService { status: StatusCode, body: String },

    /// The request could not be sent or the connection failed mid-flight.
    #[error("transport error: {0}")]
    Transport(String),

    /// The per-request timeout elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The query was rejected before any I/O happened.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The client could not be constructed from the given options.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_connect() {
            Error::Transport(format!("connection failed: {}", err))
        } else if err.is_decode() {
            Error::MalformedResponse(format!("failed to decode response: {}", err))
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse(format!("JSON parsing error: {}", err))
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_status_and_body() {
        let err = Error::RemoteService {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("upstream down"));
    }

    #[test]
    fn test_json_error_maps_to_malformed_response() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }
}
