//! Sheet reader error types.

use thiserror::Error;

/// Errors that can occur when talking to a mark-reading backend.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (missing or invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The backend could not be reached at all.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The backend answered, but not in the shape we expect.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
