//! Error types for the source client.

/// Errors returned by [`crate::Client::fetch`].
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// Every attempt failed. Transport errors and non-success statuses both end here.
    #[error("fetch of {url} exhausted after {attempts} attempt(s): {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
    /// The target could not be turned into a URL; no request was sent.
    #[error("invalid target url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Failure of a single attempt. Always retryable.
#[derive(thiserror::Error, Debug)]
pub(crate) enum AttemptError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("status {status}: {body}")]
    HttpStatus { status: u16, body: String },
}
