//! Errors surfaced at the invocation boundary.

use std::fmt;

use crate::invocation::ValidationError;
use crate::publish::PublishError;

/// Batch-level failures. Per-identifier failures never reach this type;
/// they are absorbed by the fallback chain.
#[derive(Debug)]
pub enum InvocationError {
    /// The request was malformed or named no identifiers.
    Validation(ValidationError),
    /// Writing or presigning the result failed.
    Publish(PublishError),
    /// Anything else that went wrong while handling the request.
    Internal(String),
}

impl InvocationError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Publish(_) | Self::Internal(_) => 500,
        }
    }

    /// Message placed in the `error` field of the response body.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Publish(e) => format!("An error occurred: {}", e),
            Self::Internal(msg) => format!("An error occurred: {}", msg),
        }
    }
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::Publish(e) => write!(f, "Publish error: {}", e),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for InvocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Publish(e) => Some(e),
            Self::Internal(_) => None,
        }
    }
}

impl From<ValidationError> for InvocationError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<PublishError> for InvocationError {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

impl From<serde_json::Error> for InvocationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BlobStoreError;

    #[test]
    fn status_codes() {
        assert_eq!(
            InvocationError::from(ValidationError::NoSymbols).status_code(),
            400
        );
        let publish = PublishError::Store(BlobStoreError::Unavailable("down".into()));
        assert_eq!(InvocationError::from(publish).status_code(), 500);
        assert_eq!(InvocationError::Internal("x".into()).status_code(), 500);
    }

    #[test]
    fn public_messages() {
        assert_eq!(
            InvocationError::from(ValidationError::NoSymbols).public_message(),
            "No stock symbols provided"
        );
        let publish = PublishError::Store(BlobStoreError::Unavailable("down".into()));
        assert_eq!(
            InvocationError::from(publish).public_message(),
            "An error occurred: blob store error: storage unavailable: down"
        );
    }
}
