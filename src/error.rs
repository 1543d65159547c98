//! Error types for a3s-observability

use thiserror::Error;

/// Errors that can occur in the observability pipeline
///
/// Only `Config` and `MissingClient` ever escape the provider's public API;
/// backend and transport errors are logged by the provider and swallowed.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// Invalid provider or client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider built without a backend client
    #[error("Backend client cannot be empty")]
    MissingClient,

    /// A backend call (create/end/flush) failed
    #[error("Backend operation '{operation}' failed: {reason}")]
    Backend {
        operation: String,
        reason: String,
    },

    /// HTTP transport failure talking to the tracing service
    #[error("HTTP error: {0}")]
    Http(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ObservabilityError {
    /// Shorthand for a failed backend operation
    pub fn backend(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for ObservabilityError {
    fn from(err: reqwest::Error) -> Self {
        ObservabilityError::Http(err.to_string())
    }
}

/// Result type alias for observability operations
pub type Result<T> = std::result::Result<T, ObservabilityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ObservabilityError::Config("public_key is required".to_string());
        assert_eq!(err.to_string(), "Configuration error: public_key is required");

        let err = ObservabilityError::backend("generation", "connection refused");
        assert_eq!(
            err.to_string(),
            "Backend operation 'generation' failed: connection refused"
        );

        assert_eq!(
            ObservabilityError::MissingClient.to_string(),
            "Backend client cannot be empty"
        );
    }

    #[test]
    fn test_serialization_from() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ObservabilityError = bad.into();
        assert!(matches!(err, ObservabilityError::Serialization(_)));
    }
}
