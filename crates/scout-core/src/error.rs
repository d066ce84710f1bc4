//! Error types for scout.

use thiserror::Error;

/// Result type alias using scout's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for scout operations.
///
/// The first group of variants covers per-channel failures that the search
/// pipeline absorbs into a degraded response. `MalformedRequest` is fatal to
/// a single request and `ProjectionVersionMismatch` is fatal at startup.
#[derive(Error, Debug)]
pub enum Error {
    /// Translation upstream failed or produced an unusable result
    #[error("Translation failed: {0}")]
    TranslationFailure(String),

    /// Embedding generation failed after retries
    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    /// A lexical backend call exceeded its deadline
    #[error("Lexical backend '{backend}' timed out after {timeout_ms}ms")]
    LexicalBackendTimeout { backend: String, timeout_ms: u64 },

    /// A lexical backend returned an error or is marked down
    #[error("Lexical backend unavailable: {0}")]
    LexicalBackendUnavailable(String),

    /// The vector index could not be queried
    #[error("Vector backend unavailable: {0}")]
    VectorBackendUnavailable(String),

    /// Request failed validation
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Query-side projection does not match the vectors stored in the index
    #[error("Projection version mismatch: query side '{expected}', index '{found}'")]
    ProjectionVersionMismatch { expected: String, found: String },

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the pipeline recovers from this error by degrading a channel.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::TranslationFailure(_)
                | Error::EmbeddingFailure(_)
                | Error::LexicalBackendTimeout { .. }
                | Error::LexicalBackendUnavailable(_)
                | Error::VectorBackendUnavailable(_)
        )
    }

    /// Whether the error is attributable to the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::MalformedRequest(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_translation_failure() {
        let err = Error::TranslationFailure("upstream 503".to_string());
        assert_eq!(err.to_string(), "Translation failed: upstream 503");
    }

    #[test]
    fn test_error_display_lexical_timeout() {
        let err = Error::LexicalBackendTimeout {
            backend: "elasticsearch".to_string(),
            timeout_ms: 2000,
        };
        assert_eq!(
            err.to_string(),
            "Lexical backend 'elasticsearch' timed out after 2000ms"
        );
    }

    #[test]
    fn test_error_display_projection_mismatch() {
        let err = Error::ProjectionVersionMismatch {
            expected: "pca-v2".to_string(),
            found: "pca-v1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Projection version mismatch: query side 'pca-v2', index 'pca-v1'"
        );
    }

    #[test]
    fn test_error_display_malformed() {
        let err = Error::MalformedRequest("position must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Malformed request: position must not be empty"
        );
    }

    #[test]
    fn test_channel_failures_are_recoverable() {
        assert!(Error::TranslationFailure("x".into()).is_recoverable());
        assert!(Error::EmbeddingFailure("x".into()).is_recoverable());
        assert!(Error::LexicalBackendUnavailable("x".into()).is_recoverable());
        assert!(Error::VectorBackendUnavailable("x".into()).is_recoverable());
        assert!(Error::LexicalBackendTimeout {
            backend: "pg".into(),
            timeout_ms: 1
        }
        .is_recoverable());
    }

    #[test]
    fn test_fatal_errors_are_not_recoverable() {
        assert!(!Error::MalformedRequest("x".into()).is_recoverable());
        assert!(!Error::ProjectionVersionMismatch {
            expected: "a".into(),
            found: "b".into()
        }
        .is_recoverable());
        assert!(!Error::Internal("x".into()).is_recoverable());
    }

    #[test]
    fn test_only_malformed_is_client_error() {
        assert!(Error::MalformedRequest("x".into()).is_client_error());
        assert!(!Error::EmbeddingFailure("x".into()).is_client_error());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(msg) if !msg.is_empty()));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing artifact");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("missing artifact"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
