//! OpenAI-specific error handling.

use scout_core::Error;

/// Endpoint family an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Embeddings,
    Chat,
}

/// OpenAI-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit or quota exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Request too large.
    ContextLengthExceeded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status and error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }
}

/// Convert an OpenAI failure into a scout error for the given endpoint.
///
/// Credential and model errors are configuration problems. Everything else
/// is a channel failure that the pipeline can degrade around.
pub fn to_scout_error(endpoint: Endpoint, code: OpenAIErrorCode, message: &str) -> Error {
    match code {
        OpenAIErrorCode::AuthenticationError => {
            Error::Config(format!("Authentication failed: {}", message))
        }
        OpenAIErrorCode::ModelNotFound => Error::Config(format!("Model not found: {}", message)),
        _ => {
            let detail = match code {
                OpenAIErrorCode::RateLimitExceeded => format!("Rate limit exceeded: {}", message),
                OpenAIErrorCode::ContextLengthExceeded => format!("Context too long: {}", message),
                OpenAIErrorCode::ServerError => format!("Server error: {}", message),
                _ => message.to_string(),
            };
            match endpoint {
                Endpoint::Embeddings => Error::EmbeddingFailure(detail),
                Endpoint::Chat => Error::TranslationFailure(detail),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_status() {
        assert_eq!(
            OpenAIErrorCode::from_response(401, "invalid_api_key"),
            OpenAIErrorCode::AuthenticationError
        );
        assert_eq!(
            OpenAIErrorCode::from_response(429, "insufficient_quota"),
            OpenAIErrorCode::RateLimitExceeded
        );
        assert_eq!(
            OpenAIErrorCode::from_response(400, "context_length_exceeded"),
            OpenAIErrorCode::ContextLengthExceeded
        );
        assert_eq!(
            OpenAIErrorCode::from_response(503, "overloaded"),
            OpenAIErrorCode::ServerError
        );
    }

    #[test]
    fn test_retryable_codes() {
        assert!(OpenAIErrorCode::RateLimitExceeded.is_retryable());
        assert!(OpenAIErrorCode::ServerError.is_retryable());
        assert!(!OpenAIErrorCode::AuthenticationError.is_retryable());
    }

    #[test]
    fn test_endpoint_selects_error_kind() {
        let embed = to_scout_error(Endpoint::Embeddings, OpenAIErrorCode::ServerError, "boom");
        assert!(matches!(embed, Error::EmbeddingFailure(_)));
        let chat = to_scout_error(Endpoint::Chat, OpenAIErrorCode::RateLimitExceeded, "slow down");
        assert!(matches!(chat, Error::TranslationFailure(ref m) if m.contains("slow down")));
        let auth = to_scout_error(Endpoint::Chat, OpenAIErrorCode::AuthenticationError, "bad key");
        assert!(matches!(auth, Error::Config(_)));
    }
}
