//! Error types for the generation agents.

use std::time::Duration;

use thiserror::Error;

use crate::error::LlmError;

/// Failure of the external text-generation capability.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The provider could not be reached or rejected the request.
    #[error("Text generation unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the request due to rate limiting.
    #[error("Text generation rate limited: {0}")]
    RateLimited(String),

    /// No reply arrived within the configured timeout.
    #[error("Text generation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The reply contained no usable text.
    #[error("Text generation returned an empty response")]
    EmptyResponse,

    /// The reply could not be decoded.
    #[error("Malformed generation response: {0}")]
    Malformed(String),
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited(msg) => GenerationError::RateLimited(msg),
            LlmError::ParseError(msg) => GenerationError::Malformed(msg),
            other => GenerationError::Unavailable(other.to_string()),
        }
    }
}

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_mapping() {
        assert!(matches!(
            GenerationError::from(LlmError::RateLimited("429".to_string())),
            GenerationError::RateLimited(_)
        ));
        assert!(matches!(
            GenerationError::from(LlmError::ParseError("bad json".to_string())),
            GenerationError::Malformed(_)
        ));
        assert!(matches!(
            GenerationError::from(LlmError::ApiError {
                code: 500,
                message: "boom".to_string()
            }),
            GenerationError::Unavailable(msg) if msg.contains("boom")
        ));
    }

    #[test]
    fn test_timeout_display() {
        let err = GenerationError::Timeout {
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "Text generation timed out after 5s");
    }
}
