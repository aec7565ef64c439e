//! Error types for the text-generation backends.

use socialsim_core::GeneratorError;

/// Errors raised while configuring or calling a backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// No API key is configured; no request was sent.
    #[error("no API key configured for {0}")]
    NotConfigured(String),

    /// The backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    Backend(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<LlmError> for GeneratorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NotConfigured(backend) => Self::NotConfigured(backend),
            LlmError::Config(msg) | LlmError::Backend(msg) => Self::Request(msg),
            LlmError::Serde(e) => Self::Malformed(e.to_string()),
        }
    }
}
