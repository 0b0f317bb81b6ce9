//! Error types for the chat completion client

use thiserror::Error;
use wayfarer_core::error::Error as CoreError;

#[derive(Error, Debug)]
pub enum LlmError {
    /// Key rejected by the endpoint
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Endpoint answered with an error body
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Well-formed response carrying no choices
    #[error("Empty completion")]
    EmptyCompletion,
}

impl LlmError {
    /// Worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RateLimit(_) | LlmError::ConnectionError(_) => true,
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<LlmError> for CoreError {
    fn from(err: LlmError) -> Self {
        CoreError::Llm(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
