//! Answer generation for the voice Q&A pipeline
//!
//! - Grade-calibrated prompt assembly (`prompt`)
//! - Ollama-compatible generation backend (`backend`)
//! - Speech-safe output cleanup (`cleanup`)

pub mod backend;
pub mod cleanup;
pub mod prompt;

pub use backend::OllamaGenerateBackend;
pub use cleanup::clean_for_speech;
pub use prompt::{build_prompt, GradeBand};

use thiserror::Error;

/// Generation errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for voice_qna_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => voice_qna_core::Error::GenerationTimeout,
            other => voice_qna_core::Error::Generation(other.to_string()),
        }
    }
}
