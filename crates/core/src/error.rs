//! Shared error type
//!
//! Each stage crate has its own error enum that converts into this one at
//! the crate boundary; the orchestrator maps it onto the public
//! [`crate::ErrorKind`] taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("speech recognition backend error: {0}")]
    SttBackend(String),

    #[error("generation backend error: {0}")]
    Generation(String),

    #[error("generation timed out")]
    GenerationTimeout,

    #[error("speech synthesis backend error: {0}")]
    Synthesis(String),

    #[error("lesson lookup error: {0}")]
    Lesson(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
