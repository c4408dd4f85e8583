//! Configuration management for the voice Q&A service
//!
//! Supports loading configuration from:
//! - YAML files under `config/`
//! - Environment variables (`VOICE_QNA__` prefix, `__` separator)
//!
//! Settings are read-only after startup; per-component tuning structs are
//! passed by reference into the pipeline stages.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, DecodeConfig, GenerationConfig, LessonConfig, RecognizerConfig, ServerConfig,
    Settings, SynthesisConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
