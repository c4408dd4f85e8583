//! Main settings module
//!
//! Loaded once at startup (file + env overlay) and read-only afterwards;
//! there is no per-request mutable configuration.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{audio, endpoints, generation, recognition, synthesis};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Decode chain configuration
    #[serde(default)]
    pub decode: DecodeConfig,

    /// Speech recognizer configuration
    #[serde(default)]
    pub recognizer: RecognizerConfig,

    /// Answer generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Lesson lookup configuration
    #[serde(default)]
    pub lessons: LessonConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty means localhost-only
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Upper bound on an uploaded audio blob in bytes
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,
    /// Default log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            cors_enabled: true,
            max_audio_bytes: default_max_audio_bytes(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Decode fallback chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Register the general-purpose probing decoder (when compiled in)
    #[serde(default = "default_true")]
    pub enable_probe_decoder: bool,
    /// Candidate sample rates for headerless raw-PCM reconstruction,
    /// tried in order
    #[serde(default = "default_raw_rates")]
    pub raw_fallback_rates: Vec<u32>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            enable_probe_decoder: true,
            raw_fallback_rates: default_raw_rates(),
        }
    }
}

/// Immutable recognizer tuning, passed by reference into each recognition
/// call. No recognizer state is shared or mutated across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Base URL of the speech-to-text service
    #[serde(default = "default_stt_endpoint")]
    pub endpoint: String,
    /// Locale used for the first recognition attempt
    #[serde(default = "default_primary_locale")]
    pub primary_locale: String,
    /// Locale variant retried once on an unintelligible outcome
    #[serde(default = "default_secondary_locale")]
    pub secondary_locale: String,
    /// Ambient-noise calibration window at the head of the clip (ms)
    #[serde(default = "default_calibration_ms")]
    pub calibration_ms: u32,
    /// Offset above the ambient level the clip must reach somewhere (dB)
    #[serde(default = "default_energy_offset_db")]
    pub energy_offset_db: f32,
    /// Request timeout per recognition attempt (ms)
    #[serde(default = "default_stt_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_stt_endpoint(),
            primary_locale: default_primary_locale(),
            secondary_locale: default_secondary_locale(),
            calibration_ms: default_calibration_ms(),
            energy_offset_db: default_energy_offset_db(),
            timeout_ms: default_stt_timeout_ms(),
        }
    }
}

/// Answer generation configuration (Ollama-compatible backend)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Output-length hint sent with each request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,
    /// Language tag sent to the synthesizer
    #[serde(default = "default_tts_language")]
    pub language: String,
    #[serde(default = "default_tts_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_tts_endpoint(),
            language: default_tts_language(),
            timeout_ms: default_tts_timeout_ms(),
        }
    }
}

/// Lesson lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonConfig {
    /// Base URL of the content service
    #[serde(default = "default_lessons_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_lessons_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            endpoint: default_lessons_endpoint(),
            timeout_ms: default_lessons_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_audio_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_raw_rates() -> Vec<u32> {
    audio::RAW_FALLBACK_RATES.to_vec()
}
fn default_stt_endpoint() -> String {
    endpoints::STT.to_string()
}
fn default_primary_locale() -> String {
    recognition::PRIMARY_LOCALE.to_string()
}
fn default_secondary_locale() -> String {
    recognition::SECONDARY_LOCALE.to_string()
}
fn default_calibration_ms() -> u32 {
    audio::CALIBRATION_WINDOW_MS
}
fn default_energy_offset_db() -> f32 {
    audio::ENERGY_OFFSET_DB
}
fn default_stt_timeout_ms() -> u64 {
    recognition::TIMEOUT_MS
}
fn default_ollama_endpoint() -> String {
    endpoints::OLLAMA.to_string()
}
fn default_model() -> String {
    generation::MODEL.to_string()
}
fn default_temperature() -> f32 {
    generation::TEMPERATURE
}
fn default_top_p() -> f32 {
    generation::TOP_P
}
fn default_max_tokens() -> u32 {
    generation::MAX_TOKENS
}
fn default_generation_timeout_secs() -> u64 {
    generation::TIMEOUT_SECS
}
fn default_tts_endpoint() -> String {
    endpoints::TTS.to_string()
}
fn default_tts_language() -> String {
    synthesis::LANGUAGE.to_string()
}
fn default_tts_timeout_ms() -> u64 {
    synthesis::TIMEOUT_MS
}
fn default_lessons_endpoint() -> String {
    endpoints::LESSONS.to_string()
}
fn default_lessons_timeout_ms() -> u64 {
    5_000
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings before the server starts serving
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }
        if self.decode.raw_fallback_rates.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "decode.raw_fallback_rates".to_string(),
                message: "at least one candidate rate is required".to_string(),
            });
        }
        if self.decode.raw_fallback_rates.iter().any(|&r| r == 0) {
            return Err(ConfigError::InvalidValue {
                field: "decode.raw_fallback_rates".to_string(),
                message: "candidate rates must be non-zero".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "generation.temperature".to_string(),
                message: "temperature must be within [0, 2]".to_string(),
            });
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.timeout_secs".to_string(),
                message: "timeout must be non-zero".to_string(),
            });
        }
        if self.recognizer.primary_locale.is_empty() {
            return Err(ConfigError::MissingField(
                "recognizer.primary_locale".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings from config files and environment.
///
/// Priority: env vars (`VOICE_QNA__` prefix) > `config/{env}.yaml` >
/// `config/default.yaml` > built-in defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_QNA")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.generation.model, "gemma3:2b");
        assert_eq!(settings.generation.max_tokens, 150);
        assert_eq!(settings.recognizer.primary_locale, "en-US");
        assert_eq!(
            settings.decode.raw_fallback_rates,
            vec![16_000, 44_100, 48_000, 8_000]
        );
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.generation.temperature = 5.0;
        assert!(settings.validate().is_err());

        settings.generation.temperature = 0.7;
        settings.decode.raw_fallback_rates.clear();
        assert!(settings.validate().is_err());
    }
}
