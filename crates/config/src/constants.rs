//! Centralized constants
//!
//! Single source of truth for tuning defaults used across the crates.

/// Audio constants
pub mod audio {
    /// The canonical sample rate all stages consume
    pub const TARGET_SAMPLE_RATE: u32 = 16_000;

    /// Candidate rates for headerless raw-PCM reconstruction, tried in order.
    /// 16 kHz first (most captures come from speech frontends already at
    /// 16 kHz), then the common hardware rates, telephony last.
    pub const RAW_FALLBACK_RATES: [u32; 4] = [16_000, 44_100, 48_000, 8_000];

    /// Ambient-noise calibration window at the head of the clip
    pub const CALIBRATION_WINDOW_MS: u32 = 300;

    /// Offset above the calibrated ambient level a clip must reach somewhere
    /// to be worth a recognition round-trip
    pub const ENERGY_OFFSET_DB: f32 = 6.0;

    /// Absolute floor; clips never rejected for being above this
    pub const ENERGY_FLOOR_DB: f32 = -70.0;
}

/// Default backend endpoints
pub mod endpoints {
    pub const OLLAMA: &str = "http://localhost:11434";
    pub const STT: &str = "http://127.0.0.1:8090";
    pub const TTS: &str = "http://127.0.0.1:8092";
    pub const LESSONS: &str = "http://127.0.0.1:8000";
}

/// Generation defaults
pub mod generation {
    pub const MODEL: &str = "gemma3:2b";
    pub const TEMPERATURE: f32 = 0.7;
    pub const TOP_P: f32 = 0.9;
    pub const MAX_TOKENS: u32 = 150;
    pub const TIMEOUT_SECS: u64 = 60;
}

/// Recognition defaults
pub mod recognition {
    pub const PRIMARY_LOCALE: &str = "en-US";
    pub const SECONDARY_LOCALE: &str = "en-GB";
    pub const TIMEOUT_MS: u64 = 30_000;
}

/// Synthesis defaults
pub mod synthesis {
    pub const LANGUAGE: &str = "en";
    pub const TIMEOUT_MS: u64 = 30_000;
}
