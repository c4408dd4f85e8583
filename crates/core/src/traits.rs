//! Trait seams for pluggable backends
//!
//! The orchestrator only sees these traits; HTTP implementations live in the
//! pipeline and llm crates, and tests substitute mocks.

use async_trait::async_trait;

use crate::{CanonicalPcm, Error, LessonContext, PromptSpec, Result};

/// Speech-to-text backend.
///
/// `Ok(None)` means the backend understood the request but could not
/// transcribe the clip (a terminal outcome for the request); `Err` means the
/// backend itself errored or was unreachable (infrastructure failure).
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe canonical PCM using the given locale
    async fn recognize(&self, audio: &CanonicalPcm, locale: &str) -> Result<Option<String>>;

    /// Check whether the backend is reachable
    async fn is_available(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Text-generation backend.
///
/// Returns the raw model output; sanitization happens in the answer cleanup
/// pass. Timeouts surface as [`Error::GenerationTimeout`].
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Generate an answer for the assembled prompt
    async fn generate(&self, prompt: &PromptSpec) -> Result<String>;

    /// Check whether the backend is reachable
    async fn is_available(&self) -> bool;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

/// Text-to-speech backend
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize speech audio for the given text and language tag
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>>;

    /// Check whether the backend is reachable
    async fn is_available(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Lesson lookup, keyed by lesson id.
///
/// `Ok(None)` when the lesson does not exist; the pipeline then runs without
/// lesson context rather than failing the request.
#[async_trait]
pub trait LessonLookup: Send + Sync {
    async fn lookup(&self, lesson_id: i64) -> Result<Option<LessonContext>>;
}
