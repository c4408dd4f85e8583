//! Core types and traits for the voice Q&A pipeline
//!
//! This crate provides the foundational pieces used across all other crates:
//! - Audio types (sniffed formats, canonical PCM, resampling helpers)
//! - Lesson context and transcript types
//! - The pipeline result and its failure taxonomy
//! - Trait seams for the STT, generation, TTS, and lesson-lookup backends
//! - The shared error type

pub mod audio;
pub mod error;
pub mod lesson;
pub mod result;
pub mod traits;
pub mod transcript;

pub use audio::{downmix_to_mono, resample, AudioBlob, CanonicalPcm, DetectedFormat};
pub use error::{Error, Result};
pub use lesson::LessonContext;
pub use result::{ErrorKind, PipelineResult};
pub use traits::{AnswerBackend, LessonLookup, SpeechToText, TextToSpeech};
pub use transcript::{PromptSpec, Transcript};
