//! Recognized-speech transcript

use serde::{Deserialize, Serialize};

/// Recognized text plus the locale it was recognized with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Recognized text
    pub text: String,
    /// BCP-47 locale the recognizer used (e.g. "en-US")
    pub locale: String,
}

impl Transcript {
    pub fn new(text: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Prompt assembled for the text-generation backend.
///
/// Built purely from the transcript, lesson context and grade level; the
/// length ceiling is enforced by the backend call's max-token hint rather
/// than by truncation here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    /// Full prompt text (instruction + lesson context + question)
    pub text: String,
}

impl PromptSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
