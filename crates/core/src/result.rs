//! Pipeline result and failure taxonomy
//!
//! One `PipelineResult` is the single externally visible artifact of a run:
//! either a complete question/answer/audio triple, or one typed failure.
//! Partial results are never surfaced as success, with a single deliberate
//! exception: synthesis failure degrades the audio field to the empty-string
//! sentinel instead of failing the run.

use serde::{Serialize, Serializer};

/// Why a pipeline run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No decode strategy produced usable PCM
    DecodeError,
    /// The recognizer ran but could not transcribe
    UnintelligibleAudio,
    /// A downstream service errored or was unreachable
    BackendUnavailable,
    /// The generation backend did not respond within the request timeout
    GenerationTimeout,
    /// The generation backend returned a malformed or empty answer
    GenerationError,
}

impl ErrorKind {
    /// Human-readable message surfaced to the caller
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::DecodeError => "Could not process the audio format. Please try again.",
            ErrorKind::UnintelligibleAudio => {
                "Could not understand the audio. Please try again."
            }
            ErrorKind::BackendUnavailable => {
                "A required service is unavailable. Please try again later."
            }
            ErrorKind::GenerationTimeout => {
                "The answer took too long to generate. Please try again."
            }
            ErrorKind::GenerationError => {
                "Could not generate an AI answer. Please try again."
            }
        }
    }

    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::UnintelligibleAudio => "unintelligible_audio",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::GenerationTimeout => "generation_timeout",
            ErrorKind::GenerationError => "generation_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// The single result of one pipeline invocation.
///
/// Serializes to the wire shape the HTTP layer returns:
/// `{success, question, answer, audio_response, error}`, with `error` only
/// present on failure.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl PipelineResult {
    /// Successful run: question, answer, and base64 audio (possibly the
    /// empty-string sentinel when synthesis degraded).
    pub fn success(question: String, answer: String, audio_base64: String) -> Self {
        Self {
            success: true,
            question: Some(question),
            answer: Some(answer),
            audio_response: Some(audio_base64),
            error: None,
        }
    }

    /// Failed run with a single typed reason
    pub fn failure(kind: ErrorKind) -> Self {
        Self {
            success: false,
            question: None,
            answer: None,
            audio_response: None,
            error: Some(kind),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let result = PipelineResult::success(
            "what is two plus two".to_string(),
            "Two plus two is four.".to_string(),
            "UklGRg==".to_string(),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["question"], "what is two plus two");
        assert_eq!(json["answer"], "Two plus two is four.");
        assert_eq!(json["audio_response"], "UklGRg==");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_shape() {
        let result = PipelineResult::failure(ErrorKind::DecodeError);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("question").is_none());
        assert!(json.get("answer").is_none());
        assert_eq!(
            json["error"],
            "Could not process the audio format. Please try again."
        );
    }

    #[test]
    fn test_degraded_audio_is_still_success() {
        let result = PipelineResult::success(
            "q".to_string(),
            "a.".to_string(),
            String::new(),
        );
        assert!(result.success);
        assert_eq!(result.audio_response.as_deref(), Some(""));
        assert!(result.error_kind().is_none());
    }

    #[test]
    fn test_error_labels() {
        assert_eq!(ErrorKind::GenerationTimeout.as_str(), "generation_timeout");
        assert_eq!(ErrorKind::UnintelligibleAudio.as_str(), "unintelligible_audio");
    }
}
