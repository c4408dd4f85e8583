//! Voice Q&A pipeline
//!
//! Takes one uploaded audio blob through format sniffing, the decode
//! fallback chain, energy-gated speech recognition, answer generation, and
//! best-effort speech synthesis, producing a single [`PipelineResult`].
//!
//! [`PipelineResult`]: voice_qna_core::PipelineResult

pub mod decode;
pub mod orchestrator;
pub mod sniff;
pub mod stt;
pub mod tts;

use thiserror::Error;

pub use decode::{DecodeCapabilities, DecodeOutcome, RawCandidate};
pub use orchestrator::{PipelineRequest, VoicePipeline};
pub use sniff::detect_format;
pub use stt::{HttpSttBackend, Recognizer};
pub use tts::{synthesize_base64, HttpTtsBackend};

/// Stage-internal errors. The orchestrator maps these onto the public
/// failure taxonomy before anything leaves the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("decode: {0}")]
    Decode(String),

    #[error("speech recognition: {0}")]
    Stt(String),

    #[error("speech synthesis: {0}")]
    Tts(String),
}

impl From<PipelineError> for voice_qna_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Decode(msg) => voice_qna_core::Error::Decode(msg),
            PipelineError::Stt(msg) => voice_qna_core::Error::SttBackend(msg),
            PipelineError::Tts(msg) => voice_qna_core::Error::Synthesis(msg),
        }
    }
}
