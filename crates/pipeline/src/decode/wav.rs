//! WAV decoding via hound
//!
//! Handles the labeled-WAV fast path and the common "WAV that is really
//! something else" failure mode: a RIFF header with an unreadable body
//! falls through to the rest of the chain.

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use voice_qna_core::audio::{downmix_to_mono, CanonicalPcm};

use crate::PipelineError;

/// Decode a WAV blob to canonical PCM.
///
/// Accepts 16-bit integer and 32-bit float sample formats at any source
/// rate and channel count.
pub fn decode_wav(bytes: &[u8]) -> Result<CanonicalPcm, PipelineError> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::Decode(format!("WAV header unreadable: {e}")))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<Result<_, _>>()
            .map_err(|e| PipelineError::Decode(format!("WAV body unreadable: {e}")))?,
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / i8::MAX as f32))
            .collect::<Result<_, _>>()
            .map_err(|e| PipelineError::Decode(format!("WAV body unreadable: {e}")))?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / i32::MAX as f32))
            .collect::<Result<_, _>>()
            .map_err(|e| PipelineError::Decode(format!("WAV body unreadable: {e}")))?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| PipelineError::Decode(format!("WAV body unreadable: {e}")))?,
        (fmt, bits) => {
            return Err(PipelineError::Decode(format!(
                "unsupported WAV sample format {fmt:?}/{bits}-bit"
            )))
        }
    };

    if samples.is_empty() {
        return Err(PipelineError::Decode("WAV contains no samples".to_string()));
    }

    let mono = downmix_to_mono(&samples, channels);
    CanonicalPcm::from_f32(&mono, spec.sample_rate).map_err(|e| PipelineError::Decode(e.to_string()))
}
