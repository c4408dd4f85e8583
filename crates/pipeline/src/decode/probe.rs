//! Container-probing decoder
//!
//! Wraps symphonia's format probe so the fallback chain can hand any blob
//! (WebM/Opus, MP4/M4A, Ogg, MP3, raw AAC) to one entry point. Decoded
//! audio comes back already downmixed and resampled to canonical PCM.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use voice_qna_core::audio::{downmix_to_mono, CanonicalPcm};

use crate::PipelineError;

/// Decode an arbitrary compressed audio blob to canonical PCM.
///
/// The extension hint steers symphonia's probe ordering but is never
/// trusted: a mislabeled blob still decodes if any registered reader
/// recognizes its actual structure.
pub fn decode_any(bytes: &[u8], extension_hint: Option<&str>) -> Result<CanonicalPcm, PipelineError> {
    let source = Box::new(Cursor::new(bytes.to_vec()));
    let stream = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PipelineError::Decode(format!("format probe failed: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::Decode("no decodable audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PipelineError::Decode(format!("unsupported codec: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0usize;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                // A decode error after some audio was recovered is treated
                // as a truncated stream, not a failure
                if samples.is_empty() {
                    return Err(PipelineError::Decode(format!("packet read failed: {e}")));
                }
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                if samples.is_empty() {
                    return Err(PipelineError::Decode(format!("decode failed: {e}")));
                }
                break;
            }
        };

        let spec = *decoded.spec();
        if sample_rate == 0 {
            sample_rate = spec.rate;
            channels = spec.channels.count();
        }

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
        });
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(PipelineError::Decode(
            "stream decoded to zero samples".to_string(),
        ));
    }

    let mono = downmix_to_mono(&samples, channels.max(1));
    CanonicalPcm::from_f32(&mono, sample_rate).map_err(|e| PipelineError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_rejected() {
        let bytes: Vec<u8> = (0..200u32).map(|i| (i.wrapping_mul(37) % 251) as u8).collect();
        assert!(decode_any(&bytes, None).is_err());
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(decode_any(&[], Some("webm")).is_err());
    }
}
