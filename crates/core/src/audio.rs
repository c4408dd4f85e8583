//! Audio types for the voice Q&A pipeline
//!
//! Everything downstream of the decode chain consumes one normalized
//! representation: mono 16-bit PCM at 16 kHz (`CanonicalPcm`).

use std::io::Cursor;

use crate::{Error, Result};

/// Container format classified from leading bytes.
///
/// This is a hint for choosing which decode strategy to try first, not a
/// contract: client-supplied content types are unreliable, so the sniffed
/// tag never short-circuits the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectedFormat {
    /// RIFF/WAVE container
    Wav,
    /// EBML header (WebM/Matroska, typically Opus from browsers)
    Webm,
    /// ISO-BMFF `ftyp` atom (MP4/M4A)
    Mp4M4a,
    /// Raw AAC with ADTS framing
    AacAdts,
    /// Ogg page header (Vorbis/Opus)
    Ogg,
    /// No recognizable signature
    Unknown,
}

impl DetectedFormat {
    /// File-extension style hint used by probing decoders
    pub fn extension_hint(&self) -> Option<&'static str> {
        match self {
            DetectedFormat::Wav => Some("wav"),
            DetectedFormat::Webm => Some("webm"),
            DetectedFormat::Mp4M4a => Some("m4a"),
            DetectedFormat::AacAdts => Some("aac"),
            DetectedFormat::Ogg => Some("ogg"),
            DetectedFormat::Unknown => None,
        }
    }
}

impl std::fmt::Display for DetectedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            DetectedFormat::Wav => "wav",
            DetectedFormat::Webm => "webm",
            DetectedFormat::Mp4M4a => "mp4_m4a",
            DetectedFormat::AacAdts => "aac_adts",
            DetectedFormat::Ogg => "ogg",
            DetectedFormat::Unknown => "unknown",
        };
        f.write_str(tag)
    }
}

/// Raw audio bytes plus the sniffed format tag.
///
/// Immutable once sniffed; lives for exactly one pipeline invocation.
#[derive(Debug, Clone)]
pub struct AudioBlob {
    bytes: Vec<u8>,
    format: DetectedFormat,
}

impl AudioBlob {
    pub fn new(bytes: Vec<u8>, format: DetectedFormat) -> Self {
        Self { bytes, format }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> DetectedFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// PCM16 normalization constant (i16 -> f32)
const PCM16_NORMALIZE: f32 = 32768.0;
/// PCM16 scaling constant (f32 -> i16)
const PCM16_SCALE: f32 = 32767.0;

/// Canonical audio: mono, 16-bit little-endian samples at 16 kHz.
///
/// Produced fresh per request by the decode chain and discarded when the
/// request completes. Carries enough shape information to be replayed as a
/// standard WAV container via [`CanonicalPcm::to_wav_bytes`].
#[derive(Debug, Clone)]
pub struct CanonicalPcm {
    samples: Vec<i16>,
}

impl CanonicalPcm {
    /// The single sample rate all downstream stages consume
    pub const SAMPLE_RATE: u32 = 16_000;

    /// Wrap already-canonical samples
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// Build canonical PCM from mono f32 samples at an arbitrary source rate.
    ///
    /// Resamples to 16 kHz and quantizes to 16-bit.
    pub fn from_f32(samples: &[f32], source_rate: u32) -> Result<Self> {
        if source_rate == 0 {
            return Err(Error::Decode("source sample rate is zero".to_string()));
        }
        let at_target = if source_rate == Self::SAMPLE_RATE {
            samples.to_vec()
        } else {
            resample(samples, source_rate, Self::SAMPLE_RATE)
        };

        let quantized = at_target
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * PCM16_SCALE) as i16)
            .collect();

        Ok(Self { samples: quantized })
    }

    /// Interpret raw bytes as headerless 16-bit LE mono PCM at `source_rate`.
    ///
    /// Odd-length buffers are padded with a single zero byte to keep sample
    /// alignment.
    pub fn from_raw_bytes(bytes: &[u8], source_rate: u32) -> Result<Self> {
        let mut bytes = bytes.to_vec();
        if bytes.len() % 2 != 0 {
            bytes.push(0);
        }
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / PCM16_NORMALIZE)
            .collect();
        Self::from_f32(&samples, source_rate)
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> u64 {
        (self.samples.len() as u64 * 1000) / Self::SAMPLE_RATE as u64
    }

    /// RMS energy in decibels over a sample range (clamped to the buffer)
    pub fn rms_db(&self, start: usize, len: usize) -> f32 {
        let start = start.min(self.samples.len());
        let end = (start + len).min(self.samples.len());
        let window = &self.samples[start..end];
        if window.is_empty() {
            return -96.0;
        }

        let sum_squares: f64 = window
            .iter()
            .map(|&s| {
                let f = s as f64 / PCM16_NORMALIZE as f64;
                f * f
            })
            .sum();
        let rms = (sum_squares / window.len() as f64).sqrt();

        if rms > 0.0 {
            (20.0 * rms.log10()) as f32
        } else {
            -96.0
        }
    }

    /// Serialize as a standard mono 16 kHz 16-bit WAV container
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: Self::SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| Error::Decode(format!("WAV encode failed: {}", e)))?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| Error::Decode(format!("WAV encode failed: {}", e)))?;
            }
            writer
                .finalize()
                .map_err(|e| Error::Decode(format!("WAV encode failed: {}", e)))?;
        }

        Ok(cursor.into_inner())
    }
}

/// Resample mono f32 samples with Rubato (FFT sinc), falling back to linear
/// interpolation for very short buffers or resampler errors.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    use rubato::{FftFixedIn, Resampler};

    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    // Rubato needs a reasonable chunk; short tails go through linear interp.
    const CHUNK: usize = 1024;
    if samples.len() < CHUNK {
        return resample_linear(samples, from_rate, to_rate);
    }

    let mut resampler =
        match FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, CHUNK, 2, 1) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Rubato init failed, using linear fallback: {}", e);
                return resample_linear(samples, from_rate, to_rate);
            }
        };

    let mut output = Vec::with_capacity(
        (samples.len() as f64 * to_rate as f64 / from_rate as f64) as usize + CHUNK,
    );

    let full_chunks = samples.len() / CHUNK;
    for i in 0..full_chunks {
        let chunk: Vec<f64> = samples[i * CHUNK..(i + 1) * CHUNK]
            .iter()
            .map(|&s| s as f64)
            .collect();
        match resampler.process(&[chunk], None) {
            Ok(frames) => output.extend(frames[0].iter().map(|&s| s as f32)),
            Err(e) => {
                tracing::warn!("Rubato processing failed, using linear fallback: {}", e);
                return resample_linear(samples, from_rate, to_rate);
            }
        }
    }

    // Tail shorter than one chunk
    let tail = &samples[full_chunks * CHUNK..];
    if !tail.is_empty() {
        output.extend(resample_linear(tail, from_rate, to_rate));
    }

    output
}

fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio) as usize;

    let mut resampled = Vec::with_capacity(new_len);
    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx_floor = src_idx.floor() as usize;
        let idx_ceil = (idx_floor + 1).min(samples.len().saturating_sub(1));
        let frac = (src_idx - idx_floor as f64) as f32;

        let sample = samples[idx_floor] * (1.0 - frac) + samples[idx_ceil] * frac;
        resampled.push(sample);
    }

    resampled
}

/// Average interleaved multi-channel samples down to mono
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_pcm_from_f32_same_rate() {
        let samples = vec![0.5f32, -0.5, 0.0];
        let pcm = CanonicalPcm::from_f32(&samples, 16000).unwrap();
        assert_eq!(pcm.samples().len(), 3);
        assert!(pcm.samples()[0] > 16000);
        assert!(pcm.samples()[1] < -16000);
        assert_eq!(pcm.samples()[2], 0);
    }

    #[test]
    fn test_raw_bytes_odd_length_padded() {
        let bytes = vec![0x00, 0x40, 0x7F]; // 3 bytes, one trailing
        let pcm = CanonicalPcm::from_raw_bytes(&bytes, 16000).unwrap();
        assert_eq!(pcm.samples().len(), 2);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples = vec![0.1f32; 3200]; // 200ms at 16kHz
        let out = resample(&samples, 16000, 8000);
        // FFT resampler may trim edges slightly; stay within 10%
        let expected = 1600.0;
        assert!((out.len() as f64 - expected).abs() < expected * 0.1);
    }

    #[test]
    fn test_downmix_stereo() {
        let stereo = vec![1.0f32, 0.0, 0.0, 1.0];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono, vec![0.5, 0.5]);
    }

    #[test]
    fn test_rms_db_silence_vs_tone() {
        let silent = CanonicalPcm::from_samples(vec![0i16; 1600]);
        assert!(silent.rms_db(0, 1600) < -90.0);

        let loud = CanonicalPcm::from_samples(vec![16000i16; 1600]);
        assert!(loud.rms_db(0, 1600) > -10.0);
    }

    #[test]
    fn test_wav_roundtrip_header() {
        let pcm = CanonicalPcm::from_samples(vec![0i16; 160]);
        let wav = pcm.to_wav_bytes().unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, CanonicalPcm::SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
    }

    #[test]
    fn test_duration() {
        let pcm = CanonicalPcm::from_samples(vec![0i16; 16000]);
        assert_eq!(pcm.duration_ms(), 1000);
    }
}
