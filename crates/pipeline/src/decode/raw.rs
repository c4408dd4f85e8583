//! Headerless raw-PCM reconstruction
//!
//! Last rung of the fallback chain: reinterpret the blob as 16-bit LE mono
//! PCM at each plausible capture rate. There is no way to tell the right
//! rate (or whether the bytes are PCM at all) from the bytes alone, so the
//! candidates are handed upward and judged by whether recognition succeeds.

use voice_qna_core::audio::CanonicalPcm;

/// A raw-PCM reading of the blob at one assumed capture rate
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub assumed_rate: u32,
    pub pcm: CanonicalPcm,
}

/// Build one candidate per configured rate, in configured order.
///
/// Construction itself almost never fails (odd-length buffers are padded),
/// so a non-empty blob yields one candidate per rate.
pub fn raw_candidates(bytes: &[u8], rates: &[u32]) -> Vec<RawCandidate> {
    if bytes.is_empty() {
        return Vec::new();
    }

    rates
        .iter()
        .filter_map(|&rate| {
            CanonicalPcm::from_raw_bytes(bytes, rate)
                .ok()
                .filter(|pcm| !pcm.is_empty())
                .map(|pcm| RawCandidate {
                    assumed_rate: rate,
                    pcm,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_qna_config::constants::audio::RAW_FALLBACK_RATES;

    #[test]
    fn test_one_candidate_per_rate() {
        let bytes = vec![0x12u8; 3200];
        let candidates = raw_candidates(&bytes, &RAW_FALLBACK_RATES);
        assert_eq!(candidates.len(), RAW_FALLBACK_RATES.len());
        assert_eq!(candidates[0].assumed_rate, 16_000);
    }

    #[test]
    fn test_rates_change_duration() {
        let bytes = vec![0x12u8; 32_000]; // 16k samples
        let candidates = raw_candidates(&bytes, &[16_000, 48_000]);
        // Read at 16k: one second. Read at 48k: a third of a second.
        assert_eq!(candidates[0].pcm.duration_ms(), 1000);
        assert!(candidates[1].pcm.duration_ms() < 400);
    }

    #[test]
    fn test_empty_blob_yields_nothing() {
        assert!(raw_candidates(&[], &RAW_FALLBACK_RATES).is_empty());
    }
}
