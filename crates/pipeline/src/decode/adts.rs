//! ADTS frame parsing
//!
//! ADTS wraps raw AAC in a per-frame header: a 12-bit sync word, profile
//! and sampling-frequency fields, and a 13-bit frame length spanning bytes
//! 3-5. Parsing here is pure and recovers the frame layout plus stream
//! parameters; actual AAC decoding happens in the probing decoder.

use crate::PipelineError;

/// Header length without CRC
const HEADER_LEN: usize = 7;
/// Header length with CRC
const HEADER_LEN_CRC: usize = 9;

/// Sampling frequencies by ADTS sampling_frequency_index
const SAMPLE_RATES: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025, 8_000,
    7_350,
];

/// One parsed ADTS frame (header + payload span within the source buffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsFrame {
    /// Byte offset of the frame header in the source buffer
    pub offset: usize,
    /// Total frame length including the header
    pub len: usize,
    /// Payload offset (past the header and optional CRC)
    pub payload_offset: usize,
}

/// Stream-level parameters recovered from the first frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsStreamInfo {
    pub sample_rate: u32,
    pub channels: u8,
    pub frames: usize,
}

/// Parse an ADTS byte stream into its frame layout.
///
/// Requires a valid sync word at byte 0 and at least one complete frame;
/// trailing garbage after the last complete frame is tolerated (capture
/// truncation is common), garbage between frames is not.
pub fn parse_stream(bytes: &[u8]) -> Result<(AdtsStreamInfo, Vec<AdtsFrame>), PipelineError> {
    if bytes.len() < HEADER_LEN {
        return Err(PipelineError::Decode(
            "ADTS stream shorter than one header".to_string(),
        ));
    }

    let mut frames = Vec::new();
    let mut info: Option<AdtsStreamInfo> = None;
    let mut pos = 0usize;

    while pos + HEADER_LEN <= bytes.len() {
        let header = &bytes[pos..];

        if !(header[0] == 0xFF && (header[1] & 0xF0) == 0xF0) {
            if frames.is_empty() {
                return Err(PipelineError::Decode(format!(
                    "ADTS sync word missing at offset {}",
                    pos
                )));
            }
            // Sync lost mid-stream: stop at the last complete frame
            break;
        }

        let protection_absent = header[1] & 0x01 == 1;
        let header_len = if protection_absent {
            HEADER_LEN
        } else {
            HEADER_LEN_CRC
        };

        let freq_index = ((header[2] >> 2) & 0x0F) as usize;
        if freq_index >= SAMPLE_RATES.len() {
            return Err(PipelineError::Decode(format!(
                "invalid ADTS sampling frequency index {}",
                freq_index
            )));
        }

        let channel_config = ((header[2] & 0x01) << 2) | (header[3] >> 6);

        // 13-bit frame length: low 2 bits of byte 3, byte 4, high 3 bits of byte 5
        let frame_len = (((header[3] & 0x03) as usize) << 11)
            | ((header[4] as usize) << 3)
            | ((header[5] as usize) >> 5);

        if frame_len < header_len {
            return Err(PipelineError::Decode(format!(
                "ADTS frame length {} shorter than its header",
                frame_len
            )));
        }

        if pos + frame_len > bytes.len() {
            // Truncated final frame
            break;
        }

        if info.is_none() {
            info = Some(AdtsStreamInfo {
                sample_rate: SAMPLE_RATES[freq_index],
                channels: channel_config,
                frames: 0,
            });
        }

        frames.push(AdtsFrame {
            offset: pos,
            len: frame_len,
            payload_offset: pos + header_len,
        });
        pos += frame_len;
    }

    let mut info = info.ok_or_else(|| {
        PipelineError::Decode("ADTS stream contains no complete frame".to_string())
    })?;
    info.frames = frames.len();

    Ok((info, frames))
}

/// Re-concatenate the complete frames of an ADTS stream.
///
/// Drops any truncated tail so the probing decoder sees a clean stream.
pub fn complete_frames(bytes: &[u8]) -> Result<(AdtsStreamInfo, Vec<u8>), PipelineError> {
    let (info, frames) = parse_stream(bytes)?;
    let mut out = Vec::with_capacity(bytes.len());
    for frame in &frames {
        out.extend_from_slice(&bytes[frame.offset..frame.offset + frame.len]);
    }
    Ok((info, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a synthetic ADTS frame: 44.1kHz, AAC-LC, mono, no CRC
    fn make_frame(payload_len: usize) -> Vec<u8> {
        let frame_len = HEADER_LEN + payload_len;
        let mut frame = vec![0u8; frame_len];
        frame[0] = 0xFF;
        frame[1] = 0xF1; // MPEG-4, layer 0, protection absent
        frame[2] = 0x50; // profile AAC-LC, freq index 4 (44100)
        frame[3] = 0x40 | ((frame_len >> 11) & 0x03) as u8; // channel config 1
        frame[4] = ((frame_len >> 3) & 0xFF) as u8;
        frame[5] = (((frame_len & 0x07) << 5) | 0x1F) as u8;
        frame[6] = 0xFC;
        frame
    }

    #[test]
    fn test_parse_single_frame() {
        let frame = make_frame(32);
        let (info, frames) = parse_stream(&frame).unwrap();
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.channels, 1);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len, HEADER_LEN + 32);
        assert_eq!(frames[0].payload_offset, HEADER_LEN);
    }

    #[test]
    fn test_parse_multiple_frames_with_truncated_tail() {
        let mut stream = make_frame(16);
        stream.extend(make_frame(24));
        let full_len = stream.len();
        // Append a truncated third frame
        let tail = make_frame(64);
        stream.extend_from_slice(&tail[..10]);

        let (info, frames) = parse_stream(&stream).unwrap();
        assert_eq!(info.frames, 2);
        assert_eq!(
            frames.iter().map(|f| f.len).sum::<usize>(),
            full_len
        );
    }

    #[test]
    fn test_complete_frames_drops_tail() {
        let mut stream = make_frame(16);
        stream.extend_from_slice(&[0xFF, 0xF1]); // dangling partial header
        let (_, clean) = complete_frames(&stream).unwrap();
        assert_eq!(clean.len(), HEADER_LEN + 16);
    }

    #[test]
    fn test_missing_sync_word() {
        let bytes = vec![0x00u8; 32];
        assert!(parse_stream(&bytes).is_err());
    }

    #[test]
    fn test_too_short() {
        assert!(parse_stream(&[0xFF, 0xF1, 0x50]).is_err());
    }

    #[test]
    fn test_invalid_frequency_index() {
        let mut frame = make_frame(8);
        frame[2] = 0x3C; // freq index 15
        assert!(parse_stream(&frame).is_err());
    }
}
