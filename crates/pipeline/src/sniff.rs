//! Magic-byte format sniffing
//!
//! Classifies a byte buffer by its leading signature. Client-supplied
//! content types are unreliable, so this tag only selects which decode
//! strategy to try first. Total function: every input maps to a tag,
//! `Unknown` included.

use voice_qna_core::DetectedFormat;

/// Classify a buffer's probable container format from magic bytes
pub fn detect_format(bytes: &[u8]) -> DetectedFormat {
    // RIFF....WAVE
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        return DetectedFormat::Wav;
    }

    // EBML header (WebM/Matroska)
    if bytes.len() >= 4 && bytes[0..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return DetectedFormat::Webm;
    }

    // ISO-BMFF: size field then "ftyp"
    if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        return DetectedFormat::Mp4M4a;
    }

    // ADTS sync word: 12 set bits at byte 0
    if bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xF0) == 0xF0 {
        return DetectedFormat::AacAdts;
    }

    // Ogg page header
    if bytes.len() >= 4 && &bytes[0..4] == b"OggS" {
        return DetectedFormat::Ogg;
    }

    DetectedFormat::Unknown
}
