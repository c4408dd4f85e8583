//! Recognition orchestration
//!
//! Wraps a [`SpeechToText`] backend with the policy the backend itself
//! should not know about: an energy gate that spares obviously-silent
//! clips a network round-trip, and a one-shot locale retry when the
//! primary locale hears nothing.

pub mod http;

use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use voice_qna_config::constants::audio::ENERGY_FLOOR_DB;
use voice_qna_config::RecognizerConfig;
use voice_qna_core::{CanonicalPcm, SpeechToText, Transcript};

use crate::PipelineError;

pub use http::HttpSttBackend;

/// Scan hop for the energy gate, in milliseconds
const SCAN_WINDOW_MS: u32 = 100;

/// Locale-retrying, energy-gated recognizer.
pub struct Recognizer {
    backend: Arc<dyn SpeechToText>,
    config: RecognizerConfig,
}

impl Recognizer {
    pub fn new(backend: Arc<dyn SpeechToText>, config: RecognizerConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }

    /// Recognize a clip. `Ok(None)` means the audio carried no usable
    /// speech in either locale; `Err` means the backend itself failed.
    pub async fn recognize(
        &self,
        audio: &CanonicalPcm,
    ) -> Result<Option<Transcript>, PipelineError> {
        if !self.has_speech_energy(audio) {
            debug!("energy gate rejected clip without a backend round-trip");
            counter!("stt_silence_rejected_total").increment(1);
            return Ok(None);
        }

        let primary = &self.config.primary_locale;
        if let Some(text) = self.recognize_locale(audio, primary).await? {
            return Ok(Some(Transcript::new(text, primary.clone())));
        }

        let secondary = &self.config.secondary_locale;
        if secondary.is_empty() || secondary == primary {
            return Ok(None);
        }

        debug!(
            primary = %primary,
            secondary = %secondary,
            "primary locale heard nothing, retrying"
        );
        counter!("stt_locale_retry_total").increment(1);

        match self.recognize_locale(audio, secondary).await? {
            Some(text) => Ok(Some(Transcript::new(text, secondary.clone()))),
            None => Ok(None),
        }
    }

    async fn recognize_locale(
        &self,
        audio: &CanonicalPcm,
        locale: &str,
    ) -> Result<Option<String>, PipelineError> {
        self.backend
            .recognize(audio, locale)
            .await
            .map_err(|e| PipelineError::Stt(e.to_string()))
    }

    /// Calibrate ambient level from the head of the clip and require some
    /// later window to clear it by the configured offset. The absolute
    /// floor keeps loud clips from being rejected when the calibration
    /// window itself contains speech.
    fn has_speech_energy(&self, audio: &CanonicalPcm) -> bool {
        let rate = CanonicalPcm::SAMPLE_RATE as usize;
        let calibration_len = rate * self.config.calibration_ms as usize / 1000;
        let scan_len = rate * SCAN_WINDOW_MS as usize / 1000;

        // Too short to calibrate against; let the backend judge it
        if audio.samples().len() < calibration_len + scan_len {
            return true;
        }

        let ambient_db = audio.rms_db(0, calibration_len);
        let threshold = (ambient_db + self.config.energy_offset_db).min(ENERGY_FLOOR_DB);

        let mut pos = calibration_len;
        while pos + scan_len <= audio.samples().len() {
            if audio.rms_db(pos, scan_len) >= threshold {
                return true;
            }
            pos += scan_len;
        }

        debug!(
            ambient_db,
            threshold, "no window cleared the calibrated energy threshold"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use voice_qna_config::constants::audio::CALIBRATION_WINDOW_MS;

    struct ScriptedStt {
        // One scripted reply per (locale) call, consumed in order
        replies: Mutex<Vec<voice_qna_core::Result<Option<String>>>>,
        locales_seen: Mutex<Vec<String>>,
    }

    impl ScriptedStt {
        fn new(replies: Vec<voice_qna_core::Result<Option<String>>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                locales_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SpeechToText for ScriptedStt {
        async fn recognize(
            &self,
            _audio: &CanonicalPcm,
            locale: &str,
        ) -> voice_qna_core::Result<Option<String>> {
            self.locales_seen.lock().push(locale.to_string());
            let mut replies = self.replies.lock();
            if replies.is_empty() {
                Ok(None)
            } else {
                replies.remove(0)
            }
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn config() -> RecognizerConfig {
        RecognizerConfig {
            endpoint: "http://127.0.0.1:8090".to_string(),
            primary_locale: "en-US".to_string(),
            secondary_locale: "en-GB".to_string(),
            calibration_ms: CALIBRATION_WINDOW_MS,
            energy_offset_db: 6.0,
            timeout_ms: 30_000,
        }
    }

    /// One second: quiet head for calibration, loud tail
    fn speechy_clip() -> CanonicalPcm {
        let mut samples = vec![5i16; 4800];
        samples.extend(std::iter::repeat(12_000i16).take(11_200));
        CanonicalPcm::from_samples(samples)
    }

    fn silent_clip() -> CanonicalPcm {
        CanonicalPcm::from_samples(vec![3i16; 16_000])
    }

    #[tokio::test]
    async fn test_primary_locale_hit_skips_retry() {
        let stt = Arc::new(ScriptedStt::new(vec![Ok(Some("hello there".to_string()))]));
        let recognizer = Recognizer::new(stt.clone(), config());

        let transcript = recognizer.recognize(&speechy_clip()).await.unwrap().unwrap();
        assert_eq!(transcript.text, "hello there");
        assert_eq!(transcript.locale, "en-US");
        assert_eq!(*stt.locales_seen.lock(), vec!["en-US"]);
    }

    #[tokio::test]
    async fn test_secondary_locale_retry() {
        let stt = Arc::new(ScriptedStt::new(vec![
            Ok(None),
            Ok(Some("colour of the sky".to_string())),
        ]));
        let recognizer = Recognizer::new(stt.clone(), config());

        let transcript = recognizer.recognize(&speechy_clip()).await.unwrap().unwrap();
        assert_eq!(transcript.locale, "en-GB");
        assert_eq!(*stt.locales_seen.lock(), vec!["en-US", "en-GB"]);
    }

    #[tokio::test]
    async fn test_both_locales_empty_is_none() {
        let stt = Arc::new(ScriptedStt::new(vec![Ok(None), Ok(None)]));
        let recognizer = Recognizer::new(stt, config());
        assert!(recognizer.recognize(&speechy_clip()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let stt = Arc::new(ScriptedStt::new(vec![Err(
            voice_qna_core::Error::SttBackend("connection refused".to_string()),
        )]));
        let recognizer = Recognizer::new(stt, config());
        assert!(recognizer.recognize(&speechy_clip()).await.is_err());
    }

    #[tokio::test]
    async fn test_silence_never_reaches_backend() {
        let stt = Arc::new(ScriptedStt::new(vec![Ok(Some(
            "should not be called".to_string(),
        ))]));
        let recognizer = Recognizer::new(stt.clone(), config());

        assert!(recognizer.recognize(&silent_clip()).await.unwrap().is_none());
        assert!(stt.locales_seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_short_clip_bypasses_gate() {
        let stt = Arc::new(ScriptedStt::new(vec![Ok(Some("hi".to_string()))]));
        let recognizer = Recognizer::new(stt.clone(), config());

        // 100ms: shorter than calibration + scan, goes straight through
        let clip = CanonicalPcm::from_samples(vec![0i16; 1600]);
        assert!(recognizer.recognize(&clip).await.unwrap().is_some());
        assert_eq!(stt.locales_seen.lock().len(), 1);
    }
}
