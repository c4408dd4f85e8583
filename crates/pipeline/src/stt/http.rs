//! HTTP speech-to-text backend
//!
//! Talks to a whisper-style transcription sidecar: canonical PCM goes out
//! as a WAV body, the transcript comes back as JSON. The requested locale
//! rides in a header so one sidecar can serve every retry.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use voice_qna_config::RecognizerConfig;
use voice_qna_core::{CanonicalPcm, Error, Result, SpeechToText};

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
}

/// Speech recognition over HTTP.
pub struct HttpSttBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSttBackend {
    pub fn new(config: &RecognizerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::SttBackend(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpeechToText for HttpSttBackend {
    async fn recognize(&self, audio: &CanonicalPcm, locale: &str) -> Result<Option<String>> {
        let wav = audio
            .to_wav_bytes()
            .map_err(|e| Error::SttBackend(format!("WAV framing failed: {}", e)))?;

        let response = self
            .client
            .post(format!("{}/transcribe", self.endpoint))
            .header("Content-Type", "audio/wav")
            .header("X-Language", locale)
            .body(wav)
            .send()
            .await
            .map_err(|e| Error::SttBackend(format!("transcription request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::SttBackend(format!(
                "transcription backend returned {}",
                response.status()
            )));
        }

        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| Error::SttBackend(format!("malformed transcription response: {}", e)))?;

        let text = body.text.trim();
        if text.is_empty() {
            debug!(locale, "backend returned an empty transcript");
            return Ok(None);
        }

        Ok(Some(text.to_string()))
    }

    async fn is_available(&self) -> bool {
        let health = format!("{}/health", self.endpoint);
        match self
            .client
            .get(&health)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(r) => r.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        "http-stt"
    }
}
