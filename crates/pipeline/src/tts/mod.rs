//! Speech synthesis
//!
//! HTTP [`TextToSpeech`] backend plus the pipeline-facing helper that
//! encodes synthesized audio as base64. Synthesis is best-effort: the
//! answer text is already in hand by the time this stage runs, so a
//! failure here degrades the response (empty audio) instead of failing it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use metrics::counter;
use serde::Serialize;
use tracing::warn;

use voice_qna_config::SynthesisConfig;
use voice_qna_core::{Error, Result, TextToSpeech};

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    language: &'a str,
}

/// Speech synthesis over HTTP. The sidecar returns raw audio bytes
/// (typically WAV) as the response body.
pub struct HttpTtsBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTtsBackend {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Synthesis(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TextToSpeech for HttpTtsBackend {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(format!("{}/synthesize", self.endpoint))
            .json(&SynthesizeRequest { text, language })
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("synthesis request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Synthesis(format!(
                "synthesis backend returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("synthesis body unreadable: {}", e)))?;

        if bytes.is_empty() {
            return Err(Error::Synthesis("synthesis returned no audio".to_string()));
        }

        Ok(bytes.to_vec())
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
        "http-tts"
    }
}

/// Synthesize and base64-encode, swallowing failures.
///
/// Returns the empty string when synthesis fails or yields nothing; the
/// caller ships the text answer either way.
pub async fn synthesize_base64(
    backend: &Arc<dyn TextToSpeech>,
    text: &str,
    language: &str,
) -> String {
    match backend.synthesize(text, language).await {
        Ok(bytes) if !bytes.is_empty() => BASE64.encode(bytes),
        Ok(_) => {
            warn!("synthesis produced no audio, shipping text-only response");
            counter!("tts_degraded_total").increment(1);
            String::new()
        }
        Err(e) => {
            warn!(error = %e, "synthesis failed, shipping text-only response");
            counter!("tts_degraded_total").increment(1);
            String::new()
        }
    }
}
