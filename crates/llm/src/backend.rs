//! Answer generation backend
//!
//! Talks to an Ollama-compatible `/api/generate` endpoint with a bounded
//! request timeout. Non-success statuses, empty output, and timeouts all
//! surface as typed errors; no partial answer is ever returned.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use voice_qna_config::GenerationConfig;
use voice_qna_core::{AnswerBackend, Error, PromptSpec, Result};

use crate::LlmError;

/// Ollama `/api/generate` backend
#[derive(Clone)]
pub struct OllamaGenerateBackend {
    client: Client,
    config: GenerationConfig,
}

impl OllamaGenerateBackend {
    pub fn new(config: GenerationConfig) -> std::result::Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                LlmError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    async fn execute(&self, prompt: &PromptSpec) -> std::result::Result<String, LlmError> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.text.clone(),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature as f64,
                top_p: self.config.top_p as f64,
                max_tokens: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.api_url("/generate"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = body.response.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "backend returned an empty answer".to_string(),
            ));
        }

        tracing::debug!(
            model = %self.config.model,
            answer_chars = text.len(),
            "generation completed"
        );
        Ok(text)
    }
}

#[async_trait]
impl AnswerBackend for OllamaGenerateBackend {
    async fn generate(&self, prompt: &PromptSpec) -> Result<String> {
        self.execute(prompt).await.map_err(Error::from)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/tags"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_creation_and_urls() {
        let backend = OllamaGenerateBackend::new(GenerationConfig::default()).unwrap();
        assert_eq!(
            backend.api_url("/generate"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(backend.model_name(), "gemma3:2b");
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            model: "gemma3:2b".to_string(),
            prompt: "Answer:".to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: 0.7,
                top_p: 0.9,
                max_tokens: 150,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gemma3:2b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.7);
        assert_eq!(json["options"]["top_p"], 0.9);
        assert_eq!(json["options"]["max_tokens"], 150);
    }

    #[test]
    fn test_response_missing_field_defaults_empty() {
        let body: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(body.response.is_empty());
    }
}
