//! Lesson context providers
//!
//! The pipeline only needs [`LessonLookup`]; this module supplies the HTTP
//! client that asks the lesson service, and a static in-memory store for
//! development and tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use voice_qna_config::LessonConfig;
use voice_qna_core::{Error, LessonContext, LessonLookup, Result};

#[derive(Debug, Deserialize)]
struct LessonResponse {
    title: String,
    content: String,
}

/// Lesson lookup against the lesson service's REST API.
pub struct HttpLessonClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLessonClient {
    pub fn new(config: &LessonConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Lesson(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LessonLookup for HttpLessonClient {
    async fn lookup(&self, lesson_id: i64) -> Result<Option<LessonContext>> {
        let url = format!("{}/api/lessons/{}", self.endpoint, lesson_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Lesson(format!("lesson request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(lesson_id, "lesson not found");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Lesson(format!(
                "lesson service returned {}",
                response.status()
            )));
        }

        let body: LessonResponse = response
            .json()
            .await
            .map_err(|e| Error::Lesson(format!("malformed lesson response: {}", e)))?;

        Ok(Some(LessonContext::new(body.title, body.content)))
    }
}

/// Fixed lesson table for development and tests.
#[derive(Default)]
pub struct StaticLessonStore {
    lessons: HashMap<i64, LessonContext>,
}

impl StaticLessonStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lesson(mut self, id: i64, lesson: LessonContext) -> Self {
        self.lessons.insert(id, lesson);
        self
    }
}

#[async_trait]
impl LessonLookup for StaticLessonStore {
    async fn lookup(&self, lesson_id: i64) -> Result<Option<LessonContext>> {
        Ok(self.lessons.get(&lesson_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_store() {
        let store = StaticLessonStore::new().with_lesson(
            1,
            LessonContext::new("Fractions", "Halves and quarters."),
        );
        assert!(store.lookup(1).await.unwrap().is_some());
        assert!(store.lookup(2).await.unwrap().is_none());
    }
}
