//! Shared application state

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use voice_qna_config::Settings;
use voice_qna_core::TextToSpeech;
use voice_qna_pipeline::VoicePipeline;

/// State shared by every request handler. Cheap to clone; everything heavy
/// sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<VoicePipeline>,
    pub tts: Arc<dyn TextToSpeech>,
    pub settings: Arc<Settings>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<VoicePipeline>,
        tts: Arc<dyn TextToSpeech>,
        settings: Settings,
    ) -> Self {
        Self {
            pipeline,
            tts,
            settings: Arc::new(settings),
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
