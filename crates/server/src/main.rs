//! Voice Q&A server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use voice_qna_config::{load_settings, Settings};
use voice_qna_core::{AnswerBackend, LessonLookup, SpeechToText, TextToSpeech};
use voice_qna_llm::OllamaGenerateBackend;
use voice_qna_pipeline::{HttpSttBackend, HttpTtsBackend, VoicePipeline};
use voice_qna_server::{create_router, init_metrics, AppState, HttpLessonClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("VOICE_QNA_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };
    config.validate()?;

    init_tracing(&config);

    tracing::info!("Starting Voice Q&A Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_env = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let metrics_handle = match init_metrics() {
        Ok(handle) => {
            tracing::info!("Initialized Prometheus metrics at /metrics");
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Metrics recorder unavailable, /metrics disabled");
            None
        }
    };

    let stt: Arc<dyn SpeechToText> = Arc::new(HttpSttBackend::new(&config.recognizer)?);
    let answer: Arc<dyn AnswerBackend> =
        Arc::new(OllamaGenerateBackend::new(config.generation.clone())?);
    let tts: Arc<dyn TextToSpeech> = Arc::new(HttpTtsBackend::new(&config.synthesis)?);
    let lessons: Arc<dyn LessonLookup> = Arc::new(HttpLessonClient::new(&config.lessons)?);

    let pipeline = Arc::new(VoicePipeline::new(
        stt,
        answer,
        tts.clone(),
        lessons,
        config.clone(),
    ));

    let caps = pipeline.capabilities();
    tracing::info!(
        probe_decoder = caps.probe_decoder,
        formats = ?caps
            .supported_formats()
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>(),
        model = pipeline.model_name(),
        "Decode capabilities resolved"
    );

    if !pipeline.backends_ready().await {
        tracing::warn!("One or more backends are unreachable at startup; serving anyway");
    }

    let mut state = AppState::new(pipeline, tts, config.clone());
    if let Some(handle) = metrics_handle {
        state = state.with_metrics(handle);
    }

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("voice_qna={},tower_http=debug", config.server.log_level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.server.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
