//! HTTP endpoints
//!
//! One question endpoint (`POST /api/voice-qna`, multipart), its health
//! probe, a liveness probe, and the Prometheus scrape endpoint. Pipeline
//! outcomes always serialize with status 200; non-200 statuses are
//! reserved for malformed requests and infrastructure problems.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use voice_qna_core::PipelineResult;
use voice_qna_pipeline::PipelineRequest;

use crate::metrics::record_http_request;
use crate::state::AppState;

/// Headroom over the audio limit for multipart framing and form fields
const MULTIPART_OVERHEAD: usize = 16 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.settings.server.cors_origins,
        state.settings.server.cors_enabled,
    );
    let body_limit = state.settings.server.max_audio_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/api/voice-qna", post(voice_qna))
        .route("/api/voice-qna/health", get(voice_qna_health))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins.
///
/// - cors_enabled false: permissive (development only)
/// - no origins configured: localhost:3000
/// - otherwise the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed.is_empty() {
        info!("No CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods(methods)
            .allow_headers(Any);
    }

    info!("CORS configured with {} origins", parsed.len());
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(methods)
        .allow_headers(Any)
}

/// `POST /api/voice-qna`
///
/// Multipart form: `audio_file` (required), `lesson_id` and `grade_level`
/// (optional text fields). The response is always the pipeline's result
/// shape; a missing or oversized audio part is the caller's error and gets
/// a 4xx instead.
async fn voice_qna(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PipelineResult>, (StatusCode, Json<serde_json::Value>)> {
    let mut audio: Option<Vec<u8>> = None;
    let mut lesson_id: Option<i64> = None;
    let mut grade_level: Option<u8> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        bad_request(format!("malformed multipart body: {}", e))
    })? {
        match field.name().unwrap_or_default() {
            "audio_file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("could not read audio part: {}", e)))?;
                audio = Some(bytes.to_vec());
            }
            "lesson_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("could not read lesson_id: {}", e)))?;
                lesson_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| bad_request(format!("invalid lesson_id: {:?}", text)))?,
                );
            }
            "grade_level" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("could not read grade_level: {}", e)))?;
                let grade: u8 = text
                    .trim()
                    .parse()
                    .map_err(|_| bad_request(format!("invalid grade_level: {:?}", text)))?;
                if (1..=12).contains(&grade) {
                    grade_level = Some(grade);
                } else {
                    // Out-of-domain grades are dropped rather than rejected
                    tracing::debug!(grade, "ignoring out-of-range grade_level");
                }
            }
            other => {
                // Unknown parts are skipped, not rejected
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let audio = audio.ok_or_else(|| bad_request("no audio_file part provided".to_string()))?;
    if audio.is_empty() {
        return Err(bad_request("audio file is empty".to_string()));
    }

    let max = state.settings.server.max_audio_bytes;
    if audio.len() > max {
        record_http_request("/api/voice-qna", 413);
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(serde_json::json!({
                "success": false,
                "error": format!("audio exceeds the {} byte limit", max),
            })),
        ));
    }

    let result = state
        .pipeline
        .process(PipelineRequest {
            audio,
            lesson_id,
            grade_level,
        })
        .await;

    record_http_request("/api/voice-qna", 200);
    Ok(Json(result))
}

fn bad_request(message: String) -> (StatusCode, Json<serde_json::Value>) {
    record_http_request("/api/voice-qna", 400);
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "success": false,
            "error": message,
        })),
    )
}

/// `GET /api/voice-qna/health` - per-backend readiness of the Q&A feature
async fn voice_qna_health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let stt_ok = state.pipeline.stt_ready().await;
    let generation_ok = state.pipeline.generation_ready().await;
    let tts_ok = state.tts.is_available().await;

    // Synthesis is best-effort: the feature works (degraded) without it
    let ready = stt_ok && generation_ok;
    let status = if ready && tts_ok {
        "ok"
    } else if ready {
        "degraded"
    } else {
        "unavailable"
    };

    let formats: Vec<String> = state
        .pipeline
        .capabilities()
        .supported_formats()
        .iter()
        .map(|f| f.to_string())
        .collect();

    let body = serde_json::json!({
        "status": status,
        "model": state.pipeline.model_name(),
        "supported_formats": formats,
        "checks": {
            "stt": if stt_ok { "ok" } else { "unreachable" },
            "generation": if generation_ok { "ok" } else { "unreachable" },
            "tts": if tts_ok { "ok" } else { "unreachable" },
        },
    });

    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body))
}

/// `GET /health` - process liveness
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /metrics` - Prometheus scrape endpoint
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics_handle {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed\n".to_string(),
        ),
    }
}
