//! Voice Q&A Server
//!
//! HTTP surface over the pipeline: one multipart question endpoint, health
//! and readiness probes, and a Prometheus scrape endpoint.

pub mod http;
pub mod lesson;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use lesson::{HttpLessonClient, StaticLessonStore};
pub use metrics::init_metrics;
pub use state::AppState;

use thiserror::Error;

/// Server startup errors. Request-level failures are answered directly by
/// the handlers with JSON bodies, not routed through this type.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Internal error: {0}")]
    Internal(String),
}
