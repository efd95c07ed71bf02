use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::pipeline::Stats;

/// GET /health
/// Liveness plus per-outcome message counters since startup.
pub async fn health_handler(State(stats): State<Arc<Stats>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-analyzer",
        "messages": stats.snapshot(),
    }))
}
