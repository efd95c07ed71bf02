pub mod health;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::pipeline::Stats;

pub fn build_router(stats: Arc<Stats>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .with_state(stats)
}
