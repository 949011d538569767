use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/run", post(handlers::run_samples))
        .route("/submit", post(handlers::submit))
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_text))
}
