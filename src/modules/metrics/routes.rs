use axum::{routing::get, Router};
use std::sync::Arc;

use super::controller;
use crate::services::metrics::MetricsRegistry;

/// Operational endpoints. They carry their own state so they can be merged
/// after the application state is applied.
pub fn metrics_routes(metrics: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/health", get(controller::health_check))
        .route("/metrics", get(controller::get_metrics))
        .with_state(metrics)
}
