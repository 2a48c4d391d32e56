use axum::{routing::post, Router};
use std::sync::Arc;

use crate::AppState;
use super::controller;

pub fn booking_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{id}/accept", post(controller::accept))
        .route("/{id}/reject", post(controller::reject))
        .route("/{id}/visited", post(controller::mark_visited))
        .route("/{id}/completed", post(controller::mark_completed))
        .route("/{id}/schedule", post(controller::schedule_visit))
        .route("/{id}/report", post(controller::upload_report))
        .route("/{id}/borewell", post(controller::upload_borewell_result))
        .route("/{id}/confirm-payment", post(controller::confirm_payment))
        .route("/{id}/cancel", post(controller::cancel))
}

/// Mounted under `/admin/bookings`.
pub fn admin_booking_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{id}/request-payment", post(controller::request_payment))
        .route("/{id}/approve", post(controller::admin_approve))
        .route("/{id}/final-settlement", post(controller::final_settlement))
        .route("/{id}/settle", post(controller::settle))
}
