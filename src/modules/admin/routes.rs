use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::modules::booking::admin_booking_routes;
use crate::AppState;
use super::controller;

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admins", get(controller::list_admins))
        .route("/admins/{id}", delete(controller::delete_admin))
        .route("/admins/{id}/role", patch(controller::change_role))
        .route("/admins/{id}/status", patch(controller::set_active))
        .route("/vendors/{id}/approve", post(controller::approve_vendor))
        .route("/dashboard/stats", get(controller::dashboard_stats))
        .nest("/bookings", admin_booking_routes())
}
