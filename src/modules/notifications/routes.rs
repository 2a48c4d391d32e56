use axum::{routing::get, Router};
use std::sync::Arc;

use crate::AppState;
use super::controller;

pub fn notification_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/device-tokens",
        get(controller::list_devices).post(controller::register_device),
    )
}
