use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::services::rate_limit::{OtpRateLimiter, RateLimitLayer};
use crate::AppState;
use super::controller;

pub fn auth_routes(otp_limiter: OtpRateLimiter) -> Router<Arc<AppState>> {
    // Routes that send a verification email share one limiter.
    let otp_issuing = Router::new()
        .route("/admin/register/start", post(controller::admin_register_start))
        .route("/{kind}/register/start", post(controller::register_start))
        .route("/{kind}/forgot-password", post(controller::forgot_password))
        .route_layer(RateLimitLayer::new(otp_limiter));

    Router::new()
        .route("/admin/register/complete", post(controller::admin_register_complete))
        .route("/{kind}/register/complete", post(controller::register_complete))
        .route("/{kind}/login", post(controller::login))
        .route("/{kind}/reset-password", post(controller::reset_password))
        .route("/refresh", post(controller::refresh))
        .route("/logout", post(controller::logout))
        .route("/me", get(controller::me))
        .merge(otp_issuing)
}
