pub mod config;
pub mod error;
pub mod extract;
pub mod modules;
pub mod services;

use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use config::DbPool;
use modules::admin::admin_routes;
use modules::auth::{auth_routes, AccountRepository, MySqlAccountRepository};
use modules::booking::{booking_routes, BookingRepository, MySqlBookingRepository};
use modules::metrics::metrics_routes;
use modules::notifications::notification_routes;
use services::email::EmailSender;
use services::jwt::JwtService;
use services::metrics::{metrics_middleware, MetricsRegistry};
use services::otp::{MySqlTokenStore, OtpEngine};
use services::push::{DeviceTokenRegistry, MySqlDeviceTokenRegistry};
use services::rate_limit::create_rate_limiter;
use services::security::security_headers;

/// Runtime knobs that handlers read directly.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Admin self-registration is disabled when unset.
    pub admin_registration_code: Option<String>,
    /// Verification emails allowed per minute across the OTP-issuing routes.
    pub otp_rate_burst: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            admin_registration_code: None,
            otp_rate_burst: 10,
        }
    }
}

pub struct AppState {
    pub accounts: Arc<dyn AccountRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub device_tokens: Arc<dyn DeviceTokenRegistry>,
    pub otp: OtpEngine,
    pub jwt_service: JwtService,
    pub metrics: Arc<MetricsRegistry>,
    pub settings: AppSettings,
}

impl AppState {
    /// Wire every store to MySQL.
    pub fn mysql(
        db: DbPool,
        mailer: Arc<dyn EmailSender>,
        jwt_service: JwtService,
        metrics: Arc<MetricsRegistry>,
        otp_expiry_minutes: i64,
        settings: AppSettings,
    ) -> Self {
        let otp = OtpEngine::new(Arc::new(MySqlTokenStore::new(db.clone())), mailer)
            .with_expiry_minutes(otp_expiry_minutes)
            .with_metrics(metrics.clone());

        Self {
            accounts: Arc::new(MySqlAccountRepository::new(db.clone())),
            bookings: Arc::new(MySqlBookingRepository::new(db.clone())),
            device_tokens: Arc::new(MySqlDeviceTokenRegistry::new(db)),
            otp,
            jwt_service,
            metrics,
            settings,
        }
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let metrics = state.metrics.clone();
    let otp_limiter = create_rate_limiter(state.settings.otp_rate_burst);

    Router::new()
        .nest("/auth", auth_routes(otp_limiter))
        .nest("/bookings", booking_routes())
        .nest("/admin", admin_routes())
        .nest("/notifications", notification_routes())
        .with_state(state)
        .merge(metrics_routes(metrics.clone()))
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(1024 * 100)) // 100KB max body
        .layer(middleware::from_fn_with_state(metrics, metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
