use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use service_marketplace::config::{init_db, Config};
use service_marketplace::services::email::{EmailSender, HttpEmailSender, LogEmailSender};
use service_marketplace::services::jwt::JwtService;
use service_marketplace::services::metrics::MetricsRegistry;
use service_marketplace::services::sweeper::spawn_token_sweeper;
use service_marketplace::{create_app, AppSettings, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "service_marketplace=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let db = init_db(&config.database_url).await?;
    tracing::info!("Connected to MySQL");

    let mailer: Arc<dyn EmailSender> = match config.email.api_key.clone() {
        Some(api_key) => Arc::new(HttpEmailSender::new(&config.email, api_key)),
        None => {
            tracing::warn!("EMAIL_API_KEY not set, verification emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    let jwt_service = JwtService::new(config.jwt_secret.clone()).with_durations(
        ChronoDuration::days(config.access_token_days),
        ChronoDuration::days(config.refresh_token_days),
    );

    let metrics = MetricsRegistry::new()?;

    let state = Arc::new(AppState::mysql(
        db,
        mailer,
        jwt_service,
        metrics,
        config.otp_expiry_minutes,
        AppSettings {
            admin_registration_code: config.admin_registration_code.clone(),
            otp_rate_burst: config.otp_rate_burst,
        },
    ));

    spawn_token_sweeper(state.otp.clone(), Duration::from_secs(config.token_sweep_secs.max(1)));

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
