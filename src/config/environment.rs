use std::env;

/// Environment configuration
/// Loads and validates environment variables
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub admin_registration_code: Option<String>,
    pub otp_expiry_minutes: i64,
    pub otp_rate_burst: u32,
    pub access_token_days: i64,
    pub refresh_token_days: i64,
    pub token_sweep_secs: u64,
    pub email: EmailConfig,
}

/// Transactional email API settings. When `api_key` is unset the server
/// falls back to logging outgoing mail.
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set".to_string())?;
        if jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters".to_string());
        }

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let admin_registration_code = env::var("ADMIN_REGISTRATION_CODE")
            .ok()
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());

        let email = EmailConfig {
            api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.brevo.com/v3/smtp/email".to_string()),
            api_key: env::var("EMAIL_API_KEY").ok().filter(|key| !key.trim().is_empty()),
            sender_email: env::var("EMAIL_SENDER")
                .unwrap_or_else(|_| "no-reply@localhost".to_string()),
            sender_name: env::var("EMAIL_SENDER_NAME").ok(),
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            admin_registration_code,
            otp_expiry_minutes: parse_var("OTP_EXPIRY_MINUTES", 10)?,
            otp_rate_burst: parse_var("OTP_RATE_BURST", 10)?,
            access_token_days: parse_var("ACCESS_TOKEN_DAYS", 7)?,
            refresh_token_days: parse_var("REFRESH_TOKEN_DAYS", 30)?,
            token_sweep_secs: parse_var("TOKEN_SWEEP_SECS", 300)?,
            email,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
