use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::store::TokenStore;
use super::types::{IssuedOtp, OtpError, OtpLookup, OtpTarget, TokenPurpose, VerificationToken};
use crate::services::email::{templates, EmailSender};
use crate::services::metrics::MetricsRegistry;

pub const OTP_MAX_ATTEMPTS: i32 = 5;
pub const DEFAULT_OTP_EXPIRY_MINUTES: i64 = 10;
const BEARER_BYTES: usize = 32;

/// Issues and checks one-time codes bound to a (subject-or-email, purpose) slot.
#[derive(Clone)]
pub struct OtpEngine {
    store: Arc<dyn TokenStore>,
    mailer: Arc<dyn EmailSender>,
    metrics: Option<Arc<MetricsRegistry>>,
    expiry_minutes: i64,
    max_attempts: i32,
}

impl OtpEngine {
    pub fn new(store: Arc<dyn TokenStore>, mailer: Arc<dyn EmailSender>) -> Self {
        Self {
            store,
            mailer,
            metrics: None,
            expiry_minutes: DEFAULT_OTP_EXPIRY_MINUTES,
            max_attempts: OTP_MAX_ATTEMPTS,
        }
    }

    pub fn with_expiry_minutes(mut self, minutes: i64) -> Self {
        self.expiry_minutes = minutes.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn expiry_minutes(&self) -> i64 {
        self.expiry_minutes
    }

    /// Issue a fresh code with the configured expiry, superseding any unused
    /// code in the same slot.
    pub async fn issue(&self, target: OtpTarget, purpose: TokenPurpose) -> Result<IssuedOtp, OtpError> {
        self.issue_with_expiry(target, purpose, self.expiry_minutes).await
    }

    pub async fn issue_with_expiry(
        &self,
        target: OtpTarget,
        purpose: TokenPurpose,
        expiry_minutes: i64,
    ) -> Result<IssuedOtp, OtpError> {
        let now = Utc::now();
        let code = generate_code();
        let bearer_token = generate_bearer();

        let token = VerificationToken {
            id: Uuid::new_v4().to_string(),
            subject: target.subject().cloned(),
            email: normalize_email(target.email()),
            purpose,
            bearer_hash: hash_bearer(&bearer_token),
            code: code.clone(),
            expires_at: now + Duration::minutes(expiry_minutes),
            attempts: 0,
            used: false,
            created_at: now,
        };

        self.store.insert_superseding(&token).await?;

        tracing::info!(
            token_id = %token.id,
            purpose = %purpose,
            subject = ?token.subject.as_ref().map(|s| s.to_string()),
            "verification code issued"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_otp_issued(purpose.as_str());
        }

        Ok(IssuedOtp {
            token_id: token.id,
            code,
            bearer_token,
            expires_at: token.expires_at,
        })
    }

    /// Issue a code and email it. A failed delivery deletes the new token so
    /// the caller can retry from a clean slate.
    pub async fn issue_and_send(
        &self,
        target: OtpTarget,
        purpose: TokenPurpose,
        recipient_name: Option<&str>,
    ) -> Result<IssuedOtp, OtpError> {
        let to = normalize_email(target.email());
        let issued = self.issue(target, purpose).await?;

        let email = templates::otp_email(&to, recipient_name, purpose, &issued.code, self.expiry_minutes);

        match self.mailer.send(&email).await {
            Ok(receipt) => {
                tracing::debug!(token_id = %issued.token_id, message_id = %receipt.message_id, "verification email sent");
                Ok(issued)
            }
            Err(e) => {
                tracing::warn!(token_id = %issued.token_id, error = %e, "verification email failed, rolling back token");
                if let Some(metrics) = &self.metrics {
                    metrics.record_email_failure(purpose.as_str());
                }
                if let Err(rollback) = self.store.delete(&issued.token_id).await {
                    tracing::error!(token_id = %issued.token_id, error = %rollback, "token rollback failed");
                }
                Err(OtpError::Delivery(e.to_string()))
            }
        }
    }

    pub async fn verify(
        &self,
        lookup: &OtpLookup,
        purpose: TokenPurpose,
        code: &str,
    ) -> Result<VerificationToken, OtpError> {
        self.verify_at(lookup, purpose, code, Utc::now()).await
    }

    /// Check `code` against the live token found by `lookup` as of `now`.
    ///
    /// The attempt counter moves only on a mismatch. The fifth mismatch
    /// deletes the token. A matching token is returned unconsumed; call
    /// [`OtpEngine::consume`] once the dependent account change is stored.
    pub async fn verify_at(
        &self,
        lookup: &OtpLookup,
        purpose: TokenPurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationToken, OtpError> {
        let result = self.check_code(lookup, purpose, code, now).await;
        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(_) => "accepted",
                Err(OtpError::NotFound) => "not_found",
                Err(OtpError::InvalidCode) => "invalid",
                Err(OtpError::AttemptsExhausted) => "exhausted",
                Err(_) => "error",
            };
            metrics.record_otp_verification(purpose.as_str(), outcome);
        }
        result
    }

    async fn check_code(
        &self,
        lookup: &OtpLookup,
        purpose: TokenPurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationToken, OtpError> {
        let token = match lookup {
            OtpLookup::Subject(subject) => {
                self.store.find_live_for_subject(subject, purpose, now).await?
            }
            OtpLookup::Bearer { token, email } => {
                self.store
                    .find_live_by_bearer(&hash_bearer(token), &normalize_email(email), purpose, now)
                    .await?
            }
        }
        .ok_or(OtpError::NotFound)?;

        if token.attempts >= self.max_attempts {
            self.store.delete(&token.id).await?;
            return Err(OtpError::AttemptsExhausted);
        }

        if !constant_time_eq::constant_time_eq(token.code.as_bytes(), code.trim().as_bytes()) {
            let attempts = self
                .store
                .increment_attempts(&token.id)
                .await?
                .ok_or(OtpError::NotFound)?;

            tracing::warn!(token_id = %token.id, attempts, "verification code mismatch");

            if attempts >= self.max_attempts {
                self.store.delete(&token.id).await?;
                return Err(OtpError::AttemptsExhausted);
            }
            return Err(OtpError::InvalidCode);
        }

        Ok(token)
    }

    /// Mark a verified token used. Calling it again is a no-op.
    pub async fn consume(&self, token_id: &str) -> Result<(), OtpError> {
        self.store.mark_used(token_id).await?;
        Ok(())
    }

    pub async fn sweep_expired(&self) -> Result<u64, OtpError> {
        Ok(self.store.delete_stale(Utc::now()).await?)
    }
}

fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

fn generate_bearer() -> String {
    let mut bytes = [0u8; BEARER_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_bearer(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
