use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::model::Account;
use crate::services::jwt::TokenPair;
use crate::services::otp::SubjectKind;

pub static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("phone regex is valid"));

pub static OTP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("otp regex is valid"));

// =============================================================================
// REGISTRATION
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterStartRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number"))]
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterStartResponse {
    pub message: &'static str,
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterCompleteRequest {
    pub verification_token: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(regex(path = *OTP_RE, message = "OTP must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    #[validate(regex(path = *PHONE_RE, message = "Invalid phone number"))]
    pub phone: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminRegisterStartRequest {
    pub registration_code: String,
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminRegisterCompleteRequest {
    pub verification_token: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(regex(path = *OTP_RE, message = "OTP must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterCompleteResponse {
    pub account: AccountResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

// =============================================================================
// LOGIN / SESSION
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl From<TokenPair> for SessionResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub account: AccountResponse,
    pub session: SessionResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// =============================================================================
// PASSWORD RESET
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(regex(path = *OTP_RE, message = "OTP must be 6 digits"))]
    pub otp: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// ACCOUNT VIEW
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub kind: SubjectKind,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: &'static str,
    pub is_active: bool,
    pub is_email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id().to_string(),
            kind: account.kind(),
            name: account.name().to_string(),
            email: account.email().to_string(),
            phone: account.phone().map(str::to_string),
            role: account.role(),
            is_active: account.is_active(),
            is_email_verified: account.is_email_verified(),
            is_approved: match account {
                Account::Vendor(v) => Some(v.is_approved),
                _ => None,
            },
            created_at: account.created_at(),
        }
    }
}
