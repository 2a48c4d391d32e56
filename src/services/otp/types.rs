use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ParseEnumError, StoreError};

// =============================================================================
// SUBJECT
// =============================================================================

/// The three account collections a token or session can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    User,
    Vendor,
    Admin,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Vendor => "vendor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "vendor" => Ok(Self::Vendor),
            "admin" => Ok(Self::Admin),
            other => Err(ParseEnumError::new("subject kind", other)),
        }
    }
}

/// Reference to an existing account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub kind: SubjectKind,
    pub id: String,
}

impl SubjectRef {
    pub fn new(kind: SubjectKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// =============================================================================
// PURPOSE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenPurpose {
    PasswordReset,
    EmailVerification,
    AdminRegistration,
    PhoneVerification,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PasswordReset => "PASSWORD_RESET",
            Self::EmailVerification => "EMAIL_VERIFICATION",
            Self::AdminRegistration => "ADMIN_REGISTRATION",
            Self::PhoneVerification => "PHONE_VERIFICATION",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenPurpose {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASSWORD_RESET" => Ok(Self::PasswordReset),
            "EMAIL_VERIFICATION" => Ok(Self::EmailVerification),
            "ADMIN_REGISTRATION" => Ok(Self::AdminRegistration),
            "PHONE_VERIFICATION" => Ok(Self::PhoneVerification),
            other => Err(ParseEnumError::new("token purpose", other)),
        }
    }
}

// =============================================================================
// TOKEN RECORD
// =============================================================================

/// A stored one-time code. `bearer_hash` is the SHA-256 of the opaque bearer
/// string handed to pre-account clients; the plaintext is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationToken {
    pub id: String,
    pub subject: Option<SubjectRef>,
    pub email: String,
    pub purpose: TokenPurpose,
    pub bearer_hash: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    /// Unused and strictly before its expiry instant.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }

    /// Whether `other` competes for the same (subject-or-email, purpose) slot.
    pub fn shares_scope_with(&self, other: &VerificationToken) -> bool {
        if self.purpose != other.purpose {
            return false;
        }
        match (&self.subject, &other.subject) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.email == other.email,
            _ => false,
        }
    }
}

// =============================================================================
// ENGINE INPUTS / OUTPUTS
// =============================================================================

/// Who a code is being issued for.
#[derive(Debug, Clone)]
pub enum OtpTarget {
    /// An existing account; the email is where the code is delivered.
    Subject { subject: SubjectRef, email: String },
    /// No account yet; scoped by email and the returned bearer token.
    Email(String),
}

impl OtpTarget {
    pub fn email(&self) -> &str {
        match self {
            Self::Subject { email, .. } => email,
            Self::Email(email) => email,
        }
    }

    pub fn subject(&self) -> Option<&SubjectRef> {
        match self {
            Self::Subject { subject, .. } => Some(subject),
            Self::Email(_) => None,
        }
    }
}

/// How a verify call finds its token.
#[derive(Debug, Clone)]
pub enum OtpLookup {
    Subject(SubjectRef),
    Bearer { token: String, email: String },
}

#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub token_id: String,
    pub code: String,
    pub bearer_token: String,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Invalid or expired OTP")]
    NotFound,

    #[error("Invalid or expired OTP")]
    InvalidCode,

    #[error("Max OTP attempts exceeded")]
    AttemptsExhausted,

    #[error("Failed to deliver verification email: {0}")]
    Delivery(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<OtpError> for crate::error::AppError {
    fn from(err: OtpError) -> Self {
        use crate::error::AppError;
        match err {
            OtpError::NotFound | OtpError::InvalidCode => AppError::Validation(err.to_string()),
            OtpError::AttemptsExhausted => AppError::AttemptsExhausted,
            OtpError::Delivery(msg) => {
                AppError::Unavailable(format!("Could not send verification email: {}", msg))
            }
            OtpError::Store(e) => AppError::Store(e),
        }
    }
}
