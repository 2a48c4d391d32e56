use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, ParseEnumError};
use crate::services::otp::{SubjectKind, SubjectRef};

// =============================================================================
// ROLES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "ADMIN" => Ok(Self::Admin),
            other => Err(ParseEnumError::new("admin role", other)),
        }
    }
}

impl TryFrom<String> for AdminRole {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

pub const USER_ROLE: &str = "USER";
pub const VENDOR_ROLE: &str = "VENDOR";

// =============================================================================
// ACCOUNTS
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub is_approved: bool,
    pub total_earnings: Decimal,
    pub collected_amount: Decimal,
    pub pending_amount: Decimal,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: AdminRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    pub fn is_super_admin(&self) -> bool {
        self.role == AdminRole::SuperAdmin
    }
}

/// Running payment-collection totals kept per vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VendorLedger {
    pub total_earnings: Decimal,
    pub collected_amount: Decimal,
    pub pending_amount: Decimal,
}

impl Vendor {
    /// Record a completed booking's amount. `collected` is true when the
    /// customer payment already succeeded.
    pub fn credit(&mut self, amount: Decimal, collected: bool) {
        self.total_earnings += amount;
        if collected {
            self.collected_amount += amount;
        } else {
            self.pending_amount += amount;
        }
    }

    pub fn ledger(&self) -> VendorLedger {
        VendorLedger {
            total_earnings: self.total_earnings,
            collected_amount: self.collected_amount,
            pending_amount: self.pending_amount,
        }
    }
}

/// Any of the three account collections.
#[derive(Debug, Clone)]
pub enum Account {
    User(User),
    Vendor(Vendor),
    Admin(Admin),
}

impl Account {
    pub fn kind(&self) -> SubjectKind {
        match self {
            Self::User(_) => SubjectKind::User,
            Self::Vendor(_) => SubjectKind::Vendor,
            Self::Admin(_) => SubjectKind::Admin,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::User(u) => &u.id,
            Self::Vendor(v) => &v.id,
            Self::Admin(a) => &a.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::User(u) => &u.name,
            Self::Vendor(v) => &v.name,
            Self::Admin(a) => &a.name,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Self::User(u) => &u.email,
            Self::Vendor(v) => &v.email,
            Self::Admin(a) => &a.email,
        }
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            Self::User(u) => Some(&u.phone),
            Self::Vendor(v) => Some(&v.phone),
            Self::Admin(_) => None,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Self::User(u) => &u.password_hash,
            Self::Vendor(v) => &v.password_hash,
            Self::Admin(a) => &a.password_hash,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::User(_) => USER_ROLE,
            Self::Vendor(_) => VENDOR_ROLE,
            Self::Admin(a) => a.role.as_str(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::User(u) => u.is_active,
            Self::Vendor(v) => v.is_active,
            Self::Admin(a) => a.is_active,
        }
    }

    pub fn is_email_verified(&self) -> bool {
        match self {
            Self::User(u) => u.is_email_verified,
            Self::Vendor(v) => v.is_email_verified,
            Self::Admin(_) => true,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::User(u) => u.created_at,
            Self::Vendor(v) => v.created_at,
            Self::Admin(a) => a.created_at,
        }
    }

    pub fn subject(&self) -> SubjectRef {
        SubjectRef::new(self.kind(), self.id())
    }

    /// Login gate applied after the password check.
    pub fn ensure_can_login(&self) -> Result<(), AppError> {
        if !self.is_active() {
            return Err(AppError::Forbidden("Account is deactivated".into()));
        }
        match self {
            Self::Vendor(v) if !v.is_email_verified => {
                Err(AppError::Forbidden("Email address is not verified".into()))
            }
            Self::Vendor(v) if !v.is_approved => {
                Err(AppError::Forbidden("Vendor account is awaiting admin approval".into()))
            }
            Self::User(u) if !u.is_email_verified => {
                Err(AppError::Forbidden("Email address is not verified".into()))
            }
            _ => Ok(()),
        }
    }
}
