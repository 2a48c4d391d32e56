use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::interface::AccountRepository;
use super::model::{Account, Admin, AdminRole, User, Vendor};
use crate::error::{AppError, StoreError};
use crate::services::hashing;
use crate::services::jwt::{Claims, JwtService, SessionClaims, TokenPair};
use crate::services::otp::{
    normalize_email, IssuedOtp, OtpEngine, OtpError, OtpLookup, OtpTarget, SubjectKind,
    TokenPurpose,
};

/// New-account details collected on registration completion.
pub struct NewAccount<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub password: &'a str,
}

pub struct RegistrationOutcome {
    pub account: Account,
    pub session: Option<TokenPair>,
}

pub struct LoginOutcome {
    pub account: Account,
    pub session: TokenPair,
}

/// Registration, login and password-reset flows shared by all account kinds.
pub struct AccountService<'a> {
    accounts: &'a dyn AccountRepository,
    otp: &'a OtpEngine,
    jwt: &'a JwtService,
}

impl<'a> AccountService<'a> {
    pub fn new(accounts: &'a dyn AccountRepository, otp: &'a OtpEngine, jwt: &'a JwtService) -> Self {
        Self { accounts, otp, jwt }
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Email a verification code to a not-yet-registered address.
    pub async fn start_registration(
        &self,
        kind: SubjectKind,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<IssuedOtp, AppError> {
        let email = normalize_email(email);
        self.ensure_unregistered(kind, &email, phone).await?;

        let purpose = registration_purpose(kind);
        Ok(self
            .otp
            .issue_and_send(OtpTarget::Email(email), purpose, Some(name))
            .await?)
    }

    /// Check the emailed code, create the account and consume the code.
    ///
    /// Users get a session straight away. Vendors wait for admin approval.
    /// The first admin ever registered becomes `SUPER_ADMIN`.
    pub async fn complete_registration(
        &self,
        kind: SubjectKind,
        verification_token: &str,
        otp: &str,
        details: NewAccount<'_>,
    ) -> Result<RegistrationOutcome, AppError> {
        let email = normalize_email(details.email);
        let purpose = registration_purpose(kind);

        let lookup = OtpLookup::Bearer {
            token: verification_token.to_string(),
            email: email.clone(),
        };
        let token = self.otp.verify(&lookup, purpose, otp).await?;

        self.ensure_unregistered(kind, &email, details.phone).await?;

        let password_hash = hash(details.password)?;
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let phone = details.phone.unwrap_or_default().to_string();

        let account = match kind {
            SubjectKind::User => Account::User(User {
                id,
                name: details.name.trim().to_string(),
                email,
                phone,
                password_hash,
                is_active: true,
                is_email_verified: true,
                last_login_at: None,
                created_at: now,
                updated_at: now,
            }),
            SubjectKind::Vendor => Account::Vendor(Vendor {
                id,
                name: details.name.trim().to_string(),
                email,
                phone,
                password_hash,
                is_active: true,
                is_email_verified: true,
                is_approved: false,
                total_earnings: Decimal::ZERO,
                collected_amount: Decimal::ZERO,
                pending_amount: Decimal::ZERO,
                last_login_at: None,
                created_at: now,
                updated_at: now,
            }),
            SubjectKind::Admin => {
                let role = if self.accounts.count_admins().await? == 0 {
                    AdminRole::SuperAdmin
                } else {
                    AdminRole::Admin
                };
                Account::Admin(Admin {
                    id,
                    name: details.name.trim().to_string(),
                    email,
                    password_hash,
                    role,
                    is_active: true,
                    last_login_at: None,
                    created_at: now,
                    updated_at: now,
                })
            }
        };

        match self.accounts.create(&account).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(AppError::Conflict("Email or phone already registered".into()))
            }
            Err(e) => return Err(e.into()),
        }

        self.otp.consume(&token.id).await?;

        tracing::info!(kind = %kind, account_id = %account.id(), role = account.role(), "account registered");

        let session = match &account {
            Account::Vendor(_) => None,
            _ => Some(self.issue_session(&account)?),
        };

        Ok(RegistrationOutcome { account, session })
    }

    // =========================================================================
    // LOGIN / SESSION
    // =========================================================================

    pub async fn login(
        &self,
        kind: SubjectKind,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, AppError> {
        let invalid = || AppError::Unauthorized("Invalid email or password".into());

        let account = self
            .accounts
            .find_by_email(kind, &normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        let is_valid = hashing::verify_password(password, account.password_hash())
            .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))?;
        if !is_valid {
            return Err(invalid());
        }

        account.ensure_can_login()?;

        self.accounts
            .touch_last_login(kind, account.id(), Utc::now())
            .await?;

        let session = self.issue_session(&account)?;
        tracing::info!(kind = %kind, account_id = %account.id(), "login succeeded");

        Ok(LoginOutcome { account, session })
    }

    /// Trade a refresh token for a new pair. The account is re-read so a
    /// deactivated or unapproved account cannot keep refreshing.
    pub async fn refresh(&self, refresh_token: &str) -> Result<LoginOutcome, AppError> {
        let claims = self.jwt.verify_refresh(refresh_token)?;
        let account = self.current_account(&claims).await?;
        account.ensure_can_login()?;

        let session = self.issue_session(&account)?;
        Ok(LoginOutcome { account, session })
    }

    pub async fn current_account(&self, claims: &Claims) -> Result<Account, AppError> {
        self.accounts
            .find_by_id(claims.kind, &claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))
    }

    pub fn issue_session(&self, account: &Account) -> Result<TokenPair, AppError> {
        Ok(self.jwt.issue(&SessionClaims {
            subject: account.subject(),
            email: account.email().to_string(),
            role: account.role().to_string(),
        })?)
    }

    // =========================================================================
    // PASSWORD RESET
    // =========================================================================

    /// Send a reset code if the account exists. The outcome is deliberately
    /// invisible to the caller so the endpoint cannot be used to discover registered emails.
    pub async fn forgot_password(&self, kind: SubjectKind, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);

        let Some(account) = self.accounts.find_by_email(kind, &email).await? else {
            tracing::debug!(kind = %kind, "password reset requested for unknown email");
            return Ok(());
        };

        if !account.is_active() {
            tracing::debug!(kind = %kind, account_id = %account.id(), "password reset requested for inactive account");
            return Ok(());
        }

        let target = OtpTarget::Subject {
            subject: account.subject(),
            email,
        };

        if let Err(e) = self
            .otp
            .issue_and_send(target, TokenPurpose::PasswordReset, Some(account.name()))
            .await
        {
            tracing::warn!(kind = %kind, account_id = %account.id(), error = %e, "password reset code not delivered");
        }

        Ok(())
    }

    pub async fn reset_password(
        &self,
        kind: SubjectKind,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let account = self
            .accounts
            .find_by_email(kind, &normalize_email(email))
            .await?
            .ok_or(OtpError::NotFound)?;

        let token = self
            .otp
            .verify(&OtpLookup::Subject(account.subject()), TokenPurpose::PasswordReset, otp)
            .await?;

        let password_hash = hash(new_password)?;
        self.accounts
            .update_password(kind, account.id(), &password_hash)
            .await?;

        self.otp.consume(&token.id).await?;
        tracing::info!(kind = %kind, account_id = %account.id(), "password reset");

        Ok(())
    }

    async fn ensure_unregistered(
        &self,
        kind: SubjectKind,
        email: &str,
        phone: Option<&str>,
    ) -> Result<(), AppError> {
        if self.accounts.email_exists(kind, email).await? {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        if let Some(phone) = phone {
            if self.accounts.phone_exists(kind, phone).await? {
                return Err(AppError::Conflict("Phone number already registered".into()));
            }
        }
        Ok(())
    }
}

/// Password confirmation and strength checks shared by registration and reset.
pub fn check_new_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password != confirm {
        return Err(AppError::Validation("Passwords do not match".into()));
    }
    hashing::check_password_policy(password).map_err(|e| AppError::Validation(e.into()))
}

fn registration_purpose(kind: SubjectKind) -> TokenPurpose {
    match kind {
        SubjectKind::Admin => TokenPurpose::AdminRegistration,
        SubjectKind::User | SubjectKind::Vendor => TokenPurpose::EmailVerification,
    }
}

fn hash(password: &str) -> Result<String, AppError> {
    hashing::hash_password(password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}
