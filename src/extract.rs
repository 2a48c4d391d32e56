use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;
use crate::modules::auth::{Account, AccountRepository};
use crate::services::jwt::Claims;
use crate::services::otp::SubjectKind;
use crate::AppState;

/// JSON body that has passed its `validator` rules.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        value.validate()?;
        Ok(Self(value))
    }
}

/// Verified access-token claims from the `Authorization: Bearer` header.
///
/// Only the signature and expiry are checked here. Handlers that depend on
/// the account still being active re-read it from storage.
pub struct AuthSession(pub Claims);

impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".into()))?;

        let claims = state.jwt_service.verify_access(token)?;
        Ok(Self(claims))
    }
}

impl AuthSession {
    pub fn require(&self, kind: SubjectKind) -> Result<&Claims, AppError> {
        if self.0.kind != kind {
            return Err(AppError::Forbidden(format!("{} access required", kind)));
        }
        Ok(&self.0)
    }

    /// [`require`](Self::require) plus a fresh read of the account. Holders
    /// of a still-valid token whose account was deleted, deactivated or (for
    /// vendors) unapproved are refused.
    pub async fn require_active(
        &self,
        accounts: &dyn AccountRepository,
        kind: SubjectKind,
    ) -> Result<Account, AppError> {
        let claims = self.require(kind)?;
        let account = accounts
            .find_by_id(kind, &claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?;

        account.ensure_can_login()?;
        Ok(account)
    }

    pub fn claims(&self) -> &Claims {
        &self.0
    }
}
