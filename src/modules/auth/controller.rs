use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::schema::{
    AccountResponse, AdminRegisterCompleteRequest, AdminRegisterStartRequest,
    ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RefreshTokenRequest,
    RegisterCompleteRequest, RegisterCompleteResponse, RegisterStartRequest,
    RegisterStartResponse, ResetPasswordRequest,
};
use super::service::{check_new_password, AccountService, NewAccount, RegistrationOutcome};
use crate::error::AppError;
use crate::extract::{AuthSession, ValidJson};
use crate::services::otp::{IssuedOtp, SubjectKind};
use crate::AppState;

fn service(state: &AppState) -> AccountService<'_> {
    AccountService::new(state.accounts.as_ref(), &state.otp, &state.jwt_service)
}

fn account_kind(raw: &str) -> Result<SubjectKind, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFoundOrIllegalState(format!("Unknown account type '{}'", raw)))
}

/// Users and vendors self-register; admins go through the code-gated routes.
fn self_service_kind(raw: &str) -> Result<SubjectKind, AppError> {
    match account_kind(raw)? {
        SubjectKind::Admin => Err(AppError::NotFoundOrIllegalState(
            "Admins register through /auth/admin/register".into(),
        )),
        kind => Ok(kind),
    }
}

fn started(issued: IssuedOtp) -> (StatusCode, Json<RegisterStartResponse>) {
    (
        StatusCode::OK,
        Json(RegisterStartResponse {
            message: "Verification code sent",
            verification_token: issued.bearer_token,
            expires_at: issued.expires_at,
        }),
    )
}

fn registered(outcome: RegistrationOutcome) -> (StatusCode, Json<RegisterCompleteResponse>) {
    let message = match outcome.session {
        None => Some("Registration complete. Your account is pending admin approval"),
        Some(_) => None,
    };
    (
        StatusCode::CREATED,
        Json(RegisterCompleteResponse {
            account: AccountResponse::from(&outcome.account),
            session: outcome.session.map(Into::into),
            message,
        }),
    )
}

// =============================================================================
// POST /auth/{kind}/register/start, /auth/{kind}/register/complete
// =============================================================================

pub async fn register_start(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    ValidJson(req): ValidJson<RegisterStartRequest>,
) -> Result<(StatusCode, Json<RegisterStartResponse>), AppError> {
    let kind = self_service_kind(&kind)?;
    let issued = service(&state)
        .start_registration(kind, &req.name, &req.email, Some(&req.phone))
        .await?;

    Ok(started(issued))
}

pub async fn register_complete(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    ValidJson(req): ValidJson<RegisterCompleteRequest>,
) -> Result<(StatusCode, Json<RegisterCompleteResponse>), AppError> {
    let kind = self_service_kind(&kind)?;
    check_new_password(&req.password, &req.password_confirm)?;

    let outcome = service(&state)
        .complete_registration(
            kind,
            &req.verification_token,
            &req.otp,
            NewAccount {
                name: &req.name,
                email: &req.email,
                phone: Some(&req.phone),
                password: &req.password,
            },
        )
        .await?;

    Ok(registered(outcome))
}

// =============================================================================
// POST /auth/admin/register/start, /auth/admin/register/complete
// =============================================================================

pub async fn admin_register_start(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<AdminRegisterStartRequest>,
) -> Result<(StatusCode, Json<RegisterStartResponse>), AppError> {
    let Some(expected) = state.settings.admin_registration_code.as_deref() else {
        return Err(AppError::Forbidden("Admin registration is disabled".into()));
    };
    if !constant_time_eq::constant_time_eq(
        expected.as_bytes(),
        req.registration_code.trim().as_bytes(),
    ) {
        tracing::warn!("admin registration attempted with a wrong code");
        return Err(AppError::Forbidden("Invalid registration code".into()));
    }

    let issued = service(&state)
        .start_registration(SubjectKind::Admin, &req.name, &req.email, None)
        .await?;

    Ok(started(issued))
}

pub async fn admin_register_complete(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<AdminRegisterCompleteRequest>,
) -> Result<(StatusCode, Json<RegisterCompleteResponse>), AppError> {
    check_new_password(&req.password, &req.password_confirm)?;

    let outcome = service(&state)
        .complete_registration(
            SubjectKind::Admin,
            &req.verification_token,
            &req.otp,
            NewAccount {
                name: &req.name,
                email: &req.email,
                phone: None,
                password: &req.password,
            },
        )
        .await?;

    Ok(registered(outcome))
}

// =============================================================================
// POST /auth/{kind}/login
// =============================================================================

pub async fn login(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let kind = account_kind(&kind)?;
    let outcome = service(&state).login(kind, &req.email, &req.password).await?;

    Ok(Json(LoginResponse {
        account: AccountResponse::from(&outcome.account),
        session: outcome.session.into(),
    }))
}

// =============================================================================
// POST /auth/refresh, /auth/logout, GET /auth/me
// =============================================================================

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let outcome = service(&state).refresh(&req.refresh_token).await?;

    Ok(Json(LoginResponse {
        account: AccountResponse::from(&outcome.account),
        session: outcome.session.into(),
    }))
}

/// Sessions are stateless; the client discards its tokens.
pub async fn logout(session: AuthSession) -> Json<MessageResponse> {
    tracing::debug!(subject = %session.claims().subject(), "logout");
    Json(MessageResponse {
        message: "Logged out",
    })
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<Json<AccountResponse>, AppError> {
    let account = service(&state).current_account(session.claims()).await?;
    Ok(Json(AccountResponse::from(&account)))
}

// =============================================================================
// POST /auth/{kind}/forgot-password, /auth/{kind}/reset-password
// =============================================================================

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let kind = account_kind(&kind)?;
    service(&state).forgot_password(kind, &req.email).await?;

    Ok(Json(MessageResponse {
        message: "If an account exists for this email, a reset code has been sent",
    }))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let kind = account_kind(&kind)?;
    check_new_password(&req.password, &req.password_confirm)?;

    service(&state)
        .reset_password(kind, &req.email, &req.otp, &req.password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset",
    }))
}
