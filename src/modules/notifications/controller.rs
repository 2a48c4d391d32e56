use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::schema::{DeviceTokenResponse, RegisterDeviceRequest};
use crate::error::AppError;
use crate::extract::{AuthSession, ValidJson};
use crate::services::push::MAX_DEVICES_PER_SUBJECT;
use crate::AppState;

// =============================================================================
// POST /notifications/device-tokens
// =============================================================================

pub async fn register_device(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    ValidJson(req): ValidJson<RegisterDeviceRequest>,
) -> Result<StatusCode, AppError> {
    let account = session
        .require_active(state.accounts.as_ref(), session.claims().kind)
        .await?;
    let subject = account.subject();

    state
        .device_tokens
        .upsert(&subject, req.device_token.trim(), req.platform)
        .await?;
    let pruned = state
        .device_tokens
        .prune(&subject, MAX_DEVICES_PER_SUBJECT)
        .await?;
    if pruned > 0 {
        tracing::debug!(%subject, pruned, "pruned stale device tokens");
    }

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// GET /notifications/device-tokens
// =============================================================================

pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<Json<Vec<DeviceTokenResponse>>, AppError> {
    let tokens = state
        .device_tokens
        .tokens_for(&session.claims().subject())
        .await?;

    Ok(Json(tokens.into_iter().map(DeviceTokenResponse::from).collect()))
}
