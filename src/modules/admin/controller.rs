use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::schema::{AdminResponse, ChangeRoleRequest, SetActiveRequest};
use super::service::AdminService;
use crate::error::AppError;
use crate::extract::{AuthSession, ValidJson};
use crate::modules::auth::schema::AccountResponse;
use crate::modules::booking::schema::DashboardStatsResponse;
use crate::modules::booking::BookingStateMachine;
use crate::services::otp::SubjectKind;
use crate::AppState;

// =============================================================================
// GET /admin/admins
// =============================================================================

pub async fn list_admins(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<Json<Vec<AdminResponse>>, AppError> {
    let claims = session.require(SubjectKind::Admin)?;
    let admins = AdminService::new(state.accounts.as_ref())
        .list_admins(&claims.sub)
        .await?;

    Ok(Json(admins.into_iter().map(AdminResponse::from).collect()))
}

// =============================================================================
// PATCH /admin/admins/{id}/role, /admin/admins/{id}/status
// =============================================================================

pub async fn change_role(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<ChangeRoleRequest>,
) -> Result<Json<AdminResponse>, AppError> {
    let claims = session.require(SubjectKind::Admin)?;
    let admin = AdminService::new(state.accounts.as_ref())
        .change_role(&claims.sub, &id, req.role)
        .await?;

    Ok(Json(admin.into()))
}

pub async fn set_active(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<SetActiveRequest>,
) -> Result<Json<AdminResponse>, AppError> {
    let claims = session.require(SubjectKind::Admin)?;
    let admin = AdminService::new(state.accounts.as_ref())
        .set_active(&claims.sub, &id, req.is_active)
        .await?;

    Ok(Json(admin.into()))
}

// =============================================================================
// DELETE /admin/admins/{id}
// =============================================================================

pub async fn delete_admin(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let claims = session.require(SubjectKind::Admin)?;
    AdminService::new(state.accounts.as_ref())
        .delete_admin(&claims.sub, &id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// POST /admin/vendors/{id}/approve
// =============================================================================

pub async fn approve_vendor(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, AppError> {
    let claims = session.require(SubjectKind::Admin)?;
    let vendor = AdminService::new(state.accounts.as_ref())
        .approve_vendor(&claims.sub, &id)
        .await?;

    Ok(Json(AccountResponse::from(&vendor)))
}

// =============================================================================
// GET /admin/dashboard/stats
// =============================================================================

pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<Json<DashboardStatsResponse>, AppError> {
    let claims = session.require(SubjectKind::Admin)?;
    AdminService::new(state.accounts.as_ref())
        .acting_admin(&claims.sub)
        .await?;

    let counts = BookingStateMachine::new(state.bookings.as_ref())
        .status_counts()
        .await?;

    Ok(Json(counts.into()))
}
