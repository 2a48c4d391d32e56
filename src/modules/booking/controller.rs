use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::interface::ActorScope;
use super::machine::BookingStateMachine;
use super::model::Booking;
use super::schema::{
    BorewellResultRequest, CancelBookingRequest, RejectBookingRequest, RequestPaymentRequest,
    ScheduleVisitRequest, UploadReportRequest,
};
use crate::error::AppError;
use crate::extract::{AuthSession, ValidJson};
use crate::services::otp::SubjectKind;
use crate::AppState;

type BookingResult = Result<Json<Booking>, AppError>;

fn respond(state: &AppState, result: super::machine::Result<Booking>) -> BookingResult {
    let booking = result?;
    state.metrics.record_booking_transition(booking.status.as_str());
    Ok(Json(booking))
}

// =============================================================================
// VENDOR: POST /bookings/{id}/...
// =============================================================================

pub async fn accept(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> BookingResult {
    let vendor = session.require_active(state.accounts.as_ref(), SubjectKind::Vendor).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.accept(vendor.id(), &id).await)
}

pub async fn reject(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<RejectBookingRequest>,
) -> BookingResult {
    let vendor = session.require_active(state.accounts.as_ref(), SubjectKind::Vendor).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.reject(vendor.id(), &id, &req.reason).await)
}

pub async fn mark_visited(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> BookingResult {
    let vendor = session.require_active(state.accounts.as_ref(), SubjectKind::Vendor).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.mark_visited(vendor.id(), &id).await)
}

pub async fn mark_completed(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> BookingResult {
    let vendor = session.require_active(state.accounts.as_ref(), SubjectKind::Vendor).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.mark_completed(vendor.id(), &id).await)
}

pub async fn schedule_visit(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<ScheduleVisitRequest>,
) -> BookingResult {
    let vendor = session.require_active(state.accounts.as_ref(), SubjectKind::Vendor).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(
        &state,
        machine
            .schedule_visit(vendor.id(), &id, &req.scheduled_date, &req.scheduled_time)
            .await,
    )
}

pub async fn upload_report(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UploadReportRequest>,
) -> BookingResult {
    let vendor = session.require_active(state.accounts.as_ref(), SubjectKind::Vendor).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.upload_report(vendor.id(), &id, &req.report_url).await)
}

pub async fn upload_borewell_result(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<BorewellResultRequest>,
) -> BookingResult {
    let vendor = session.require_active(state.accounts.as_ref(), SubjectKind::Vendor).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(
        &state,
        machine.upload_borewell_result(vendor.id(), &id, &req.result).await,
    )
}

// =============================================================================
// USER / ADMIN: POST /bookings/{id}/confirm-payment, /cancel
// =============================================================================

pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> BookingResult {
    let user = session.require_active(state.accounts.as_ref(), SubjectKind::User).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.confirm_payment(user.id(), &id).await)
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<CancelBookingRequest>,
) -> BookingResult {
    let kind = session.claims().kind;
    let actor = match kind {
        SubjectKind::User => {
            let user = session.require_active(state.accounts.as_ref(), kind).await?;
            ActorScope::User(user.id().to_string())
        }
        SubjectKind::Admin => {
            session.require_active(state.accounts.as_ref(), kind).await?;
            ActorScope::Admin
        }
        SubjectKind::Vendor => ActorScope::Vendor(session.claims().sub.clone()),
    };

    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.cancel(actor, &id, req.reason.as_deref()).await)
}

// =============================================================================
// ADMIN: POST /admin/bookings/{id}/...
// =============================================================================

pub async fn request_payment(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<RequestPaymentRequest>,
) -> BookingResult {
    session.require_active(state.accounts.as_ref(), SubjectKind::Admin).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.request_payment(&id, req.amount).await)
}

pub async fn admin_approve(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> BookingResult {
    session.require_active(state.accounts.as_ref(), SubjectKind::Admin).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.admin_approve(&id).await)
}

pub async fn final_settlement(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> BookingResult {
    session.require_active(state.accounts.as_ref(), SubjectKind::Admin).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.final_settlement(&id).await)
}

pub async fn settle(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<String>,
) -> BookingResult {
    session.require_active(state.accounts.as_ref(), SubjectKind::Admin).await?;
    let machine = BookingStateMachine::new(state.bookings.as_ref());
    respond(&state, machine.settle(&id).await)
}
