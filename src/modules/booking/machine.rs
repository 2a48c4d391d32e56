use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidateUrl;

use super::interface::{ActorScope, BookingPatch, BookingRepository, TransitionRequest};
use super::model::{Booking, BookingStatus, PaymentStatus};
use crate::error::{AppError, StoreError};

pub const REJECTION_REASON_MIN: usize = 10;
pub const REJECTION_REASON_MAX: usize = 500;
pub const CANCELLATION_REASON_MAX: usize = 500;
pub const BOREWELL_RESULT_MAX: usize = 2000;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid time regex"));

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("Booking not found or already processed")]
    NotFoundOrAlreadyProcessed,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(msg) => AppError::Validation(msg),
            BookingError::NotFoundOrAlreadyProcessed => {
                AppError::NotFoundOrIllegalState(err.to_string())
            }
            BookingError::Forbidden(msg) => AppError::Forbidden(msg.to_string()),
            BookingError::Store(e) => AppError::Store(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;

/// Drives bookings through their lifecycle. Each operation checks its input
/// first and then issues exactly one conditional transition against storage.
pub struct BookingStateMachine<'a> {
    bookings: &'a dyn BookingRepository,
}

impl<'a> BookingStateMachine<'a> {
    pub fn new(bookings: &'a dyn BookingRepository) -> Self {
        Self { bookings }
    }

    async fn apply(&self, request: TransitionRequest) -> Result<Booking> {
        match self.bookings.transition(&request).await? {
            Some(booking) => {
                tracing::info!(
                    booking_id = %booking.id,
                    status = %booking.status,
                    "booking transitioned"
                );
                Ok(booking)
            }
            None => {
                tracing::debug!(
                    booking_id = %request.booking_id,
                    to = %request.to,
                    "booking transition matched nothing"
                );
                Err(BookingError::NotFoundOrAlreadyProcessed)
            }
        }
    }

    // =========================================================================
    // VENDOR OPERATIONS
    // =========================================================================

    pub async fn accept(&self, vendor_id: &str, booking_id: &str) -> Result<Booking> {
        self.apply(TransitionRequest::new(
            booking_id,
            ActorScope::Vendor(vendor_id.to_string()),
            &[BookingStatus::Pending],
            BookingStatus::Accepted,
        ))
        .await
    }

    pub async fn reject(&self, vendor_id: &str, booking_id: &str, reason: &str) -> Result<Booking> {
        let reason = reason.trim();
        let len = reason.chars().count();
        if !(REJECTION_REASON_MIN..=REJECTION_REASON_MAX).contains(&len) {
            return Err(BookingError::Validation(format!(
                "Rejection reason must be between {} and {} characters",
                REJECTION_REASON_MIN, REJECTION_REASON_MAX
            )));
        }

        let patch = BookingPatch {
            rejection_reason: Some(reason.to_string()),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::Vendor(vendor_id.to_string()),
                &[BookingStatus::Pending],
                BookingStatus::Rejected,
            )
            .with_patch(patch),
        )
        .await
    }

    pub async fn mark_visited(&self, vendor_id: &str, booking_id: &str) -> Result<Booking> {
        let patch = BookingPatch {
            visited_at: Some(Utc::now()),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::Vendor(vendor_id.to_string()),
                &[BookingStatus::Accepted],
                BookingStatus::Visited,
            )
            .with_patch(patch),
        )
        .await
    }

    /// Vendor shortcut from `VISITED` straight to `COMPLETED`; credits the
    /// vendor ledger.
    pub async fn mark_completed(&self, vendor_id: &str, booking_id: &str) -> Result<Booking> {
        let patch = BookingPatch {
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::Vendor(vendor_id.to_string()),
                &[BookingStatus::Visited],
                BookingStatus::Completed,
            )
            .with_patch(patch),
        )
        .await
    }

    /// Set the visit slot. A `PENDING` booking becomes `ACCEPTED`; an
    /// `ACCEPTED` one is rescheduled in place.
    pub async fn schedule_visit(
        &self,
        vendor_id: &str,
        booking_id: &str,
        date: &str,
        time: &str,
    ) -> Result<Booking> {
        let time = time.trim();
        if !TIME_RE.is_match(time) {
            return Err(BookingError::Validation(
                "Scheduled time must be in HH:MM format".into(),
            ));
        }
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
            BookingError::Validation("Scheduled date must be an ISO date (YYYY-MM-DD)".into())
        })?;

        let patch = BookingPatch {
            scheduled_date: Some(date),
            scheduled_time: Some(time.to_string()),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::Vendor(vendor_id.to_string()),
                &[BookingStatus::Pending, BookingStatus::Accepted],
                BookingStatus::Accepted,
            )
            .with_patch(patch),
        )
        .await
    }

    pub async fn upload_report(&self, vendor_id: &str, booking_id: &str, report_url: &str) -> Result<Booking> {
        let report_url = report_url.trim();
        let scheme_ok = report_url.starts_with("https://") || report_url.starts_with("http://");
        if !scheme_ok || !report_url.validate_url() {
            return Err(BookingError::Validation(
                "Report URL must be a valid http(s) URL".into(),
            ));
        }

        let patch = BookingPatch {
            report_url: Some(report_url.to_string()),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::Vendor(vendor_id.to_string()),
                &[BookingStatus::Visited],
                BookingStatus::ReportUploaded,
            )
            .with_patch(patch),
        )
        .await
    }

    pub async fn upload_borewell_result(
        &self,
        vendor_id: &str,
        booking_id: &str,
        result: &str,
    ) -> Result<Booking> {
        let result = result.trim();
        let len = result.chars().count();
        if len == 0 || len > BOREWELL_RESULT_MAX {
            return Err(BookingError::Validation(format!(
                "Borewell result must be between 1 and {} characters",
                BOREWELL_RESULT_MAX
            )));
        }

        let patch = BookingPatch {
            borewell_result: Some(result.to_string()),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::Vendor(vendor_id.to_string()),
                &[BookingStatus::PaymentSuccess],
                BookingStatus::BorewellUploaded,
            )
            .with_patch(patch),
        )
        .await
    }

    // =========================================================================
    // USER OPERATIONS
    // =========================================================================

    pub async fn confirm_payment(&self, user_id: &str, booking_id: &str) -> Result<Booking> {
        let patch = BookingPatch {
            payment_status: Some(PaymentStatus::Success),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::User(user_id.to_string()),
                &[BookingStatus::AwaitingPayment],
                BookingStatus::PaymentSuccess,
            )
            .with_patch(patch),
        )
        .await
    }

    /// Cancel from any non-terminal state. Only the booking's user or an
    /// admin may cancel.
    pub async fn cancel(&self, actor: ActorScope, booking_id: &str, reason: Option<&str>) -> Result<Booking> {
        if matches!(actor, ActorScope::Vendor(_)) {
            return Err(BookingError::Forbidden("Vendors cannot cancel bookings"));
        }

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if let Some(reason) = reason {
            if reason.chars().count() > CANCELLATION_REASON_MAX {
                return Err(BookingError::Validation(format!(
                    "Cancellation reason must be at most {} characters",
                    CANCELLATION_REASON_MAX
                )));
            }
        }

        let patch = BookingPatch {
            cancellation_reason: reason.map(str::to_string),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                actor,
                &BookingStatus::non_terminal(),
                BookingStatus::Cancelled,
            )
            .with_patch(patch),
        )
        .await
    }

    // =========================================================================
    // ADMIN OPERATIONS
    // =========================================================================

    pub async fn request_payment(&self, booking_id: &str, amount: Decimal) -> Result<Booking> {
        if amount <= Decimal::ZERO {
            return Err(BookingError::Validation(
                "Payment amount must be greater than zero".into(),
            ));
        }

        let patch = BookingPatch {
            payment_amount: Some(amount),
            payment_status: Some(PaymentStatus::Pending),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::Admin,
                &[BookingStatus::ReportUploaded],
                BookingStatus::AwaitingPayment,
            )
            .with_patch(patch),
        )
        .await
    }

    pub async fn admin_approve(&self, booking_id: &str) -> Result<Booking> {
        let patch = BookingPatch {
            approved_at: Some(Utc::now()),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::Admin,
                &[BookingStatus::BorewellUploaded],
                BookingStatus::AdminApproved,
            )
            .with_patch(patch),
        )
        .await
    }

    pub async fn final_settlement(&self, booking_id: &str) -> Result<Booking> {
        self.apply(TransitionRequest::new(
            booking_id,
            ActorScope::Admin,
            &[BookingStatus::AdminApproved],
            BookingStatus::FinalSettlement,
        ))
        .await
    }

    /// Close a settled booking; credits the vendor ledger.
    pub async fn settle(&self, booking_id: &str) -> Result<Booking> {
        let patch = BookingPatch {
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        self.apply(
            TransitionRequest::new(
                booking_id,
                ActorScope::Admin,
                &[BookingStatus::FinalSettlement],
                BookingStatus::Completed,
            )
            .with_patch(patch),
        )
        .await
    }

    // =========================================================================
    // DASHBOARD
    // =========================================================================

    /// Count per status, with every status present (zero when unused).
    pub async fn status_counts(&self) -> Result<Vec<(BookingStatus, i64)>> {
        let stored = self.bookings.status_counts().await?;
        Ok(BookingStatus::ALL
            .into_iter()
            .map(|status| {
                let count = stored
                    .iter()
                    .filter(|(s, _)| *s == status)
                    .map(|(_, c)| *c)
                    .sum();
                (status, count)
            })
            .collect())
    }
}
