use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::model::{Booking, BookingStatus, PaymentStatus};
use crate::error::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

// =============================================================================
// TRANSITION REQUEST
// =============================================================================

/// Who is driving a transition. Vendors and users only match bookings they
/// are attached to; admins match any booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorScope {
    Vendor(String),
    User(String),
    Admin,
}

impl ActorScope {
    pub fn permits(&self, booking: &Booking) -> bool {
        match self {
            ActorScope::Vendor(id) => booking.vendor_id.as_deref() == Some(id.as_str()),
            ActorScope::User(id) => booking.user_id == *id,
            ActorScope::Admin => true,
        }
    }
}

/// Columns written alongside the status change. `None` leaves a column as is.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    pub payment_amount: Option<Decimal>,
    pub payment_status: Option<PaymentStatus>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub report_url: Option<String>,
    pub borewell_result: Option<String>,
    pub visited_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl BookingPatch {
    pub fn apply_to(&self, booking: &mut Booking) {
        if let Some(date) = self.scheduled_date {
            booking.scheduled_date = Some(date);
        }
        if let Some(time) = &self.scheduled_time {
            booking.scheduled_time = Some(time.clone());
        }
        if let Some(amount) = self.payment_amount {
            booking.payment_amount = amount;
        }
        if let Some(status) = self.payment_status {
            booking.payment_status = status;
        }
        if let Some(reason) = &self.rejection_reason {
            booking.rejection_reason = Some(reason.clone());
        }
        if let Some(reason) = &self.cancellation_reason {
            booking.cancellation_reason = Some(reason.clone());
        }
        if let Some(url) = &self.report_url {
            booking.report_url = Some(url.clone());
        }
        if let Some(result) = &self.borewell_result {
            booking.borewell_result = Some(result.clone());
        }
        if let Some(at) = self.visited_at {
            booking.visited_at = Some(at);
        }
        if let Some(at) = self.completed_at {
            booking.completed_at = Some(at);
        }
        if let Some(at) = self.approved_at {
            booking.approved_at = Some(at);
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub booking_id: String,
    pub actor: ActorScope,
    pub from: Vec<BookingStatus>,
    pub to: BookingStatus,
    pub patch: BookingPatch,
}

impl TransitionRequest {
    /// Every `from` status must either already be `to` or list it as a
    /// successor.
    pub fn new(booking_id: &str, actor: ActorScope, from: &[BookingStatus], to: BookingStatus) -> Self {
        debug_assert!(
            from.iter().all(|s| *s == to || s.can_transition_to(to)),
            "no edge from {:?} to {}",
            from,
            to
        );
        Self {
            booking_id: booking_id.to_string(),
            actor,
            from: from.to_vec(),
            to,
            patch: BookingPatch::default(),
        }
    }

    pub fn with_patch(mut self, patch: BookingPatch) -> Self {
        self.patch = patch;
        self
    }

    /// Whether `booking` is in a state and ownership this request may move.
    pub fn matches(&self, booking: &Booking) -> bool {
        booking.id == self.booking_id && self.from.contains(&booking.status) && self.actor.permits(booking)
    }
}

// =============================================================================
// BOOKING REPOSITORY
// =============================================================================

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: &Booking) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>>;

    /// Single conditional update on (id, current status, actor). Returns the
    /// updated booking, or `None` when nothing matched. A move into
    /// `COMPLETED` also credits the assigned vendor's ledger in the same
    /// atomic step.
    async fn transition(&self, request: &TransitionRequest) -> Result<Option<Booking>>;

    /// Booking count per status. Statuses with no bookings may be omitted.
    async fn status_counts(&self) -> Result<Vec<(BookingStatus, i64)>>;
}
