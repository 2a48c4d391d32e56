use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ParseEnumError;

// =============================================================================
// BOOKING STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Assigned,
    Accepted,
    Visited,
    ReportUploaded,
    AwaitingPayment,
    PaymentSuccess,
    BorewellUploaded,
    AdminApproved,
    FinalSettlement,
    Completed,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 13] = [
        Self::Pending,
        Self::Assigned,
        Self::Accepted,
        Self::Visited,
        Self::ReportUploaded,
        Self::AwaitingPayment,
        Self::PaymentSuccess,
        Self::BorewellUploaded,
        Self::AdminApproved,
        Self::FinalSettlement,
        Self::Completed,
        Self::Rejected,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Assigned => "ASSIGNED",
            Self::Accepted => "ACCEPTED",
            Self::Visited => "VISITED",
            Self::ReportUploaded => "REPORT_UPLOADED",
            Self::AwaitingPayment => "AWAITING_PAYMENT",
            Self::PaymentSuccess => "PAYMENT_SUCCESS",
            Self::BorewellUploaded => "BOREWELL_UPLOADED",
            Self::AdminApproved => "ADMIN_APPROVED",
            Self::FinalSettlement => "FINAL_SETTLEMENT",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    /// Forward moves allowed out of this status. There are no backward edges.
    pub fn successors(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            Pending => &[Assigned, Accepted, Rejected, Cancelled],
            Assigned => &[Accepted, Cancelled],
            Accepted => &[Visited, Cancelled],
            Visited => &[ReportUploaded, Completed, Cancelled],
            ReportUploaded => &[AwaitingPayment, Cancelled],
            AwaitingPayment => &[PaymentSuccess, Cancelled],
            PaymentSuccess => &[BorewellUploaded, Cancelled],
            BorewellUploaded => &[AdminApproved, Cancelled],
            AdminApproved => &[FinalSettlement, Cancelled],
            FinalSettlement => &[Completed, Cancelled],
            Completed | Rejected | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        self.successors().contains(&next)
    }

    /// Every status from which `CANCELLED` is reachable.
    pub fn non_terminal() -> Vec<BookingStatus> {
        Self::ALL.into_iter().filter(|s| !s.is_terminal()).collect()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("booking status", s))
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// =============================================================================
// PAYMENT STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(ParseEnumError::new("payment status", other)),
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// =============================================================================
// BOOKING
// =============================================================================

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub vendor_id: Option<String>,
    pub service_id: String,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,

    // Scheduling
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,

    // Payment
    pub payment_amount: Decimal,
    #[sqlx(try_from = "String")]
    pub payment_status: PaymentStatus,

    // Outcomes
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub report_url: Option<String>,
    pub borewell_result: Option<String>,

    // Milestones
    pub visited_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub revision: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A fresh `PENDING` booking, as produced by the booking-creation flow.
    pub fn new_pending(
        user_id: impl Into<String>,
        vendor_id: Option<String>,
        service_id: impl Into<String>,
        payment_amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            vendor_id,
            service_id: service_id.into(),
            status: BookingStatus::Pending,
            scheduled_date: None,
            scheduled_time: None,
            payment_amount,
            payment_status: PaymentStatus::Pending,
            rejection_reason: None,
            cancellation_reason: None,
            report_url: None,
            borewell_result: None,
            visited_at: None,
            completed_at: None,
            approved_at: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
