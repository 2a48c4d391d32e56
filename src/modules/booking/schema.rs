use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::model::BookingStatus;

// Length and format rules live in the state machine so they run in the same
// order for every caller; these bodies only shape the JSON.

#[derive(Debug, Deserialize, Validate)]
pub struct RejectBookingRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleVisitRequest {
    pub scheduled_date: String,
    pub scheduled_time: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UploadReportRequest {
    pub report_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BorewellResultRequest {
    pub result: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelBookingRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RequestPaymentRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: BookingStatus,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardStatsResponse {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

impl From<Vec<(BookingStatus, i64)>> for DashboardStatsResponse {
    fn from(counts: Vec<(BookingStatus, i64)>) -> Self {
        Self {
            total: counts.iter().map(|(_, c)| c).sum(),
            by_status: counts
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
        }
    }
}
