use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{MySql, Pool, QueryBuilder};

use super::interface::{ActorScope, BookingRepository, Result, TransitionRequest};
use super::model::{Booking, BookingStatus, PaymentStatus};
use crate::error::StoreError;

pub struct MySqlBookingRepository {
    pool: Pool<MySql>,
}

impl MySqlBookingRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for MySqlBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, user_id, vendor_id, service_id, status,
                scheduled_date, scheduled_time, payment_amount, payment_status,
                revision, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.user_id)
        .bind(&booking.vendor_id)
        .bind(&booking.service_id)
        .bind(booking.status.as_str())
        .bind(booking.scheduled_date)
        .bind(&booking.scheduled_time)
        .bind(booking.payment_amount)
        .bind(booking.payment_status.as_str())
        .bind(booking.revision)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    async fn transition(&self, request: &TransitionRequest) -> Result<Option<Booking>> {
        if request.from.is_empty() {
            return Ok(None);
        }

        let patch = &request.patch;
        let mut tx = self.pool.begin().await?;

        // `revision` guarantees the row counts as changed even when the
        // status stays the same (rescheduling an accepted booking).
        let mut query = QueryBuilder::<MySql>::new("UPDATE bookings SET status = ");
        query.push_bind(request.to.as_str());
        query.push(", revision = revision + 1, updated_at = ");
        query.push_bind(Utc::now());

        if let Some(date) = patch.scheduled_date {
            query.push(", scheduled_date = ").push_bind(date);
        }
        if let Some(time) = &patch.scheduled_time {
            query.push(", scheduled_time = ").push_bind(time.as_str());
        }
        if let Some(amount) = patch.payment_amount {
            query.push(", payment_amount = ").push_bind(amount);
        }
        if let Some(status) = patch.payment_status {
            query.push(", payment_status = ").push_bind(status.as_str());
        }
        if let Some(reason) = &patch.rejection_reason {
            query.push(", rejection_reason = ").push_bind(reason.as_str());
        }
        if let Some(reason) = &patch.cancellation_reason {
            query.push(", cancellation_reason = ").push_bind(reason.as_str());
        }
        if let Some(url) = &patch.report_url {
            query.push(", report_url = ").push_bind(url.as_str());
        }
        if let Some(result) = &patch.borewell_result {
            query.push(", borewell_result = ").push_bind(result.as_str());
        }
        if let Some(at) = patch.visited_at {
            query.push(", visited_at = ").push_bind(at);
        }
        if let Some(at) = patch.completed_at {
            query.push(", completed_at = ").push_bind(at);
        }
        if let Some(at) = patch.approved_at {
            query.push(", approved_at = ").push_bind(at);
        }

        query.push(" WHERE id = ").push_bind(request.booking_id.as_str());
        query.push(" AND status IN (");
        let mut statuses = query.separated(", ");
        for status in &request.from {
            statuses.push_bind(status.as_str());
        }
        statuses.push_unseparated(")");

        match &request.actor {
            ActorScope::Vendor(id) => {
                query.push(" AND vendor_id = ").push_bind(id.as_str());
            }
            ActorScope::User(id) => {
                query.push(" AND user_id = ").push_bind(id.as_str());
            }
            ActorScope::Admin => {}
        }

        let result = query.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(&request.booking_id)
            .fetch_one(&mut *tx)
            .await?;

        if request.to == BookingStatus::Completed {
            if let Some(vendor_id) = &booking.vendor_id {
                let amount = booking.payment_amount;
                let (collected, pending) = if booking.payment_status == PaymentStatus::Success {
                    (amount, Decimal::ZERO)
                } else {
                    (Decimal::ZERO, amount)
                };

                let ledger = sqlx::query(
                    r#"
                    UPDATE vendors
                    SET total_earnings = total_earnings + ?,
                        collected_amount = collected_amount + ?,
                        pending_amount = pending_amount + ?
                    WHERE id = ?
                    "#,
                )
                .bind(amount)
                .bind(collected)
                .bind(pending)
                .bind(vendor_id)
                .execute(&mut *tx)
                .await?;

                if ledger.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(StoreError::Corrupt(format!(
                        "booking {} references missing vendor {}",
                        booking.id, vendor_id
                    )));
                }
            }
        }

        tx.commit().await?;
        Ok(Some(booking))
    }

    async fn status_counts(&self) -> Result<Vec<(BookingStatus, i64)>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM bookings GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(status, count)| {
                status
                    .parse::<BookingStatus>()
                    .map(|status| (status, count))
                    .map_err(|e| StoreError::Corrupt(e.to_string()))
            })
            .collect()
    }
}
