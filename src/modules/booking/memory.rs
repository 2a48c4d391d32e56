use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::interface::{BookingRepository, Result, TransitionRequest};
use super::model::{Booking, BookingStatus, PaymentStatus};
use crate::error::StoreError;
use crate::modules::auth::InMemoryAccountRepository;

/// Booking storage in process memory. Transitions hold the map lock for the
/// whole check-and-set, which gives the same all-or-nothing behaviour as the
/// conditional UPDATE in MySQL.
#[derive(Debug, Clone)]
pub struct InMemoryBookingRepository {
    bookings: Arc<Mutex<HashMap<String, Booking>>>,
    accounts: InMemoryAccountRepository,
}

impl InMemoryBookingRepository {
    pub fn new(accounts: InMemoryAccountRepository) -> Self {
        Self {
            bookings: Arc::new(Mutex::new(HashMap::new())),
            accounts,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Booking>> {
        self.bookings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        let mut bookings = self.lock();
        if bookings.contains_key(&booking.id) {
            return Err(StoreError::Duplicate(format!("booking {}", booking.id)));
        }
        bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>> {
        Ok(self.lock().get(id).cloned())
    }

    async fn transition(&self, request: &TransitionRequest) -> Result<Option<Booking>> {
        // Lock order: bookings, then accounts.
        let mut bookings = self.lock();
        let Some(booking) = bookings.get_mut(&request.booking_id) else {
            return Ok(None);
        };
        if !request.matches(booking) {
            return Ok(None);
        }

        let mut updated = booking.clone();
        request.patch.apply_to(&mut updated);
        updated.status = request.to;
        updated.revision += 1;
        updated.updated_at = Utc::now();

        if request.to == BookingStatus::Completed {
            if let Some(vendor_id) = &updated.vendor_id {
                let collected = updated.payment_status == PaymentStatus::Success;
                if !self.accounts.credit_vendor(vendor_id, updated.payment_amount, collected) {
                    return Err(StoreError::Corrupt(format!(
                        "booking {} references missing vendor {}",
                        updated.id, vendor_id
                    )));
                }
            }
        }

        *booking = updated.clone();
        Ok(Some(updated))
    }

    async fn status_counts(&self) -> Result<Vec<(BookingStatus, i64)>> {
        let mut counts: HashMap<BookingStatus, i64> = HashMap::new();
        for booking in self.lock().values() {
            *counts.entry(booking.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}
