use async_trait::async_trait;

use super::types::{DevicePlatform, DeviceToken};
use crate::error::StoreError;
use crate::services::otp::SubjectRef;

/// Number of device tokens kept per account after a registration.
pub const MAX_DEVICES_PER_SUBJECT: usize = 5;

/// Where push-notification device tokens are kept. Delivery itself is out of
/// scope; this only tracks which devices belong to which account.
#[async_trait]
pub trait DeviceTokenRegistry: Send + Sync {
    /// Register `device_token` for `subject`, refreshing `last_seen_at` if it
    /// is already known.
    async fn upsert(
        &self,
        subject: &SubjectRef,
        device_token: &str,
        platform: DevicePlatform,
    ) -> Result<(), StoreError>;

    /// Drop all but the `keep_latest` most recently seen tokens. Returns the
    /// number removed.
    async fn prune(&self, subject: &SubjectRef, keep_latest: usize) -> Result<u64, StoreError>;

    /// Most recently seen first.
    async fn tokens_for(&self, subject: &SubjectRef) -> Result<Vec<DeviceToken>, StoreError>;
}
