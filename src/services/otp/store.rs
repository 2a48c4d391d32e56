use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{SubjectRef, TokenPurpose, VerificationToken};
use crate::error::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence for verification tokens.
///
/// Every method is a single atomic storage operation; the engine never pairs
/// a read with a dependent write.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Delete every unused token in the same (subject-or-email, purpose) slot,
    /// then insert `token`.
    async fn insert_superseding(&self, token: &VerificationToken) -> Result<()>;

    async fn find_live_for_subject(
        &self,
        subject: &SubjectRef,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationToken>>;

    async fn find_live_by_bearer(
        &self,
        bearer_hash: &str,
        email: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationToken>>;

    /// Atomically bump the attempt counter of an unused token and return the
    /// new value. `None` when the token is gone or already used.
    async fn increment_attempts(&self, id: &str) -> Result<Option<i32>>;

    async fn mark_used(&self, id: &str) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Purge expired and used tokens. Returns the number removed.
    async fn delete_stale(&self, now: DateTime<Utc>) -> Result<u64>;
}
