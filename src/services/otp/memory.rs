use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::store::{Result, TokenStore};
use super::types::{SubjectRef, TokenPurpose, VerificationToken};

/// Token store backed by a process-local map.
///
/// Each trait method takes the lock once, so every operation is atomic with
/// respect to concurrent callers the same way a single-row UPDATE is.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenStore {
    tokens: Arc<Mutex<HashMap<String, VerificationToken>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored tokens, live or not.
    pub fn snapshot(&self) -> Vec<VerificationToken> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<VerificationToken> {
        self.lock().get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VerificationToken>> {
        // A panic while holding the lock cannot leave a token half-written.
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert_superseding(&self, token: &VerificationToken) -> Result<()> {
        let mut tokens = self.lock();
        tokens.retain(|_, existing| existing.used || !existing.shares_scope_with(token));
        tokens.insert(token.id.clone(), token.clone());
        Ok(())
    }

    async fn find_live_for_subject(
        &self,
        subject: &SubjectRef,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationToken>> {
        let tokens = self.lock();
        Ok(tokens
            .values()
            .filter(|t| t.purpose == purpose && t.subject.as_ref() == Some(subject) && t.is_live(now))
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn find_live_by_bearer(
        &self,
        bearer_hash: &str,
        email: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationToken>> {
        let tokens = self.lock();
        Ok(tokens
            .values()
            .find(|t| {
                t.bearer_hash == bearer_hash
                    && t.email == email
                    && t.purpose == purpose
                    && t.is_live(now)
            })
            .cloned())
    }

    async fn increment_attempts(&self, id: &str) -> Result<Option<i32>> {
        let mut tokens = self.lock();
        Ok(tokens.get_mut(id).filter(|t| !t.used).map(|t| {
            t.attempts += 1;
            t.attempts
        }))
    }

    async fn mark_used(&self, id: &str) -> Result<()> {
        if let Some(token) = self.lock().get_mut(id) {
            token.used = true;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.lock().remove(id);
        Ok(())
    }

    async fn delete_stale(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tokens = self.lock();
        let before = tokens.len();
        tokens.retain(|_, t| t.is_live(now));
        Ok((before - tokens.len()) as u64)
    }
}
