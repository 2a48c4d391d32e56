use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::registry::DeviceTokenRegistry;
use super::types::{DevicePlatform, DeviceToken};
use crate::error::StoreError;
use crate::services::otp::SubjectRef;

#[derive(Debug, Clone, Default)]
pub struct InMemoryDeviceTokenRegistry {
    tokens: Arc<Mutex<Vec<DeviceToken>>>,
}

impl InMemoryDeviceTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DeviceToken>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DeviceTokenRegistry for InMemoryDeviceTokenRegistry {
    async fn upsert(
        &self,
        subject: &SubjectRef,
        device_token: &str,
        platform: DevicePlatform,
    ) -> Result<(), StoreError> {
        let mut tokens = self.lock();
        let now = Utc::now();

        match tokens
            .iter_mut()
            .find(|t| t.subject == *subject && t.device_token == device_token)
        {
            Some(existing) => {
                existing.platform = platform;
                existing.last_seen_at = now;
            }
            None => tokens.push(DeviceToken {
                id: Uuid::new_v4().to_string(),
                subject: subject.clone(),
                device_token: device_token.to_string(),
                platform,
                last_seen_at: now,
            }),
        }
        Ok(())
    }

    async fn prune(&self, subject: &SubjectRef, keep_latest: usize) -> Result<u64, StoreError> {
        let mut tokens = self.lock();

        let mut mine: Vec<&DeviceToken> = tokens.iter().filter(|t| t.subject == *subject).collect();
        mine.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));
        let stale: Vec<String> = mine.iter().skip(keep_latest).map(|t| t.id.clone()).collect();

        tokens.retain(|t| !stale.contains(&t.id));
        Ok(stale.len() as u64)
    }

    async fn tokens_for(&self, subject: &SubjectRef) -> Result<Vec<DeviceToken>, StoreError> {
        let mut mine: Vec<DeviceToken> = self
            .lock()
            .iter()
            .filter(|t| t.subject == *subject)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));
        Ok(mine)
    }
}
