use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySql, Pool, QueryBuilder};
use uuid::Uuid;

use super::registry::DeviceTokenRegistry;
use super::types::{DevicePlatform, DeviceToken};
use crate::error::{ParseEnumError, StoreError};
use crate::services::otp::{SubjectKind, SubjectRef};

#[derive(Debug, FromRow)]
struct DeviceTokenRow {
    id: String,
    subject_kind: String,
    subject_id: String,
    device_token: String,
    platform: String,
    last_seen_at: DateTime<Utc>,
}

impl TryFrom<DeviceTokenRow> for DeviceToken {
    type Error = StoreError;

    fn try_from(row: DeviceTokenRow) -> Result<Self, Self::Error> {
        let corrupt = |e: ParseEnumError| StoreError::Corrupt(e.to_string());
        let kind: SubjectKind = row.subject_kind.parse().map_err(corrupt)?;
        let platform: DevicePlatform = row.platform.parse().map_err(corrupt)?;

        Ok(DeviceToken {
            id: row.id,
            subject: SubjectRef::new(kind, row.subject_id),
            device_token: row.device_token,
            platform,
            last_seen_at: row.last_seen_at,
        })
    }
}

pub struct MySqlDeviceTokenRegistry {
    pool: Pool<MySql>,
}

impl MySqlDeviceTokenRegistry {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceTokenRegistry for MySqlDeviceTokenRegistry {
    async fn upsert(
        &self,
        subject: &SubjectRef,
        device_token: &str,
        platform: DevicePlatform,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO device_tokens (id, subject_kind, subject_id, device_token, platform, last_seen_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE platform = VALUES(platform), last_seen_at = VALUES(last_seen_at)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(subject.kind.as_str())
        .bind(&subject.id)
        .bind(device_token)
        .bind(platform.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn prune(&self, subject: &SubjectRef, keep_latest: usize) -> Result<u64, StoreError> {
        let stale: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM device_tokens
            WHERE subject_kind = ? AND subject_id = ?
            ORDER BY last_seen_at DESC
            LIMIT 18446744073709551615 OFFSET ?
            "#,
        )
        .bind(subject.kind.as_str())
        .bind(&subject.id)
        .bind(keep_latest as u64)
        .fetch_all(&self.pool)
        .await?;

        if stale.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<MySql>::new("DELETE FROM device_tokens WHERE id IN (");
        let mut ids = query.separated(", ");
        for (id,) in &stale {
            ids.push_bind(id.as_str());
        }
        ids.push_unseparated(")");

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn tokens_for(&self, subject: &SubjectRef) -> Result<Vec<DeviceToken>, StoreError> {
        let rows = sqlx::query_as::<_, DeviceTokenRow>(
            r#"
            SELECT id, subject_kind, subject_id, device_token, platform, last_seen_at
            FROM device_tokens
            WHERE subject_kind = ? AND subject_id = ?
            ORDER BY last_seen_at DESC
            "#,
        )
        .bind(subject.kind.as_str())
        .bind(&subject.id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DeviceToken::try_from).collect()
    }
}
