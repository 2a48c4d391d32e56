use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySql, Pool};

use super::store::{Result, TokenStore};
use super::types::{SubjectKind, SubjectRef, TokenPurpose, VerificationToken};
use crate::error::StoreError;

#[derive(Debug, FromRow)]
struct TokenRow {
    id: String,
    subject_kind: Option<String>,
    subject_id: Option<String>,
    email: String,
    purpose: String,
    bearer_hash: String,
    code: String,
    expires_at: DateTime<Utc>,
    attempts: i32,
    used: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for VerificationToken {
    type Error = StoreError;

    fn try_from(row: TokenRow) -> std::result::Result<Self, Self::Error> {
        let subject = match (row.subject_kind, row.subject_id) {
            (Some(kind), Some(id)) => {
                let kind: SubjectKind = kind
                    .parse()
                    .map_err(|e: crate::error::ParseEnumError| StoreError::Corrupt(e.to_string()))?;
                Some(SubjectRef { kind, id })
            }
            (None, None) => None,
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "token {} has a partial subject reference",
                    row.id
                )))
            }
        };

        let purpose = row
            .purpose
            .parse()
            .map_err(|e: crate::error::ParseEnumError| StoreError::Corrupt(e.to_string()))?;

        Ok(VerificationToken {
            id: row.id,
            subject,
            email: row.email,
            purpose,
            bearer_hash: row.bearer_hash,
            code: row.code,
            expires_at: row.expires_at,
            attempts: row.attempts,
            used: row.used,
            created_at: row.created_at,
        })
    }
}

const SELECT_TOKEN: &str = "SELECT id, subject_kind, subject_id, email, purpose, bearer_hash, code, \
     expires_at, attempts, used, created_at FROM verification_tokens";

#[derive(Clone)]
pub struct MySqlTokenStore {
    pool: Pool<MySql>,
}

impl MySqlTokenStore {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for MySqlTokenStore {
    async fn insert_superseding(&self, token: &VerificationToken) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        match &token.subject {
            Some(subject) => {
                sqlx::query(
                    "DELETE FROM verification_tokens
                     WHERE subject_kind = ? AND subject_id = ? AND purpose = ? AND used = FALSE",
                )
                .bind(subject.kind.as_str())
                .bind(&subject.id)
                .bind(token.purpose.as_str())
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "DELETE FROM verification_tokens
                     WHERE subject_id IS NULL AND email = ? AND purpose = ? AND used = FALSE",
                )
                .bind(&token.email)
                .bind(token.purpose.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO verification_tokens
                (id, subject_kind, subject_id, email, purpose, bearer_hash, code, expires_at, attempts, used, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(token.subject.as_ref().map(|s| s.kind.as_str()))
        .bind(token.subject.as_ref().map(|s| s.id.as_str()))
        .bind(&token.email)
        .bind(token.purpose.as_str())
        .bind(&token.bearer_hash)
        .bind(&token.code)
        .bind(token.expires_at)
        .bind(token.attempts)
        .bind(token.used)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_live_for_subject(
        &self,
        subject: &SubjectRef,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationToken>> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "{} WHERE subject_kind = ? AND subject_id = ? AND purpose = ?
               AND used = FALSE AND expires_at > ?
             ORDER BY created_at DESC LIMIT 1",
            SELECT_TOKEN
        ))
        .bind(subject.kind.as_str())
        .bind(&subject.id)
        .bind(purpose.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(VerificationToken::try_from).transpose()
    }

    async fn find_live_by_bearer(
        &self,
        bearer_hash: &str,
        email: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationToken>> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "{} WHERE bearer_hash = ? AND email = ? AND purpose = ?
               AND used = FALSE AND expires_at > ?",
            SELECT_TOKEN
        ))
        .bind(bearer_hash)
        .bind(email)
        .bind(purpose.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(VerificationToken::try_from).transpose()
    }

    async fn increment_attempts(&self, id: &str) -> Result<Option<i32>> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(i32,)> = sqlx::query_as(
            "SELECT attempts FROM verification_tokens WHERE id = ? AND used = FALSE FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((attempts,)) = current else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("UPDATE verification_tokens SET attempts = attempts + 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(attempts + 1))
    }

    async fn mark_used(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE verification_tokens SET used = TRUE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM verification_tokens WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_stale(&self, now: DateTime<Utc>) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM verification_tokens WHERE expires_at <= ? OR used = TRUE")
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
