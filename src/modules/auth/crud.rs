use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool};

use super::interface::{
    AccountRepository, AdminChange, AdminChangeCheck, AdminWrite, Result, SuperAdminCounts,
};
use super::model::{Account, Admin, User, Vendor};
use crate::services::otp::SubjectKind;

fn table(kind: SubjectKind) -> &'static str {
    match kind {
        SubjectKind::User => "users",
        SubjectKind::Vendor => "vendors",
        SubjectKind::Admin => "admins",
    }
}

#[derive(Clone)]
pub struct MySqlAccountRepository {
    pool: Pool<MySql>,
}

impl MySqlAccountRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, kind: SubjectKind, column: &str, value: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT * FROM {} WHERE {} = ?", table(kind), column);

        let account = match kind {
            SubjectKind::User => sqlx::query_as::<_, User>(&sql)
                .bind(value)
                .fetch_optional(&self.pool)
                .await?
                .map(Account::User),
            SubjectKind::Vendor => sqlx::query_as::<_, Vendor>(&sql)
                .bind(value)
                .fetch_optional(&self.pool)
                .await?
                .map(Account::Vendor),
            SubjectKind::Admin => sqlx::query_as::<_, Admin>(&sql)
                .bind(value)
                .fetch_optional(&self.pool)
                .await?
                .map(Account::Admin),
        };

        Ok(account)
    }

    async fn exists_by(&self, kind: SubjectKind, column: &str, value: &str) -> Result<bool> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table(kind), column);
        let result: (i64,) = sqlx::query_as(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0 > 0)
    }
}

#[async_trait]
impl AccountRepository for MySqlAccountRepository {
    async fn create(&self, account: &Account) -> Result<()> {
        match account {
            Account::User(user) => {
                sqlx::query(
                    r#"
                    INSERT INTO users (id, name, email, phone, password_hash, is_active, is_email_verified, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&user.id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.phone)
                .bind(&user.password_hash)
                .bind(user.is_active)
                .bind(user.is_email_verified)
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(&self.pool)
                .await?;
            }
            Account::Vendor(vendor) => {
                sqlx::query(
                    r#"
                    INSERT INTO vendors (id, name, email, phone, password_hash, is_active, is_email_verified, is_approved,
                                         total_earnings, collected_amount, pending_amount, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&vendor.id)
                .bind(&vendor.name)
                .bind(&vendor.email)
                .bind(&vendor.phone)
                .bind(&vendor.password_hash)
                .bind(vendor.is_active)
                .bind(vendor.is_email_verified)
                .bind(vendor.is_approved)
                .bind(vendor.total_earnings)
                .bind(vendor.collected_amount)
                .bind(vendor.pending_amount)
                .bind(vendor.created_at)
                .bind(vendor.updated_at)
                .execute(&self.pool)
                .await?;
            }
            Account::Admin(admin) => {
                sqlx::query(
                    r#"
                    INSERT INTO admins (id, name, email, password_hash, role, is_active, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&admin.id)
                .bind(&admin.name)
                .bind(&admin.email)
                .bind(&admin.password_hash)
                .bind(admin.role.as_str())
                .bind(admin.is_active)
                .bind(admin.created_at)
                .bind(admin.updated_at)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn find_by_id(&self, kind: SubjectKind, id: &str) -> Result<Option<Account>> {
        self.fetch_one_by(kind, "id", id).await
    }

    async fn find_by_email(&self, kind: SubjectKind, email: &str) -> Result<Option<Account>> {
        self.fetch_one_by(kind, "email", email).await
    }

    async fn email_exists(&self, kind: SubjectKind, email: &str) -> Result<bool> {
        self.exists_by(kind, "email", email).await
    }

    async fn phone_exists(&self, kind: SubjectKind, phone: &str) -> Result<bool> {
        match kind {
            SubjectKind::Admin => Ok(false),
            _ => self.exists_by(kind, "phone", phone).await,
        }
    }

    async fn update_password(&self, kind: SubjectKind, id: &str, password_hash: &str) -> Result<bool> {
        let sql = format!("UPDATE {} SET password_hash = ? WHERE id = ?", table(kind));
        let result = sqlx::query(&sql)
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_login(&self, kind: SubjectKind, id: &str, at: DateTime<Utc>) -> Result<()> {
        let sql = format!("UPDATE {} SET last_login_at = ? WHERE id = ?", table(kind));
        sqlx::query(&sql).bind(at).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn set_vendor_approved(&self, vendor_id: &str, approved: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE vendors SET is_approved = ? WHERE id = ?")
            .bind(approved)
            .bind(vendor_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_admins(&self) -> Result<Vec<Admin>> {
        Ok(sqlx::query_as::<_, Admin>("SELECT * FROM admins ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_admins(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn change_admin(
        &self,
        acting_id: &str,
        admin_id: &str,
        change: AdminChange,
        check: AdminChangeCheck<'_>,
    ) -> Result<AdminWrite> {
        let mut tx = self.pool.begin().await?;

        // Locking every super admin row serializes concurrent admin changes.
        let supers: Vec<(String, bool)> = sqlx::query_as(
            "SELECT id, is_active FROM admins WHERE role = 'SUPER_ADMIN' FOR UPDATE",
        )
        .fetch_all(&mut *tx)
        .await?;

        let target = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ? FOR UPDATE")
            .bind(admin_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(mut target) = target else {
            tx.rollback().await?;
            return Ok(AdminWrite::NotFound);
        };

        if !supers.iter().any(|(id, active)| id == acting_id && *active) {
            tx.rollback().await?;
            return Ok(AdminWrite::NotPermitted);
        }

        let counts = SuperAdminCounts {
            active: supers.iter().filter(|(_, active)| *active).count() as i64,
            total: supers.len() as i64,
        };
        if let Err(refusal) = check(&target, counts) {
            tx.rollback().await?;
            return Ok(AdminWrite::Refused(refusal));
        }

        let now = Utc::now();
        match change {
            AdminChange::Role(role) => {
                sqlx::query("UPDATE admins SET role = ?, updated_at = ? WHERE id = ?")
                    .bind(role.as_str())
                    .bind(now)
                    .bind(admin_id)
                    .execute(&mut *tx)
                    .await?;
                target.role = role;
                target.updated_at = now;
            }
            AdminChange::Active(active) => {
                sqlx::query("UPDATE admins SET is_active = ?, updated_at = ? WHERE id = ?")
                    .bind(active)
                    .bind(now)
                    .bind(admin_id)
                    .execute(&mut *tx)
                    .await?;
                target.is_active = active;
                target.updated_at = now;
            }
            AdminChange::Delete => {
                sqlx::query("DELETE FROM admins WHERE id = ?")
                    .bind(admin_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(AdminWrite::Applied(target))
    }
}
