use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::interface::{
    AccountRepository, AdminChange, AdminChangeCheck, AdminWrite, Result, SuperAdminCounts,
};
use super::model::{Account, Admin};
use crate::error::StoreError;
use crate::services::otp::SubjectKind;

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<(SubjectKind, String), Account>,
}

impl Accounts {
    fn iter_kind(&self, kind: SubjectKind) -> impl Iterator<Item = &Account> {
        self.by_id.values().filter(move |a| a.kind() == kind)
    }

    fn admins(&self) -> impl Iterator<Item = &Admin> {
        self.by_id.values().filter_map(|a| match a {
            Account::Admin(admin) => Some(admin),
            _ => None,
        })
    }

    fn admin_mut(&mut self, id: &str) -> Option<&mut Admin> {
        match self.by_id.get_mut(&(SubjectKind::Admin, id.to_string())) {
            Some(Account::Admin(admin)) => Some(admin),
            _ => None,
        }
    }
}

/// Account storage in process memory, mirroring the unique keys of the
/// MySQL schema.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountRepository {
    inner: Arc<Mutex<Accounts>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Accounts> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a completed booking to the vendor's ledger. Returns false when
    /// the vendor does not exist.
    pub fn credit_vendor(&self, vendor_id: &str, amount: Decimal, collected: bool) -> bool {
        let mut accounts = self.lock();
        match accounts.by_id.get_mut(&(SubjectKind::Vendor, vendor_id.to_string())) {
            Some(Account::Vendor(vendor)) => {
                vendor.credit(amount, collected);
                vendor.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn create(&self, account: &Account) -> Result<()> {
        let mut accounts = self.lock();
        let kind = account.kind();

        if accounts.iter_kind(kind).any(|a| a.email() == account.email()) {
            return Err(StoreError::Duplicate(format!("{} email {}", kind, account.email())));
        }
        if let Some(phone) = account.phone() {
            if accounts.iter_kind(kind).any(|a| a.phone() == Some(phone)) {
                return Err(StoreError::Duplicate(format!("{} phone {}", kind, phone)));
            }
        }

        accounts
            .by_id
            .insert((kind, account.id().to_string()), account.clone());
        Ok(())
    }

    async fn find_by_id(&self, kind: SubjectKind, id: &str) -> Result<Option<Account>> {
        Ok(self.lock().by_id.get(&(kind, id.to_string())).cloned())
    }

    async fn find_by_email(&self, kind: SubjectKind, email: &str) -> Result<Option<Account>> {
        Ok(self
            .lock()
            .iter_kind(kind)
            .find(|a| a.email() == email)
            .cloned())
    }

    async fn email_exists(&self, kind: SubjectKind, email: &str) -> Result<bool> {
        Ok(self.lock().iter_kind(kind).any(|a| a.email() == email))
    }

    async fn phone_exists(&self, kind: SubjectKind, phone: &str) -> Result<bool> {
        Ok(self.lock().iter_kind(kind).any(|a| a.phone() == Some(phone)))
    }

    async fn update_password(&self, kind: SubjectKind, id: &str, password_hash: &str) -> Result<bool> {
        let mut accounts = self.lock();
        let Some(account) = accounts.by_id.get_mut(&(kind, id.to_string())) else {
            return Ok(false);
        };
        let now = Utc::now();
        match account {
            Account::User(u) => {
                u.password_hash = password_hash.to_string();
                u.updated_at = now;
            }
            Account::Vendor(v) => {
                v.password_hash = password_hash.to_string();
                v.updated_at = now;
            }
            Account::Admin(a) => {
                a.password_hash = password_hash.to_string();
                a.updated_at = now;
            }
        }
        Ok(true)
    }

    async fn touch_last_login(&self, kind: SubjectKind, id: &str, at: DateTime<Utc>) -> Result<()> {
        if let Some(account) = self.lock().by_id.get_mut(&(kind, id.to_string())) {
            match account {
                Account::User(u) => u.last_login_at = Some(at),
                Account::Vendor(v) => v.last_login_at = Some(at),
                Account::Admin(a) => a.last_login_at = Some(at),
            }
        }
        Ok(())
    }

    async fn set_vendor_approved(&self, vendor_id: &str, approved: bool) -> Result<bool> {
        let mut accounts = self.lock();
        match accounts.by_id.get_mut(&(SubjectKind::Vendor, vendor_id.to_string())) {
            Some(Account::Vendor(vendor)) => {
                vendor.is_approved = approved;
                vendor.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_admins(&self) -> Result<Vec<Admin>> {
        let mut admins: Vec<Admin> = self.lock().admins().cloned().collect();
        admins.sort_by_key(|a| a.created_at);
        Ok(admins)
    }

    async fn count_admins(&self) -> Result<i64> {
        Ok(self.lock().admins().count() as i64)
    }

    async fn change_admin(
        &self,
        acting_id: &str,
        admin_id: &str,
        change: AdminChange,
        check: AdminChangeCheck<'_>,
    ) -> Result<AdminWrite> {
        let mut accounts = self.lock();

        let Some(target) = accounts.admin_mut(admin_id).map(|admin| admin.clone()) else {
            return Ok(AdminWrite::NotFound);
        };

        let acting_ok = accounts
            .admins()
            .any(|a| a.id == acting_id && a.is_super_admin() && a.is_active);
        if !acting_ok {
            return Ok(AdminWrite::NotPermitted);
        }

        let counts = SuperAdminCounts {
            active: accounts.admins().filter(|a| a.is_super_admin() && a.is_active).count() as i64,
            total: accounts.admins().filter(|a| a.is_super_admin()).count() as i64,
        };
        if let Err(refusal) = check(&target, counts) {
            return Ok(AdminWrite::Refused(refusal));
        }

        if change == AdminChange::Delete {
            accounts.by_id.remove(&(SubjectKind::Admin, admin_id.to_string()));
            return Ok(AdminWrite::Applied(target));
        }

        let Some(admin) = accounts.admin_mut(admin_id) else {
            return Ok(AdminWrite::NotFound);
        };
        match change {
            AdminChange::Role(role) => admin.role = role,
            AdminChange::Active(active) => admin.is_active = active,
            AdminChange::Delete => {}
        }
        admin.updated_at = Utc::now();

        Ok(AdminWrite::Applied(admin.clone()))
    }
}
