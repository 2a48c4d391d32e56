use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Account, Admin, AdminRole};
use crate::error::StoreError;
use crate::modules::admin::AdminGuardError;
use crate::services::otp::SubjectKind;

pub type Result<T> = std::result::Result<T, StoreError>;

// =============================================================================
// ADMIN CHANGES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminChange {
    Role(AdminRole),
    Active(bool),
    Delete,
}

/// `SUPER_ADMIN` head-counts, read under the same lock as the change they
/// gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperAdminCounts {
    pub active: i64,
    pub total: i64,
}

/// Guard run against the locked target row before a change is written.
pub type AdminChangeCheck<'a> =
    &'a (dyn Fn(&Admin, SuperAdminCounts) -> std::result::Result<(), AdminGuardError> + Send + Sync);

#[derive(Debug)]
pub enum AdminWrite {
    /// The admin as written (or as it was before deletion).
    Applied(Admin),
    NotFound,
    /// The acting admin is no longer an active super admin.
    NotPermitted,
    Refused(AdminGuardError),
}

// =============================================================================
// ACCOUNT REPOSITORY
// =============================================================================

/// Storage for the user, vendor and admin collections.
///
/// Lookups are scoped by [`SubjectKind`]; an email registered as a user can
/// independently register as a vendor.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account. Unique email/phone clashes surface as
    /// [`StoreError::Duplicate`].
    async fn create(&self, account: &Account) -> Result<()>;
    async fn find_by_id(&self, kind: SubjectKind, id: &str) -> Result<Option<Account>>;
    async fn find_by_email(&self, kind: SubjectKind, email: &str) -> Result<Option<Account>>;
    async fn email_exists(&self, kind: SubjectKind, email: &str) -> Result<bool>;
    async fn phone_exists(&self, kind: SubjectKind, phone: &str) -> Result<bool>;
    async fn update_password(&self, kind: SubjectKind, id: &str, password_hash: &str) -> Result<bool>;
    async fn touch_last_login(&self, kind: SubjectKind, id: &str, at: DateTime<Utc>) -> Result<()>;

    // Vendor onboarding
    async fn set_vendor_approved(&self, vendor_id: &str, approved: bool) -> Result<bool>;

    // Admin management
    async fn list_admins(&self) -> Result<Vec<Admin>>;
    async fn count_admins(&self) -> Result<i64>;

    /// Apply `change` to `admin_id` on behalf of `acting_id`.
    ///
    /// The acting admin's standing, the super admin counts and `check` are
    /// all evaluated inside the write's transaction, so concurrent changes
    /// cannot together remove the last super admin.
    async fn change_admin(
        &self,
        acting_id: &str,
        admin_id: &str,
        change: AdminChange,
        check: AdminChangeCheck<'_>,
    ) -> Result<AdminWrite>;
}
