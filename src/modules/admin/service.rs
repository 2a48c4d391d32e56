use super::guard::{can_change_role, can_deactivate, can_delete};
use crate::error::AppError;
use crate::modules::auth::interface::{
    AccountRepository, AdminChange, AdminChangeCheck, AdminWrite, SuperAdminCounts,
};
use crate::modules::auth::model::{Account, Admin, AdminRole};
use crate::services::otp::SubjectKind;

/// Admin-on-admin management plus vendor approval.
///
/// The acting admin is always re-read from storage so a deactivated or
/// demoted admin holding a still-valid session cannot act.
pub struct AdminService<'a> {
    accounts: &'a dyn AccountRepository,
}

impl<'a> AdminService<'a> {
    pub fn new(accounts: &'a dyn AccountRepository) -> Self {
        Self { accounts }
    }

    pub async fn acting_admin(&self, admin_id: &str) -> Result<Admin, AppError> {
        match self.accounts.find_by_id(SubjectKind::Admin, admin_id).await? {
            Some(Account::Admin(admin)) if admin.is_active => Ok(admin),
            Some(_) => Err(AppError::Forbidden("Admin account is deactivated".into())),
            None => Err(AppError::Unauthorized("Admin account no longer exists".into())),
        }
    }

    pub async fn acting_super_admin(&self, admin_id: &str) -> Result<Admin, AppError> {
        let admin = self.acting_admin(admin_id).await?;
        if !admin.is_super_admin() {
            return Err(AppError::Forbidden("Super admin access required".into()));
        }
        Ok(admin)
    }

    async fn target(&self, admin_id: &str) -> Result<Admin, AppError> {
        match self.accounts.find_by_id(SubjectKind::Admin, admin_id).await? {
            Some(Account::Admin(admin)) => Ok(admin),
            _ => Err(AppError::NotFoundOrIllegalState("Admin not found".into())),
        }
    }

    pub async fn list_admins(&self, acting_id: &str) -> Result<Vec<Admin>, AppError> {
        self.acting_super_admin(acting_id).await?;
        Ok(self.accounts.list_admins().await?)
    }

    pub async fn change_role(
        &self,
        acting_id: &str,
        target_id: &str,
        new_role: AdminRole,
    ) -> Result<Admin, AppError> {
        self.acting_super_admin(acting_id).await?;
        let target = self.target(target_id).await?;
        if target.role == new_role {
            return Ok(target);
        }

        let check = |target: &Admin, counts: SuperAdminCounts| {
            can_change_role(acting_id, target, new_role, counts.active)
        };
        let admin = self
            .apply(acting_id, target_id, AdminChange::Role(new_role), &check)
            .await?;
        tracing::info!(acting = %acting_id, target = %target_id, role = %new_role, "admin role changed");

        Ok(admin)
    }

    pub async fn set_active(&self, acting_id: &str, target_id: &str, active: bool) -> Result<Admin, AppError> {
        self.acting_super_admin(acting_id).await?;
        let target = self.target(target_id).await?;
        if target.is_active == active {
            return Ok(target);
        }
        if !active && target.id == acting_id {
            return Err(AppError::Validation("Admins cannot deactivate themselves".into()));
        }

        let check = |target: &Admin, counts: SuperAdminCounts| {
            if active {
                Ok(())
            } else {
                can_deactivate(target, counts.active)
            }
        };
        let admin = self
            .apply(acting_id, target_id, AdminChange::Active(active), &check)
            .await?;
        tracing::info!(acting = %acting_id, target = %target_id, active, "admin status changed");

        Ok(admin)
    }

    pub async fn delete_admin(&self, acting_id: &str, target_id: &str) -> Result<(), AppError> {
        self.acting_super_admin(acting_id).await?;

        let check = |target: &Admin, counts: SuperAdminCounts| {
            can_delete(acting_id, target, counts.total)
        };
        self.apply(acting_id, target_id, AdminChange::Delete, &check)
            .await?;
        tracing::info!(acting = %acting_id, target = %target_id, "admin deleted");
        Ok(())
    }

    async fn apply(
        &self,
        acting_id: &str,
        target_id: &str,
        change: AdminChange,
        check: AdminChangeCheck<'_>,
    ) -> Result<Admin, AppError> {
        match self
            .accounts
            .change_admin(acting_id, target_id, change, check)
            .await?
        {
            AdminWrite::Applied(admin) => Ok(admin),
            AdminWrite::NotFound => Err(AppError::NotFoundOrIllegalState("Admin not found".into())),
            AdminWrite::NotPermitted => {
                Err(AppError::Forbidden("Super admin access required".into()))
            }
            AdminWrite::Refused(refusal) => Err(refusal.into()),
        }
    }

    /// Let a vendor log in. Any active admin may approve.
    pub async fn approve_vendor(&self, acting_id: &str, vendor_id: &str) -> Result<Account, AppError> {
        self.acting_admin(acting_id).await?;

        let vendor = match self.accounts.find_by_id(SubjectKind::Vendor, vendor_id).await? {
            Some(account @ Account::Vendor(_)) => account,
            _ => return Err(AppError::NotFoundOrIllegalState("Vendor not found".into())),
        };
        if let Account::Vendor(v) = &vendor {
            if v.is_approved {
                return Ok(vendor);
            }
        }

        if !self.accounts.set_vendor_approved(vendor_id, true).await? {
            return Err(AppError::NotFoundOrIllegalState("Vendor not found".into()));
        }
        tracing::info!(acting = %acting_id, vendor = %vendor_id, "vendor approved");

        match self.accounts.find_by_id(SubjectKind::Vendor, vendor_id).await? {
            Some(account) => Ok(account),
            None => Err(AppError::NotFoundOrIllegalState("Vendor not found".into())),
        }
    }
}
