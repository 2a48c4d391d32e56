use crate::error::AppError;
use crate::modules::auth::model::{Admin, AdminRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdminGuardError {
    #[error("Admins cannot delete their own account")]
    SelfDeletion,

    #[error("At least one super admin must remain")]
    LastSuperAdmin,
}

impl From<AdminGuardError> for AppError {
    fn from(err: AdminGuardError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Refuse a super admin demoting themselves when no other active super admin
/// exists. `active_super_admins` counts active `SUPER_ADMIN` accounts.
pub fn can_change_role(
    acting_id: &str,
    target: &Admin,
    new_role: AdminRole,
    active_super_admins: i64,
) -> Result<(), AdminGuardError> {
    if target.id == acting_id
        && target.role == AdminRole::SuperAdmin
        && new_role != AdminRole::SuperAdmin
        && active_super_admins <= 1
    {
        return Err(AdminGuardError::LastSuperAdmin);
    }
    Ok(())
}

/// `total_super_admins` counts `SUPER_ADMIN` accounts whether active or not.
pub fn can_delete(acting_id: &str, target: &Admin, total_super_admins: i64) -> Result<(), AdminGuardError> {
    if target.id == acting_id {
        return Err(AdminGuardError::SelfDeletion);
    }
    if target.role == AdminRole::SuperAdmin && total_super_admins <= 1 {
        return Err(AdminGuardError::LastSuperAdmin);
    }
    Ok(())
}

/// Deactivating the only active super admin would lock everyone out of admin
/// management.
pub fn can_deactivate(target: &Admin, active_super_admins: i64) -> Result<(), AdminGuardError> {
    if target.role == AdminRole::SuperAdmin && target.is_active && active_super_admins <= 1 {
        return Err(AdminGuardError::LastSuperAdmin);
    }
    Ok(())
}
