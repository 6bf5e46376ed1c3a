//! API-side authorization guard.
//!
//! Checked at the handler boundary, before a command is dispatched or a read
//! model is queried; aggregates and projections stay auth-agnostic.

use stockroom_auth::{AuthzError, CommandAuthorization, Permission, authorize};

use crate::context::PrincipalContext;

pub mod perms {
    use stockroom_auth::Permission;

    pub const CATALOG_READ: Permission = Permission::from_static("catalog.read");
    pub const PRODUCTS_WRITE: Permission = Permission::from_static("products.write");
    pub const FASHION_WRITE: Permission = Permission::from_static("fashion.write");
    pub const FASHION_DELETE: Permission = Permission::from_static("fashion.delete");
    pub const STOCK_READ: Permission = Permission::from_static("stock.read");
    pub const STOCK_WRITE: Permission = Permission::from_static("stock.write");
    pub const STOCK_AUDIT: Permission = Permission::from_static("stock.audit");
    pub const STOCK_EXPORT: Permission = Permission::from_static("stock.export");
    pub const TRANSACTIONS_READ: Permission = Permission::from_static("transactions.read");
    pub const ALERTS_READ: Permission = Permission::from_static("alerts.read");
    pub const ALERTS_RESOLVE: Permission = Permission::from_static("alerts.resolve");
    pub const ALERTS_DELETE: Permission = Permission::from_static("alerts.delete");
    pub const ALERTS_CLEANUP: Permission = Permission::from_static("alerts.cleanup");
    pub const REPORTS_EXPORT: Permission = Permission::from_static("reports.export");
    pub const ADMIN_USERS: Permission = Permission::from_static("admin.users");
    pub const ADMIN_STATS: Permission = Permission::from_static("admin.stats");
    pub const DASHBOARD_STAFF: Permission = Permission::from_static("dashboard.staff");
    pub const DASHBOARD_MANAGER: Permission = Permission::from_static("dashboard.manager");
}

/// Check authorization for a command in the current request context.
///
/// Call this **before** dispatching the command.
pub fn authorize_command<C: CommandAuthorization>(
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    for perm in command.required_permissions() {
        authorize(principal.principal(), perm)?;
    }
    Ok(())
}

/// Guard for read endpoints that have no command to wrap.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), AuthzError> {
    authorize(principal.principal(), permission)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use stockroom_auth::{Role, UserStatus};
    use stockroom_core::UserId;
    use stockroom_infra::projections::UserView;

    use super::*;
    use crate::app::routes::common::CmdAuth;

    fn ctx(role: Role) -> PrincipalContext {
        let now = Utc::now();
        PrincipalContext::new(UserView {
            id: UserId::new(),
            username: "pat".to_string(),
            email: "pat@example.com".to_string(),
            password_hash: String::new(),
            role,
            status: UserStatus::Approved,
            created_at: now,
            updated_at: now,
            position: 1,
        })
    }

    #[test]
    fn manager_may_move_stock_but_not_delete_fashion() {
        let manager = ctx(Role::Manager);
        let cmd = CmdAuth {
            inner: (),
            required: vec![perms::STOCK_WRITE],
        };
        assert!(authorize_command(&manager, &cmd).is_ok());
        assert_eq!(
            require(&manager, &perms::FASHION_DELETE),
            Err(AuthzError::Forbidden("fashion.delete".to_string()))
        );
    }

    #[test]
    fn staff_is_read_only() {
        let staff = ctx(Role::Staff);
        assert!(require(&staff, &perms::CATALOG_READ).is_ok());
        assert!(require(&staff, &perms::STOCK_WRITE).is_err());
        assert!(require(&staff, &perms::DASHBOARD_MANAGER).is_err());
    }

    #[test]
    fn admin_passes_every_guard() {
        let admin = ctx(Role::Admin);
        for perm in [perms::ADMIN_USERS, perms::ALERTS_CLEANUP, perms::PRODUCTS_WRITE] {
            assert!(require(&admin, &perm).is_ok());
        }
    }
}
