use std::collections::HashSet;

use thiserror::Error;

use stockroom_core::UserId;

use crate::{Permission, Role, role_permissions};

/// An authenticated caller, resolved from a verified token and the current
/// user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn new(user_id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            permissions: role_permissions(role),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Permissions a command requires before it may be dispatched.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Pure policy check; no IO.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_wildcard_grants_admin_only_permissions() {
        let admin = Principal::new(UserId::new(), "root", Role::Admin);
        assert!(authorize(&admin, &Permission::new("admin.users")).is_ok());
        assert!(authorize(&admin, &Permission::new("products.write")).is_ok());
    }

    #[test]
    fn manager_is_forbidden_from_user_administration() {
        let manager = Principal::new(UserId::new(), "mia", Role::Manager);
        assert!(authorize(&manager, &Permission::new("stock.write")).is_ok());
        assert_eq!(
            authorize(&manager, &Permission::new("admin.users")),
            Err(AuthzError::Forbidden("admin.users".to_string()))
        );
    }
}
