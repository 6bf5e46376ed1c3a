use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Account role. Serialized upper-case, as the frontend stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Manager,
    Staff,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Staff];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Staff => "STAFF",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

const MANAGER_PERMISSIONS: &[&str] = &[
    "catalog.read",
    "fashion.write",
    "stock.read",
    "stock.write",
    "stock.audit",
    "stock.export",
    "alerts.read",
    "alerts.resolve",
    "transactions.read",
    "reports.export",
    "dashboard.manager",
];

const STAFF_PERMISSIONS: &[&str] = &[
    "catalog.read",
    "stock.read",
    "alerts.read",
    "transactions.read",
    "dashboard.staff",
];

/// Static role → permission policy.
///
/// Admin-only capabilities (`products.write`, `fashion.delete`,
/// `alerts.delete`, `alerts.cleanup`, `admin.users`, `admin.stats`) are not
/// listed anywhere; only the wildcard reaches them.
pub fn role_permissions(role: Role) -> Vec<Permission> {
    let names: &[&'static str] = match role {
        Role::Admin => &["*"],
        Role::Manager => MANAGER_PERMISSIONS,
        Role::Staff => STAFF_PERMISSIONS,
    };
    names.iter().copied().map(Permission::from_static).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(" Staff ".parse::<Role>().unwrap(), Role::Staff);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let r: Role = serde_json::from_str("\"STAFF\"").unwrap();
        assert_eq!(r, Role::Staff);
    }

    #[test]
    fn only_admin_holds_the_wildcard() {
        assert!(role_permissions(Role::Admin).iter().any(Permission::is_wildcard));
        assert!(!role_permissions(Role::Manager).iter().any(Permission::is_wildcard));
        assert!(!role_permissions(Role::Staff).iter().any(Permission::is_wildcard));
    }

    #[test]
    fn staff_cannot_move_stock() {
        let perms = role_permissions(Role::Staff);
        assert!(!perms.iter().any(|p| p.as_str() == "stock.write"));
        assert!(perms.iter().any(|p| p.as_str() == "catalog.read"));
    }
}
