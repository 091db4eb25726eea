//! Per-request identity context.
//!
//! Roles are a closed set. `Role::parse` never fails: a string we do not
//! recognise becomes `Other`, which resolves to a self-only scope, so bad
//! or stale role data can only narrow access, never widen it. The identity is
//! passed explicitly into every service call; nothing reads ambient
//! session state.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::db::DbUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Founder,
    SalesManager,
    SalesRep,
    AccountManager,
    ProjectManager,
    SupportStaff,
    Other,
}

impl Role {
    /// Parse a role token. Unknown strings land on `Other` (fail-closed).
    pub fn parse(s: &str) -> Role {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Role::Admin,
            "FOUNDER" => Role::Founder,
            "SALES_MANAGER" => Role::SalesManager,
            "SALES_REP" => Role::SalesRep,
            "ACCOUNT_MANAGER" => Role::AccountManager,
            "PROJECT_MANAGER" => Role::ProjectManager,
            "SUPPORT_STAFF" => Role::SupportStaff,
            _ => Role::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Founder => "FOUNDER",
            Role::SalesManager => "SALES_MANAGER",
            Role::SalesRep => "SALES_REP",
            Role::AccountManager => "ACCOUNT_MANAGER",
            Role::ProjectManager => "PROJECT_MANAGER",
            Role::SupportStaff => "SUPPORT_STAFF",
            Role::Other => "OTHER",
        }
    }

    /// ADMIN and FOUNDER see every record in the org.
    pub fn is_unrestricted(self) -> bool {
        matches!(self, Role::Admin | Role::Founder)
    }

    /// Account deletion is role-gated on top of ownership: only ADMIN and
    /// FOUNDER may delete an account, owner or not.
    pub fn can_delete_accounts(self) -> bool {
        self.is_unrestricted()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Deserialization routes through `parse` so the fail-closed default applies
// on every input path, not just database reads.
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Role::parse(&s))
    }
}

/// The acting user for one request: who they are, what role they hold, and
/// who they report to.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
    pub manager_id: Option<String>,
}

impl Identity {
    pub fn from_user(user: &DbUser) -> Self {
        Identity {
            user_id: user.id.clone(),
            role: user.role,
            manager_id: user.manager_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_roles() {
        assert_eq!(Role::parse("ADMIN"), Role::Admin);
        assert_eq!(Role::parse("sales_manager"), Role::SalesManager);
        assert_eq!(Role::parse("  Sales_Rep "), Role::SalesRep);
    }

    #[test]
    fn test_parse_unknown_role_is_fail_closed() {
        assert_eq!(Role::parse("SUPERUSER"), Role::Other);
        assert_eq!(Role::parse(""), Role::Other);
        assert!(!Role::parse("SUPERUSER").is_unrestricted());
    }

    #[test]
    fn test_roundtrip_through_as_str() {
        for role in [
            Role::Admin,
            Role::Founder,
            Role::SalesManager,
            Role::SalesRep,
            Role::AccountManager,
            Role::ProjectManager,
            Role::SupportStaff,
            Role::Other,
        ] {
            assert_eq!(Role::parse(role.as_str()), role);
        }
    }

    #[test]
    fn test_delete_capability_tracks_unrestricted_roles() {
        assert!(Role::Admin.can_delete_accounts());
        assert!(Role::Founder.can_delete_accounts());
        assert!(!Role::SalesManager.can_delete_accounts());
        assert!(!Role::SalesRep.can_delete_accounts());
    }

    #[test]
    fn test_deserialize_unknown_role() {
        let role: Role = serde_json::from_str("\"WIZARD\"").expect("deserialize");
        assert_eq!(role, Role::Other);
    }
}
