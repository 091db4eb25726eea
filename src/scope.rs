//! Access scope resolution.
//!
//! A scope is the set of owner ids the acting user may touch, or the
//! unrestricted sentinel for org-wide roles. Managers see themselves plus
//! direct reports only; visibility is one level deep, so resolution costs
//! at most one directory query and can never walk a cycle.

use std::collections::HashSet;

use crate::db::{CrmDb, DbError};
use crate::identity::{Identity, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Org-wide access. Kept as a sentinel rather than an enumerated user
    /// set so large orgs don't pay for it.
    Unrestricted,
    /// The exact set of owner ids the caller may access.
    Owners(HashSet<String>),
}

impl Scope {
    pub fn permits(&self, owner_id: &str) -> bool {
        match self {
            Scope::Unrestricted => true,
            Scope::Owners(ids) => ids.contains(owner_id),
        }
    }

    pub fn self_only(user_id: &str) -> Scope {
        Scope::Owners(std::iter::once(user_id.to_string()).collect())
    }
}

/// Pure core: fold a directory result into a scope.
///
/// `direct_report_ids` is only consulted for SALES_MANAGER. Every role the
/// match does not name, including `Other` (where unknown tokens land),
/// falls through to self-only.
pub fn scope_for(identity: &Identity, direct_report_ids: &[String]) -> Scope {
    match identity.role {
        Role::Admin | Role::Founder => Scope::Unrestricted,
        Role::SalesManager => {
            let mut ids: HashSet<String> = direct_report_ids.iter().cloned().collect();
            ids.insert(identity.user_id.clone());
            Scope::Owners(ids)
        }
        _ => Scope::self_only(&identity.user_id),
    }
}

/// Resolve the caller's scope: one directory query for managers, none for
/// anyone else.
pub fn resolve_scope(db: &CrmDb, identity: &Identity) -> Result<Scope, DbError> {
    match identity.role {
        Role::SalesManager => {
            let reports = db.get_user_ids_by_manager(&identity.user_id)?;
            Ok(scope_for(identity, &reports))
        }
        _ => Ok(scope_for(identity, &[])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(user_id: &str, role: Role) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            role,
            manager_id: None,
        }
    }

    #[test]
    fn test_restricted_roles_resolve_to_self_only() {
        for role in [
            Role::SalesRep,
            Role::AccountManager,
            Role::ProjectManager,
            Role::SupportStaff,
            Role::Other,
        ] {
            let scope = scope_for(&identity("u-1", role), &[]);
            assert_eq!(scope, Scope::self_only("u-1"), "role {role} should be self-only");
        }
    }

    #[test]
    fn test_admin_and_founder_are_unrestricted() {
        assert_eq!(
            scope_for(&identity("u-1", Role::Admin), &[]),
            Scope::Unrestricted
        );
        assert_eq!(
            scope_for(&identity("u-1", Role::Founder), &[]),
            Scope::Unrestricted
        );
    }

    #[test]
    fn test_manager_scope_is_self_plus_direct_reports() {
        let reports = vec!["r-1".to_string(), "r-2".to_string()];
        let scope = scope_for(&identity("m-1", Role::SalesManager), &reports);

        assert!(scope.permits("m-1"));
        assert!(scope.permits("r-1"));
        assert!(scope.permits("r-2"));
        // A report-of-a-report never appears in the directory result the
        // resolver passes in, so it is simply absent.
        assert!(!scope.permits("r-3"));
    }

    #[test]
    fn test_manager_directory_result_ignored_for_other_roles() {
        let reports = vec!["r-1".to_string()];
        let scope = scope_for(&identity("u-1", Role::SalesRep), &reports);
        assert!(!scope.permits("r-1"));
    }

    #[test]
    fn test_resolve_scope_against_directory() {
        use crate::db::test_utils::test_db;
        use crate::db::DbUser;

        let db = test_db();
        let now = chrono::Utc::now().to_rfc3339();
        for (id, role, manager) in [
            ("m-1", Role::SalesManager, None),
            ("r-1", Role::SalesRep, Some("m-1")),
            ("r-2", Role::SalesRep, Some("m-1")),
            ("r-3", Role::SalesRep, Some("r-1")),
        ] {
            db.upsert_user(&DbUser {
                id: id.to_string(),
                name: id.to_string(),
                email: format!("{id}@example.com"),
                role,
                manager_id: manager.map(str::to_string),
                created_at: now.clone(),
                updated_at: now.clone(),
            })
            .expect("seed user");
        }

        let scope = resolve_scope(&db, &identity("m-1", Role::SalesManager)).expect("resolve");
        assert!(scope.permits("m-1"));
        assert!(scope.permits("r-1"));
        assert!(scope.permits("r-2"));
        assert!(!scope.permits("r-3"), "visibility must not be transitive");
    }
}
