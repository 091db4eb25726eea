//! Business operations over the store, each gated by the caller's scope.
//!
//! Every function takes the acting [`Identity`](crate::identity::Identity)
//! explicitly; nothing here reads ambient auth state.

pub mod accounts;
pub mod contacts;
pub mod leads;
pub mod opportunities;
pub mod users;

use crate::db::CrmDb;
use crate::error::CrmError;
use crate::identity::Identity;
use crate::scope::resolve_scope;

/// Resolve the owner for a new record. Defaults to the caller; naming
/// someone else requires that user to exist and to sit inside the caller's
/// scope.
pub(crate) fn resolve_owner(
    db: &CrmDb,
    who: &Identity,
    requested: Option<String>,
) -> Result<String, CrmError> {
    match requested {
        None => Ok(who.user_id.clone()),
        Some(owner_id) if owner_id == who.user_id => Ok(owner_id),
        Some(owner_id) => {
            let scope = resolve_scope(db, who)?;
            if !scope.permits(&owner_id) {
                return Err(CrmError::Forbidden);
            }
            if db.get_user(&owner_id)?.is_none() {
                return Err(CrmError::validation(
                    "ownerId does not reference a known user",
                ));
            }
            Ok(owner_id)
        }
    }
}

/// Reject empty or whitespace-only required strings.
pub(crate) fn required_field(value: &str, field: &str) -> Result<String, CrmError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CrmError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::DbUser;
    use crate::identity::Role;

    fn seed_user(db: &CrmDb, id: &str, role: Role, manager_id: Option<&str>) {
        let now = chrono::Utc::now().to_rfc3339();
        db.upsert_user(&DbUser {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
            role,
            manager_id: manager_id.map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        })
        .expect("seed user");
    }

    fn identity(user_id: &str, role: Role) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            role,
            manager_id: None,
        }
    }

    #[test]
    fn test_resolve_owner_defaults_to_caller() {
        let db = test_db();
        let who = identity("u-1", Role::SalesRep);
        assert_eq!(resolve_owner(&db, &who, None).expect("resolve"), "u-1");
    }

    #[test]
    fn test_resolve_owner_rejects_out_of_scope_assignee() {
        let db = test_db();
        seed_user(&db, "u-2", Role::SalesRep, None);
        let who = identity("u-1", Role::SalesRep);
        let err = resolve_owner(&db, &who, Some("u-2".to_string())).expect_err("should deny");
        assert!(matches!(err, CrmError::Forbidden));
    }

    #[test]
    fn test_resolve_owner_allows_manager_assigning_report() {
        let db = test_db();
        seed_user(&db, "m-1", Role::SalesManager, None);
        seed_user(&db, "r-1", Role::SalesRep, Some("m-1"));
        let who = identity("m-1", Role::SalesManager);
        assert_eq!(
            resolve_owner(&db, &who, Some("r-1".to_string())).expect("resolve"),
            "r-1"
        );
    }

    #[test]
    fn test_resolve_owner_requires_assignee_to_exist() {
        let db = test_db();
        let who = identity("admin", Role::Admin);
        let err = resolve_owner(&db, &who, Some("ghost".to_string())).expect_err("should reject");
        assert!(matches!(err, CrmError::Validation(_)));
    }
}
