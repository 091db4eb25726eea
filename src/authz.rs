//! The record authorization gate.
//!
//! Single-record reads, updates, and deletes all pass through [`authorize`];
//! it is the only place ownership and role capability are compared.
//! Collection queries filter by scope at the SQL level instead and never
//! call the gate per row. Denial is a value, not an error; callers turn it
//! into the surface taxonomy with [`Decision::require`].

use crate::error::CrmError;
use crate::identity::Identity;
use crate::scope::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzAction {
    Read,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Account,
    Lead,
    Contact,
    Opportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The record's owner is outside the caller's resolved scope.
    OutOfScope,
    /// Ownership passed but the role lacks the capability (account
    /// deletion is ADMIN/FOUNDER only).
    MissingCapability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert a denial into the surface error. The reason stays internal;
    /// the wire only sees FORBIDDEN.
    pub fn require(self) -> Result<(), CrmError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(_) => Err(CrmError::Forbidden),
        }
    }
}

/// Decide whether `identity` may perform `action` on a record owned by
/// `owner_id`. The record's existence has already been settled by the
/// caller: a missing id is NOT_FOUND before the gate runs, which keeps
/// absent and out-of-scope ids distinguishable.
pub fn authorize(
    identity: &Identity,
    scope: &Scope,
    kind: RecordKind,
    owner_id: &str,
    action: AuthzAction,
) -> Decision {
    // Capability check is orthogonal to ownership: deleting an account is
    // role-gated even for records the caller owns.
    if action == AuthzAction::Delete
        && kind == RecordKind::Account
        && !identity.role.can_delete_accounts()
    {
        return Decision::Deny(DenyReason::MissingCapability);
    }

    if scope.permits(owner_id) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::OutOfScope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use crate::scope::scope_for;

    fn identity(user_id: &str, role: Role) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            role,
            manager_id: None,
        }
    }

    #[test]
    fn test_owner_may_read_and_update() {
        let who = identity("u-1", Role::SalesRep);
        let scope = scope_for(&who, &[]);
        for action in [AuthzAction::Read, AuthzAction::Update] {
            assert!(authorize(&who, &scope, RecordKind::Lead, "u-1", action).allowed());
        }
    }

    #[test]
    fn test_out_of_scope_is_denied() {
        let who = identity("u-2", Role::SalesRep);
        let scope = scope_for(&who, &[]);
        assert_eq!(
            authorize(&who, &scope, RecordKind::Lead, "u-1", AuthzAction::Read),
            Decision::Deny(DenyReason::OutOfScope)
        );
    }

    #[test]
    fn test_manager_sees_report_records() {
        let who = identity("m-1", Role::SalesManager);
        let scope = scope_for(&who, &["u-1".to_string()]);
        assert!(authorize(&who, &scope, RecordKind::Lead, "u-1", AuthzAction::Read).allowed());
    }

    #[test]
    fn test_admin_allowed_on_any_record_and_action() {
        let who = identity("admin", Role::Admin);
        let scope = scope_for(&who, &[]);
        for action in [AuthzAction::Read, AuthzAction::Update, AuthzAction::Delete] {
            for kind in [
                RecordKind::Account,
                RecordKind::Lead,
                RecordKind::Contact,
                RecordKind::Opportunity,
            ] {
                assert!(authorize(&who, &scope, kind, "someone-else", action).allowed());
            }
        }
    }

    #[test]
    fn test_owning_rep_cannot_delete_account() {
        let who = identity("u-1", Role::SalesRep);
        let scope = scope_for(&who, &[]);
        // Ownership matches, capability does not.
        assert_eq!(
            authorize(&who, &scope, RecordKind::Account, "u-1", AuthzAction::Delete),
            Decision::Deny(DenyReason::MissingCapability)
        );
        // Other record kinds delete under the ownership gate alone.
        assert!(authorize(&who, &scope, RecordKind::Lead, "u-1", AuthzAction::Delete).allowed());
    }

    #[test]
    fn test_non_owning_admin_may_delete_account() {
        let who = identity("admin", Role::Admin);
        let scope = scope_for(&who, &[]);
        assert!(
            authorize(&who, &scope, RecordKind::Account, "u-1", AuthzAction::Delete).allowed()
        );
    }

    #[test]
    fn test_require_maps_denial_to_forbidden() {
        let who = identity("u-2", Role::SalesRep);
        let scope = scope_for(&who, &[]);
        let err = authorize(&who, &scope, RecordKind::Lead, "u-1", AuthzAction::Read)
            .require()
            .expect_err("should deny");
        assert!(matches!(err, CrmError::Forbidden));
    }
}
