//! Opportunity operations behind the authorization gate.
//!
//! Opportunities always hang off an account; the link is checked against
//! the caller's scope the same way contact links are.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::authz::{self, AuthzAction, RecordKind};
use crate::db::{CrmDb, DbOpportunity, OpportunityPatch};
use crate::error::CrmError;
use crate::identity::Identity;
use crate::scope::resolve_scope;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpportunityRequest {
    pub name: String,
    pub account_id: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub close_date: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn check_account_link(db: &CrmDb, who: &Identity, account_id: &str) -> Result<(), CrmError> {
    let account = db
        .get_account(account_id)?
        .ok_or_else(|| CrmError::validation("accountId does not reference a known account"))?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Account,
        &account.owner_id,
        AuthzAction::Read,
    )
    .require()
}

pub fn get_opportunity(db: &CrmDb, who: &Identity, id: &str) -> Result<DbOpportunity, CrmError> {
    let opportunity = db.get_opportunity(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Opportunity,
        &opportunity.owner_id,
        AuthzAction::Read,
    )
    .require()?;
    Ok(opportunity)
}

pub fn list_opportunities(db: &CrmDb, who: &Identity) -> Result<Vec<DbOpportunity>, CrmError> {
    let scope = resolve_scope(db, who)?;
    Ok(db.list_opportunities(&scope)?)
}

pub fn create_opportunity(
    db: &CrmDb,
    who: &Identity,
    req: CreateOpportunityRequest,
) -> Result<DbOpportunity, CrmError> {
    let name = super::required_field(&req.name, "name")?;
    check_account_link(db, who, &req.account_id)?;
    let owner_id = super::resolve_owner(db, who, req.owner_id)?;

    let now = Utc::now().to_rfc3339();
    let opportunity = DbOpportunity {
        id: Uuid::new_v4().to_string(),
        owner_id,
        account_id: req.account_id,
        name,
        stage: req
            .stage
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "prospecting".to_string()),
        amount: req.amount,
        close_date: req.close_date,
        created_at: now.clone(),
        updated_at: now,
    };
    db.insert_opportunity(&opportunity)?;
    Ok(opportunity)
}

pub fn update_opportunity(
    db: &CrmDb,
    who: &Identity,
    id: &str,
    patch: &OpportunityPatch,
) -> Result<DbOpportunity, CrmError> {
    let opportunity = db.get_opportunity(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Opportunity,
        &opportunity.owner_id,
        AuthzAction::Update,
    )
    .require()?;

    if let Some(name) = &patch.name {
        super::required_field(name, "name")?;
    }

    db.update_opportunity(id, patch)?;
    db.get_opportunity(id)?.ok_or(CrmError::NotFound)
}

pub fn delete_opportunity(db: &CrmDb, who: &Identity, id: &str) -> Result<(), CrmError> {
    let opportunity = db.get_opportunity(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Opportunity,
        &opportunity.owner_id,
        AuthzAction::Delete,
    )
    .require()?;

    db.delete_opportunity(id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::db::DbAccount;
    use crate::identity::Role;

    fn identity(user_id: &str, role: Role) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            role,
            manager_id: None,
        }
    }

    fn seed_account(db: &CrmDb, id: &str, owner: &str) {
        let now = Utc::now().to_rfc3339();
        db.insert_account(&DbAccount {
            id: id.to_string(),
            owner_id: owner.to_string(),
            name: format!("Account {id}"),
            website: None,
            phone: None,
            industry: None,
            created_at: now.clone(),
            updated_at: now,
        })
        .expect("seed account");
    }

    #[test]
    fn test_create_requires_in_scope_account() {
        let db = test_db();
        seed_account(&db, "a-mine", "u-1");
        seed_account(&db, "a-theirs", "u-2");
        let who = identity("u-1", Role::SalesRep);

        let ok = create_opportunity(
            &db,
            &who,
            CreateOpportunityRequest {
                name: "Renewal".to_string(),
                account_id: "a-mine".to_string(),
                stage: None,
                amount: None,
                close_date: None,
                owner_id: None,
            },
        )
        .expect("create");
        assert_eq!(ok.stage, "prospecting");

        let err = create_opportunity(
            &db,
            &who,
            CreateOpportunityRequest {
                name: "Poach".to_string(),
                account_id: "a-theirs".to_string(),
                stage: None,
                amount: None,
                close_date: None,
                owner_id: None,
            },
        )
        .expect_err("should deny");
        assert!(matches!(err, CrmError::Forbidden));
    }

    #[test]
    fn test_stranger_cannot_read_or_delete() {
        let db = test_db();
        seed_account(&db, "a-1", "u-1");
        let owner = identity("u-1", Role::SalesRep);
        let opp = create_opportunity(
            &db,
            &owner,
            CreateOpportunityRequest {
                name: "Expansion".to_string(),
                account_id: "a-1".to_string(),
                stage: Some("negotiation".to_string()),
                amount: Some(50_000.0),
                close_date: None,
                owner_id: None,
            },
        )
        .expect("create");

        let stranger = identity("u-9", Role::SalesRep);
        assert!(matches!(
            get_opportunity(&db, &stranger, &opp.id),
            Err(CrmError::Forbidden)
        ));
        assert!(matches!(
            delete_opportunity(&db, &stranger, &opp.id),
            Err(CrmError::Forbidden)
        ));

        // The owner may delete: opportunities carry no extra capability gate.
        delete_opportunity(&db, &owner, &opp.id).expect("owner delete");
        assert!(db.get_opportunity(&opp.id).expect("query").is_none());
    }
}
