//! Contact operations behind the authorization gate.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::authz::{self, AuthzAction, RecordKind};
use crate::db::{ContactPatch, CrmDb, DbContact};
use crate::error::CrmError;
use crate::identity::Identity;
use crate::scope::resolve_scope;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn has_person_seed(last_name: Option<&str>, email: Option<&str>) -> bool {
    last_name.map(str::trim).is_some_and(|s| !s.is_empty())
        || email.map(str::trim).is_some_and(|s| !s.is_empty())
}

/// An `accountId` link must point at a real account inside the caller's
/// scope; linking records across scopes would leak through the join.
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

pub fn get_contact(db: &CrmDb, who: &Identity, id: &str) -> Result<DbContact, CrmError> {
    let contact = db.get_contact(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Contact,
        &contact.owner_id,
        AuthzAction::Read,
    )
    .require()?;
    Ok(contact)
}

pub fn list_contacts(db: &CrmDb, who: &Identity) -> Result<Vec<DbContact>, CrmError> {
    let scope = resolve_scope(db, who)?;
    Ok(db.list_contacts(&scope)?)
}

pub fn create_contact(
    db: &CrmDb,
    who: &Identity,
    req: CreateContactRequest,
) -> Result<DbContact, CrmError> {
    if !has_person_seed(req.last_name.as_deref(), req.email.as_deref()) {
        return Err(CrmError::validation(
            "contact needs a last name or an email address",
        ));
    }
    if let Some(account_id) = &req.account_id {
        check_account_link(db, who, account_id)?;
    }
    let owner_id = super::resolve_owner(db, who, req.owner_id)?;

    let now = Utc::now().to_rfc3339();
    let contact = DbContact {
        id: Uuid::new_v4().to_string(),
        owner_id,
        account_id: req.account_id,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        phone: req.phone,
        title: req.title,
        created_at: now.clone(),
        updated_at: now,
    };
    db.insert_contact(&contact)?;
    Ok(contact)
}

pub fn update_contact(
    db: &CrmDb,
    who: &Identity,
    id: &str,
    patch: &ContactPatch,
) -> Result<DbContact, CrmError> {
    let contact = db.get_contact(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Contact,
        &contact.owner_id,
        AuthzAction::Update,
    )
    .require()?;

    if let Some(account_id) = &patch.account_id {
        check_account_link(db, who, account_id)?;
    }

    db.update_contact(id, patch)?;
    db.get_contact(id)?.ok_or(CrmError::NotFound)
}

pub fn delete_contact(db: &CrmDb, who: &Identity, id: &str) -> Result<(), CrmError> {
    let contact = db.get_contact(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Contact,
        &contact.owner_id,
        AuthzAction::Delete,
    )
    .require()?;

    db.delete_contact(id)?;
    Ok(())
}
