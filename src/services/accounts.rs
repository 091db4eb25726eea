//! Account operations behind the authorization gate.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::authz::{self, AuthzAction, RecordKind};
use crate::db::{AccountPatch, CrmDb, DbAccount};
use crate::error::CrmError;
use crate::identity::Identity;
use crate::scope::resolve_scope;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    /// Defaults to the caller; naming someone else requires them to be in
    /// the caller's scope.
    #[serde(default)]
    pub owner_id: Option<String>,
}

pub fn get_account(db: &CrmDb, who: &Identity, id: &str) -> Result<DbAccount, CrmError> {
    let account = db.get_account(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Account,
        &account.owner_id,
        AuthzAction::Read,
    )
    .require()?;
    Ok(account)
}

pub fn list_accounts(db: &CrmDb, who: &Identity) -> Result<Vec<DbAccount>, CrmError> {
    let scope = resolve_scope(db, who)?;
    Ok(db.list_accounts(&scope)?)
}

pub fn create_account(
    db: &CrmDb,
    who: &Identity,
    req: CreateAccountRequest,
) -> Result<DbAccount, CrmError> {
    let name = super::required_field(&req.name, "name")?;
    let owner_id = super::resolve_owner(db, who, req.owner_id)?;

    let now = Utc::now().to_rfc3339();
    let account = DbAccount {
        id: Uuid::new_v4().to_string(),
        owner_id,
        name,
        website: req.website,
        phone: req.phone,
        industry: req.industry,
        created_at: now.clone(),
        updated_at: now,
    };
    db.insert_account(&account)?;
    Ok(account)
}

pub fn update_account(
    db: &CrmDb,
    who: &Identity,
    id: &str,
    patch: &AccountPatch,
) -> Result<DbAccount, CrmError> {
    let account = db.get_account(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Account,
        &account.owner_id,
        AuthzAction::Update,
    )
    .require()?;

    if let Some(name) = &patch.name {
        super::required_field(name, "name")?;
    }

    db.update_account(id, patch)?;
    db.get_account(id)?.ok_or(CrmError::NotFound)
}

pub fn delete_account(db: &CrmDb, who: &Identity, id: &str) -> Result<(), CrmError> {
    let account = db.get_account(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Account,
        &account.owner_id,
        AuthzAction::Delete,
    )
    .require()?;

    db.delete_account(id)?;
    Ok(())
}
