//! Org directory administration.
//!
//! The resolver reads the directory on every request, so provisioning is
//! deliberately small: create and read. Mutation is restricted to the
//! org-wide roles; the first users of a fresh database come from seeding.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{CrmDb, DbUser};
use crate::error::CrmError;
use crate::identity::{Identity, Role};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    /// Role token; unknown values land on OTHER.
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub manager_id: Option<String>,
}

pub fn create_user(db: &CrmDb, who: &Identity, req: CreateUserRequest) -> Result<DbUser, CrmError> {
    if !who.role.is_unrestricted() {
        return Err(CrmError::Forbidden);
    }

    let name = super::required_field(&req.name, "name")?;
    let email = super::required_field(&req.email, "email")?;
    if db.get_user_by_email(&email)?.is_some() {
        return Err(CrmError::validation("email is already in use"));
    }
    if let Some(manager_id) = &req.manager_id {
        if db.get_user(manager_id)?.is_none() {
            return Err(CrmError::validation(
                "managerId does not reference a known user",
            ));
        }
    }

    let now = Utc::now().to_rfc3339();
    let user = DbUser {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        role: req.role.unwrap_or(Role::Other),
        manager_id: req.manager_id,
        created_at: now.clone(),
        updated_at: now,
    };
    db.upsert_user(&user)?;
    Ok(user)
}

pub fn get_user(db: &CrmDb, _who: &Identity, id: &str) -> Result<DbUser, CrmError> {
    db.get_user(id)?.ok_or(CrmError::NotFound)
}

pub fn list_users(db: &CrmDb, who: &Identity) -> Result<Vec<DbUser>, CrmError> {
    if !who.role.is_unrestricted() {
        return Err(CrmError::Forbidden);
    }
    Ok(db.list_users()?)
}
