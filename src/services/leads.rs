//! Lead operations, including the one-time conversion into an
//! Account + Contact pair.
//!
//! Conversion is the only path to `CONVERTED`. The whole unit (account,
//! contact, optional opportunity, then the conditional status flip) runs
//! inside one transaction with the lead update as the last write, so a lost
//! race rolls the entire unit back and surfaces as a conflict instead of
//! double-creating records.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authz::{self, AuthzAction, RecordKind};
use crate::db::{CrmDb, DbAccount, DbContact, DbLead, DbOpportunity, LeadPatch, LeadStatus};
use crate::error::CrmError;
use crate::identity::Identity;
use crate::scope::resolve_scope;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Optional opportunity to open alongside the conversion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpportunitySeed {
    pub name: Option<String>,
    pub stage: Option<String>,
    pub amount: Option<f64>,
    pub close_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertLeadRequest {
    pub opportunity: Option<OpportunitySeed>,
}

/// Everything a successful conversion created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub account: DbAccount,
    pub contact: DbContact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity: Option<DbOpportunity>,
}

pub fn get_lead(db: &CrmDb, who: &Identity, id: &str) -> Result<DbLead, CrmError> {
    let lead = db.get_lead(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(who, &scope, RecordKind::Lead, &lead.owner_id, AuthzAction::Read)
        .require()?;
    Ok(lead)
}

pub fn list_leads(db: &CrmDb, who: &Identity) -> Result<Vec<DbLead>, CrmError> {
    let scope = resolve_scope(db, who)?;
    Ok(db.list_leads(&scope)?)
}

pub fn create_lead(db: &CrmDb, who: &Identity, req: CreateLeadRequest) -> Result<DbLead, CrmError> {
    let has_seed = req
        .company
        .as_deref()
        .map(str::trim)
        .is_some_and(|s| !s.is_empty())
        || req
            .email
            .as_deref()
            .map(str::trim)
            .is_some_and(|s| !s.is_empty());
    if !has_seed {
        return Err(CrmError::validation(
            "lead needs at least a company name or an email address",
        ));
    }
    let owner_id = super::resolve_owner(db, who, req.owner_id)?;

    let now = Utc::now().to_rfc3339();
    let lead = DbLead {
        id: Uuid::new_v4().to_string(),
        owner_id,
        status: LeadStatus::New,
        company: req.company,
        website: req.website,
        phone: req.phone,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        title: req.title,
        converted_account_id: None,
        converted_contact_id: None,
        created_at: now.clone(),
        updated_at: now,
    };
    db.insert_lead(&lead)?;
    Ok(lead)
}

pub fn update_lead(
    db: &CrmDb,
    who: &Identity,
    id: &str,
    patch: &LeadPatch,
) -> Result<DbLead, CrmError> {
    let lead = db.get_lead(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Lead,
        &lead.owner_id,
        AuthzAction::Update,
    )
    .require()?;

    if lead.status.is_converted() {
        return Err(CrmError::conflict("a converted lead is terminal"));
    }

    let mut checked = patch.clone();
    if let Some(status) = &patch.status {
        let parsed = LeadStatus::parse(status);
        if parsed.is_converted() {
            return Err(CrmError::validation(
                "status cannot be set to CONVERTED directly; use the convert operation",
            ));
        }
        // Store the canonical token, not whatever casing came in.
        checked.status = Some(parsed.as_str().to_string());
    }

    db.update_lead(id, &checked)?;
    db.get_lead(id)?.ok_or(CrmError::NotFound)
}

pub fn delete_lead(db: &CrmDb, who: &Identity, id: &str) -> Result<(), CrmError> {
    let lead = db.get_lead(id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Lead,
        &lead.owner_id,
        AuthzAction::Delete,
    )
    .require()?;

    db.delete_lead(id)?;
    Ok(())
}

/// Seed fields the conversion copies out of the lead. Extracted up front so
/// validation fails before anything is written.
struct ConversionSeeds {
    company: String,
}

impl ConversionSeeds {
    fn from_lead(lead: &DbLead) -> Result<Self, CrmError> {
        let company = lead
            .company
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CrmError::validation("lead is missing a company name"))?;

        let has_person = lead
            .last_name
            .as_deref()
            .map(str::trim)
            .is_some_and(|s| !s.is_empty())
            || lead
                .email
                .as_deref()
                .map(str::trim)
                .is_some_and(|s| !s.is_empty());
        if !has_person {
            return Err(CrmError::validation(
                "lead is missing contact details (last name or email)",
            ));
        }

        Ok(ConversionSeeds {
            company: company.to_string(),
        })
    }
}

/// Convert an open lead into an Account + Contact pair, optionally opening
/// an Opportunity on the new account.
pub fn convert_lead(
    db: &CrmDb,
    who: &Identity,
    lead_id: &str,
    req: &ConvertLeadRequest,
) -> Result<Conversion, CrmError> {
    let lead = db.get_lead(lead_id)?.ok_or(CrmError::NotFound)?;
    let scope = resolve_scope(db, who)?;
    authz::authorize(
        who,
        &scope,
        RecordKind::Lead,
        &lead.owner_id,
        AuthzAction::Update,
    )
    .require()?;

    // Idempotency guard: converting twice must not create anything new.
    if lead.status.is_converted() {
        return Err(CrmError::conflict("lead has already been converted"));
    }

    let seeds = ConversionSeeds::from_lead(&lead)?;
    let now = Utc::now().to_rfc3339();

    // Created records inherit the lead's owner, not the caller: a manager
    // converting a report's lead leaves the report owning the outcome.
    let account = DbAccount {
        id: Uuid::new_v4().to_string(),
        owner_id: lead.owner_id.clone(),
        name: seeds.company.clone(),
        website: lead.website.clone(),
        phone: lead.phone.clone(),
        industry: None,
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    let contact = DbContact {
        id: Uuid::new_v4().to_string(),
        owner_id: lead.owner_id.clone(),
        account_id: Some(account.id.clone()),
        first_name: lead.first_name.clone(),
        last_name: lead.last_name.clone(),
        email: lead.email.clone(),
        phone: lead.phone.clone(),
        title: lead.title.clone(),
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    let opportunity = req.opportunity.as_ref().map(|seed| DbOpportunity {
        id: Uuid::new_v4().to_string(),
        owner_id: lead.owner_id.clone(),
        account_id: account.id.clone(),
        name: seed
            .name
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("{} opportunity", seeds.company)),
        stage: seed
            .stage
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "prospecting".to_string()),
        amount: seed.amount,
        close_date: seed.close_date.clone(),
        created_at: now.clone(),
        updated_at: now,
    });

    // Account, contact, optional opportunity, then the conditional status
    // flip. The lead update stays the last write of the unit.
    let result = db.with_transaction(|tx| {
        tx.insert_account(&account)?;
        tx.insert_contact(&contact)?;
        if let Some(opp) = &opportunity {
            tx.insert_opportunity(opp)?;
        }
        let won = tx.mark_lead_converted(&lead.id, &account.id, &contact.id)?;
        if !won {
            return Err(CrmError::conflict("lead has already been converted"));
        }
        Ok(())
    });

    match result {
        Ok(()) => {
            tracing::info!(
                lead = %lead.id,
                account = %account.id,
                contact = %contact.id,
                "lead converted"
            );
            Ok(Conversion {
                account,
                contact,
                opportunity,
            })
        }
        Err(failure) if failure.rollback_failed => Err(CrmError::PartialFailure {
            account_id: Some(account.id.clone()),
            contact_id: Some(contact.id.clone()),
            message: failure.source.to_string(),
        }),
        Err(failure) => Err(failure.source),
    }
}
