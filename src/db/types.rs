//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Role;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// Lead pipeline states. Everything before `Converted` is open and may still
/// convert; `Converted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Working,
    Nurturing,
    Qualified,
    Converted,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "NEW",
            LeadStatus::Working => "WORKING",
            LeadStatus::Nurturing => "NURTURING",
            LeadStatus::Qualified => "QUALIFIED",
            LeadStatus::Converted => "CONVERTED",
        }
    }

    /// The schema constrains the column to the five known tokens; an
    /// unexpected value reads back as `New` rather than failing the row.
    pub fn parse(s: &str) -> LeadStatus {
        match s.trim().to_ascii_uppercase().as_str() {
            "WORKING" => LeadStatus::Working,
            "NURTURING" => LeadStatus::Nurturing,
            "QUALIFIED" => LeadStatus::Qualified,
            "CONVERTED" => LeadStatus::Converted,
            _ => LeadStatus::New,
        }
    }

    pub fn is_converted(self) -> bool {
        matches!(self, LeadStatus::Converted)
    }
}

/// A row from the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `accounts` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbAccount {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `contacts` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbContact {
    pub id: String,
    pub owner_id: String,
    pub account_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `leads` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbLead {
    pub id: String,
    pub owner_id: String,
    pub status: LeadStatus,
    pub company: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    /// Set when the lead converts; terminal together with `status`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_contact_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A row from the `opportunities` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbOpportunity {
    pub id: String,
    pub owner_id: String,
    pub account_id: String,
    pub name: String,
    pub stage: String,
    pub amount: Option<f64>,
    pub close_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Whitelisted account fields for updates. `owner_id` is deliberately
/// absent: ownership never changes through the update surface.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
}

/// Whitelisted contact fields for updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactPatch {
    pub account_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
}

/// Whitelisted lead fields for updates. `status` is carried as a raw token
/// and validated in the service layer so that `CONVERTED` can never be set
/// directly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadPatch {
    pub status: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
}

/// Whitelisted opportunity fields for updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpportunityPatch {
    pub name: Option<String>,
    pub stage: Option<String>,
    pub amount: Option<f64>,
    pub close_date: Option<String>,
}
