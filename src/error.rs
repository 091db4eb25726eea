//! Error taxonomy for the CRM core.
//!
//! The surface keeps four outcomes distinguishable: an id that resolves to
//! nothing (NotFound), a record that exists but sits outside the caller's
//! scope (Forbidden), a state-machine guard violation (Conflict), and bad
//! input (Validation). A conversion that leaves orphaned records behind is
//! its own kind and carries the created ids so an operator can reconcile.

use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("record not found")]
    NotFound,

    #[error("you do not have access to this record")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    /// Conversion failed after some records were written and the rollback
    /// could not be confirmed.
    #[error("conversion partially applied: {message}")]
    PartialFailure {
        account_id: Option<String>,
        contact_id: Option<String>,
        message: String,
    },

    #[error("missing or unknown user identity")]
    Unauthenticated,

    #[error("storage error: {0}")]
    Db(#[from] DbError),
}

impl CrmError {
    pub fn conflict(message: impl Into<String>) -> Self {
        CrmError::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CrmError::Validation(message.into())
    }

    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            CrmError::NotFound => "NOT_FOUND",
            CrmError::Forbidden => "FORBIDDEN",
            CrmError::Conflict(_) => "CONFLICT",
            CrmError::Validation(_) => "VALIDATION",
            CrmError::PartialFailure { .. } => "PARTIAL_FAILURE",
            CrmError::Unauthenticated => "UNAUTHENTICATED",
            CrmError::Db(_) => "INTERNAL",
        }
    }
}

/// Serializable error representation for the HTTP surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_contact_id: Option<String>,
}

impl From<&CrmError> for ApiError {
    fn from(err: &CrmError) -> Self {
        let (created_account_id, created_contact_id) = match err {
            CrmError::PartialFailure {
                account_id,
                contact_id,
                ..
            } => (account_id.clone(), contact_id.clone()),
            _ => (None, None),
        };

        // Storage detail stays in the log, never on the wire.
        let message = match err {
            CrmError::Db(_) => "internal storage error".to_string(),
            other => other.to_string(),
        };

        ApiError {
            code: err.code().to_string(),
            message,
            created_account_id,
            created_contact_id,
        }
    }
}
