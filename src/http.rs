//! HTTP surface: routes, request identity, and error mapping.
//!
//! Identity arrives per request in the `X-User-Id` header and is resolved
//! against the org directory before any handler logic runs. Outcomes map to
//! status codes in one place (`status_for`); handlers never pick codes ad
//! hoc.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::{
    AccountPatch, ContactPatch, CrmDb, DbAccount, DbContact, DbLead, DbOpportunity, DbUser,
    LeadPatch, OpportunityPatch,
};
use crate::error::{ApiError, CrmError};
use crate::identity::Identity;
use crate::services;
use crate::services::accounts::CreateAccountRequest;
use crate::services::contacts::CreateContactRequest;
use crate::services::leads::{ConvertLeadRequest, Conversion, CreateLeadRequest};
use crate::services::opportunities::CreateOpportunityRequest;
use crate::services::users::CreateUserRequest;
use crate::state::AppState;

const USER_HEADER: &str = "x-user-id";

type ApiResult<T> = Result<(StatusCode, Json<T>), (StatusCode, Json<ApiError>)>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route("/leads", get(list_leads).post(create_lead))
        .route(
            "/leads/:id",
            get(get_lead).put(update_lead).delete(delete_lead),
        )
        .route("/leads/:id/convert", axum::routing::post(convert_lead))
        .route("/contacts", get(list_contacts).post(create_contact))
        .route(
            "/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route(
            "/opportunities",
            get(list_opportunities).post(create_opportunity),
        )
        .route(
            "/opportunities/:id",
            get(get_opportunity)
                .put(update_opportunity)
                .delete(delete_opportunity),
        )
        .with_state(state)
}

/// Map the error taxonomy onto status codes. The surface contract puts
/// state conflicts and bad input both on 400.
fn status_for(err: &CrmError) -> StatusCode {
    match err {
        CrmError::NotFound => StatusCode::NOT_FOUND,
        CrmError::Forbidden => StatusCode::FORBIDDEN,
        CrmError::Conflict(_) | CrmError::Validation(_) => StatusCode::BAD_REQUEST,
        CrmError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CrmError::PartialFailure { .. } | CrmError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fail<T>(err: CrmError) -> ApiResult<T> {
    match &err {
        CrmError::Db(inner) => tracing::error!("storage error: {inner}"),
        CrmError::PartialFailure { message, .. } => {
            tracing::error!("partial conversion failure: {message}")
        }
        _ => {}
    }
    Err((status_for(&err), Json(ApiError::from(&err))))
}

fn ok<T>(value: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(value)))
}

fn created<T>(value: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(value)))
}

/// Resolve the acting user from the request headers against the directory.
fn identify(db: &CrmDb, headers: &HeaderMap) -> Result<Identity, CrmError> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CrmError::Unauthenticated)?;
    let user = db.get_user(user_id)?.ok_or(CrmError::Unauthenticated)?;
    Ok(Identity::from_user(&user))
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let db = state.db.lock();
    match db.conn_ref().query_row("SELECT 1", [], |row| row.get::<_, i32>(0)) {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
            }),
        ),
        Err(e) => {
            tracing::error!("health check failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "error".to_string(),
                }),
            )
        }
    }
}

// =============================================================================
// Users
// =============================================================================

async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<DbUser> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::users::create_user(&db, &who, req) {
        Ok(user) => created(user),
        Err(e) => fail(e),
    }
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<DbUser> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::users::get_user(&db, &who, &id) {
        Ok(user) => ok(user),
        Err(e) => fail(e),
    }
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<DbUser>> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::users::list_users(&db, &who) {
        Ok(users) => ok(users),
        Err(e) => fail(e),
    }
}

// =============================================================================
// Accounts
// =============================================================================

async fn list_accounts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<DbAccount>> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::accounts::list_accounts(&db, &who) {
        Ok(accounts) => ok(accounts),
        Err(e) => fail(e),
    }
}

async fn create_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<DbAccount> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::accounts::create_account(&db, &who, req) {
        Ok(account) => created(account),
        Err(e) => fail(e),
    }
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<DbAccount> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::accounts::get_account(&db, &who, &id) {
        Ok(account) => ok(account),
        Err(e) => fail(e),
    }
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<AccountPatch>,
) -> ApiResult<DbAccount> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::accounts::update_account(&db, &who, &id, &patch) {
        Ok(account) => ok(account),
        Err(e) => fail(e),
    }
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::accounts::delete_account(&db, &who, &id) {
        Ok(()) => ok(serde_json::json!({ "deleted": id })),
        Err(e) => fail(e),
    }
}

// =============================================================================
// Leads
// =============================================================================

async fn list_leads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<DbLead>> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::leads::list_leads(&db, &who) {
        Ok(leads) => ok(leads),
        Err(e) => fail(e),
    }
}

async fn create_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateLeadRequest>,
) -> ApiResult<DbLead> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::leads::create_lead(&db, &who, req) {
        Ok(lead) => created(lead),
        Err(e) => fail(e),
    }
}

async fn get_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<DbLead> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::leads::get_lead(&db, &who, &id) {
        Ok(lead) => ok(lead),
        Err(e) => fail(e),
    }
}

async fn update_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<LeadPatch>,
) -> ApiResult<DbLead> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::leads::update_lead(&db, &who, &id, &patch) {
        Ok(lead) => ok(lead),
        Err(e) => fail(e),
    }
}

async fn delete_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::leads::delete_lead(&db, &who, &id) {
        Ok(()) => ok(serde_json::json!({ "deleted": id })),
        Err(e) => fail(e),
    }
}

async fn convert_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ConvertLeadRequest>>,
) -> ApiResult<Conversion> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    let req = body.map(|Json(req)| req).unwrap_or_default();
    match services::leads::convert_lead(&db, &who, &id, &req) {
        Ok(conversion) => created(conversion),
        Err(e) => fail(e),
    }
}

// =============================================================================
// Contacts
// =============================================================================

async fn list_contacts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<DbContact>> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::contacts::list_contacts(&db, &who) {
        Ok(contacts) => ok(contacts),
        Err(e) => fail(e),
    }
}

async fn create_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateContactRequest>,
) -> ApiResult<DbContact> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::contacts::create_contact(&db, &who, req) {
        Ok(contact) => created(contact),
        Err(e) => fail(e),
    }
}

async fn get_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<DbContact> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::contacts::get_contact(&db, &who, &id) {
        Ok(contact) => ok(contact),
        Err(e) => fail(e),
    }
}

async fn update_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<ContactPatch>,
) -> ApiResult<DbContact> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::contacts::update_contact(&db, &who, &id, &patch) {
        Ok(contact) => ok(contact),
        Err(e) => fail(e),
    }
}

async fn delete_contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::contacts::delete_contact(&db, &who, &id) {
        Ok(()) => ok(serde_json::json!({ "deleted": id })),
        Err(e) => fail(e),
    }
}

// =============================================================================
// Opportunities
// =============================================================================

async fn list_opportunities(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<DbOpportunity>> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::opportunities::list_opportunities(&db, &who) {
        Ok(opportunities) => ok(opportunities),
        Err(e) => fail(e),
    }
}

async fn create_opportunity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateOpportunityRequest>,
) -> ApiResult<DbOpportunity> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::opportunities::create_opportunity(&db, &who, req) {
        Ok(opportunity) => created(opportunity),
        Err(e) => fail(e),
    }
}

async fn get_opportunity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<DbOpportunity> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::opportunities::get_opportunity(&db, &who, &id) {
        Ok(opportunity) => ok(opportunity),
        Err(e) => fail(e),
    }
}

async fn update_opportunity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<OpportunityPatch>,
) -> ApiResult<DbOpportunity> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::opportunities::update_opportunity(&db, &who, &id, &patch) {
        Ok(opportunity) => ok(opportunity),
        Err(e) => fail(e),
    }
}

async fn delete_opportunity(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    let who = match identify(&db, &headers) {
        Ok(who) => who,
        Err(e) => return fail(e),
    };
    match services::opportunities::delete_opportunity(&db, &who, &id) {
        Ok(()) => ok(serde_json::json!({ "deleted": id })),
        Err(e) => fail(e),
    }
}
