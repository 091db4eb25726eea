//! Salesdesk: the ownership-scoped core of a CRM backend.
//!
//! Every owned record (account, lead, contact, opportunity) carries an
//! `owner_id`; a per-request [`identity::Identity`] resolves to a
//! [`scope::Scope`] of owner ids, and [`authz::authorize`] is the single
//! gate in front of record reads, updates, and deletes. Lead conversion is
//! the one multi-step transition and runs inside a SQLite transaction.

pub mod authz;
pub mod db;
pub mod error;
pub mod http;
pub mod identity;
mod migrations;
pub mod scope;
pub mod services;
pub mod state;
