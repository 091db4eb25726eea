//! SQLite-based store for the CRM core.
//!
//! The database lives at `~/.salesdesk/salesdesk.db` and holds the org
//! directory plus every owned record. WAL mode keeps concurrent reads cheap;
//! all writes go through the single shared connection owned by the server
//! state.

use std::path::PathBuf;

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::CrmError;
use crate::scope::Scope;

pub mod types;
pub use types::*;

pub mod accounts;
pub mod contacts;
pub mod leads;
pub mod opportunities;
pub mod users;

pub struct CrmDb {
    conn: Connection,
}

/// Failure inside [`CrmDb::with_transaction`]: the closure error plus
/// whether the rollback completed. When it did not, the database may hold a
/// partial write set and the caller must surface what it created.
#[derive(Debug)]
pub struct TxFailure {
    pub source: CrmError,
    pub rollback_failed: bool,
}

impl CrmDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T, TxFailure>
    where
        F: FnOnce(&Self) -> Result<T, CrmError>,
    {
        if let Err(e) = self.conn.execute_batch("BEGIN IMMEDIATE") {
            return Err(TxFailure {
                source: CrmError::Db(e.into()),
                rollback_failed: false,
            });
        }
        match f(self) {
            Ok(val) => match self.conn.execute_batch("COMMIT") {
                Ok(()) => Ok(val),
                Err(e) => Err(TxFailure {
                    source: CrmError::Db(e.into()),
                    rollback_failed: !self.rollback(),
                }),
            },
            Err(source) => Err(TxFailure {
                source,
                rollback_failed: !self.rollback(),
            }),
        }
    }

    /// Attempt to roll back; returns true once the connection is back in
    /// autocommit (i.e. no transaction is left open).
    fn rollback(&self) -> bool {
        let _ = self.conn.execute_batch("ROLLBACK");
        self.conn.is_autocommit()
    }

    /// Open (or create) the database at `~/.salesdesk/salesdesk.db` and
    /// apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Used by tests and by an explicit
    /// `databasePath` in config.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.salesdesk/salesdesk.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".salesdesk").join("salesdesk.db"))
    }
}

// =============================================================================
// Shared test utilities
// =============================================================================

#[cfg(test)]
pub mod test_utils {
    use super::CrmDb;

    /// Create a temporary database for testing.
    ///
    /// We leak the `TempDir` so the directory persists for the duration of
    /// the test. FK enforcement is disabled so that unit tests can insert
    /// rows without satisfying every foreign key constraint.
    pub fn test_db() -> CrmDb {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        let db = CrmDb::open_at(path).expect("Failed to open test database");
        db.conn_ref()
            .execute_batch("PRAGMA foreign_keys = OFF;")
            .expect("disable FK for tests");
        db
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_utils::test_db;
    use super::*;

    fn sample_account(id: &str, owner: &str, name: &str) -> DbAccount {
        let now = Utc::now().to_rfc3339();
        DbAccount {
            id: id.to_string(),
            owner_id: owner.to_string(),
            name: name.to_string(),
            website: None,
            phone: None,
            industry: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        for table in ["users", "accounts", "contacts", "leads", "opportunities"] {
            let count: i32 = db
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .unwrap_or_else(|_| panic!("{table} table should exist"));
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_idempotent_schema_application() {
        // Opening the same DB twice should not error
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("idempotent.db");

        let _db1 = CrmDb::open_at(path.clone()).expect("first open");
        let _db2 = CrmDb::open_at(path).expect("second open should not fail");
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let db = test_db();
        db.with_transaction(|tx| {
            tx.insert_account(&sample_account("a-1", "u-1", "Acme"))?;
            Ok(())
        })
        .expect("transaction should commit");

        assert!(db.get_account("a-1").expect("query").is_some());
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let db = test_db();
        let failure = db
            .with_transaction(|tx| {
                tx.insert_account(&sample_account("a-2", "u-1", "Beta"))?;
                Err::<(), _>(CrmError::conflict("forced failure"))
            })
            .expect_err("transaction should fail");

        assert!(!failure.rollback_failed, "rollback should complete");
        assert!(
            db.get_account("a-2").expect("query").is_none(),
            "rolled-back insert must not persist"
        );
    }
}
