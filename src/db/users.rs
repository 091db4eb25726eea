use super::*;

use crate::identity::Role;

impl CrmDb {
    // =========================================================================
    // Users (org directory)
    // =========================================================================

    /// Insert or update a user by id.
    pub fn upsert_user(&self, user: &DbUser) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO users (id, name, email, role, manager_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                role = excluded.role,
                manager_id = excluded.manager_id,
                updated_at = excluded.updated_at",
            params![
                user.id,
                user.name,
                user.email,
                user.role.as_str(),
                user.manager_id,
                user.created_at,
                user.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: &str) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, role, manager_id, created_at, updated_at
             FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Get a user by email (case-insensitive). Used to keep emails unique
    /// with a readable error instead of a bare constraint failure.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, role, manager_id, created_at, updated_at
             FROM users WHERE LOWER(email) = LOWER(?1)",
        )?;
        let mut rows = stmt.query_map(params![email], Self::map_user_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// All users, ordered by name.
    pub fn list_users(&self) -> Result<Vec<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, role, manager_id, created_at, updated_at
             FROM users ORDER BY name",
        )?;
        let rows = stmt.query_map([], Self::map_user_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Direct reports of a manager. One level only; visibility never walks
    /// the chain further.
    pub fn get_users_by_manager(&self, manager_id: &str) -> Result<Vec<DbUser>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, role, manager_id, created_at, updated_at
             FROM users WHERE manager_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![manager_id], Self::map_user_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Ids of a manager's direct reports. The scope resolver only needs ids.
    pub fn get_user_ids_by_manager(&self, manager_id: &str) -> Result<Vec<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM users WHERE manager_id = ?1")?;
        let rows = stmt.query_map(params![manager_id], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Helper: map a row to `DbUser`. Role parsing is fail-closed.
    pub(crate) fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbUser> {
        Ok(DbUser {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role: Role::parse(&row.get::<_, String>(3)?),
            manager_id: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn sample_user(id: &str, role: Role, manager_id: Option<&str>) -> DbUser {
        let now = Utc::now().to_rfc3339();
        DbUser {
            id: id.to_string(),
            name: format!("User {id}"),
            email: format!("{id}@example.com"),
            role,
            manager_id: manager_id.map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_upsert_and_get_user() {
        let db = test_db();
        let mut user = sample_user("u-1", Role::SalesRep, None);
        db.upsert_user(&user).expect("insert");

        user.role = Role::SalesManager;
        db.upsert_user(&user).expect("update");

        let stored = db.get_user("u-1").expect("query").expect("row exists");
        assert_eq!(stored.role, Role::SalesManager);
    }

    #[test]
    fn test_get_users_by_manager_is_direct_only() {
        let db = test_db();
        db.upsert_user(&sample_user("m-1", Role::SalesManager, None))
            .expect("manager");
        db.upsert_user(&sample_user("r-1", Role::SalesRep, Some("m-1")))
            .expect("report 1");
        db.upsert_user(&sample_user("r-2", Role::SalesRep, Some("m-1")))
            .expect("report 2");
        // Report-of-a-report: managed by r-1, not by m-1.
        db.upsert_user(&sample_user("r-3", Role::SalesRep, Some("r-1")))
            .expect("nested report");

        let ids = db.get_user_ids_by_manager("m-1").expect("query");
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"r-1".to_string()));
        assert!(ids.contains(&"r-2".to_string()));
        assert!(!ids.contains(&"r-3".to_string()));
    }

    #[test]
    fn test_unknown_role_reads_as_other() {
        let db = test_db();
        db.conn_ref()
            .execute(
                "INSERT INTO users (id, name, email, role, created_at, updated_at)
                 VALUES ('u-x', 'X', 'x@example.com', 'WIZARD', '2026-01-01', '2026-01-01')",
                [],
            )
            .expect("raw insert");

        let user = db.get_user("u-x").expect("query").expect("row exists");
        assert_eq!(user.role, Role::Other);
    }

    #[test]
    fn test_get_user_by_email_case_insensitive() {
        let db = test_db();
        db.upsert_user(&sample_user("u-9", Role::SalesRep, None))
            .expect("insert");
        let found = db.get_user_by_email("U-9@EXAMPLE.COM").expect("query");
        assert!(found.is_some());
    }
}
