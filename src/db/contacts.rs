use super::*;

impl CrmDb {
    // =========================================================================
    // Contacts
    // =========================================================================

    pub fn insert_contact(&self, contact: &DbContact) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO contacts (id, owner_id, account_id, first_name, last_name, email,
                                   phone, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                contact.id,
                contact.owner_id,
                contact.account_id,
                contact.first_name,
                contact.last_name,
                contact.email,
                contact.phone,
                contact.title,
                contact.created_at,
                contact.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a contact by ID.
    pub fn get_contact(&self, id: &str) -> Result<Option<DbContact>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, account_id, first_name, last_name, email, phone, title,
                    created_at, updated_at
             FROM contacts WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_contact_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Contacts visible to a scope, ordered by last name.
    pub fn list_contacts(&self, scope: &Scope) -> Result<Vec<DbContact>, DbError> {
        const COLS: &str = "id, owner_id, account_id, first_name, last_name, email, phone, title, \
                            created_at, updated_at";
        match scope {
            Scope::Unrestricted => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COLS} FROM contacts ORDER BY last_name, first_name"
                ))?;
                let rows = stmt.query_map([], Self::map_contact_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            }
            Scope::Owners(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = vec!["?"; ids.len()].join(", ");
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COLS} FROM contacts WHERE owner_id IN ({placeholders})
                     ORDER BY last_name, first_name"
                ))?;
                let rows =
                    stmt.query_map(rusqlite::params_from_iter(ids.iter()), Self::map_contact_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            }
        }
    }

    /// Contacts attached to an account, ordered by last name.
    pub fn get_contacts_for_account(&self, account_id: &str) -> Result<Vec<DbContact>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, account_id, first_name, last_name, email, phone, title,
                    created_at, updated_at
             FROM contacts WHERE account_id = ?1 ORDER BY last_name, first_name",
        )?;
        let rows = stmt.query_map(params![account_id], Self::map_contact_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Apply a whitelisted patch. Returns `false` if no row matched.
    pub fn update_contact(&self, id: &str, patch: &ContactPatch) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::new();

        if let Some(account_id) = &patch.account_id {
            sets.push("account_id = ?");
            values.push(account_id);
        }
        if let Some(first_name) = &patch.first_name {
            sets.push("first_name = ?");
            values.push(first_name);
        }
        if let Some(last_name) = &patch.last_name {
            sets.push("last_name = ?");
            values.push(last_name);
        }
        if let Some(email) = &patch.email {
            sets.push("email = ?");
            values.push(email);
        }
        if let Some(phone) = &patch.phone {
            sets.push("phone = ?");
            values.push(phone);
        }
        if let Some(title) = &patch.title {
            sets.push("title = ?");
            values.push(title);
        }
        sets.push("updated_at = ?");
        values.push(&now);
        values.push(&id);

        let sql = format!("UPDATE contacts SET {} WHERE id = ?", sets.join(", "));
        let rows = self.conn.execute(&sql, values.as_slice())?;
        Ok(rows > 0)
    }

    /// Delete a contact row. Returns `false` if no row matched.
    pub fn delete_contact(&self, id: &str) -> Result<bool, DbError> {
        let rows = self
            .conn
            .execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn count_contacts(&self) -> Result<i64, DbError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?)
    }

    /// Helper: map a row to `DbContact`.
    pub(crate) fn map_contact_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbContact> {
        Ok(DbContact {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            account_id: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            email: row.get(5)?,
            phone: row.get(6)?,
            title: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn sample_contact(id: &str, owner: &str, last_name: &str) -> DbContact {
        let now = Utc::now().to_rfc3339();
        DbContact {
            id: id.to_string(),
            owner_id: owner.to_string(),
            account_id: None,
            first_name: None,
            last_name: Some(last_name.to_string()),
            email: None,
            phone: None,
            title: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_contacts_for_account() {
        let db = test_db();
        let mut c1 = sample_contact("c-1", "u-1", "Ada");
        c1.account_id = Some("a-1".to_string());
        let mut c2 = sample_contact("c-2", "u-1", "Bo");
        c2.account_id = Some("a-2".to_string());
        db.insert_contact(&c1).expect("insert");
        db.insert_contact(&c2).expect("insert");

        let linked = db.get_contacts_for_account("a-1").expect("query");
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, "c-1");
    }

    #[test]
    fn test_update_contact_relinks_account() {
        let db = test_db();
        db.insert_contact(&sample_contact("c-1", "u-1", "Ada"))
            .expect("insert");

        let patch = ContactPatch {
            account_id: Some("a-9".to_string()),
            title: Some("CTO".to_string()),
            ..Default::default()
        };
        assert!(db.update_contact("c-1", &patch).expect("update"));

        let stored = db.get_contact("c-1").expect("query").expect("row");
        assert_eq!(stored.account_id.as_deref(), Some("a-9"));
        assert_eq!(stored.title.as_deref(), Some("CTO"));
        assert_eq!(stored.owner_id, "u-1");
    }
}
