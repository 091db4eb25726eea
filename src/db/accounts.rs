use super::*;

impl CrmDb {
    // =========================================================================
    // Accounts
    // =========================================================================

    pub fn insert_account(&self, account: &DbAccount) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO accounts (id, owner_id, name, website, phone, industry, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                account.id,
                account.owner_id,
                account.name,
                account.website,
                account.phone,
                account.industry,
                account.created_at,
                account.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get an account by ID.
    pub fn get_account(&self, id: &str) -> Result<Option<DbAccount>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, name, website, phone, industry, created_at, updated_at
             FROM accounts WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_account_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Accounts visible to a scope, ordered by name. Filtering happens here,
    /// at the query; out-of-scope rows are never fetched and re-checked.
    pub fn list_accounts(&self, scope: &Scope) -> Result<Vec<DbAccount>, DbError> {
        const COLS: &str = "id, owner_id, name, website, phone, industry, created_at, updated_at";
        match scope {
            Scope::Unrestricted => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {COLS} FROM accounts ORDER BY name"))?;
                let rows = stmt.query_map([], Self::map_account_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            }
            Scope::Owners(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = vec!["?"; ids.len()].join(", ");
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COLS} FROM accounts WHERE owner_id IN ({placeholders}) ORDER BY name"
                ))?;
                let rows =
                    stmt.query_map(rusqlite::params_from_iter(ids.iter()), Self::map_account_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            }
        }
    }

    /// Apply a whitelisted patch. `owner_id` is not updatable here or
    /// anywhere else on the update surface. Returns `false` if no row
    /// matched.
    pub fn update_account(&self, id: &str, patch: &AccountPatch) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::new();

        if let Some(name) = &patch.name {
            sets.push("name = ?");
            values.push(name);
        }
        if let Some(website) = &patch.website {
            sets.push("website = ?");
            values.push(website);
        }
        if let Some(phone) = &patch.phone {
            sets.push("phone = ?");
            values.push(phone);
        }
        if let Some(industry) = &patch.industry {
            sets.push("industry = ?");
            values.push(industry);
        }
        sets.push("updated_at = ?");
        values.push(&now);
        values.push(&id);

        let sql = format!("UPDATE accounts SET {} WHERE id = ?", sets.join(", "));
        let rows = self.conn.execute(&sql, values.as_slice())?;
        Ok(rows > 0)
    }

    /// Delete an account row. Returns `false` if no row matched.
    pub fn delete_account(&self, id: &str) -> Result<bool, DbError> {
        let rows = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn count_accounts(&self) -> Result<i64, DbError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?)
    }

    /// Helper: map a row to `DbAccount`.
    pub(crate) fn map_account_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbAccount> {
        Ok(DbAccount {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            website: row.get(3)?,
            phone: row.get(4)?,
            industry: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}
