use super::*;

impl CrmDb {
    // =========================================================================
    // Opportunities
    // =========================================================================

    pub fn insert_opportunity(&self, opportunity: &DbOpportunity) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO opportunities (id, owner_id, account_id, name, stage, amount,
                                        close_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                opportunity.id,
                opportunity.owner_id,
                opportunity.account_id,
                opportunity.name,
                opportunity.stage,
                opportunity.amount,
                opportunity.close_date,
                opportunity.created_at,
                opportunity.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get an opportunity by ID.
    pub fn get_opportunity(&self, id: &str) -> Result<Option<DbOpportunity>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, account_id, name, stage, amount, close_date,
                    created_at, updated_at
             FROM opportunities WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_opportunity_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Opportunities visible to a scope, newest first.
    pub fn list_opportunities(&self, scope: &Scope) -> Result<Vec<DbOpportunity>, DbError> {
        const COLS: &str = "id, owner_id, account_id, name, stage, amount, close_date, \
                            created_at, updated_at";
        match scope {
            Scope::Unrestricted => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COLS} FROM opportunities ORDER BY created_at DESC"
                ))?;
                let rows = stmt.query_map([], Self::map_opportunity_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            }
            Scope::Owners(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = vec!["?"; ids.len()].join(", ");
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COLS} FROM opportunities WHERE owner_id IN ({placeholders})
                     ORDER BY created_at DESC"
                ))?;
                let rows = stmt.query_map(
                    rusqlite::params_from_iter(ids.iter()),
                    Self::map_opportunity_row,
                )?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            }
        }
    }

    /// Opportunities attached to an account, newest first.
    pub fn get_opportunities_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<DbOpportunity>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, account_id, name, stage, amount, close_date,
                    created_at, updated_at
             FROM opportunities WHERE account_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![account_id], Self::map_opportunity_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Apply a whitelisted patch. Returns `false` if no row matched.
    pub fn update_opportunity(&self, id: &str, patch: &OpportunityPatch) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::new();

        if let Some(name) = &patch.name {
            sets.push("name = ?");
            values.push(name);
        }
        if let Some(stage) = &patch.stage {
            sets.push("stage = ?");
            values.push(stage);
        }
        if let Some(amount) = &patch.amount {
            sets.push("amount = ?");
            values.push(amount);
        }
        if let Some(close_date) = &patch.close_date {
            sets.push("close_date = ?");
            values.push(close_date);
        }
        sets.push("updated_at = ?");
        values.push(&now);
        values.push(&id);

        let sql = format!("UPDATE opportunities SET {} WHERE id = ?", sets.join(", "));
        let rows = self.conn.execute(&sql, values.as_slice())?;
        Ok(rows > 0)
    }

    /// Delete an opportunity row. Returns `false` if no row matched.
    pub fn delete_opportunity(&self, id: &str) -> Result<bool, DbError> {
        let rows = self
            .conn
            .execute("DELETE FROM opportunities WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Helper: map a row to `DbOpportunity`.
    pub(crate) fn map_opportunity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbOpportunity> {
        Ok(DbOpportunity {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            account_id: row.get(2)?,
            name: row.get(3)?,
            stage: row.get(4)?,
            amount: row.get(5)?,
            close_date: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn sample_opportunity(id: &str, owner: &str, account: &str) -> DbOpportunity {
        let now = Utc::now().to_rfc3339();
        DbOpportunity {
            id: id.to_string(),
            owner_id: owner.to_string(),
            account_id: account.to_string(),
            name: format!("Deal {id}"),
            stage: "prospecting".to_string(),
            amount: Some(25_000.0),
            close_date: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_opportunities_for_account() {
        let db = test_db();
        db.insert_opportunity(&sample_opportunity("o-1", "u-1", "a-1"))
            .expect("insert");
        db.insert_opportunity(&sample_opportunity("o-2", "u-1", "a-2"))
            .expect("insert");

        let linked = db.get_opportunities_for_account("a-1").expect("query");
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, "o-1");
    }

    #[test]
    fn test_update_opportunity_stage() {
        let db = test_db();
        db.insert_opportunity(&sample_opportunity("o-1", "u-1", "a-1"))
            .expect("insert");

        let patch = OpportunityPatch {
            stage: Some("negotiation".to_string()),
            amount: Some(40_000.0),
            ..Default::default()
        };
        assert!(db.update_opportunity("o-1", &patch).expect("update"));

        let stored = db.get_opportunity("o-1").expect("query").expect("row");
        assert_eq!(stored.stage, "negotiation");
        assert_eq!(stored.amount, Some(40_000.0));
    }
}
