use super::*;

impl CrmDb {
    // =========================================================================
    // Leads
    // =========================================================================

    pub fn insert_lead(&self, lead: &DbLead) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO leads (id, owner_id, status, company, website, phone, first_name,
                                last_name, email, title, converted_account_id,
                                converted_contact_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                lead.id,
                lead.owner_id,
                lead.status.as_str(),
                lead.company,
                lead.website,
                lead.phone,
                lead.first_name,
                lead.last_name,
                lead.email,
                lead.title,
                lead.converted_account_id,
                lead.converted_contact_id,
                lead.created_at,
                lead.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a lead by ID.
    pub fn get_lead(&self, id: &str) -> Result<Option<DbLead>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, status, company, website, phone, first_name, last_name,
                    email, title, converted_account_id, converted_contact_id,
                    created_at, updated_at
             FROM leads WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_lead_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Leads visible to a scope, newest first.
    pub fn list_leads(&self, scope: &Scope) -> Result<Vec<DbLead>, DbError> {
        const COLS: &str = "id, owner_id, status, company, website, phone, first_name, \
                            last_name, email, title, converted_account_id, \
                            converted_contact_id, created_at, updated_at";
        match scope {
            Scope::Unrestricted => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("SELECT {COLS} FROM leads ORDER BY created_at DESC"))?;
                let rows = stmt.query_map([], Self::map_lead_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            }
            Scope::Owners(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders = vec!["?"; ids.len()].join(", ");
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COLS} FROM leads WHERE owner_id IN ({placeholders})
                     ORDER BY created_at DESC"
                ))?;
                let rows =
                    stmt.query_map(rusqlite::params_from_iter(ids.iter()), Self::map_lead_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            }
        }
    }

    /// Apply a whitelisted patch. Status tokens are validated by the service
    /// layer before they reach this statement; the schema CHECK is the last
    /// line of defence. Returns `false` if no row matched.
    pub fn update_lead(&self, id: &str, patch: &LeadPatch) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::new();

        if let Some(status) = &patch.status {
            sets.push("status = ?");
            values.push(status);
        }
        if let Some(company) = &patch.company {
            sets.push("company = ?");
            values.push(company);
        }
        if let Some(website) = &patch.website {
            sets.push("website = ?");
            values.push(website);
        }
        if let Some(phone) = &patch.phone {
            sets.push("phone = ?");
            values.push(phone);
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
        if let Some(title) = &patch.title {
            sets.push("title = ?");
            values.push(title);
        }
        sets.push("updated_at = ?");
        values.push(&now);
        values.push(&id);

        let sql = format!("UPDATE leads SET {} WHERE id = ?", sets.join(", "));
        let rows = self.conn.execute(&sql, values.as_slice())?;
        Ok(rows > 0)
    }

    /// Mark a lead converted with back-references to the records created
    /// from it, but only if no other writer got there first. Returns
    /// `false` when a concurrent conversion already won; the caller treats
    /// that as a conflict and rolls back its own writes.
    pub fn mark_lead_converted(
        &self,
        id: &str,
        account_id: &str,
        contact_id: &str,
    ) -> Result<bool, DbError> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE leads
             SET status = 'CONVERTED',
                 converted_account_id = ?1,
                 converted_contact_id = ?2,
                 updated_at = ?3
             WHERE id = ?4 AND status != 'CONVERTED'",
            params![account_id, contact_id, now, id],
        )?;
        Ok(rows > 0)
    }

    /// Delete a lead row. Returns `false` if no row matched.
    pub fn delete_lead(&self, id: &str) -> Result<bool, DbError> {
        let rows = self
            .conn
            .execute("DELETE FROM leads WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn count_leads(&self) -> Result<i64, DbError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?)
    }

    /// Helper: map a row to `DbLead`.
    pub(crate) fn map_lead_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DbLead> {
        Ok(DbLead {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            status: LeadStatus::parse(&row.get::<_, String>(2)?),
            company: row.get(3)?,
            website: row.get(4)?,
            phone: row.get(5)?,
            first_name: row.get(6)?,
            last_name: row.get(7)?,
            email: row.get(8)?,
            title: row.get(9)?,
            converted_account_id: row.get(10)?,
            converted_contact_id: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    pub(crate) fn sample_lead(id: &str, owner: &str, company: &str) -> DbLead {
        let now = Utc::now().to_rfc3339();
        DbLead {
            id: id.to_string(),
            owner_id: owner.to_string(),
            status: LeadStatus::New,
            company: Some(company.to_string()),
            website: None,
            phone: None,
            first_name: None,
            last_name: None,
            email: Some(format!("contact@{}.example", id)),
            title: None,
            converted_account_id: None,
            converted_contact_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_get_lead() {
        let db = test_db();
        db.insert_lead(&sample_lead("l-1", "u-1", "Acme"))
            .expect("insert");

        let lead = db.get_lead("l-1").expect("query").expect("row exists");
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.company.as_deref(), Some("Acme"));
        assert!(lead.converted_account_id.is_none());
    }

    #[test]
    fn test_mark_lead_converted_single_winner() {
        let db = test_db();
        db.insert_lead(&sample_lead("l-1", "u-1", "Acme"))
            .expect("insert");

        let won = db
            .mark_lead_converted("l-1", "a-1", "c-1")
            .expect("first conversion");
        assert!(won);

        // A second writer loses the conditional update.
        let lost = db
            .mark_lead_converted("l-1", "a-2", "c-2")
            .expect("second conversion");
        assert!(!lost);

        let lead = db.get_lead("l-1").expect("query").expect("row exists");
        assert_eq!(lead.status, LeadStatus::Converted);
        assert_eq!(lead.converted_account_id.as_deref(), Some("a-1"));
        assert_eq!(lead.converted_contact_id.as_deref(), Some("c-1"));
    }

    #[test]
    fn test_update_lead_fields() {
        let db = test_db();
        db.insert_lead(&sample_lead("l-1", "u-1", "Acme"))
            .expect("insert");

        let patch = LeadPatch {
            status: Some("WORKING".to_string()),
            last_name: Some("Nguyen".to_string()),
            ..Default::default()
        };
        assert!(db.update_lead("l-1", &patch).expect("update"));

        let lead = db.get_lead("l-1").expect("query").expect("row exists");
        assert_eq!(lead.status, LeadStatus::Working);
        assert_eq!(lead.last_name.as_deref(), Some("Nguyen"));
        assert_eq!(lead.owner_id, "u-1");
    }
}
