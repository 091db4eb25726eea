//! Seed a demo org and pipeline into the salesdesk database.
//!
//! Creates a founder, a sales manager with two reps, and a handful of open
//! leads so the API can be exercised immediately:
//!
//! ```sh
//! cargo run --bin seed_demo
//! curl -H 'X-User-Id: u-rep-dana' localhost:8080/leads
//! ```
//!
//! Re-running is safe: users upsert by fixed id, leads are only inserted
//! when absent.

use chrono::Utc;

use salesdesk_lib::db::{CrmDb, DbLead, DbUser, LeadStatus};
use salesdesk_lib::identity::Role;

fn user(id: &str, name: &str, role: Role, manager_id: Option<&str>) -> DbUser {
    let now = Utc::now().to_rfc3339();
    DbUser {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@salesdesk.example", id.trim_start_matches("u-")),
        role,
        manager_id: manager_id.map(str::to_string),
        created_at: now.clone(),
        updated_at: now,
    }
}

#[allow(clippy::too_many_arguments)]
fn lead(
    id: &str,
    owner: &str,
    status: LeadStatus,
    company: &str,
    first: &str,
    last: &str,
    email: &str,
    title: &str,
) -> DbLead {
    let now = Utc::now().to_rfc3339();
    DbLead {
        id: id.to_string(),
        owner_id: owner.to_string(),
        status,
        company: Some(company.to_string()),
        website: None,
        phone: None,
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        email: Some(email.to_string()),
        title: Some(title.to_string()),
        converted_account_id: None,
        converted_contact_id: None,
        created_at: now.clone(),
        updated_at: now,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db = CrmDb::open()?;

    let users = [
        user("u-founder", "Frances Ogawa", Role::Founder, None),
        user(
            "u-mgr-lee",
            "Morgan Lee",
            Role::SalesManager,
            Some("u-founder"),
        ),
        user("u-rep-dana", "Dana Silva", Role::SalesRep, Some("u-mgr-lee")),
        user("u-rep-kim", "Kim Haddad", Role::SalesRep, Some("u-mgr-lee")),
        user(
            "u-support",
            "Ash Connolly",
            Role::SupportStaff,
            Some("u-founder"),
        ),
    ];
    for u in &users {
        db.upsert_user(u)?;
    }

    let leads = [
        lead(
            "lead-northwind",
            "u-rep-dana",
            LeadStatus::New,
            "Northwind Traders",
            "Elena",
            "Fuentes",
            "elena@northwind.example",
            "VP Operations",
        ),
        lead(
            "lead-contoso",
            "u-rep-dana",
            LeadStatus::Working,
            "Contoso",
            "Priya",
            "Raman",
            "priya@contoso.example",
            "Head of IT",
        ),
        lead(
            "lead-fabrikam",
            "u-rep-kim",
            LeadStatus::Qualified,
            "Fabrikam",
            "Jonas",
            "Weber",
            "jonas@fabrikam.example",
            "CFO",
        ),
    ];
    let mut inserted = 0;
    for l in &leads {
        if db.get_lead(&l.id)?.is_none() {
            db.insert_lead(l)?;
            inserted += 1;
        }
    }

    println!(
        "Seeded {} users, {} new leads (of {}).",
        users.len(),
        inserted,
        leads.len()
    );
    println!("Try: curl -H 'X-User-Id: u-mgr-lee' localhost:8080/leads");
    Ok(())
}
