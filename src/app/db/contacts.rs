use serde::Serialize;
use sqlx::FromRow;

use crate::app::domain::{ContactStatus, ResourceType, UserId};

use super::{scoped::TenantRow, TenantSession};

/// Database row for contacts table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contact {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub assigned_to_id: Option<String>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl TenantRow for Contact {
    const RESOURCE: ResourceType = ResourceType::Contact;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Data structure for inserting a new contact. The organization comes from the session.
pub struct NewContact {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: ContactStatus,
    pub assigned_to_id: Option<UserId>,
}

/// Editable contact fields.
pub struct ContactChanges {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub assigned_to_id: Option<UserId>,
}

/// Insert a contact stamped with the session's organization.
pub async fn insert(session: &mut TenantSession, contact: &NewContact) -> Result<(), sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    sqlx::query(
        "INSERT INTO contacts (id, organization_id, name, email, phone, status, assigned_to_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&contact.id)
    .bind(organization_id)
    .bind(&contact.name)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(contact.status.to_string())
    .bind(contact.assigned_to_id.as_ref().map(UserId::as_str))
    .bind(super::now())
    .execute(session.conn())
    .await?;
    Ok(())
}

/// Update editable fields. Returns rows affected; zero means not owned or missing.
pub async fn update(session: &mut TenantSession, id: &str, changes: &ContactChanges) -> Result<u64, sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    let result = sqlx::query(
        "UPDATE contacts SET name = ?, email = ?, phone = ?, assigned_to_id = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
    )
    .bind(&changes.name)
    .bind(&changes.email)
    .bind(&changes.phone)
    .bind(changes.assigned_to_id.as_ref().map(UserId::as_str))
    .bind(super::now())
    .bind(id)
    .bind(organization_id)
    .execute(session.conn())
    .await?;
    Ok(result.rows_affected())
}

/// Move a contact to another status.
pub async fn update_status(session: &mut TenantSession, id: &str, status: ContactStatus) -> Result<u64, sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    let result = sqlx::query("UPDATE contacts SET status = ?, updated_at = ? WHERE id = ? AND organization_id = ?")
        .bind(status.to_string())
        .bind(super::now())
        .bind(id)
        .bind(organization_id)
        .execute(session.conn())
        .await?;
    Ok(result.rows_affected())
}
