use serde::Serialize;
use sqlx::FromRow;

use crate::app::domain::{LeadScore, LeadStatus, ResourceType, UserId};

use super::{scoped::TenantRow, TenantSession};

/// Database row for leads table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lead {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: Option<String>,
    pub source: String,
    pub status: String,
    pub score: String,
    pub score_value: i64,
    pub assigned_to_id: Option<String>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl TenantRow for Lead {
    const RESOURCE: ResourceType = ResourceType::Lead;

    fn id(&self) -> &str {
        &self.id
    }
}

pub struct NewLead {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    pub score: LeadScore,
    pub score_value: i64,
    pub assigned_to_id: Option<UserId>,
}

pub struct LeadChanges {
    pub name: String,
    pub email: Option<String>,
    pub source: String,
    pub assigned_to_id: Option<UserId>,
}

pub async fn insert(session: &mut TenantSession, lead: &NewLead) -> Result<(), sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    sqlx::query(
        "INSERT INTO leads (id, organization_id, name, email, source, status, score, score_value, assigned_to_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&lead.id)
    .bind(organization_id)
    .bind(&lead.name)
    .bind(&lead.email)
    .bind(&lead.source)
    .bind(lead.status.to_string())
    .bind(lead.score.to_string())
    .bind(lead.score_value)
    .bind(lead.assigned_to_id.as_ref().map(UserId::as_str))
    .bind(super::now())
    .execute(session.conn())
    .await?;
    Ok(())
}

pub async fn update(session: &mut TenantSession, id: &str, changes: &LeadChanges) -> Result<u64, sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    let result = sqlx::query(
        "UPDATE leads SET name = ?, email = ?, source = ?, assigned_to_id = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
    )
    .bind(&changes.name)
    .bind(&changes.email)
    .bind(&changes.source)
    .bind(changes.assigned_to_id.as_ref().map(UserId::as_str))
    .bind(super::now())
    .bind(id)
    .bind(organization_id)
    .execute(session.conn())
    .await?;
    Ok(result.rows_affected())
}

/// Set both the score bucket and its numeric value.
pub async fn update_score(
    session: &mut TenantSession,
    id: &str,
    score: LeadScore,
    score_value: i64,
) -> Result<u64, sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    let result = sqlx::query(
        "UPDATE leads SET score = ?, score_value = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
    )
    .bind(score.to_string())
    .bind(score_value)
    .bind(super::now())
    .bind(id)
    .bind(organization_id)
    .execute(session.conn())
    .await?;
    Ok(result.rows_affected())
}

pub async fn update_status(session: &mut TenantSession, id: &str, status: LeadStatus) -> Result<u64, sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    let result = sqlx::query("UPDATE leads SET status = ?, updated_at = ? WHERE id = ? AND organization_id = ?")
        .bind(status.to_string())
        .bind(super::now())
        .bind(id)
        .bind(organization_id)
        .execute(session.conn())
        .await?;
    Ok(result.rows_affected())
}
