use serde::Serialize;
use sqlx::FromRow;

use crate::app::domain::{DealStage, ResourceType, UserId};

use super::{scoped::TenantRow, TenantSession};

/// Database row for deals table. Monetary value is stored in cents.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Deal {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    pub value_cents: i64,
    pub stage: String,
    pub contact_id: Option<String>,
    pub lead_id: Option<String>,
    pub assigned_to_id: Option<String>,
    pub closed_at: Option<i64>,
    pub lost_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl TenantRow for Deal {
    const RESOURCE: ResourceType = ResourceType::Deal;

    fn id(&self) -> &str {
        &self.id
    }
}

pub struct NewDeal {
    pub id: String,
    pub title: String,
    pub value_cents: i64,
    pub stage: DealStage,
    pub contact_id: Option<String>,
    pub lead_id: Option<String>,
    pub assigned_to_id: Option<UserId>,
}

pub struct DealChanges {
    pub title: String,
    pub value_cents: i64,
    pub contact_id: Option<String>,
    pub lead_id: Option<String>,
    pub assigned_to_id: Option<UserId>,
}

pub async fn insert(session: &mut TenantSession, deal: &NewDeal) -> Result<(), sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    sqlx::query(
        "INSERT INTO deals (id, organization_id, title, value_cents, stage, contact_id, lead_id, assigned_to_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&deal.id)
    .bind(organization_id)
    .bind(&deal.title)
    .bind(deal.value_cents)
    .bind(deal.stage.to_string())
    .bind(&deal.contact_id)
    .bind(&deal.lead_id)
    .bind(deal.assigned_to_id.as_ref().map(UserId::as_str))
    .bind(super::now())
    .execute(session.conn())
    .await?;
    Ok(())
}

pub async fn update(session: &mut TenantSession, id: &str, changes: &DealChanges) -> Result<u64, sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    let result = sqlx::query(
        "UPDATE deals SET title = ?, value_cents = ?, contact_id = ?, lead_id = ?, assigned_to_id = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
    )
    .bind(&changes.title)
    .bind(changes.value_cents)
    .bind(&changes.contact_id)
    .bind(&changes.lead_id)
    .bind(changes.assigned_to_id.as_ref().map(UserId::as_str))
    .bind(super::now())
    .bind(id)
    .bind(organization_id)
    .execute(session.conn())
    .await?;
    Ok(result.rows_affected())
}

/// Move a deal through the pipeline.
pub async fn update_stage(session: &mut TenantSession, id: &str, stage: DealStage) -> Result<u64, sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    let result = sqlx::query("UPDATE deals SET stage = ?, updated_at = ? WHERE id = ? AND organization_id = ?")
        .bind(stage.to_string())
        .bind(super::now())
        .bind(id)
        .bind(organization_id)
        .execute(session.conn())
        .await?;
    Ok(result.rows_affected())
}

/// Close a deal at a terminal stage. `lost_reason` is only kept for lost deals.
pub async fn close(
    session: &mut TenantSession,
    id: &str,
    stage: DealStage,
    lost_reason: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    let now = super::now();
    let result = sqlx::query(
        "UPDATE deals SET stage = ?, closed_at = ?, lost_reason = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
    )
    .bind(stage.to_string())
    .bind(now)
    .bind(lost_reason)
    .bind(now)
    .bind(id)
    .bind(organization_id)
    .execute(session.conn())
    .await?;
    Ok(result.rows_affected())
}
