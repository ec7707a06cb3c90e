use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};

use crate::app::domain::{OrganizationId, ResourceType, UserId};

/// Database row for activity_logs table. Snapshots are JSON text.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityLog {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub old_data: Option<String>,
    pub new_data: Option<String>,
    pub created_at: i64,
}

/// Data structure for appending an activity entry.
#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub action: String,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub old_data: Option<String>,
    pub new_data: Option<String>,
}

/// Append one entry. Entries are never updated or deleted.
pub async fn insert<'e, E>(executor: E, entry: &NewActivityLog) -> Result<String, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let id = ulid::Ulid::new().to_string();
    sqlx::query(
        "INSERT INTO activity_logs (id, organization_id, user_id, action, resource_type, resource_id, old_data, new_data, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(entry.organization_id.as_str())
    .bind(entry.user_id.as_str())
    .bind(&entry.action)
    .bind(entry.resource_type.to_string())
    .bind(&entry.resource_id)
    .bind(&entry.old_data)
    .bind(&entry.new_data)
    .bind(super::now())
    .execute(executor)
    .await?;
    Ok(id)
}

/// Newest entries for one organization.
pub async fn list_for_organization<'e, E>(
    executor: E,
    organization_id: &OrganizationId,
    limit: i64,
) -> Result<Vec<ActivityLog>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, ActivityLog>(
        "SELECT * FROM activity_logs WHERE organization_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(organization_id.as_str())
    .bind(limit)
    .fetch_all(executor)
    .await
}
