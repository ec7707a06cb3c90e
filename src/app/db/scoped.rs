//! Queries shared by every tenant-owned table. Each one filters on the session's
//! organization, so a row owned by another tenant is indistinguishable from a missing one.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::app::domain::{ResourceType, UserId};

use super::TenantSession;

/// A row type backed by a tenant-owned table.
pub trait TenantRow: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const RESOURCE: ResourceType;

    fn id(&self) -> &str;
}

/// Fetch one row by id, only if the session's organization owns it.
pub async fn find_by_id<T: TenantRow>(
    session: &mut TenantSession,
    id: &str,
) -> Result<Option<T>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM {} WHERE id = ? AND organization_id = ?",
        T::RESOURCE.table()
    );
    let organization_id = session.organization_id().as_str();
    sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .bind(organization_id)
        .fetch_optional(session.conn())
        .await
}

/// Whether the session's organization owns a row with this id.
pub async fn exists(
    session: &mut TenantSession,
    resource: ResourceType,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "SELECT count(*) FROM {} WHERE id = ? AND organization_id = ?",
        resource.table()
    );
    let organization_id = session.organization_id().as_str();
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(id)
        .bind(organization_id)
        .fetch_one(session.conn())
        .await?;
    Ok(count > 0)
}

/// Newest rows first, scoped to the session's organization.
pub async fn list<T: TenantRow>(session: &mut TenantSession, limit: i64) -> Result<Vec<T>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM {} WHERE organization_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        T::RESOURCE.table()
    );
    let organization_id = session.organization_id().as_str();
    sqlx::query_as::<_, T>(&sql)
        .bind(organization_id)
        .bind(limit)
        .fetch_all(session.conn())
        .await
}

/// Delete by id within the session's organization. Returns rows affected.
pub async fn delete(session: &mut TenantSession, resource: ResourceType, id: &str) -> Result<u64, sqlx::Error> {
    let sql = format!(
        "DELETE FROM {} WHERE id = ? AND organization_id = ?",
        resource.table()
    );
    let organization_id = session.organization_id().as_str();
    let result = sqlx::query(&sql)
        .bind(id)
        .bind(organization_id)
        .execute(session.conn())
        .await?;
    Ok(result.rows_affected())
}

/// Point every listed row at `assignee`. Ids the organization does not own are
/// ignored; the return value counts only rows actually updated.
pub async fn assign_many(
    session: &mut TenantSession,
    resource: ResourceType,
    ids: &[String],
    assignee: Option<&UserId>,
) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("UPDATE {} SET assigned_to_id = ", resource.table()));
    builder.push_bind(assignee.map(UserId::as_str));
    builder.push(", updated_at = ");
    builder.push_bind(super::now());
    builder.push(" WHERE organization_id = ");
    builder.push_bind(session.organization_id().as_str());
    builder.push(" AND id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");

    let result = builder.build().execute(session.conn()).await?;
    Ok(result.rows_affected())
}
