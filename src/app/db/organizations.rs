use sqlx::{FromRow, SqliteExecutor};

use crate::app::domain::{OrganizationId, OrganizationMembership, OrganizationRole, UserId};

/// Database row for organizations table.
#[derive(Debug, FromRow)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// Data structure for inserting a new organization.
pub struct NewOrganization {
    pub id: OrganizationId,
    pub name: String,
}

/// Find an organization by name. Used by seeds to stay idempotent.
pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Organization>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Organization>(
        "SELECT id, name, created_at FROM organizations WHERE name = ? ORDER BY created_at LIMIT 1",
    )
    .bind(name)
    .fetch_optional(executor)
    .await
}

/// Insert a new organization.
pub async fn insert<'e, E>(
    executor: E,
    organization: &NewOrganization,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("INSERT INTO organizations (id, name, created_at) VALUES (?, ?, ?)")
        .bind(organization.id.as_str())
        .bind(&organization.name)
        .bind(super::now())
        .execute(executor)
        .await?;
    Ok(())
}

/// Add a user to an organization with a specific role.
pub async fn add_member<'e, E>(
    executor: E,
    organization_id: &OrganizationId,
    user_id: &UserId,
    role: OrganizationRole,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO organization_members (organization_id, user_id, role, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(organization_id.as_str())
    .bind(user_id.as_str())
    .bind(role.to_string())
    .bind(super::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Find a member's role in an organization. Returns None if not a member.
pub async fn find_member_role<'e, E>(
    executor: E,
    organization_id: &OrganizationId,
    user_id: &UserId,
) -> Result<Option<OrganizationRole>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<String> = sqlx::query_scalar(
        "SELECT role FROM organization_members WHERE organization_id = ? AND user_id = ?",
    )
    .bind(organization_id.as_str())
    .bind(user_id.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(row.and_then(|r| r.parse::<OrganizationRole>().ok()))
}

/// Every membership a user holds. Rows with an unrecognised role are skipped, which
/// leaves that user without access to the organization.
pub async fn memberships_for_user<'e, E>(
    executor: E,
    user_id: &UserId,
) -> Result<Vec<OrganizationMembership>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT organization_id, role FROM organization_members WHERE user_id = ? ORDER BY created_at",
    )
    .bind(user_id.as_str())
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(organization_id, role)| {
            Some(OrganizationMembership {
                user_id: user_id.clone(),
                organization_id: OrganizationId::from_string(&organization_id).ok()?,
                role: role.parse::<OrganizationRole>().ok()?,
            })
        })
        .collect())
}
