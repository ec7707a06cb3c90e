use sqlx::{FromRow, SqliteExecutor, SqlitePool};

use crate::app::domain::{GlobalRole, Principal, SubscriptionTier, UserId};

use super::organizations;

/// Database row for users table.
#[derive(Debug, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub global_role: String,
    pub subscription_tier: String,
    pub created_at: i64,
}

/// Data structure for inserting a new user.
pub struct NewUser {
    pub id: UserId,
    pub email: String,
    pub global_role: GlobalRole,
    pub subscription_tier: SubscriptionTier,
}

/// Find a user by email address.
pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "SELECT id, email, global_role, subscription_tier, created_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(executor)
    .await
}

/// Find a user by ID.
pub async fn find_by_id<'e, E>(executor: E, user_id: &UserId) -> Result<Option<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, User>(
        "SELECT id, email, global_role, subscription_tier, created_at FROM users WHERE id = ?",
    )
    .bind(user_id.as_str())
    .fetch_optional(executor)
    .await
}

/// Insert a new user into the database.
pub async fn insert<'e, E>(executor: E, user: &NewUser) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO users (id, email, global_role, subscription_tier, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user.id.as_str())
    .bind(&user.email)
    .bind(user.global_role.to_string())
    .bind(user.subscription_tier.to_string())
    .bind(super::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// Change a user's subscription tier.
pub async fn update_subscription_tier<'e, E>(
    executor: E,
    user_id: &UserId,
    tier: SubscriptionTier,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE users SET subscription_tier = ? WHERE id = ?")
        .bind(tier.to_string())
        .bind(user_id.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

/// Assemble the principal for `user_id` from its user row and memberships.
/// Returns None when the user does not exist.
pub async fn load_principal(pool: &SqlitePool, user_id: &UserId) -> Result<Option<Principal>, sqlx::Error> {
    let Some(user) = find_by_id(pool, user_id).await? else {
        return Ok(None);
    };

    let global_role = user
        .global_role
        .parse::<GlobalRole>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let subscription_tier = user
        .subscription_tier
        .parse::<SubscriptionTier>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let memberships = organizations::memberships_for_user(pool, user_id).await?;

    Ok(Some(Principal {
        id: user_id.clone(),
        global_role,
        subscription_tier,
        memberships,
    }))
}
