use std::env;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::app::db::{self, organizations::NewOrganization, users::NewUser};
use crate::app::domain::{GlobalRole, OrganizationId, OrganizationRole, SubscriptionTier, UserId};
use crate::seeds::{Seed, SeedOutcome};

const DEFAULT_ORGANIZATION_NAME: &str = "Dev Organization";

/// Development organization with one owner, so the CRM can be exercised locally.
/// Reads `SEED_OWNER_EMAIL` (required) and `SEED_ORGANIZATION_NAME`.
pub struct DevOrganization {
    pub owner_email: Option<String>,
    pub organization_name: String,
}

impl DevOrganization {
    pub fn from_env() -> Self {
        let owner_email = env::var("SEED_OWNER_EMAIL")
            .ok()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let organization_name = env::var("SEED_ORGANIZATION_NAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ORGANIZATION_NAME.to_string());
        Self {
            owner_email,
            organization_name,
        }
    }
}

#[async_trait]
impl Seed for DevOrganization {
    fn version(&self) -> i64 {
        20260301120000
    }

    fn description(&self) -> &str {
        "dev_organization"
    }

    async fn run(&self, pool: &SqlitePool) -> Result<SeedOutcome, sqlx::Error> {
        let Some(email) = self.owner_email.as_deref() else {
            return Ok(SeedOutcome::Skipped);
        };
        if !email.contains('@') {
            tracing::warn!(email, "SEED_OWNER_EMAIL is not an email address");
            return Ok(SeedOutcome::Skipped);
        }
        if db::users::find_by_email(pool, email).await?.is_some() {
            return Ok(SeedOutcome::Applied);
        }

        let mut tx = pool.begin().await?;

        let organization_id = match db::organizations::find_by_name(&mut *tx, &self.organization_name).await? {
            Some(existing) => OrganizationId::from_string(&existing.id)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            None => {
                let organization_id = OrganizationId::new();
                let organization = NewOrganization {
                    id: organization_id.clone(),
                    name: self.organization_name.clone(),
                };
                db::organizations::insert(&mut *tx, &organization).await?;
                organization_id
            }
        };

        let user_id = UserId::new();
        let owner = NewUser {
            id: user_id.clone(),
            email: email.to_string(),
            global_role: GlobalRole::Admin,
            subscription_tier: SubscriptionTier::Growth,
        };
        db::users::insert(&mut *tx, &owner).await?;
        db::organizations::add_member(&mut *tx, &organization_id, &user_id, OrganizationRole::Owner).await?;

        tx.commit().await?;

        tracing::info!(
            email,
            organization = %self.organization_name,
            organization_id = %organization_id,
            user_id = %user_id,
            "created dev organization owner"
        );
        Ok(SeedOutcome::Applied)
    }
}
