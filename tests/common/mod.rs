#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tenantgate::app::db::{self, organizations::NewOrganization, users::NewUser};
use tenantgate::app::domain::{GlobalRole, OrganizationId, OrganizationRole, Principal, SubscriptionTier, UserId};
use tenantgate::app::features::crm::contacts::CreateContactInput;
use tenantgate::app::invalidation::{InvalidationError, ViewInvalidator};
use tenantgate::app::AppState;

/// In-memory database on a single connection, so every test also exercises
/// connection reuse across tenant sessions.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// One invalidation call, with how many contacts were visible when it arrived.
#[derive(Debug, Clone)]
pub struct Invalidation {
    pub paths: Vec<String>,
    pub visible_contacts: i64,
}

/// Records invalidation calls and what a fresh reader could see at that moment.
pub struct RecordingInvalidator {
    pool: SqlitePool,
    pub calls: Mutex<Vec<Invalidation>>,
}

impl RecordingInvalidator {
    pub fn calls(&self) -> Vec<Invalidation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ViewInvalidator for RecordingInvalidator {
    async fn invalidate(&self, paths: &[String]) -> Result<(), InvalidationError> {
        let visible_contacts: i64 = sqlx::query_scalar("SELECT count(*) FROM contacts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| InvalidationError::Signal(e.to_string()))?;
        self.calls.lock().unwrap().push(Invalidation {
            paths: paths.to_vec(),
            visible_contacts,
        });
        Ok(())
    }
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub state: AppState,
    pub invalidator: Arc<RecordingInvalidator>,
}

pub async fn test_app() -> TestApp {
    let pool = test_pool().await;
    let invalidator = Arc::new(RecordingInvalidator {
        pool: pool.clone(),
        calls: Mutex::new(Vec::new()),
    });
    let state = AppState::new(pool.clone(), invalidator.clone());
    TestApp {
        pool,
        state,
        invalidator,
    }
}

pub async fn create_organization(pool: &SqlitePool, name: &str) -> OrganizationId {
    let id = OrganizationId::new();
    db::organizations::insert(
        pool,
        &NewOrganization {
            id: id.clone(),
            name: name.to_string(),
        },
    )
    .await
    .unwrap();
    id
}

pub async fn create_user(pool: &SqlitePool, email: &str, global_role: GlobalRole, tier: SubscriptionTier) -> UserId {
    let id = UserId::new();
    db::users::insert(
        pool,
        &NewUser {
            id: id.clone(),
            email: email.to_string(),
            global_role,
            subscription_tier: tier,
        },
    )
    .await
    .unwrap();
    id
}

pub async fn add_member(pool: &SqlitePool, organization_id: &OrganizationId, user_id: &UserId, role: OrganizationRole) {
    db::organizations::add_member(pool, organization_id, user_id, role)
        .await
        .unwrap();
}

pub async fn load_principal(pool: &SqlitePool, user_id: &UserId) -> Principal {
    db::users::load_principal(pool, user_id)
        .await
        .unwrap()
        .expect("user exists")
}

/// Create a user, make them `role` in `organization_id`, and load their principal.
pub async fn member(
    pool: &SqlitePool,
    organization_id: &OrganizationId,
    email: &str,
    global_role: GlobalRole,
    tier: SubscriptionTier,
    role: OrganizationRole,
) -> Principal {
    let user_id = create_user(pool, email, global_role, tier).await;
    add_member(pool, organization_id, &user_id, role).await;
    load_principal(pool, &user_id).await
}

/// Starter-tier employee with the given org role: passes the tier and global gates for CRM writes.
pub async fn crm_user(pool: &SqlitePool, organization_id: &OrganizationId, email: &str, role: OrganizationRole) -> Principal {
    member(pool, organization_id, email, GlobalRole::Employee, SubscriptionTier::Starter, role).await
}

pub fn contact_input(name: &str) -> CreateContactInput {
    CreateContactInput {
        name: name.to_string(),
        email: None,
        phone: None,
        status: Default::default(),
        assigned_to_id: None,
    }
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT count(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}
