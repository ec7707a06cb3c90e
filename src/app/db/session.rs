//! Store-level tenant binding.
//!
//! A [`TenantSession`] is one transaction on one pooled connection, with the active
//! organization written into a connection-local TEMP table. TEMP triggers on every
//! tenant table compare each inserted, updated or deleted row against that binding
//! and abort the statement on mismatch. An empty binding matches nothing, so writes
//! on a connection that has ever carried a session fail closed once it is unbound.
//!
//! The binding row is inserted inside the transaction: commit deletes it first,
//! rollback (explicit or on drop) discards it. A connection never goes back to the
//! pool still bound.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::app::domain::{OrganizationId, ResourceType};
use crate::app::error::AppError;
use crate::app::tenant;

const BINDING_TABLE: &str = "tenant_binding";
const TRIGGER_PREFIX: &str = "tenant_guard_";

/// Pinned transaction bound to the active tenant. Repository functions take one of these.
pub struct TenantSession {
    organization_id: OrganizationId,
    tx: Transaction<'static, Sqlite>,
}

impl TenantSession {
    /// Begin a read session for the ambient tenant. Fails with `MissingTenantContext`
    /// outside [`tenant::enter`], before any connection is taken from the pool.
    pub async fn begin(pool: &SqlitePool) -> Result<Self, AppError> {
        let organization_id = tenant::active_organization()?;
        let tx = pool.begin().await?;
        Self::bind(tx, organization_id).await
    }

    /// Begin a write session. The store write lock is taken at `BEGIN IMMEDIATE`,
    /// so the guard read and the write that follows see the same snapshot.
    /// Concurrent writers queue on the busy timeout.
    pub async fn begin_write(pool: &SqlitePool) -> Result<Self, AppError> {
        let organization_id = tenant::active_organization()?;
        let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
        Self::bind(tx, organization_id).await
    }

    async fn bind(mut tx: Transaction<'static, Sqlite>, organization_id: OrganizationId) -> Result<Self, AppError> {
        install(&mut *tx).await?;
        sqlx::query("DELETE FROM tenant_binding")
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO tenant_binding (organization_id) VALUES (?)")
            .bind(organization_id.as_str())
            .execute(&mut *tx)
            .await?;

        tracing::debug!(organization_id = %organization_id, "tenant session opened");
        Ok(Self { organization_id, tx })
    }

    /// Organization this session is bound to.
    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    /// The pinned connection. Everything run through it sees the binding.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Clear the binding and commit.
    pub async fn commit(mut self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tenant_binding")
            .execute(&mut *self.tx)
            .await?;
        self.tx.commit().await?;
        tracing::debug!(organization_id = %self.organization_id, "tenant session committed");
        Ok(())
    }

    /// Discard every write, the binding included.
    pub async fn rollback(self) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Organization currently bound on `conn`, if any. Tolerates connections that never
/// carried a session.
pub async fn bound_organization(conn: &mut SqliteConnection) -> Result<Option<String>, sqlx::Error> {
    let installed: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM sqlite_temp_master WHERE type = 'table' AND name = ?",
    )
    .bind(BINDING_TABLE)
    .fetch_one(&mut *conn)
    .await?;
    if installed == 0 {
        return Ok(None);
    }

    sqlx::query_scalar("SELECT organization_id FROM tenant_binding LIMIT 1")
        .fetch_optional(conn)
        .await
}

/// Create the binding table and triggers on this connection unless already present.
async fn install(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let expected = 1 + 3 * ResourceType::ALL.len() as i64;
    let present: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM sqlite_temp_master WHERE name = ? OR name LIKE ?",
    )
    .bind(BINDING_TABLE)
    .bind(format!("{TRIGGER_PREFIX}%"))
    .fetch_one(&mut *conn)
    .await?;
    if present == expected {
        return Ok(());
    }

    sqlx::query("CREATE TEMP TABLE IF NOT EXISTS tenant_binding (organization_id TEXT NOT NULL)")
        .execute(&mut *conn)
        .await?;
    for resource in ResourceType::ALL {
        for statement in trigger_statements(resource.table()) {
            sqlx::query(&statement).execute(&mut *conn).await?;
        }
    }
    tracing::debug!("tenant isolation triggers installed on connection");
    Ok(())
}

fn trigger_statements(table: &str) -> [String; 3] {
    let bound = "(SELECT organization_id FROM tenant_binding)";
    let body = "BEGIN SELECT RAISE(ABORT, 'tenant isolation violation'); END";
    [
        format!(
            "CREATE TEMP TRIGGER IF NOT EXISTS {TRIGGER_PREFIX}{table}_insert BEFORE INSERT ON {table} \
             WHEN NEW.organization_id IS NOT {bound} {body}"
        ),
        format!(
            "CREATE TEMP TRIGGER IF NOT EXISTS {TRIGGER_PREFIX}{table}_update BEFORE UPDATE ON {table} \
             WHEN OLD.organization_id IS NOT {bound} OR NEW.organization_id IS NOT {bound} {body}"
        ),
        format!(
            "CREATE TEMP TRIGGER IF NOT EXISTS {TRIGGER_PREFIX}{table}_delete BEFORE DELETE ON {table} \
             WHEN OLD.organization_id IS NOT {bound} {body}"
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_cover_every_write_kind() {
        let statements = trigger_statements("contacts");
        assert!(statements[0].contains("BEFORE INSERT ON contacts"));
        assert!(statements[1].contains("OLD.organization_id"));
        assert!(statements[1].contains("NEW.organization_id"));
        assert!(statements[2].contains("BEFORE DELETE ON contacts"));
        assert!(statements.iter().all(|s| s.contains("tenant_guard_contacts_")));
    }

    #[tokio::test]
    async fn begin_requires_a_tenant_context() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        assert!(matches!(
            TenantSession::begin(&pool).await,
            Err(AppError::MissingTenantContext)
        ));
        assert!(matches!(
            TenantSession::begin_write(&pool).await,
            Err(AppError::MissingTenantContext)
        ));
    }
}
