use std::sync::Arc;

use sqlx::SqlitePool;

/// Human-readable application name, used in logs and seed output.
pub const APP_NAME: &str = "Tenantgate";

/// Shared state every operation runs against.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub audit: audit::ActivityLogger,
    pub invalidator: Arc<dyn invalidation::ViewInvalidator>,
}

impl AppState {
    pub fn new(db: SqlitePool, invalidator: Arc<dyn invalidation::ViewInvalidator>) -> Self {
        Self {
            audit: audit::ActivityLogger::new(db.clone()),
            db,
            invalidator,
        }
    }

    /// Connect, migrate and wire collaborators from config.
    pub async fn from_config(config: &config::Config) -> Result<Self, String> {
        let db = db::connect(config)
            .await
            .map_err(|e| format!("Failed to connect to database: {e}"))?;
        db::migrate(&db)
            .await
            .map_err(|e| format!("Failed to run database migrations: {e}"))?;
        let invalidator = invalidation::from_config(config).map_err(|e| e.to_string())?;
        Ok(Self::new(db, invalidator))
    }
}

pub mod audit;
pub mod authz;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod features;
pub mod guard;
pub mod invalidation;
pub mod pipeline;
pub mod tenant;
