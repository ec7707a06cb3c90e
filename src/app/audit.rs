//! Append-only activity log, written after the business transaction commits.
//!
//! Recording is best effort: a failed write is reported on the `audit` tracing target
//! and never reaches the caller of the mutation.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::app::db::activity_logs::{self, NewActivityLog};
use crate::app::domain::{OrganizationId, ResourceType, UserId};

/// What a mutation did, described by the mutation itself.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub action: &'static str,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub old_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
}

impl ActivityRecord {
    pub fn new(action: &'static str, resource_type: ResourceType, resource_id: impl Into<String>) -> Self {
        Self {
            action,
            resource_type,
            resource_id: resource_id.into(),
            old_data: None,
            new_data: None,
        }
    }

    /// Snapshot before the change.
    pub fn before<T: Serialize>(mut self, value: &T) -> Self {
        self.old_data = snapshot(value);
        self
    }

    /// Snapshot after the change.
    pub fn after<T: Serialize>(mut self, value: &T) -> Self {
        self.new_data = snapshot(value);
        self
    }

    fn into_entry(self, organization_id: OrganizationId, user_id: UserId) -> NewActivityLog {
        NewActivityLog {
            organization_id,
            user_id,
            action: self.action.to_string(),
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            old_data: self.old_data.map(|v| v.to_string()),
            new_data: self.new_data.map(|v| v.to_string()),
        }
    }
}

fn snapshot<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(target: "audit", %err, "could not snapshot activity data");
            None
        }
    }
}

/// Writes activity entries through its own pool connection, outside any tenant session.
#[derive(Clone)]
pub struct ActivityLogger {
    db: SqlitePool,
}

impl ActivityLogger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one entry. Returns whether it was stored; failure is logged, never raised.
    pub async fn record(&self, organization_id: &OrganizationId, user_id: &UserId, record: ActivityRecord) -> bool {
        let action = record.action;
        let resource_id = record.resource_id.clone();
        let entry = record.into_entry(organization_id.clone(), user_id.clone());

        match activity_logs::insert(&self.db, &entry).await {
            Ok(id) => {
                tracing::info!(
                    target: "audit",
                    id = %id,
                    action,
                    organization_id = %organization_id,
                    user_id = %user_id,
                    resource_id = %resource_id,
                    "activity recorded"
                );
                true
            }
            Err(err) => {
                tracing::error!(
                    target: "audit",
                    %err,
                    action,
                    organization_id = %organization_id,
                    user_id = %user_id,
                    resource_id = %resource_id,
                    "failed to record activity"
                );
                false
            }
        }
    }
}
