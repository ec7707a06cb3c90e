use crate::app::authz::{Capability, Feature, Requirement};
use crate::app::db::activity_logs::{self, ActivityLog};
use crate::app::db::TenantSession;
use crate::app::domain::{OrganizationId, Principal};
use crate::app::error::AppError;
use crate::app::pipeline::{self, Operation};
use crate::app::AppState;

pub const READ: Operation = Operation::new(
    "list_activity",
    Requirement::new(Feature::Crm, Capability::ViewAuditLog, "activity:read"),
    "Failed to load activity",
);

/// Newest activity entries for the organization. Never includes another tenant's rows.
pub async fn list_activity(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    limit: Option<i64>,
) -> Result<Vec<ActivityLog>, AppError> {
    let limit = super::page_size(limit);
    pipeline::query(state, caller, organization_id, &READ, move |session| {
        list_in_session(session, limit)
    })
    .await
}

async fn list_in_session(mut session: TenantSession, limit: i64) -> Result<Vec<ActivityLog>, AppError> {
    let organization_id = session.organization_id().clone();
    Ok(activity_logs::list_for_organization(session.conn(), &organization_id, limit).await?)
}
