//! CRM operations. Every public function here goes through [`pipeline`]; the helpers
//! below cover the shapes that are identical across record kinds.

pub mod activity;
pub mod contacts;
pub mod customers;
pub mod deals;
pub mod leads;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::audit::ActivityRecord;
use crate::app::db::{scoped, TenantRow, TenantSession};
use crate::app::domain::{OrganizationId, Principal, ResourceType, UserId};
use crate::app::error::AppError;
use crate::app::guard;
use crate::app::pipeline::{self, Mutation, Operation};
use crate::app::AppState;

/// Rows returned when the caller does not ask for a page size.
pub const DEFAULT_PAGE_SIZE: i64 = 100;
/// Upper bound on a single page.
pub const MAX_PAGE_SIZE: i64 = 500;

/// Input for operations that only name a record.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Target {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
}

/// Input for bulk reassignment. Ids the active organization does not own are skipped.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkAssignInput {
    #[validate(length(min = 1, max = 1000))]
    pub ids: Vec<String>,
    pub assigned_to_id: Option<UserId>,
}

/// Views affected by a change to one record kind.
pub(crate) fn views(resource: ResourceType, id: Option<&str>) -> Vec<String> {
    let base = format!("/crm/{}", resource.table());
    let mut paths = Vec::with_capacity(3);
    if let Some(id) = id {
        paths.push(format!("{base}/{id}"));
    }
    paths.push(base);
    paths.push("/crm/dashboard".to_string());
    paths
}

pub(crate) fn page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

pub(crate) async fn list_records<T: TenantRow>(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    operation: &Operation,
    limit: Option<i64>,
) -> Result<Vec<T>, AppError> {
    let limit = page_size(limit);
    pipeline::query(state, caller, organization_id, operation, move |session| {
        list_in_session::<T>(session, limit)
    })
    .await
}

async fn list_in_session<T: TenantRow>(mut session: TenantSession, limit: i64) -> Result<Vec<T>, AppError> {
    Ok(scoped::list::<T>(&mut session, limit).await?)
}

pub(crate) async fn get_record<T: TenantRow>(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    operation: &Operation,
    id: &str,
) -> Result<T, AppError> {
    let id = id.to_string();
    pipeline::query(state, caller, organization_id, operation, move |session| {
        get_in_session::<T>(session, id)
    })
    .await
}

async fn get_in_session<T: TenantRow>(mut session: TenantSession, id: String) -> Result<T, AppError> {
    guard::fetch_owned::<T>(&mut session, &id).await
}

pub(crate) async fn delete_record<T: TenantRow + Serialize>(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    operation: &Operation,
    action: &'static str,
    id: &str,
) -> Result<(), AppError> {
    let target = Target { id: id.to_string() };
    pipeline::mutate(state, caller, organization_id, operation, target, move |session, target| {
        delete_in_session::<T>(session, target, action)
    })
    .await
}

async fn delete_in_session<T: TenantRow + Serialize>(
    mut session: TenantSession,
    target: Target,
    action: &'static str,
) -> Result<Mutation<()>, AppError> {
    let before = guard::fetch_owned::<T>(&mut session, &target.id).await?;
    let rows = scoped::delete(&mut session, T::RESOURCE, &target.id).await?;
    guard::expect_affected(rows)?;

    let record = ActivityRecord::new(action, T::RESOURCE, before.id()).before(&before);
    let paths = views(T::RESOURCE, Some(before.id()));
    Ok(Mutation::stage(session, ()).audited(record).invalidates(paths))
}

pub(crate) async fn bulk_assign(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    operation: &Operation,
    resource: ResourceType,
    action: &'static str,
    input: BulkAssignInput,
) -> Result<u64, AppError> {
    pipeline::mutate(state, caller, organization_id, operation, input, move |session, input| {
        bulk_assign_in_session(session, resource, action, input)
    })
    .await
}

async fn bulk_assign_in_session(
    mut session: TenantSession,
    resource: ResourceType,
    action: &'static str,
    input: BulkAssignInput,
) -> Result<Mutation<u64>, AppError> {
    guard::ensure_assignee(&mut session, input.assigned_to_id.as_ref()).await?;
    let updated = scoped::assign_many(&mut session, resource, &input.ids, input.assigned_to_id.as_ref()).await?;

    let record = ActivityRecord::new(action, resource, "bulk").after(&serde_json::json!({
        "requested": input.ids.len(),
        "updated": updated,
        "assigned_to_id": input.assigned_to_id,
    }));
    Ok(Mutation::stage(session, updated)
        .audited(record)
        .invalidates(views(resource, None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_include_detail_list_and_dashboard() {
        assert_eq!(
            views(ResourceType::Contact, Some("01ABC")),
            vec!["/crm/contacts/01ABC", "/crm/contacts", "/crm/dashboard"]
        );
        assert_eq!(views(ResourceType::Deal, None), vec!["/crm/deals", "/crm/dashboard"]);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(10_000)), MAX_PAGE_SIZE);
    }

    #[test]
    fn bulk_input_requires_ids() {
        let input = BulkAssignInput { ids: Vec::new(), assigned_to_id: None };
        assert!(input.validate().is_err());
    }
}
