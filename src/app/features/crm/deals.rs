use serde::Deserialize;
use ulid::Ulid;
use validator::Validate;

use crate::app::audit::ActivityRecord;
use crate::app::authz::{Capability, Feature, Requirement};
use crate::app::db::deals::{self, Deal, DealChanges, NewDeal};
use crate::app::db::TenantSession;
use crate::app::domain::{DealOutcome, DealStage, OrganizationId, Principal, ResourceType, UserId};
use crate::app::error::AppError;
use crate::app::guard;
use crate::app::pipeline::{self, Mutation, Operation};
use crate::app::AppState;

use super::{views, BulkAssignInput};

pub const CREATE: Operation = Operation::new(
    "create_deal",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "deals:write"),
    "Failed to create deal",
);
pub const UPDATE: Operation = Operation::new(
    "update_deal",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "deals:write"),
    "Failed to update deal",
);
pub const UPDATE_STAGE: Operation = Operation::new(
    "update_deal_stage",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "deals:write"),
    "Failed to update deal stage",
);
pub const CLOSE: Operation = Operation::new(
    "close_deal",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "deals:write"),
    "Failed to close deal",
);
pub const DELETE: Operation = Operation::new(
    "delete_deal",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "deals:manage"),
    "Failed to delete deal",
);
pub const BULK_ASSIGN: Operation = Operation::new(
    "bulk_assign_deals",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "deals:manage"),
    "Failed to assign deals",
);
pub const READ: Operation = Operation::new(
    "read_deals",
    Requirement::new(Feature::Crm, Capability::AccessCrm, "deals:read"),
    "Failed to load deals",
);

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDealInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub value_cents: i64,
    #[serde(default)]
    pub stage: DealStage,
    pub contact_id: Option<String>,
    pub lead_id: Option<String>,
    pub assigned_to_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateDealInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(range(min = 0))]
    pub value_cents: i64,
    pub contact_id: Option<String>,
    pub lead_id: Option<String>,
    pub assigned_to_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DealStageInput {
    pub stage: DealStage,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CloseDealInput {
    pub outcome: DealOutcome,
    #[validate(length(max = 1000))]
    pub lost_reason: Option<String>,
}

/// Linked contacts and leads are tenant data too; foreign ids are rejected like targets.
async fn ensure_links(
    session: &mut TenantSession,
    contact_id: Option<&str>,
    lead_id: Option<&str>,
) -> Result<(), AppError> {
    if let Some(contact_id) = contact_id {
        guard::ensure_owned(session, ResourceType::Contact, contact_id).await?;
    }
    if let Some(lead_id) = lead_id {
        guard::ensure_owned(session, ResourceType::Lead, lead_id).await?;
    }
    Ok(())
}

pub async fn create_deal(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    input: CreateDealInput,
) -> Result<Deal, AppError> {
    pipeline::mutate(state, caller, organization_id, &CREATE, input, create_in_session).await
}

async fn create_in_session(mut session: TenantSession, input: CreateDealInput) -> Result<Mutation<Deal>, AppError> {
    ensure_links(&mut session, input.contact_id.as_deref(), input.lead_id.as_deref()).await?;
    guard::ensure_assignee(&mut session, input.assigned_to_id.as_ref()).await?;

    let new_deal = NewDeal {
        id: Ulid::new().to_string(),
        title: input.title,
        value_cents: input.value_cents,
        stage: input.stage,
        contact_id: input.contact_id,
        lead_id: input.lead_id,
        assigned_to_id: input.assigned_to_id,
    };
    deals::insert(&mut session, &new_deal).await?;

    let deal = guard::fetch_owned::<Deal>(&mut session, &new_deal.id).await?;
    let record = ActivityRecord::new("created_deal", ResourceType::Deal, &deal.id).after(&deal);
    let paths = views(ResourceType::Deal, Some(&deal.id));
    Ok(Mutation::stage(session, deal).audited(record).invalidates(paths))
}

pub async fn update_deal(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
    input: UpdateDealInput,
) -> Result<Deal, AppError> {
    let id = id.to_string();
    pipeline::mutate(state, caller, organization_id, &UPDATE, input, move |session, input| {
        update_in_session(session, id, input)
    })
    .await
}

async fn update_in_session(mut session: TenantSession, id: String, input: UpdateDealInput) -> Result<Mutation<Deal>, AppError> {
    let before = guard::fetch_owned::<Deal>(&mut session, &id).await?;
    ensure_links(&mut session, input.contact_id.as_deref(), input.lead_id.as_deref()).await?;
    guard::ensure_assignee(&mut session, input.assigned_to_id.as_ref()).await?;

    let changes = DealChanges {
        title: input.title,
        value_cents: input.value_cents,
        contact_id: input.contact_id,
        lead_id: input.lead_id,
        assigned_to_id: input.assigned_to_id,
    };
    guard::expect_affected(deals::update(&mut session, &id, &changes).await?)?;

    let after = guard::fetch_owned::<Deal>(&mut session, &id).await?;
    let record = ActivityRecord::new("updated_deal", ResourceType::Deal, &id)
        .before(&before)
        .after(&after);
    Ok(Mutation::stage(session, after)
        .audited(record)
        .invalidates(views(ResourceType::Deal, Some(&id))))
}

/// Move a deal to another pipeline stage.
pub async fn update_deal_stage(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
    input: DealStageInput,
) -> Result<Deal, AppError> {
    let id = id.to_string();
    pipeline::mutate(state, caller, organization_id, &UPDATE_STAGE, input, move |session, input| {
        update_stage_in_session(session, id, input)
    })
    .await
}

async fn update_stage_in_session(
    mut session: TenantSession,
    id: String,
    input: DealStageInput,
) -> Result<Mutation<Deal>, AppError> {
    let before = guard::fetch_owned::<Deal>(&mut session, &id).await?;
    guard::expect_affected(deals::update_stage(&mut session, &id, input.stage).await?)?;

    let after = guard::fetch_owned::<Deal>(&mut session, &id).await?;
    let record = ActivityRecord::new("updated_deal_stage", ResourceType::Deal, &id)
        .before(&serde_json::json!({ "stage": before.stage }))
        .after(&serde_json::json!({ "stage": after.stage }));
    Ok(Mutation::stage(session, after)
        .audited(record)
        .invalidates(views(ResourceType::Deal, Some(&id))))
}

/// Close a deal as won or lost. Closed deals stay closed; reopening goes through `update_deal_stage`.
pub async fn close_deal(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
    input: CloseDealInput,
) -> Result<Deal, AppError> {
    let id = id.to_string();
    pipeline::mutate(state, caller, organization_id, &CLOSE, input, move |session, input| {
        close_in_session(session, id, input)
    })
    .await
}

async fn close_in_session(mut session: TenantSession, id: String, input: CloseDealInput) -> Result<Mutation<Deal>, AppError> {
    let before = guard::fetch_owned::<Deal>(&mut session, &id).await?;
    if before.closed_at.is_some() || before.stage.parse::<DealStage>().is_ok_and(DealStage::is_closed) {
        return Err(AppError::Validation("Deal is already closed".to_string()));
    }

    let lost_reason = match input.outcome {
        DealOutcome::Lost => input.lost_reason.as_deref(),
        DealOutcome::Won => None,
    };
    guard::expect_affected(deals::close(&mut session, &id, input.outcome.stage(), lost_reason).await?)?;

    let after = guard::fetch_owned::<Deal>(&mut session, &id).await?;
    let record = ActivityRecord::new("closed_deal", ResourceType::Deal, &id)
        .before(&serde_json::json!({ "stage": before.stage }))
        .after(&serde_json::json!({ "stage": after.stage, "lost_reason": after.lost_reason }));
    Ok(Mutation::stage(session, after)
        .audited(record)
        .invalidates(views(ResourceType::Deal, Some(&id))))
}

pub async fn delete_deal(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
) -> Result<(), AppError> {
    super::delete_record::<Deal>(state, caller, organization_id, &DELETE, "deleted_deal", id).await
}

pub async fn bulk_assign_deals(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    input: BulkAssignInput,
) -> Result<u64, AppError> {
    super::bulk_assign(
        state,
        caller,
        organization_id,
        &BULK_ASSIGN,
        ResourceType::Deal,
        "bulk_assigned_deals",
        input,
    )
    .await
}

pub async fn list_deals(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    limit: Option<i64>,
) -> Result<Vec<Deal>, AppError> {
    super::list_records::<Deal>(state, caller, organization_id, &READ, limit).await
}

pub async fn get_deal(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
) -> Result<Deal, AppError> {
    super::get_record::<Deal>(state, caller, organization_id, &READ, id).await
}
