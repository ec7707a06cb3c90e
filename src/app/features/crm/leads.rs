use serde::{Deserialize, Serialize};
use ulid::Ulid;
use validator::Validate;

use crate::app::audit::ActivityRecord;
use crate::app::authz::{Capability, Feature, Requirement};
use crate::app::db::contacts::{self, Contact, NewContact};
use crate::app::db::leads::{self, Lead, LeadChanges, NewLead};
use crate::app::db::TenantSession;
use crate::app::domain::{ContactStatus, LeadScore, LeadStatus, OrganizationId, Principal, ResourceType, UserId};
use crate::app::error::AppError;
use crate::app::guard;
use crate::app::pipeline::{self, Mutation, Operation};
use crate::app::AppState;

use super::{views, BulkAssignInput, Target};

pub const CREATE: Operation = Operation::new(
    "create_lead",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "leads:write"),
    "Failed to create lead",
);
pub const UPDATE: Operation = Operation::new(
    "update_lead",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "leads:write"),
    "Failed to update lead",
);
pub const UPDATE_SCORE: Operation = Operation::new(
    "update_lead_score",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "leads:write"),
    "Failed to update lead score",
);
pub const UPDATE_STATUS: Operation = Operation::new(
    "update_lead_status",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "leads:write"),
    "Failed to update lead status",
);
pub const CONVERT: Operation = Operation::new(
    "convert_lead",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "leads:write"),
    "Failed to convert lead",
);
pub const DELETE: Operation = Operation::new(
    "delete_lead",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "leads:manage"),
    "Failed to delete lead",
);
pub const BULK_ASSIGN: Operation = Operation::new(
    "bulk_assign_leads",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "leads:manage"),
    "Failed to assign leads",
);
pub const READ: Operation = Operation::new(
    "read_leads",
    Requirement::new(Feature::Crm, Capability::AccessCrm, "leads:read"),
    "Failed to load leads",
);

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLeadInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub source: String,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub score: LeadScore,
    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub score_value: i64,
    pub assigned_to_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateLeadInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub source: String,
    pub assigned_to_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LeadScoreInput {
    pub score: LeadScore,
    #[validate(range(min = 0, max = 100))]
    pub score_value: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LeadStatusInput {
    pub status: LeadStatus,
}

/// A converted lead and the contact created from it.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertedLead {
    pub lead: Lead,
    pub contact: Contact,
}

pub async fn create_lead(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    input: CreateLeadInput,
) -> Result<Lead, AppError> {
    pipeline::mutate(state, caller, organization_id, &CREATE, input, create_in_session).await
}

async fn create_in_session(mut session: TenantSession, input: CreateLeadInput) -> Result<Mutation<Lead>, AppError> {
    guard::ensure_assignee(&mut session, input.assigned_to_id.as_ref()).await?;

    let new_lead = NewLead {
        id: Ulid::new().to_string(),
        name: input.name,
        email: input.email,
        source: input.source,
        status: input.status,
        score: input.score,
        score_value: input.score_value,
        assigned_to_id: input.assigned_to_id,
    };
    leads::insert(&mut session, &new_lead).await?;

    let lead = guard::fetch_owned::<Lead>(&mut session, &new_lead.id).await?;
    let record = ActivityRecord::new("created_lead", ResourceType::Lead, &lead.id).after(&lead);
    let paths = views(ResourceType::Lead, Some(&lead.id));
    Ok(Mutation::stage(session, lead).audited(record).invalidates(paths))
}

pub async fn update_lead(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
    input: UpdateLeadInput,
) -> Result<Lead, AppError> {
    let id = id.to_string();
    pipeline::mutate(state, caller, organization_id, &UPDATE, input, move |session, input| {
        update_in_session(session, id, input)
    })
    .await
}

async fn update_in_session(mut session: TenantSession, id: String, input: UpdateLeadInput) -> Result<Mutation<Lead>, AppError> {
    let before = guard::fetch_owned::<Lead>(&mut session, &id).await?;
    guard::ensure_assignee(&mut session, input.assigned_to_id.as_ref()).await?;

    let changes = LeadChanges {
        name: input.name,
        email: input.email,
        source: input.source,
        assigned_to_id: input.assigned_to_id,
    };
    guard::expect_affected(leads::update(&mut session, &id, &changes).await?)?;

    let after = guard::fetch_owned::<Lead>(&mut session, &id).await?;
    let record = ActivityRecord::new("updated_lead", ResourceType::Lead, &id)
        .before(&before)
        .after(&after);
    Ok(Mutation::stage(session, after)
        .audited(record)
        .invalidates(views(ResourceType::Lead, Some(&id))))
}

/// Re-score a lead. Bucket and numeric value change together.
pub async fn update_lead_score(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
    input: LeadScoreInput,
) -> Result<Lead, AppError> {
    let id = id.to_string();
    pipeline::mutate(state, caller, organization_id, &UPDATE_SCORE, input, move |session, input| {
        update_score_in_session(session, id, input)
    })
    .await
}

async fn update_score_in_session(
    mut session: TenantSession,
    id: String,
    input: LeadScoreInput,
) -> Result<Mutation<Lead>, AppError> {
    let before = guard::fetch_owned::<Lead>(&mut session, &id).await?;
    guard::expect_affected(leads::update_score(&mut session, &id, input.score, input.score_value).await?)?;

    let after = guard::fetch_owned::<Lead>(&mut session, &id).await?;
    let record = ActivityRecord::new("updated_lead_score", ResourceType::Lead, &id)
        .before(&serde_json::json!({ "score": before.score, "score_value": before.score_value }))
        .after(&serde_json::json!({ "score": after.score, "score_value": after.score_value }));
    Ok(Mutation::stage(session, after)
        .audited(record)
        .invalidates(views(ResourceType::Lead, Some(&id))))
}

pub async fn update_lead_status(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
    input: LeadStatusInput,
) -> Result<Lead, AppError> {
    let id = id.to_string();
    pipeline::mutate(state, caller, organization_id, &UPDATE_STATUS, input, move |session, input| {
        update_status_in_session(session, id, input)
    })
    .await
}

async fn update_status_in_session(
    mut session: TenantSession,
    id: String,
    input: LeadStatusInput,
) -> Result<Mutation<Lead>, AppError> {
    let before = guard::fetch_owned::<Lead>(&mut session, &id).await?;
    guard::expect_affected(leads::update_status(&mut session, &id, input.status).await?)?;

    let after = guard::fetch_owned::<Lead>(&mut session, &id).await?;
    let record = ActivityRecord::new("updated_lead_status", ResourceType::Lead, &id)
        .before(&serde_json::json!({ "status": before.status }))
        .after(&serde_json::json!({ "status": after.status }));
    Ok(Mutation::stage(session, after)
        .audited(record)
        .invalidates(views(ResourceType::Lead, Some(&id))))
}

/// Turn a lead into a client contact. The contact insert and the status change commit together.
pub async fn convert_lead(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
) -> Result<ConvertedLead, AppError> {
    let target = Target { id: id.to_string() };
    pipeline::mutate(state, caller, organization_id, &CONVERT, target, convert_in_session).await
}

async fn convert_in_session(mut session: TenantSession, target: Target) -> Result<Mutation<ConvertedLead>, AppError> {
    let before = guard::fetch_owned::<Lead>(&mut session, &target.id).await?;
    if before.status == LeadStatus::Converted.to_string() {
        return Err(AppError::Validation("Lead is already converted".to_string()));
    }

    let assigned_to_id = before
        .assigned_to_id
        .as_deref()
        .map(UserId::from_string)
        .transpose()
        .map_err(|_| AppError::Internal)?;
    let new_contact = NewContact {
        id: Ulid::new().to_string(),
        name: before.name.clone(),
        email: before.email.clone(),
        phone: None,
        status: ContactStatus::Client,
        assigned_to_id,
    };
    contacts::insert(&mut session, &new_contact).await?;
    guard::expect_affected(leads::update_status(&mut session, &target.id, LeadStatus::Converted).await?)?;

    let contact = guard::fetch_owned::<Contact>(&mut session, &new_contact.id).await?;
    let lead = guard::fetch_owned::<Lead>(&mut session, &target.id).await?;
    let record = ActivityRecord::new("converted_lead", ResourceType::Lead, &lead.id)
        .before(&before)
        .after(&serde_json::json!({ "status": lead.status, "contact_id": contact.id }));
    let mut paths = views(ResourceType::Lead, Some(&lead.id));
    paths.push(format!("/crm/{}", ResourceType::Contact.table()));
    Ok(Mutation::stage(session, ConvertedLead { lead, contact })
        .audited(record)
        .invalidates(paths))
}

pub async fn delete_lead(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
) -> Result<(), AppError> {
    super::delete_record::<Lead>(state, caller, organization_id, &DELETE, "deleted_lead", id).await
}

pub async fn bulk_assign_leads(
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
        ResourceType::Lead,
        "bulk_assigned_leads",
        input,
    )
    .await
}

pub async fn list_leads(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    limit: Option<i64>,
) -> Result<Vec<Lead>, AppError> {
    super::list_records::<Lead>(state, caller, organization_id, &READ, limit).await
}

pub async fn get_lead(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
) -> Result<Lead, AppError> {
    super::get_record::<Lead>(state, caller, organization_id, &READ, id).await
}
