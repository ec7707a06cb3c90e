use serde::Deserialize;
use ulid::Ulid;
use validator::Validate;

use crate::app::audit::ActivityRecord;
use crate::app::authz::{Capability, Feature, Requirement};
use crate::app::db::contacts::{self, Contact, ContactChanges, NewContact};
use crate::app::db::TenantSession;
use crate::app::domain::{ContactStatus, OrganizationId, Principal, ResourceType, UserId};
use crate::app::error::AppError;
use crate::app::guard;
use crate::app::pipeline::{self, Mutation, Operation};
use crate::app::AppState;

use super::{views, BulkAssignInput};

pub const CREATE: Operation = Operation::new(
    "create_contact",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "contacts:write"),
    "Failed to create contact",
);
pub const UPDATE: Operation = Operation::new(
    "update_contact",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "contacts:write"),
    "Failed to update contact",
);
pub const UPDATE_STATUS: Operation = Operation::new(
    "update_contact_status",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "contacts:write"),
    "Failed to update contact status",
);
pub const DELETE: Operation = Operation::new(
    "delete_contact",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "contacts:manage"),
    "Failed to delete contact",
);
pub const BULK_ASSIGN: Operation = Operation::new(
    "bulk_assign_contacts",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "contacts:manage"),
    "Failed to assign contacts",
);
pub const READ: Operation = Operation::new(
    "read_contacts",
    Requirement::new(Feature::Crm, Capability::AccessCrm, "contacts:read"),
    "Failed to load contacts",
);

/// Input for creating a contact.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateContactInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: ContactStatus,
    pub assigned_to_id: Option<UserId>,
}

/// Input for editing a contact. Status has its own operation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateContactInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub assigned_to_id: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactStatusInput {
    pub status: ContactStatus,
}

/// Create a contact in `organization_id`.
pub async fn create_contact(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    input: CreateContactInput,
) -> Result<Contact, AppError> {
    pipeline::mutate(state, caller, organization_id, &CREATE, input, create_in_session).await
}

async fn create_in_session(mut session: TenantSession, input: CreateContactInput) -> Result<Mutation<Contact>, AppError> {
    guard::ensure_assignee(&mut session, input.assigned_to_id.as_ref()).await?;

    let new_contact = NewContact {
        id: Ulid::new().to_string(),
        name: input.name,
        email: input.email,
        phone: input.phone,
        status: input.status,
        assigned_to_id: input.assigned_to_id,
    };
    contacts::insert(&mut session, &new_contact).await?;

    // Read back through the tenant filter, inside the uncommitted session.
    let contact = guard::fetch_owned::<Contact>(&mut session, &new_contact.id).await?;
    let record = ActivityRecord::new("created_contact", ResourceType::Contact, &contact.id).after(&contact);
    let paths = views(ResourceType::Contact, Some(&contact.id));
    Ok(Mutation::stage(session, contact).audited(record).invalidates(paths))
}

/// Edit a contact's details.
pub async fn update_contact(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
    input: UpdateContactInput,
) -> Result<Contact, AppError> {
    let id = id.to_string();
    pipeline::mutate(state, caller, organization_id, &UPDATE, input, move |session, input| {
        update_in_session(session, id, input)
    })
    .await
}

async fn update_in_session(
    mut session: TenantSession,
    id: String,
    input: UpdateContactInput,
) -> Result<Mutation<Contact>, AppError> {
    let before = guard::fetch_owned::<Contact>(&mut session, &id).await?;
    guard::ensure_assignee(&mut session, input.assigned_to_id.as_ref()).await?;

    let changes = ContactChanges {
        name: input.name,
        email: input.email,
        phone: input.phone,
        assigned_to_id: input.assigned_to_id,
    };
    guard::expect_affected(contacts::update(&mut session, &id, &changes).await?)?;

    let after = guard::fetch_owned::<Contact>(&mut session, &id).await?;
    let record = ActivityRecord::new("updated_contact", ResourceType::Contact, &id)
        .before(&before)
        .after(&after);
    Ok(Mutation::stage(session, after)
        .audited(record)
        .invalidates(views(ResourceType::Contact, Some(&id))))
}

/// Move a contact to another status.
pub async fn update_contact_status(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
    input: ContactStatusInput,
) -> Result<Contact, AppError> {
    let id = id.to_string();
    pipeline::mutate(state, caller, organization_id, &UPDATE_STATUS, input, move |session, input| {
        update_status_in_session(session, id, input)
    })
    .await
}

async fn update_status_in_session(
    mut session: TenantSession,
    id: String,
    input: ContactStatusInput,
) -> Result<Mutation<Contact>, AppError> {
    let before = guard::fetch_owned::<Contact>(&mut session, &id).await?;
    guard::expect_affected(contacts::update_status(&mut session, &id, input.status).await?)?;

    let after = guard::fetch_owned::<Contact>(&mut session, &id).await?;
    let record = ActivityRecord::new("updated_contact_status", ResourceType::Contact, &id)
        .before(&serde_json::json!({ "status": before.status }))
        .after(&serde_json::json!({ "status": after.status }));
    Ok(Mutation::stage(session, after)
        .audited(record)
        .invalidates(views(ResourceType::Contact, Some(&id))))
}

/// Delete a contact. Deals that referenced it keep their row with the link cleared.
pub async fn delete_contact(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
) -> Result<(), AppError> {
    super::delete_record::<Contact>(state, caller, organization_id, &DELETE, "deleted_contact", id).await
}

/// Reassign many contacts at once. Returns how many were actually updated.
pub async fn bulk_assign_contacts(
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
        ResourceType::Contact,
        "bulk_assigned_contacts",
        input,
    )
    .await
}

/// Newest contacts first.
pub async fn list_contacts(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    limit: Option<i64>,
) -> Result<Vec<Contact>, AppError> {
    super::list_records::<Contact>(state, caller, organization_id, &READ, limit).await
}

pub async fn get_contact(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
) -> Result<Contact, AppError> {
    super::get_record::<Contact>(state, caller, organization_id, &READ, id).await
}
