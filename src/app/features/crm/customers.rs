use serde::Deserialize;
use ulid::Ulid;
use validator::Validate;

use crate::app::audit::ActivityRecord;
use crate::app::authz::{Capability, Feature, Requirement};
use crate::app::db::customers::{self, Customer, CustomerChanges, NewCustomer};
use crate::app::db::TenantSession;
use crate::app::domain::{CustomerStatus, OrganizationId, Principal, ResourceType, UserId};
use crate::app::error::AppError;
use crate::app::guard;
use crate::app::pipeline::{self, Mutation, Operation};
use crate::app::AppState;

use super::views;

pub const CREATE: Operation = Operation::new(
    "create_customer",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "customers:write"),
    "Failed to create customer",
);
pub const UPDATE: Operation = Operation::new(
    "update_customer",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "customers:write"),
    "Failed to update customer",
);
pub const DELETE: Operation = Operation::new(
    "delete_customer",
    Requirement::new(Feature::Crm, Capability::WriteCrm, "customers:manage"),
    "Failed to delete customer",
);
pub const READ: Operation = Operation::new(
    "read_customers",
    Requirement::new(Feature::Crm, Capability::AccessCrm, "customers:read"),
    "Failed to load customers",
);

/// Customer fields. Create and update take the same shape.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub company: Option<String>,
    #[serde(default)]
    pub status: CustomerStatus,
    pub assigned_to_id: Option<UserId>,
}

pub async fn create_customer(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    input: CustomerInput,
) -> Result<Customer, AppError> {
    pipeline::mutate(state, caller, organization_id, &CREATE, input, create_in_session).await
}

async fn create_in_session(mut session: TenantSession, input: CustomerInput) -> Result<Mutation<Customer>, AppError> {
    guard::ensure_assignee(&mut session, input.assigned_to_id.as_ref()).await?;

    let new_customer = NewCustomer {
        id: Ulid::new().to_string(),
        name: input.name,
        email: input.email,
        phone: input.phone,
        company: input.company,
        status: input.status,
        assigned_to_id: input.assigned_to_id,
    };
    customers::insert(&mut session, &new_customer).await?;

    let customer = guard::fetch_owned::<Customer>(&mut session, &new_customer.id).await?;
    let record = ActivityRecord::new("created_customer", ResourceType::Customer, &customer.id).after(&customer);
    let paths = views(ResourceType::Customer, Some(&customer.id));
    Ok(Mutation::stage(session, customer).audited(record).invalidates(paths))
}

pub async fn update_customer(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
    input: CustomerInput,
) -> Result<Customer, AppError> {
    let id = id.to_string();
    pipeline::mutate(state, caller, organization_id, &UPDATE, input, move |session, input| {
        update_in_session(session, id, input)
    })
    .await
}

async fn update_in_session(
    mut session: TenantSession,
    id: String,
    input: CustomerInput,
) -> Result<Mutation<Customer>, AppError> {
    let before = guard::fetch_owned::<Customer>(&mut session, &id).await?;
    guard::ensure_assignee(&mut session, input.assigned_to_id.as_ref()).await?;

    let changes = CustomerChanges {
        name: input.name,
        email: input.email,
        phone: input.phone,
        company: input.company,
        status: input.status,
        assigned_to_id: input.assigned_to_id,
    };
    guard::expect_affected(customers::update(&mut session, &id, &changes).await?)?;

    let after = guard::fetch_owned::<Customer>(&mut session, &id).await?;
    let record = ActivityRecord::new("updated_customer", ResourceType::Customer, &id)
        .before(&before)
        .after(&after);
    Ok(Mutation::stage(session, after)
        .audited(record)
        .invalidates(views(ResourceType::Customer, Some(&id))))
}

pub async fn delete_customer(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
) -> Result<(), AppError> {
    super::delete_record::<Customer>(state, caller, organization_id, &DELETE, "deleted_customer", id).await
}

pub async fn list_customers(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    limit: Option<i64>,
) -> Result<Vec<Customer>, AppError> {
    super::list_records::<Customer>(state, caller, organization_id, &READ, limit).await
}

pub async fn get_customer(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    id: &str,
) -> Result<Customer, AppError> {
    super::get_record::<Customer>(state, caller, organization_id, &READ, id).await
}
