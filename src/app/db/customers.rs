use serde::Serialize;
use sqlx::FromRow;

use crate::app::domain::{CustomerStatus, ResourceType, UserId};

use super::{scoped::TenantRow, TenantSession};

/// Database row for customers table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: String,
    pub assigned_to_id: Option<String>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl TenantRow for Customer {
    const RESOURCE: ResourceType = ResourceType::Customer;

    fn id(&self) -> &str {
        &self.id
    }
}

pub struct NewCustomer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: CustomerStatus,
    pub assigned_to_id: Option<UserId>,
}

pub struct CustomerChanges {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: CustomerStatus,
    pub assigned_to_id: Option<UserId>,
}

pub async fn insert(session: &mut TenantSession, customer: &NewCustomer) -> Result<(), sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    sqlx::query(
        "INSERT INTO customers (id, organization_id, name, email, phone, company, status, assigned_to_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&customer.id)
    .bind(organization_id)
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(&customer.company)
    .bind(customer.status.to_string())
    .bind(customer.assigned_to_id.as_ref().map(UserId::as_str))
    .bind(super::now())
    .execute(session.conn())
    .await?;
    Ok(())
}

pub async fn update(session: &mut TenantSession, id: &str, changes: &CustomerChanges) -> Result<u64, sqlx::Error> {
    let organization_id = session.organization_id().as_str();
    let result = sqlx::query(
        "UPDATE customers SET name = ?, email = ?, phone = ?, company = ?, status = ?, assigned_to_id = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
    )
    .bind(&changes.name)
    .bind(&changes.email)
    .bind(&changes.phone)
    .bind(&changes.company)
    .bind(changes.status.to_string())
    .bind(changes.assigned_to_id.as_ref().map(UserId::as_str))
    .bind(super::now())
    .bind(id)
    .bind(organization_id)
    .execute(session.conn())
    .await?;
    Ok(result.rows_affected())
}
