//! Ownership re-verification before a targeted write.
//!
//! Every helper answers `NotFoundOrForbidden` for both "no such row" and "row owned
//! by another tenant", so foreign ids are indistinguishable from missing ones.

use crate::app::db::{self, TenantRow, TenantSession};
use crate::app::domain::{ResourceType, UserId};
use crate::app::error::AppError;

/// Load a row owned by the session's organization.
pub async fn fetch_owned<T: TenantRow>(session: &mut TenantSession, id: &str) -> Result<T, AppError> {
    match db::scoped::find_by_id::<T>(session, id).await? {
        Some(row) => Ok(row),
        None => {
            tracing::debug!(
                resource = %T::RESOURCE,
                id,
                organization_id = %session.organization_id(),
                "guard rejected id outside active tenant"
            );
            Err(AppError::NotFoundOrForbidden)
        }
    }
}

/// Check ownership without loading the row. Used for referenced ids.
pub async fn ensure_owned(session: &mut TenantSession, resource: ResourceType, id: &str) -> Result<(), AppError> {
    if db::scoped::exists(session, resource, id).await? {
        Ok(())
    } else {
        tracing::debug!(
            resource = %resource,
            id,
            organization_id = %session.organization_id(),
            "guard rejected referenced id outside active tenant"
        );
        Err(AppError::NotFoundOrForbidden)
    }
}

/// The re-filtered write must have touched the row the guard approved.
pub fn expect_affected(rows_affected: u64) -> Result<(), AppError> {
    if rows_affected == 0 {
        Err(AppError::NotFoundOrForbidden)
    } else {
        Ok(())
    }
}

/// An assignee must belong to the active organization.
pub async fn ensure_member(session: &mut TenantSession, user_id: &UserId) -> Result<(), AppError> {
    let organization_id = session.organization_id().clone();
    match db::organizations::find_member_role(session.conn(), &organization_id, user_id).await? {
        Some(_) => Ok(()),
        None => {
            tracing::debug!(
                user_id = %user_id,
                organization_id = %organization_id,
                "guard rejected assignee outside active tenant"
            );
            Err(AppError::NotFoundOrForbidden)
        }
    }
}

/// [`ensure_member`] for an optional assignee.
pub async fn ensure_assignee(session: &mut TenantSession, assignee: Option<&UserId>) -> Result<(), AppError> {
    match assignee {
        Some(user_id) => ensure_member(session, user_id).await,
        None => Ok(()),
    }
}
