//! The one path every CRM operation takes.
//!
//! Writes: authenticate, authorize against the explicitly chosen organization,
//! validate, then run the body inside a tenant context on a fresh tenant session.
//! The pipeline commits what the body staged, and only then records activity and
//! signals view invalidation on a detached task.
//!
//! Reads: the same gates, then a tenant session that is rolled back when the body
//! drops it.

use std::future::Future;
use std::sync::Arc;

use validator::Validate;

use crate::app::audit::ActivityRecord;
use crate::app::authz::{evaluate, Decision, Requirement};
use crate::app::db::TenantSession;
use crate::app::domain::{OrganizationId, Principal};
use crate::app::error::AppError;
use crate::app::tenant::{self, TenantContext};
use crate::app::AppState;

/// Static description of one operation.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Stable name, used in logs and in `Persistence` errors.
    pub name: &'static str,
    pub requirement: Requirement,
    /// Message shown to the caller when the store fails.
    pub failure: &'static str,
}

impl Operation {
    pub const fn new(name: &'static str, requirement: Requirement, failure: &'static str) -> Self {
        Self {
            name,
            requirement,
            failure,
        }
    }
}

/// Work staged by a mutation body, waiting for the pipeline to commit it.
#[must_use = "a staged mutation must be returned to the pipeline to be committed"]
pub struct Mutation<T> {
    session: TenantSession,
    value: T,
    activity: Option<ActivityRecord>,
    views: Vec<String>,
}

impl<T> Mutation<T> {
    pub fn stage(session: TenantSession, value: T) -> Self {
        Self {
            session,
            value,
            activity: None,
            views: Vec::new(),
        }
    }

    /// Activity entry to record after commit.
    pub fn audited(mut self, record: ActivityRecord) -> Self {
        self.activity = Some(record);
        self
    }

    /// View paths to invalidate after commit.
    pub fn invalidates(mut self, views: Vec<String>) -> Self {
        self.views = views;
        self
    }
}

/// Run a write through the full pipeline. `body` receives an open tenant session and
/// the validated input; it guards, persists, and hands back a [`Mutation`].
pub async fn mutate<I, T, F, Fut>(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    operation: &Operation,
    input: I,
    body: F,
) -> Result<T, AppError>
where
    I: Validate,
    F: FnOnce(TenantSession, I) -> Fut,
    Fut: Future<Output = Result<Mutation<T>, AppError>>,
{
    let principal = authorize(caller, organization_id, operation)?;
    input.validate()?;

    let context = TenantContext::new(organization_id.clone(), Arc::new(principal.clone()));
    let db = state.db.clone();
    let (value, activity, views) = tenant::enter(context, async move {
        let session = TenantSession::begin_write(&db).await?;
        let Mutation {
            session,
            value,
            activity,
            views,
        } = body(session, input).await?;
        session.commit().await?;
        Ok((value, activity, views))
    })
    .await
    .map_err(|err| into_public(operation, organization_id, err))?;

    tracing::info!(
        operation = operation.name,
        organization_id = %organization_id,
        user_id = %principal.id,
        "operation committed"
    );

    // Detached so a caller that stops waiting after commit still gets both attempted.
    let audit = state.audit.clone();
    let invalidator = Arc::clone(&state.invalidator);
    let organization_id = organization_id.clone();
    let user_id = principal.id.clone();
    let operation_name = operation.name;
    let side_channel = tokio::spawn(async move {
        if let Some(record) = activity {
            audit.record(&organization_id, &user_id, record).await;
        }
        if !views.is_empty() {
            if let Err(err) = invalidator.invalidate(&views).await {
                tracing::warn!(operation = operation_name, %err, "view invalidation failed");
            }
        }
    });
    if let Err(err) = side_channel.await {
        tracing::error!(operation = operation.name, %err, "post-commit task did not complete");
    }

    Ok(value)
}

/// Run a read through the gates and a tenant session.
pub async fn query<T, F, Fut>(
    state: &AppState,
    caller: Option<&Principal>,
    organization_id: &OrganizationId,
    operation: &Operation,
    body: F,
) -> Result<T, AppError>
where
    F: FnOnce(TenantSession) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let principal = authorize(caller, organization_id, operation)?;

    let context = TenantContext::new(organization_id.clone(), Arc::new(principal.clone()));
    let db = state.db.clone();
    tenant::enter(context, async move {
        let session = TenantSession::begin(&db).await?;
        body(session).await
    })
    .await
    .map_err(|err| into_public(operation, organization_id, err))
}

/// Authentication plus the three gates. The membership is looked up for the
/// organization the caller named, never inferred.
fn authorize<'p>(
    caller: Option<&'p Principal>,
    organization_id: &OrganizationId,
    operation: &Operation,
) -> Result<&'p Principal, AppError> {
    let principal = caller.ok_or(AppError::Unauthenticated)?;
    let membership = principal.membership_in(organization_id);

    let decision = evaluate(principal, membership, &operation.requirement);
    if let Decision::Deny(denial) = &decision {
        tracing::info!(
            operation = operation.name,
            gate = denial.tag(),
            organization_id = %organization_id,
            user_id = %principal.id,
            "operation denied"
        );
    }
    decision.into_result()?;
    Ok(principal)
}

/// Store errors are logged in full here and replaced with the operation's safe message.
fn into_public(operation: &Operation, organization_id: &OrganizationId, err: AppError) -> AppError {
    match err {
        AppError::Database(err) => {
            tracing::error!(
                operation = operation.name,
                organization_id = %organization_id,
                %err,
                "store failure"
            );
            AppError::Persistence {
                operation: operation.name,
                message: operation.failure,
            }
        }
        other => other,
    }
}
