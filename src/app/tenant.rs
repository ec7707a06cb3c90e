//! Tenant isolation enforcement.
//!
//! **Rule**: Never trust an ambient org. The active organization is passed explicitly
//! by the caller, checked against the principal's memberships, and then bound here for
//! the lifetime of one logical operation.
//!
//! The binding is a tokio task-local, so concurrent operations on the same worker
//! thread never see each other's tenant, and spawned tasks start unbound.

use std::future::Future;
use std::sync::Arc;

use crate::app::domain::{OrganizationId, Principal};
use crate::app::error::AppError;

tokio::task_local! {
    static ACTIVE: TenantContext;
}

/// The tenant an operation runs for, and who is running it.
#[derive(Debug, Clone)]
pub struct TenantContext {
    organization_id: OrganizationId,
    principal: Arc<Principal>,
}

impl TenantContext {
    pub fn new(organization_id: OrganizationId, principal: Arc<Principal>) -> Self {
        Self {
            organization_id,
            principal,
        }
    }

    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// Run `body` with `context` bound. The binding is released however `body` ends,
/// including when the returned future is dropped mid-flight.
///
/// Entering the organization that is already active nests without rebinding: the
/// outer context stays in force, principal included, and the principal carried by
/// `context` is ignored. Callers authorize before `enter`.
/// Entering a different organization fails with `TenantConflict` and `body` is never polled.
pub async fn enter<F, T>(context: TenantContext, body: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match ACTIVE.try_with(|active| active.organization_id.clone()) {
        Ok(active) if active == context.organization_id => body.await,
        Ok(active) => {
            tracing::error!(
                active = %active,
                requested = %context.organization_id,
                "refusing to switch tenant inside an active context"
            );
            Err(AppError::TenantConflict {
                active,
                requested: context.organization_id,
            })
        }
        Err(_) => ACTIVE.scope(context, body).await,
    }
}

/// The active context, or `MissingTenantContext` when called outside [`enter`].
pub fn current() -> Result<TenantContext, AppError> {
    ACTIVE
        .try_with(TenantContext::clone)
        .map_err(|_| AppError::MissingTenantContext)
}

/// Shorthand for the active organization id.
pub fn active_organization() -> Result<OrganizationId, AppError> {
    ACTIVE
        .try_with(|active| active.organization_id.clone())
        .map_err(|_| AppError::MissingTenantContext)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::app::domain::{GlobalRole, SubscriptionTier, UserId};

    fn context_for(organization_id: OrganizationId) -> TenantContext {
        let principal = Principal {
            id: UserId::new(),
            global_role: GlobalRole::Employee,
            subscription_tier: SubscriptionTier::Starter,
            memberships: Vec::new(),
        };
        TenantContext::new(organization_id, Arc::new(principal))
    }

    #[tokio::test]
    async fn current_fails_outside_a_context() {
        assert!(matches!(current(), Err(AppError::MissingTenantContext)));
        assert!(matches!(active_organization(), Err(AppError::MissingTenantContext)));
    }

    #[tokio::test]
    async fn binding_is_visible_inside_and_released_after() {
        let org = OrganizationId::new();
        let seen = enter(context_for(org.clone()), async { active_organization() })
            .await
            .unwrap();
        assert_eq!(seen, org);
        assert!(current().is_err());
    }

    #[tokio::test]
    async fn binding_is_released_when_body_fails() {
        let result: Result<(), AppError> =
            enter(context_for(OrganizationId::new()), async { Err(AppError::NotFoundOrForbidden) }).await;
        assert!(matches!(result, Err(AppError::NotFoundOrForbidden)));
        assert!(current().is_err());
    }

    #[tokio::test]
    async fn same_organization_nests() {
        let org = OrganizationId::new();
        let inner = enter(context_for(org.clone()), async {
            enter(context_for(org.clone()), async { active_organization() }).await
        })
        .await
        .unwrap();
        assert_eq!(inner, org);
    }

    #[tokio::test]
    async fn nested_entry_keeps_the_outer_principal() {
        let org = OrganizationId::new();
        let outer = context_for(org.clone());
        let outer_user = outer.principal().id.clone();
        let inner = context_for(org.clone());
        assert_ne!(inner.principal().id, outer_user);

        let seen = enter(outer, async {
            enter(inner, async { Ok::<_, AppError>(current()?.principal().id.clone()) }).await
        })
        .await
        .unwrap();
        assert_eq!(seen, outer_user);
    }

    #[tokio::test]
    async fn switching_organization_fails_without_running_body() {
        let outer = OrganizationId::new();
        let other = OrganizationId::new();
        let ran = AtomicBool::new(false);

        let result = enter(context_for(outer.clone()), async {
            enter(context_for(other.clone()), async {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
        })
        .await;

        match result {
            Err(AppError::TenantConflict { active, requested }) => {
                assert_eq!(active, outer);
                assert_eq!(requested, other);
            }
            other => panic!("expected TenantConflict, got {other:?}"),
        }
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_the_binding() {
        let inherited = enter(context_for(OrganizationId::new()), async {
            Ok(tokio::spawn(async { current().is_ok() }).await.unwrap())
        })
        .await
        .unwrap();
        assert!(!inherited);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_contexts_never_observe_each_other() {
        let mut handles = Vec::new();
        for _ in 0..8 {
            let org = OrganizationId::new();
            handles.push(tokio::spawn(async move {
                enter(context_for(org.clone()), async {
                    for _ in 0..50 {
                        tokio::task::yield_now().await;
                        assert_eq!(active_organization().unwrap(), org);
                    }
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }
}
