//! Permission evaluator.
//!
//! Gates run cheapest first and short-circuit:
//!
//! 1. tier gate (pure lookup on the principal's subscription tier),
//! 2. global-role gate (pure lookup on the principal's global role),
//! 3. org-role gate (needs the active membership, already loaded by the caller).
//!
//! A deny at an earlier gate means later gates are never consulted. Each gate
//! sits behind [`Gates`] so it can be called and asserted on in isolation.

use crate::app::domain::{OrganizationMembership, Permission, Principal, SubscriptionTier};
use crate::app::error::AppError;

use super::registry::{self, Capability, Feature};

/// What an operation needs from the caller, one entry per gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub feature: Feature,
    pub capability: Capability,
    pub permission: Permission,
}

impl Requirement {
    pub const fn new(feature: Feature, capability: Capability, permission: &'static str) -> Self {
        Self {
            feature,
            capability,
            permission: Permission::from_static(permission),
        }
    }
}

/// Which gate denied, with enough detail for a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Tier { feature: Feature, required: SubscriptionTier },
    GlobalRole { capability: Capability },
    OrgRole { permission: Permission },
}

impl Denial {
    /// Stable tag naming the gate that failed.
    pub fn tag(&self) -> &'static str {
        match self {
            Denial::Tier { .. } => "tier",
            Denial::GlobalRole { .. } => "global-role",
            Denial::OrgRole { .. } => "org-role",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    /// Convert into the error taxonomy. `Allow` maps to `Ok(())`.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(denial.into()),
        }
    }
}

/// The three individual gates.
pub trait Gates {
    fn tier(&self, principal: &Principal, feature: Feature) -> bool;
    fn global_role(&self, principal: &Principal, capability: Capability) -> bool;
    fn org_role(&self, principal: &Principal, membership: Option<&OrganizationMembership>, permission: &Permission) -> bool;
}

/// Gates backed by the static registry tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryGates;

impl Gates for RegistryGates {
    fn tier(&self, principal: &Principal, feature: Feature) -> bool {
        registry::tier_unlocks_feature(principal.subscription_tier, feature)
    }

    fn global_role(&self, principal: &Principal, capability: Capability) -> bool {
        registry::role_has_capability(principal.global_role, capability)
    }

    fn org_role(&self, principal: &Principal, membership: Option<&OrganizationMembership>, permission: &Permission) -> bool {
        match membership {
            Some(m) if m.user_id == principal.id => m.role.grants(permission),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Evaluator<G = RegistryGates> {
    gates: G,
}

impl<G: Gates> Evaluator<G> {
    pub fn with_gates(gates: G) -> Self {
        Self { gates }
    }

    pub fn gates(&self) -> &G {
        &self.gates
    }

    pub fn evaluate(
        &self,
        principal: &Principal,
        membership: Option<&OrganizationMembership>,
        requirement: &Requirement,
    ) -> Decision {
        if !self.gates.tier(principal, requirement.feature) {
            return Decision::Deny(Denial::Tier {
                feature: requirement.feature,
                required: requirement.feature.minimum_tier(),
            });
        }
        if !self.gates.global_role(principal, requirement.capability) {
            return Decision::Deny(Denial::GlobalRole {
                capability: requirement.capability,
            });
        }
        if !self.gates.org_role(principal, membership, &requirement.permission) {
            return Decision::Deny(Denial::OrgRole {
                permission: requirement.permission.clone(),
            });
        }
        Decision::Allow
    }
}

/// Evaluate with the registry-backed gates.
pub fn evaluate(
    principal: &Principal,
    membership: Option<&OrganizationMembership>,
    requirement: &Requirement,
) -> Decision {
    Evaluator::<RegistryGates>::default().evaluate(principal, membership, requirement)
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Tier { feature, required } => AppError::UpgradeRequired { feature, required },
            Denial::GlobalRole { capability } => AppError::ForbiddenGlobal { capability },
            Denial::OrgRole { permission } => AppError::ForbiddenOrg { permission },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::app::domain::{GlobalRole, OrganizationId, OrganizationRole, UserId};

    const CONTACTS_WRITE: Requirement = Requirement::new(Feature::Crm, Capability::WriteCrm, "contacts:write");
    const CONTACTS_MANAGE: Requirement = Requirement::new(Feature::Crm, Capability::WriteCrm, "contacts:manage");

    fn principal(tier: SubscriptionTier, global_role: GlobalRole, role: OrganizationRole) -> (Principal, OrganizationId) {
        let id = UserId::new();
        let org = OrganizationId::new();
        let principal = Principal {
            id: id.clone(),
            global_role,
            subscription_tier: tier,
            memberships: vec![OrganizationMembership { user_id: id, organization_id: org.clone(), role }],
        };
        (principal, org)
    }

    /// Delegates to the registry and counts calls per gate.
    #[derive(Default)]
    struct SpyGates {
        tier_calls: Cell<u32>,
        global_calls: Cell<u32>,
        org_calls: Cell<u32>,
    }

    impl Gates for SpyGates {
        fn tier(&self, principal: &Principal, feature: Feature) -> bool {
            self.tier_calls.set(self.tier_calls.get() + 1);
            RegistryGates.tier(principal, feature)
        }

        fn global_role(&self, principal: &Principal, capability: Capability) -> bool {
            self.global_calls.set(self.global_calls.get() + 1);
            RegistryGates.global_role(principal, capability)
        }

        fn org_role(&self, principal: &Principal, membership: Option<&OrganizationMembership>, permission: &Permission) -> bool {
            self.org_calls.set(self.org_calls.get() + 1);
            RegistryGates.org_role(principal, membership, permission)
        }
    }

    #[test]
    fn allows_when_all_three_gates_pass() {
        let (p, org) = principal(SubscriptionTier::Starter, GlobalRole::Employee, OrganizationRole::Member);
        assert_eq!(evaluate(&p, p.membership_in(&org), &CONTACTS_WRITE), Decision::Allow);
    }

    #[test]
    fn tier_deny_never_reaches_later_gates() {
        let (p, org) = principal(SubscriptionTier::Free, GlobalRole::Admin, OrganizationRole::Owner);
        let evaluator = Evaluator::with_gates(SpyGates::default());

        let decision = evaluator.evaluate(&p, p.membership_in(&org), &CONTACTS_WRITE);

        assert_eq!(
            decision,
            Decision::Deny(Denial::Tier { feature: Feature::Crm, required: SubscriptionTier::Starter })
        );
        assert_eq!(evaluator.gates().tier_calls.get(), 1);
        assert_eq!(evaluator.gates().global_calls.get(), 0);
        assert_eq!(evaluator.gates().org_calls.get(), 0);
    }

    #[test]
    fn global_deny_never_reaches_org_gate() {
        let (p, org) = principal(SubscriptionTier::Enterprise, GlobalRole::Client, OrganizationRole::Owner);
        let evaluator = Evaluator::with_gates(SpyGates::default());

        let decision = evaluator.evaluate(&p, p.membership_in(&org), &CONTACTS_WRITE);

        assert!(matches!(decision, Decision::Deny(ref d) if d.tag() == "global-role"));
        assert_eq!(evaluator.gates().global_calls.get(), 1);
        assert_eq!(evaluator.gates().org_calls.get(), 0);
    }

    #[test]
    fn org_gate_denies_missing_permission() {
        let (p, org) = principal(SubscriptionTier::Growth, GlobalRole::Employee, OrganizationRole::Member);
        let decision = evaluate(&p, p.membership_in(&org), &CONTACTS_MANAGE);
        assert_eq!(
            decision,
            Decision::Deny(Denial::OrgRole { permission: Permission::from_static("contacts:manage") })
        );
    }

    #[test]
    fn org_gate_denies_without_membership() {
        let (p, _) = principal(SubscriptionTier::Growth, GlobalRole::Admin, OrganizationRole::Owner);
        let decision = evaluate(&p, p.membership_in(&OrganizationId::new()), &CONTACTS_WRITE);
        assert!(matches!(decision, Decision::Deny(Denial::OrgRole { .. })));
    }

    #[test]
    fn org_gate_rejects_membership_of_another_user() {
        let (p, org) = principal(SubscriptionTier::Growth, GlobalRole::Employee, OrganizationRole::Member);
        let borrowed = OrganizationMembership { user_id: UserId::new(), organization_id: org, role: OrganizationRole::Owner };
        assert!(!RegistryGates.org_role(&p, Some(&borrowed), &Permission::from_static("contacts:write")));
    }

    #[test]
    fn gates_are_callable_in_isolation() {
        let (p, org) = principal(SubscriptionTier::Custom, GlobalRole::Employee, OrganizationRole::Viewer);
        assert!(!RegistryGates.tier(&p, Feature::Crm));
        assert!(RegistryGates.tier(&p, Feature::Marketplace));
        assert!(RegistryGates.global_role(&p, Capability::AccessCrm));
        assert!(RegistryGates.org_role(&p, p.membership_in(&org), &Permission::from_static("deals:read")));
    }

    #[test]
    fn denials_map_to_tagged_errors() {
        let err: AppError = Denial::Tier { feature: Feature::Crm, required: SubscriptionTier::Starter }.into();
        assert_eq!(err.code(), "upgrade_required");
        assert_eq!(err.to_string(), "Upgrade to STARTER tier to access crm features");
        let err: AppError = Denial::OrgRole { permission: Permission::from_static("leads:manage") }.into();
        assert_eq!(err.code(), "forbidden_org");
    }
}
