use super::{GlobalRole, OrganizationId, OrganizationRole, SubscriptionTier, UserId};

/// One (user, organization, role) membership row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationMembership {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: OrganizationRole,
}

/// The authenticated caller. Identity is established elsewhere; this crate only consumes it.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: UserId,
    pub global_role: GlobalRole,
    pub subscription_tier: SubscriptionTier,
    pub memberships: Vec<OrganizationMembership>,
}

impl Principal {
    /// Membership for an explicitly chosen organization. Never picks one by position.
    pub fn membership_in(&self, organization_id: &OrganizationId) -> Option<&OrganizationMembership> {
        self.memberships
            .iter()
            .find(|m| &m.organization_id == organization_id && m.user_id == self.id)
    }
}
