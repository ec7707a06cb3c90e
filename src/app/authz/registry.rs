//! Static lookup tables. Nothing here is computed per call and nothing suspends.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::app::domain::{GlobalRole, OrganizationRole, Permission, SubscriptionTier};

/// Tier-gated product areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Feature {
    Dashboard,
    Profile,
    Settings,
    Marketplace,
    Crm,
    Cms,
    Transactions,
    Ai,
    Tools,
    Analytics,
}

impl Feature {
    /// Lowest tier that unlocks this feature.
    pub const fn minimum_tier(self) -> SubscriptionTier {
        match self {
            Self::Dashboard | Self::Profile | Self::Settings => SubscriptionTier::Free,
            Self::Marketplace => SubscriptionTier::Custom,
            Self::Crm | Self::Cms | Self::Transactions => SubscriptionTier::Starter,
            Self::Ai | Self::Tools | Self::Analytics => SubscriptionTier::Growth,
        }
    }
}

/// Capabilities granted by a global role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Capability {
    AccessCrm,
    WriteCrm,
    ViewAuditLog,
    ManageOrganizations,
    AccessAdmin,
}

/// Whether `tier` unlocks `feature`. Monotonic: rank at or above the minimum unlocks.
pub fn tier_unlocks_feature(tier: SubscriptionTier, feature: Feature) -> bool {
    tier >= feature.minimum_tier()
}

/// String-keyed variant. Unknown features are denied.
pub fn tier_unlocks_feature_key(tier: SubscriptionTier, key: &str) -> bool {
    key.parse::<Feature>()
        .map(|feature| tier_unlocks_feature(tier, feature))
        .unwrap_or(false)
}

/// All features a tier unlocks, in declaration order.
pub fn features_for_tier(tier: SubscriptionTier) -> Vec<Feature> {
    Feature::iter().filter(|f| tier_unlocks_feature(tier, *f)).collect()
}

/// Tier to suggest in an upgrade prompt, or `None` when the tier already has access.
pub fn suggested_upgrade(tier: SubscriptionTier, feature: Feature) -> Option<SubscriptionTier> {
    (!tier_unlocks_feature(tier, feature)).then(|| feature.minimum_tier())
}

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::AccessCrm,
    Capability::WriteCrm,
    Capability::ViewAuditLog,
    Capability::ManageOrganizations,
    Capability::AccessAdmin,
];
const MODERATOR_CAPABILITIES: &[Capability] = &[
    Capability::AccessCrm,
    Capability::WriteCrm,
    Capability::ViewAuditLog,
    Capability::ManageOrganizations,
];
const EMPLOYEE_CAPABILITIES: &[Capability] = &[Capability::AccessCrm, Capability::WriteCrm];
const CLIENT_CAPABILITIES: &[Capability] = &[];

/// Capability set of a global role.
pub fn role_capabilities(role: GlobalRole) -> &'static [Capability] {
    match role {
        GlobalRole::Admin => ADMIN_CAPABILITIES,
        GlobalRole::Moderator => MODERATOR_CAPABILITIES,
        GlobalRole::Employee => EMPLOYEE_CAPABILITIES,
        GlobalRole::Client => CLIENT_CAPABILITIES,
    }
}

pub fn role_has_capability(role: GlobalRole, capability: Capability) -> bool {
    role_capabilities(role).contains(&capability)
}

const OWNER_PERMISSIONS: &[Permission] = &[Permission::from_static("*")];
const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::from_static("contacts:*"),
    Permission::from_static("leads:*"),
    Permission::from_static("deals:*"),
    Permission::from_static("customers:*"),
    Permission::from_static("activity:read"),
    Permission::from_static("members:invite"),
    Permission::from_static("members:remove"),
    Permission::from_static("settings:edit"),
];
const MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::from_static("contacts:read"),
    Permission::from_static("contacts:write"),
    Permission::from_static("leads:read"),
    Permission::from_static("leads:write"),
    Permission::from_static("deals:read"),
    Permission::from_static("deals:write"),
    Permission::from_static("customers:read"),
    Permission::from_static("customers:write"),
    Permission::from_static("members:invite"),
];
const VIEWER_PERMISSIONS: &[Permission] = &[
    Permission::from_static("contacts:read"),
    Permission::from_static("leads:read"),
    Permission::from_static("deals:read"),
    Permission::from_static("customers:read"),
];

/// Permission grants of an organization role.
pub fn org_role_permissions(role: OrganizationRole) -> &'static [Permission] {
    match role {
        OrganizationRole::Owner => OWNER_PERMISSIONS,
        OrganizationRole::Admin => ADMIN_PERMISSIONS,
        OrganizationRole::Member => MEMBER_PERMISSIONS,
        OrganizationRole::Viewer => VIEWER_PERMISSIONS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(s: &'static str) -> Permission {
        Permission::from_static(s)
    }

    #[test]
    fn tier_unlock_is_monotonic_for_every_feature() {
        let tiers: Vec<_> = SubscriptionTier::iter().collect();
        for feature in Feature::iter() {
            for (i, tier) in tiers.iter().enumerate() {
                if tier_unlocks_feature(*tier, feature) {
                    for higher in &tiers[i..] {
                        assert!(
                            tier_unlocks_feature(*higher, feature),
                            "{higher} should unlock {feature} because {tier} does"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn crm_needs_starter() {
        assert!(!tier_unlocks_feature(SubscriptionTier::Free, Feature::Crm));
        assert!(!tier_unlocks_feature(SubscriptionTier::Custom, Feature::Crm));
        assert!(tier_unlocks_feature(SubscriptionTier::Starter, Feature::Crm));
        assert!(tier_unlocks_feature(SubscriptionTier::Enterprise, Feature::Crm));
    }

    #[test]
    fn unknown_feature_key_is_denied() {
        assert!(tier_unlocks_feature_key(SubscriptionTier::Growth, "ai"));
        assert!(!tier_unlocks_feature_key(SubscriptionTier::Enterprise, "time-travel"));
    }

    #[test]
    fn free_tier_features() {
        assert_eq!(
            features_for_tier(SubscriptionTier::Free),
            vec![Feature::Dashboard, Feature::Profile, Feature::Settings]
        );
    }

    #[test]
    fn suggested_upgrade_points_at_minimum_tier() {
        assert_eq!(suggested_upgrade(SubscriptionTier::Free, Feature::Ai), Some(SubscriptionTier::Growth));
        assert_eq!(suggested_upgrade(SubscriptionTier::Elite, Feature::Ai), None);
    }

    #[test]
    fn client_has_no_crm_access() {
        assert!(!role_has_capability(GlobalRole::Client, Capability::AccessCrm));
        assert!(role_has_capability(GlobalRole::Employee, Capability::WriteCrm));
        assert!(!role_has_capability(GlobalRole::Employee, Capability::ViewAuditLog));
        assert!(role_has_capability(GlobalRole::Admin, Capability::AccessAdmin));
    }

    #[test]
    fn member_writes_but_does_not_manage() {
        assert!(OrganizationRole::Member.grants(&perm("contacts:write")));
        assert!(!OrganizationRole::Member.grants(&perm("contacts:manage")));
        assert!(!OrganizationRole::Member.grants(&perm("activity:read")));
    }

    #[test]
    fn admin_manages_records_but_not_billing() {
        assert!(OrganizationRole::Admin.grants(&perm("deals:manage")));
        assert!(OrganizationRole::Admin.grants(&perm("activity:read")));
        assert!(!OrganizationRole::Admin.grants(&perm("settings:billing")));
    }

    #[test]
    fn owner_holds_everything_and_viewer_only_reads() {
        assert!(OrganizationRole::Owner.grants(&perm("org:delete")));
        assert!(OrganizationRole::Viewer.grants(&perm("leads:read")));
        assert!(!OrganizationRole::Viewer.grants(&perm("leads:write")));
    }
}
