pub mod crm;
pub mod global_role;
pub mod ids;
pub mod organization_role;
pub mod permission;
pub mod principal;
pub mod resource;
pub mod subscription_tier;

pub use crm::{ContactStatus, CustomerStatus, DealOutcome, DealStage, LeadScore, LeadStatus};
pub use global_role::GlobalRole;
pub use ids::{OrganizationId, UserId};
pub use organization_role::OrganizationRole;
pub use permission::Permission;
pub use principal::{OrganizationMembership, Principal};
pub use resource::ResourceType;
pub use subscription_tier::SubscriptionTier;
