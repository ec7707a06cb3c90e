use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Tenant-owned resource kinds. Each maps to one table carrying `organization_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    Contact,
    Lead,
    Deal,
    Customer,
}

impl ResourceType {
    /// Every tenant-owned kind; the isolation triggers are installed on each table.
    pub const ALL: [ResourceType; 4] = [Self::Contact, Self::Lead, Self::Deal, Self::Customer];

    /// Backing table. Static, so safe to splice into SQL.
    pub const fn table(self) -> &'static str {
        match self {
            Self::Contact => "contacts",
            Self::Lead => "leads",
            Self::Deal => "deals",
            Self::Customer => "customers",
        }
    }
}
