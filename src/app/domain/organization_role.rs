use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::Permission;

/// Per-organization role. Maps to a static set of permission strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrganizationRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl OrganizationRole {
    /// Permissions granted by this role in its organization.
    pub fn permissions(self) -> &'static [Permission] {
        crate::app::authz::registry::org_role_permissions(self)
    }

    /// True when any permission held by this role grants `required`.
    pub fn grants(self, required: &Permission) -> bool {
        self.permissions().iter().any(|held| held.grants(required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lowercase_storage_form() {
        assert_eq!("member".parse::<OrganizationRole>().unwrap(), OrganizationRole::Member);
        assert_eq!(OrganizationRole::Owner.to_string(), "owner");
        assert!("MEMBERS".parse::<OrganizationRole>().is_err());
    }
}
