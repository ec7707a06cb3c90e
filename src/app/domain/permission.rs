//! Flat `resource:action` capability strings.
//!
//! Grants held by a role may use a resource wildcard (`contacts:*`) or the
//! full wildcard `*`. Required permissions are always concrete.

use std::fmt;

/// A permission token such as `contacts:write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission(&'static str);

impl Permission {
    /// Build a permission from a literal. Used for the static role tables.
    pub const fn from_static(s: &'static str) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Resource part, e.g. `contacts`. `*` for the full wildcard.
    pub fn resource(&self) -> &'static str {
        self.0.split_once(':').map_or(self.as_str(), |(resource, _)| resource)
    }

    /// Action part, e.g. `write`. `*` for the full wildcard.
    pub fn action(&self) -> &'static str {
        self.0.split_once(':').map_or(self.as_str(), |(_, action)| action)
    }

    /// Whether holding `self` satisfies `required`.
    pub fn grants(&self, required: &Permission) -> bool {
        if self.0 == "*" || self.0 == required.0 {
            return true;
        }
        self.action() == "*" && self.resource() == required.resource()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &'static str) -> Permission {
        Permission::from_static(s)
    }

    #[test]
    fn splits_resource_and_action() {
        let perm = p("deals:manage");
        assert_eq!(perm.resource(), "deals");
        assert_eq!(perm.action(), "manage");
    }

    #[test]
    fn exact_grant() {
        assert!(p("contacts:write").grants(&p("contacts:write")));
        assert!(!p("contacts:write").grants(&p("contacts:manage")));
        assert!(!p("contacts:write").grants(&p("leads:write")));
    }

    #[test]
    fn resource_wildcard_stays_within_resource() {
        assert!(p("contacts:*").grants(&p("contacts:manage")));
        assert!(!p("contacts:*").grants(&p("leads:read")));
    }

    #[test]
    fn full_wildcard_grants_everything() {
        assert!(p("*").grants(&p("org:delete")));
    }
}
