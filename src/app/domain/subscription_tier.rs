use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Subscription tier. Declaration order is rank order: later variants rank higher.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Custom,
    Starter,
    Growth,
    Elite,
    Enterprise,
}

impl SubscriptionTier {
    /// Upper-case label used in upgrade prompts.
    pub fn label(self) -> String {
        self.to_string().to_uppercase()
    }
}
