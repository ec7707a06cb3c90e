use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// System-wide role, independent of any organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GlobalRole {
    Admin,
    Moderator,
    Employee,
    Client,
}
