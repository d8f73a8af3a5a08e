//! Change events returned by the update-history provider.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::EntityType;

/// Kind of change recorded by an [`UpdateEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Create,
    Modify,
    Delete,
}

impl UpdateType {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "Created",
            Self::Modify => "Modified",
            Self::Delete => "Deleted",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Before/after values of one changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    #[serde(default)]
    pub previous: Value,
    #[serde(default)]
    pub new: Value,
}

/// Attribution used when the provider omits `userId`.
pub const SYSTEM_USER: &str = "System";

fn system_user() -> String {
    SYSTEM_USER.to_string()
}

/// One change event against a flow entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    pub id: String,
    pub entity_id: String,
    pub entity_type: EntityType,
    pub entity_name: String,
    pub timestamp: DateTime<Utc>,
    pub update_type: UpdateType,
    #[serde(default = "system_user")]
    pub user_id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Field name → previous/new values, in field-name order.
    #[serde(default)]
    pub changes: Option<BTreeMap<String, FieldChange>>,
}

impl UpdateEvent {
    /// Whether the event carries a per-field diff.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changes.as_ref().is_some_and(|c| !c.is_empty())
    }
}
