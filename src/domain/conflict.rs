//! Active data conflicts and the resolution request sent back to the provider.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::EntityType;

/// Ordinal conflict urgency. Only [`Severity::High`] raises an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Lowercase wire tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One way the operator may settle a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOption {
    pub id: String,
    pub label: String,
}

/// A data conflict between two entities detected by the conflict provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: String,
    pub title: String,
    pub source_entity_id: String,
    pub target_entity_id: String,
    pub source_type: EntityType,
    pub target_type: EntityType,
    pub severity: Severity,
    /// Free-form conflict category (e.g. `schedule_overlap`).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub resolution_options: Option<Vec<ResolutionOption>>,
}

impl Conflict {
    /// Whether either side of the conflict is `entity_id`.
    #[must_use]
    pub fn involves(&self, entity_id: &str) -> bool {
        self.source_entity_id == entity_id || self.target_entity_id == entity_id
    }

    /// Resolution options in provider order (empty when none were offered).
    #[must_use]
    pub fn options(&self) -> &[ResolutionOption] {
        self.resolution_options.as_deref().unwrap_or_default()
    }
}

/// Payload for the resolve operation: the full conflict plus the chosen option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    #[serde(flatten)]
    pub conflict: Conflict,
    #[serde(default)]
    pub resolution_option: Option<String>,
}

impl ResolutionRequest {
    #[must_use]
    pub fn new(conflict: Conflict, resolution_option: Option<String>) -> Self {
        Self {
            conflict,
            resolution_option,
        }
    }
}

/// Provider acknowledgement of a resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionAck {
    pub success: bool,
}
