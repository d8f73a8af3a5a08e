//! Flow entities (diagram nodes) and the relations between them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of entity kinds rendered in the flow diagram.
///
/// Styling is an exhaustive lookup on this enum (see
/// [`crate::flow::style::StyleRegistry`]), so adding a kind is a compile-time
/// checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Client,
    Caregiver,
    Schedule,
    Notification,
    Agent,
}

impl EntityType {
    /// Every entity kind, in legend order.
    pub const ALL: [Self; 5] = [
        Self::Client,
        Self::Caregiver,
        Self::Schedule,
        Self::Notification,
        Self::Agent,
    ];

    /// Lowercase wire tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Caregiver => "caregiver",
            Self::Schedule => "schedule",
            Self::Notification => "notification",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Computed placement of an entity on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// A node in the flow diagram, as returned by the metrics provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default)]
    pub update_count: u64,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub has_conflict: bool,
    /// Derived by the layout pass; never read from or written to the wire.
    #[serde(skip)]
    pub position: Option<Position>,
}

impl FlowEntity {
    /// Build an entity with no activity and no computed position.
    #[must_use]
    pub fn new(id: impl Into<String>, entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type,
            name: name.into(),
            update_count: 0,
            last_update: None,
            has_conflict: false,
            position: None,
        }
    }
}

/// A directed, weighted edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRelation {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// Line-weight hint.
    #[serde(default = "default_strength")]
    pub strength: f64,
    /// Observed flow in units per minute.
    #[serde(default)]
    pub flow_rate: Option<f64>,
    #[serde(default)]
    pub has_conflict: bool,
}

const fn default_strength() -> f64 {
    1.0
}

impl FlowRelation {
    /// Build a relation of unit strength with no flow rate.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            strength: default_strength(),
            flow_rate: None,
            has_conflict: false,
        }
    }
}
