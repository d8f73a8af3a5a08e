//! Read-only projections of the model for display: the entity detail panel,
//! history cards, the conflict list, and their empty states.

use serde::Serialize;
use serde_json::Value;

use super::model::FlowMonitorModel;
use super::timeline::{TimelineSummary, for_entity, summarize};
use super::triage::SeverityCounts;
use crate::domain::{Conflict, FlowEntity, Severity, UpdateEvent};
use crate::flow::style::StyleRegistry;

pub const NO_UPDATES_MESSAGE: &str = "No updates found for the selected time range.";
pub const NO_CONFLICTS_MESSAGE: &str = "No conflicts detected for the selected time range.";
pub const NEVER_UPDATED: &str = "Never";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Styling of an empty state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Neutral,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyState {
    pub message: &'static str,
    pub tone: Tone,
}

// ──────────────────── detail panel ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailPanel {
    pub id: String,
    pub name: String,
    pub type_label: &'static str,
    pub update_count: u64,
    pub last_update: String,
    pub has_conflict: bool,
}

impl DetailPanel {
    #[must_use]
    pub fn of(entity: &FlowEntity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            type_label: StyleRegistry.style(entity.entity_type).label,
            update_count: entity.update_count,
            last_update: entity.last_update.map_or_else(
                || NEVER_UPDATED.to_string(),
                |ts| ts.format(TIMESTAMP_FORMAT).to_string(),
            ),
            has_conflict: entity.has_conflict,
        }
    }

    #[must_use]
    pub const fn conflict_status(&self) -> &'static str {
        if self.has_conflict {
            "Has conflicts"
        } else {
            "No conflicts"
        }
    }
}

/// Detail panel of the selected entity.
#[must_use]
pub fn detail_panel(model: &FlowMonitorModel) -> Option<DetailPanel> {
    model.selected_entity().map(DetailPanel::of)
}

// ──────────────────── history ────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffRow {
    pub field: String,
    pub previous: String,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryCard {
    pub update_id: String,
    pub entity_name: String,
    pub entity_type: &'static str,
    pub update_type: &'static str,
    pub user: String,
    pub timestamp: String,
    pub description: Option<String>,
    /// Whether the card has a diff to expand into.
    pub expandable: bool,
    pub expanded: bool,
    /// Filled only while expanded.
    pub diff: Vec<DiffRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPanel {
    pub summary: TimelineSummary,
    pub cards: Vec<HistoryCard>,
    pub empty: Option<EmptyState>,
}

fn show_value(value: &Value) -> String {
    match value {
        Value::Null => "—".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn card(update: &UpdateEvent, expanded: bool) -> HistoryCard {
    let diff = if expanded {
        update
            .changes
            .iter()
            .flatten()
            .map(|(field, change)| DiffRow {
                field: field.clone(),
                previous: show_value(&change.previous),
                new: show_value(&change.new),
            })
            .collect()
    } else {
        Vec::new()
    };
    HistoryCard {
        update_id: update.id.clone(),
        entity_name: update.entity_name.clone(),
        entity_type: StyleRegistry.style(update.entity_type).label,
        update_type: update.update_type.label(),
        user: update.user_id.clone(),
        timestamp: update.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        description: update.description.clone(),
        expandable: update.has_changes(),
        expanded: expanded && update.has_changes(),
        diff,
    }
}

/// History view under the current filter, in provider order.
#[must_use]
pub fn history_panel(model: &FlowMonitorModel) -> HistoryPanel {
    let visible: Vec<UpdateEvent> = for_entity(&model.updates, model.filter.entity_id())
        .cloned()
        .collect();
    let cards: Vec<HistoryCard> = visible
        .iter()
        .map(|u| card(u, model.expansion.is_expanded(&u.id)))
        .collect();
    let empty = cards.is_empty().then_some(EmptyState {
        message: NO_UPDATES_MESSAGE,
        tone: Tone::Neutral,
    });
    HistoryPanel {
        summary: summarize(&visible),
        cards,
        empty,
    }
}

// ──────────────────── conflicts ────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictItem {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub kind: String,
    pub description: String,
    pub between: String,
    pub detected_at: String,
    /// `(option id, label)` in provider order.
    pub options: Vec<(String, String)>,
}

impl ConflictItem {
    fn of(conflict: &Conflict) -> Self {
        Self {
            id: conflict.id.clone(),
            title: conflict.title.clone(),
            severity: conflict.severity,
            kind: conflict.kind.clone(),
            description: conflict.description.clone(),
            between: format!(
                "{} {} ↔ {} {}",
                StyleRegistry.style(conflict.source_type).label,
                conflict.source_entity_id,
                StyleRegistry.style(conflict.target_type).label,
                conflict.target_entity_id
            ),
            detected_at: conflict.detected_at.format(TIMESTAMP_FORMAT).to_string(),
            options: conflict
                .options()
                .iter()
                .map(|o| (o.id.clone(), o.label.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictsPanel {
    pub counts: SeverityCounts,
    pub items: Vec<ConflictItem>,
    pub empty: Option<EmptyState>,
}

/// Conflicts view under the current filter.
#[must_use]
pub fn conflicts_panel(model: &FlowMonitorModel) -> ConflictsPanel {
    let visible: Vec<&Conflict> = model
        .conflicts
        .iter()
        .filter(|c| model.filter.entity_id().is_none_or(|id| c.involves(id)))
        .collect();
    let items: Vec<ConflictItem> = visible.iter().map(|c| ConflictItem::of(c)).collect();
    let empty = items.is_empty().then_some(EmptyState {
        message: NO_CONFLICTS_MESSAGE,
        tone: Tone::Success,
    });
    ConflictsPanel {
        counts: SeverityCounts::of(visible),
        items,
        empty,
    }
}
