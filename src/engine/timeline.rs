//! Update-history summary and per-card expansion state.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::domain::{UpdateEvent, UpdateType};

/// Aggregate view of one cycle's updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimelineSummary {
    pub total: usize,
    pub by_type: BTreeMap<UpdateType, usize>,
    pub by_user: BTreeMap<String, usize>,
}

#[must_use]
pub fn summarize(updates: &[UpdateEvent]) -> TimelineSummary {
    let mut summary = TimelineSummary {
        total: updates.len(),
        ..TimelineSummary::default()
    };
    for update in updates {
        *summary.by_type.entry(update.update_type).or_default() += 1;
        *summary.by_user.entry(update.user_id.clone()).or_default() += 1;
    }
    summary
}

/// Updates for `entity_id`, in provider order. `None` keeps all of them.
pub fn for_entity<'a>(
    updates: &'a [UpdateEvent],
    entity_id: Option<&'a str>,
) -> impl Iterator<Item = &'a UpdateEvent> + 'a {
    updates
        .iter()
        .filter(move |u| entity_id.is_none_or(|id| u.entity_id == id))
}

/// Which history cards are expanded into their diff table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    expanded: HashSet<String>,
}

impl Expansion {
    /// Flip one card. Returns whether it is now expanded.
    pub fn toggle(&mut self, update_id: &str) -> bool {
        if self.expanded.remove(update_id) {
            false
        } else {
            self.expanded.insert(update_id.to_string());
            true
        }
    }

    #[must_use]
    pub fn is_expanded(&self, update_id: &str) -> bool {
        self.expanded.contains(update_id)
    }

    /// Forget cards that are no longer in `updates`.
    pub fn prune(&mut self, updates: &[UpdateEvent]) {
        let live: HashSet<&str> = updates.iter().map(|u| u.id.as_str()).collect();
        self.expanded.retain(|id| live.contains(id.as_str()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}
