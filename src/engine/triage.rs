//! Conflict triage: the aggregate high-severity alert and resolution notices.

use serde::Serialize;

use crate::domain::{Conflict, Severity};
use crate::notify::Notice;

pub const CRITICAL_ALERT_TITLE: &str = "Critical Data Conflicts Detected";
pub const RESOLVED_TITLE: &str = "Conflict Resolved";
pub const RESOLUTION_FAILED_TITLE: &str = "Resolution Failed";

/// Result of triaging one cycle's conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageOutcome {
    pub high_severity: Vec<Conflict>,
    /// At most one notice, however many conflicts are high severity.
    pub alert: Option<Notice>,
}

/// Pick out high-severity conflicts and build the aggregate alert.
#[must_use]
pub fn triage(conflicts: &[Conflict]) -> TriageOutcome {
    let high_severity: Vec<Conflict> = conflicts
        .iter()
        .filter(|c| c.severity == Severity::High)
        .cloned()
        .collect();
    let alert = (!high_severity.is_empty()).then(|| {
        Notice::error(
            CRITICAL_ALERT_TITLE,
            format!(
                "{} critical conflicts found. Review immediately.",
                high_severity.len()
            ),
        )
    });
    TriageOutcome {
        high_severity,
        alert,
    }
}

/// Conflict counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl SeverityCounts {
    #[must_use]
    pub fn of<'a>(conflicts: impl IntoIterator<Item = &'a Conflict>) -> Self {
        let mut counts = Self::default();
        for conflict in conflicts {
            match conflict.severity {
                Severity::Low => counts.low += 1,
                Severity::Medium => counts.medium += 1,
                Severity::High => counts.high += 1,
            }
        }
        counts
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

#[must_use]
pub fn resolved_notice(conflict: &Conflict) -> Notice {
    Notice::success(
        RESOLVED_TITLE,
        format!("\"{}\" has been resolved.", conflict.title),
    )
}

#[must_use]
pub fn resolution_failed_notice(details: &str) -> Notice {
    Notice::error(
        RESOLUTION_FAILED_TITLE,
        format!("Failed to resolve conflict: {details}"),
    )
}
