//! Query window shared by every provider call of a fetch cycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Bounded window over which metrics, history, and conflicts are queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1h")]
    LastHour,
    #[default]
    #[serde(rename = "24h")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
}

impl TimeRange {
    /// All ranges in selector order.
    pub const ALL: [Self; 4] = [
        Self::LastHour,
        Self::LastDay,
        Self::LastWeek,
        Self::LastMonth,
    ];

    /// Wire tag used by providers (`1h`, `24h`, `7d`, `30d`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::LastHour => "1h",
            Self::LastDay => "24h",
            Self::LastWeek => "7d",
            Self::LastMonth => "30d",
        }
    }

    /// Human-readable label for selectors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LastHour => "Last Hour",
            Self::LastDay => "Last 24 Hours",
            Self::LastWeek => "Last 7 Days",
            Self::LastMonth => "Last 30 Days",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|range| range.tag().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown time range {s:?} (expected 1h, 24h, 7d, or 30d)"))
    }
}
