//! Elm-style state model for the flow monitor.
//!
//! All display state lives in [`FlowMonitorModel`]. Operator input, timer ticks
//! and provider results arrive as [`FlowMsg`] values; side effects are
//! represented as [`FlowCmd`] values returned from [`super::update::update`].
//!
//! The model performs no I/O.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::fetch::FetchBundle;
use super::scheduler::{DEFAULT_INTERVAL, RefreshScheduler};
use super::timeline::{Expansion, TimelineSummary};
use crate::core::config::Config;
use crate::core::errors::{FetchError, ProviderError};
use crate::domain::{Conflict, ResolutionAck, ResolutionRequest, TimeRange, UpdateEvent};
use crate::flow::geometry::Point;
use crate::flow::layout::{FlowFrame, Geometry};
use crate::notify::Notice;

// ──────────────────── views ────────────────────

/// Top-level views. Tabs move freely between them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum View {
    #[default]
    Flow,
    History,
    Conflicts,
}

impl View {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Flow => "Flow",
            Self::History => "History",
            Self::Conflicts => "Conflicts",
        }
    }
}

/// Record filter of the History and Conflicts views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewFilter {
    #[default]
    All,
    Entity(String),
}

impl ViewFilter {
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Entity(id) => Some(id),
        }
    }
}

// ──────────────────── settings ────────────────────

/// Construction-time knobs, usually derived from the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub geometry: Geometry,
    pub sort_entities_by_id: bool,
    pub time_range: TimeRange,
    /// Turn auto-refresh on at [`FlowMsg::Init`].
    pub auto_refresh: bool,
    pub interval: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            sort_entities_by_id: true,
            time_range: TimeRange::default(),
            auto_refresh: false,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl From<&Config> for ModelSettings {
    fn from(config: &Config) -> Self {
        Self {
            geometry: config.geometry(),
            sort_entities_by_id: config.layout.sort_entities_by_id,
            time_range: config.refresh.time_range,
            auto_refresh: config.refresh.auto_refresh,
            interval: config.refresh_interval(),
        }
    }
}

// ──────────────────── fetch tracking ────────────────────

/// Single-flight bookkeeping for fetch cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleTracker {
    last_issued: u64,
    in_flight: Option<u64>,
    follow_up: bool,
    completed: u64,
}

impl CycleTracker {
    /// Whether a follow-up cycle is queued behind the running one.
    #[must_use]
    pub const fn follow_up_queued(&self) -> bool {
        self.follow_up
    }

    /// Cycles that finished, successfully or not.
    #[must_use]
    pub const fn completed(&self) -> u64 {
        self.completed
    }

    /// Start a cycle, or queue one follow-up if a cycle is running.
    /// Returns the new cycle id when one should start now.
    pub(crate) fn request(&mut self) -> Option<u64> {
        if self.in_flight.is_some() {
            self.follow_up = true;
            return None;
        }
        self.last_issued += 1;
        self.in_flight = Some(self.last_issued);
        Some(self.last_issued)
    }

    /// Close `cycle`. Returns `false` for an id that is not the running cycle.
    pub(crate) fn finish(&mut self, cycle: u64) -> bool {
        if self.in_flight != Some(cycle) {
            return false;
        }
        self.in_flight = None;
        self.completed += 1;
        true
    }

    /// Take the queued follow-up, if any.
    pub(crate) const fn take_follow_up(&mut self) -> bool {
        std::mem::replace(&mut self.follow_up, false)
    }
}

// ──────────────────── model ────────────────────

/// Complete display state of the flow monitor.
#[derive(Debug, Clone)]
pub struct FlowMonitorModel {
    pub settings: ModelSettings,
    pub scheduler: RefreshScheduler,
    pub view: View,
    pub filter: ViewFilter,
    /// Last successfully fetched entities and relations, laid out.
    pub frame: FlowFrame,
    pub updates: Vec<UpdateEvent>,
    pub conflicts: Vec<Conflict>,
    pub summary: TimelineSummary,
    pub expansion: Expansion,
    /// Id of the selected entity; always a member of `frame`.
    pub selected: Option<String>,
    pub loading: bool,
    /// Inline banner text of the last failed cycle.
    pub error: Option<String>,
    pub last_fetch: Option<DateTime<Utc>>,
    pub cycles: CycleTracker,
    /// Conflict ids with a resolve call in flight.
    pub resolving: HashSet<String>,
}

impl FlowMonitorModel {
    #[must_use]
    pub fn new(settings: ModelSettings) -> Self {
        let scheduler = RefreshScheduler::new(settings.time_range, settings.interval);
        Self {
            settings,
            scheduler,
            view: View::default(),
            filter: ViewFilter::default(),
            frame: FlowFrame::default(),
            updates: Vec::new(),
            conflicts: Vec::new(),
            summary: TimelineSummary::default(),
            expansion: Expansion::default(),
            selected: None,
            loading: false,
            error: None,
            last_fetch: None,
            cycles: CycleTracker::default(),
            resolving: HashSet::new(),
        }
    }

    #[must_use]
    pub const fn time_range(&self) -> TimeRange {
        self.scheduler.time_range()
    }

    /// Whether a fetch cycle or a resolve call is still outstanding.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.loading || !self.resolving.is_empty()
    }

    #[must_use]
    pub fn selected_entity(&self) -> Option<&crate::domain::FlowEntity> {
        self.selected.as_deref().and_then(|id| self.frame.entity(id))
    }

    #[must_use]
    pub fn conflict(&self, conflict_id: &str) -> Option<&Conflict> {
        self.conflicts.iter().find(|c| c.id == conflict_id)
    }
}

impl Default for FlowMonitorModel {
    fn default() -> Self {
        Self::new(ModelSettings::default())
    }
}

// ──────────────────── messages ────────────────────

/// Inputs to the update function.
#[derive(Debug, Clone)]
pub enum FlowMsg {
    /// First fetch, plus auto-refresh when the settings ask for it.
    Init,
    SetTimeRange(TimeRange),
    EnableAuto(Duration),
    DisableAuto,
    ChangeInterval(Duration),
    ManualRefresh,
    /// Tick from the timer started with `generation`.
    TimerTick { generation: u64 },
    FetchCompleted {
        cycle: u64,
        result: Result<Box<FetchBundle>, FetchError>,
    },
    /// Pointer click in canvas coordinates.
    Click(Point),
    /// Select an entity by id. Ids outside the frame leave the selection as is.
    Select(String),
    SelectView(View),
    /// Detail-panel shortcut into the Conflicts view.
    ShowEntityConflicts,
    /// Detail-panel shortcut into the History view.
    ShowEntityHistory,
    ToggleUpdate(String),
    Resolve {
        conflict_id: String,
        option: Option<String>,
    },
    ResolutionCompleted {
        conflict_id: String,
        result: Result<ResolutionAck, ProviderError>,
    },
}

// ──────────────────── commands ────────────────────

/// Events the runtime records in the activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    FetchCompleted {
        cycle: u64,
        range: TimeRange,
        entities: usize,
        relations: usize,
        updates: usize,
        conflicts: usize,
        high_severity: usize,
        duration_ms: u64,
    },
    FetchFailed {
        cycle: u64,
        range: TimeRange,
        message: String,
    },
    ConflictAlert {
        cycle: u64,
        high_severity: usize,
    },
    ResolutionApplied {
        conflict_id: String,
    },
    ResolutionFailed {
        conflict_id: String,
        message: String,
    },
}

/// Side effects returned by the update function for the runtime to execute.
#[derive(Debug, Clone)]
pub enum FlowCmd {
    None,
    Batch(Vec<Self>),
    /// Run fetch cycle `cycle` for `range` off the update loop.
    Fetch { cycle: u64, range: TimeRange },
    /// Put a new timer in the slot, dropping any previous one.
    StartTimer { generation: u64, interval: Duration },
    /// Empty the timer slot.
    CancelTimer,
    Notify(Notice),
    Resolve(ResolutionRequest),
    Record(Activity),
}

impl FlowCmd {
    /// Collapse a list of commands, skipping `None`s.
    #[must_use]
    pub fn batch(cmds: impl IntoIterator<Item = Self>) -> Self {
        let mut cmds: Vec<Self> = cmds
            .into_iter()
            .filter(|c| !matches!(c, Self::None))
            .collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.remove(0),
            _ => Self::Batch(cmds),
        }
    }

    /// Flatten nested batches into execution order.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::flatten).collect(),
            cmd => vec![cmd],
        }
    }
}
