//! End-to-end engine scenarios: the runtime driven with a scripted provider,
//! a virtual-clock timer driver and an in-memory notification sink.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use care_flow_monitor::core::errors::{FetchStage, ProviderError};
use care_flow_monitor::domain::{
    Conflict, EntityType, FlowEntity, FlowRelation, ResolutionOption, Severity, TimeRange,
};
use care_flow_monitor::engine::panels::{
    NO_CONFLICTS_MESSAGE, NO_UPDATES_MESSAGE, Tone, conflicts_panel, detail_panel, history_panel,
};
use care_flow_monitor::engine::triage::{
    CRITICAL_ALERT_TITLE, RESOLUTION_FAILED_TITLE, RESOLVED_TITLE,
};
use care_flow_monitor::engine::update::FETCH_ERROR_TITLE;
use care_flow_monitor::engine::{
    FlowMonitor, FlowMsg, ManualTimerDriver, ModelSettings, MonitorParts, View,
};
use care_flow_monitor::flow::geometry::Point;
use care_flow_monitor::flow::layout::Geometry;
use care_flow_monitor::logger::jsonl::ActivityLog;
use care_flow_monitor::notify::{Notice, RecordingSink};
use care_flow_monitor::providers::scripted::{ProviderCall, ResolveBehavior};
use care_flow_monitor::providers::{Providers, ScriptedProvider, Snapshot};

const SETTLE: Duration = Duration::from_secs(5);

struct Harness {
    monitor: FlowMonitor,
    provider: Arc<ScriptedProvider>,
    driver: ManualTimerDriver,
    sink: RecordingSink,
}

impl Harness {
    fn new(snapshot: Snapshot) -> Self {
        Self::with_settings(snapshot, ModelSettings::default())
    }

    fn with_settings(snapshot: Snapshot, settings: ModelSettings) -> Self {
        let provider = Arc::new(ScriptedProvider::new(snapshot));
        let driver = ManualTimerDriver::new();
        let sink = RecordingSink::new();
        let monitor = FlowMonitor::new(MonitorParts {
            providers: Providers::from_single(Arc::clone(&provider)),
            settings,
            sink: Arc::new(sink.clone()),
            log: ActivityLog::discard(),
            timer_driver: Box::new(driver.clone()),
        });
        Self {
            monitor,
            provider,
            driver,
            sink,
        }
    }

    fn send(&mut self, msg: FlowMsg) {
        self.monitor.dispatch(msg).expect("dispatch");
        self.monitor.settle(SETTLE).expect("settle");
    }

    /// Advance the virtual clock, then handle whatever the ticks started.
    fn advance(&mut self, by: Duration) -> usize {
        let fired = self.driver.advance(by);
        self.monitor.settle(SETTLE).expect("settle");
        fired
    }

    fn cycles(&self) -> usize {
        self.provider.fetch_count(FetchStage::Metrics)
    }
}

fn conflict(id: &str, severity: Severity) -> Conflict {
    Conflict {
        id: id.to_string(),
        title: format!("Conflict {id}"),
        source_entity_id: "client-1".to_string(),
        target_entity_id: "cg-1".to_string(),
        source_type: EntityType::Client,
        target_type: EntityType::Caregiver,
        severity,
        kind: "schedule_overlap".to_string(),
        description: "Overlapping visits".to_string(),
        detected_at: Utc
            .with_ymd_and_hms(2026, 10, 1, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
        resolution_options: Some(vec![ResolutionOption {
            id: "keep-first".to_string(),
            label: "Keep the first visit".to_string(),
        }]),
    }
}

fn care_team() -> Snapshot {
    let mut conflicted = FlowRelation::new("rel-1", "cg-1", "client-1");
    conflicted.has_conflict = true;
    Snapshot {
        entities: vec![
            FlowEntity::new("client-1", EntityType::Client, "Ada Lovelace"),
            FlowEntity::new("cg-1", EntityType::Caregiver, "Grace Hopper"),
            FlowEntity::new("sched-1", EntityType::Schedule, "Morning Visit"),
        ],
        relations: vec![conflicted, FlowRelation::new("rel-2", "sched-1", "cg-1")],
        updates: Vec::new(),
        conflicts: vec![conflict("conf-1", Severity::High)],
    }
}

// ──────────────────── scenarios ────────────────────

#[test]
fn single_high_conflict_raises_one_aggregate_alert() {
    let mut h = Harness::new(care_team());
    h.send(FlowMsg::Init);

    assert_eq!(h.monitor.model().frame.entities().len(), 3);
    assert_eq!(h.monitor.model().frame.relations().len(), 2);
    assert_eq!(
        h.sink.notices(),
        vec![Notice::error(
            CRITICAL_ALERT_TITLE,
            "1 critical conflicts found. Review immediately."
        )]
    );
}

#[test]
fn many_high_conflicts_still_alert_once_per_cycle() {
    let mut snapshot = care_team();
    snapshot.conflicts = (0..5)
        .map(|i| conflict(&format!("conf-{i}"), Severity::High))
        .chain([conflict("conf-low", Severity::Low)])
        .collect();
    let mut h = Harness::new(snapshot);

    h.send(FlowMsg::Init);
    h.send(FlowMsg::ManualRefresh);
    assert_eq!(h.sink.count_titled(CRITICAL_ALERT_TITLE), 2);
    assert!(
        h.sink
            .notices()
            .iter()
            .all(|n| n.message == "5 critical conflicts found. Review immediately.")
    );
}

#[test]
fn time_range_change_refetches_without_auto_refresh() {
    let mut h = Harness::new(care_team());
    h.send(FlowMsg::Init);
    h.send(FlowMsg::SetTimeRange(TimeRange::LastWeek));

    let calls = h.provider.calls();
    assert_eq!(
        calls[calls.len() - 3..],
        [
            ProviderCall::Fetch(FetchStage::Metrics, TimeRange::LastWeek),
            ProviderCall::Fetch(FetchStage::History, TimeRange::LastWeek),
            ProviderCall::Fetch(FetchStage::Conflicts, TimeRange::LastWeek),
        ]
    );
    assert!(!h.monitor.timer_active());
}

#[test]
fn click_selects_entity_and_fills_detail_panel() {
    // Ring centre (270, 300) and radius 150 put slot 0 at (420, 300).
    let settings = ModelSettings {
        geometry: Geometry {
            width: 540.0,
            height: 600.0,
            ring_radius: 150.0,
        },
        ..ModelSettings::default()
    };
    let mut b = FlowEntity::new("b", EntityType::Caregiver, "Entity B");
    b.update_count = 4;
    b.has_conflict = true;
    let snapshot = Snapshot {
        entities: vec![FlowEntity::new("c", EntityType::Client, "Entity C"), b],
        ..Snapshot::default()
    };
    let mut h = Harness::with_settings(snapshot, settings);
    h.send(FlowMsg::Init);

    let position = h
        .monitor
        .model()
        .frame
        .entity("b")
        .and_then(|e| e.position)
        .expect("b is laid out");
    assert!((position.x - 420.0).abs() < 1e-9);
    assert!((position.y - 300.0).abs() < 1e-9);
    assert!((position.radius - 30.0).abs() < f64::EPSILON);

    h.send(FlowMsg::Click(Point::new(425.0, 305.0)));
    assert_eq!(h.monitor.model().selected.as_deref(), Some("b"));

    let panel = detail_panel(h.monitor.model()).expect("detail panel");
    assert_eq!(panel.id, "b");
    assert_eq!(panel.type_label, "Caregiver");
    assert_eq!(panel.update_count, 4);
    assert_eq!(panel.last_update, "Never");
    assert_eq!(panel.conflict_status(), "Has conflicts");

    h.send(FlowMsg::Click(Point::new(270.0, 300.0)));
    assert!(detail_panel(h.monitor.model()).is_none());
}

#[test]
fn auto_refresh_fires_once_per_interval() {
    let mut h = Harness::new(care_team());
    h.send(FlowMsg::Init);
    h.send(FlowMsg::EnableAuto(Duration::from_secs(30)));
    assert_eq!(h.cycles(), 1);

    assert_eq!(h.advance(Duration::from_secs(29)), 0);
    assert_eq!(h.cycles(), 1);
    assert_eq!(h.advance(Duration::from_secs(1)), 1);
    assert_eq!(h.cycles(), 2);
}

#[test]
fn disabling_before_the_mark_prevents_the_fetch() {
    let mut h = Harness::new(care_team());
    h.send(FlowMsg::Init);
    h.send(FlowMsg::EnableAuto(Duration::from_secs(30)));

    h.advance(Duration::from_secs(20));
    h.send(FlowMsg::DisableAuto);
    assert_eq!(h.driver.active_timers(), 0);

    assert_eq!(h.advance(Duration::from_secs(120)), 0);
    assert_eq!(h.cycles(), 1);
}

#[test]
fn interval_change_replaces_the_timer() {
    let mut h = Harness::new(care_team());
    h.send(FlowMsg::Init);
    h.send(FlowMsg::EnableAuto(Duration::from_secs(30)));
    h.send(FlowMsg::ChangeInterval(Duration::from_secs(10)));
    assert_eq!(h.driver.active_timers(), 1);

    for _ in 0..3 {
        assert_eq!(h.advance(Duration::from_secs(10)), 1);
    }
    assert_eq!(h.cycles(), 4);
}

#[test]
fn empty_history_and_conflicts_show_empty_states_without_notices() {
    let snapshot = Snapshot {
        entities: vec![FlowEntity::new("client-1", EntityType::Client, "Ada")],
        ..Snapshot::default()
    };
    let mut h = Harness::new(snapshot);
    h.send(FlowMsg::Init);

    h.send(FlowMsg::SelectView(View::History));
    let history = history_panel(h.monitor.model());
    let empty = history.empty.expect("history empty state");
    assert_eq!(empty.message, NO_UPDATES_MESSAGE);
    assert!(empty.message.starts_with("No updates found"));

    h.send(FlowMsg::SelectView(View::Conflicts));
    let conflicts = conflicts_panel(h.monitor.model());
    let empty = conflicts.empty.expect("conflicts empty state");
    assert_eq!(empty.message, NO_CONFLICTS_MESSAGE);
    assert_eq!(empty.tone, Tone::Success);

    assert!(h.sink.notices().is_empty());
}

// ──────────────────── failure and resolution ────────────────────

#[test]
fn failed_cycle_keeps_previous_frame_behind_banner() {
    let mut h = Harness::new(care_team());
    h.send(FlowMsg::Init);
    h.sink.clear();

    h.provider
        .fail_next(FetchStage::History, ProviderError::Unavailable("down".into()));
    h.send(FlowMsg::ManualRefresh);

    let model = h.monitor.model();
    assert_eq!(
        model.error.as_deref(),
        Some("Failed to load data flow: update history request failed: provider unavailable: down")
    );
    assert!(!model.loading);
    assert_eq!(model.frame.entities().len(), 3);
    assert_eq!(h.sink.count_titled(FETCH_ERROR_TITLE), 1);
    // The cycle aborted before the conflicts call.
    assert_eq!(h.provider.fetch_count(FetchStage::Conflicts), 1);

    h.send(FlowMsg::ManualRefresh);
    assert!(h.monitor.model().error.is_none());
}

#[test]
fn successful_resolution_refetches_once() {
    let mut h = Harness::new(care_team());
    h.send(FlowMsg::Init);
    h.sink.clear();

    h.send(FlowMsg::Resolve {
        conflict_id: "conf-1".into(),
        option: Some("keep-first".into()),
    });

    assert_eq!(h.sink.count_titled(RESOLVED_TITLE), 1);
    assert_eq!(h.cycles(), 2);
    assert!(h.monitor.model().conflicts.is_empty());
    let requests = h.provider.resolutions();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].resolution_option.as_deref(), Some("keep-first"));
}

#[test]
fn failed_resolution_neither_refetches_nor_changes_state() {
    let mut h = Harness::new(care_team());
    h.send(FlowMsg::Init);
    h.sink.clear();

    h.provider
        .set_resolve_behavior(ResolveBehavior::Fail(ProviderError::Rejected("locked".into())));
    h.send(FlowMsg::Resolve {
        conflict_id: "conf-1".into(),
        option: None,
    });
    h.provider.set_resolve_behavior(ResolveBehavior::Decline);
    h.send(FlowMsg::Resolve {
        conflict_id: "conf-1".into(),
        option: None,
    });

    assert_eq!(h.sink.count_titled(RESOLUTION_FAILED_TITLE), 2);
    assert_eq!(h.sink.count_titled(RESOLVED_TITLE), 0);
    assert_eq!(h.cycles(), 1);
    assert_eq!(h.monitor.model().conflicts.len(), 1);
}

#[test]
fn overlapping_triggers_coalesce_into_one_follow_up() {
    let mut h = Harness::new(care_team());
    h.provider.set_latency(Duration::from_millis(50));

    h.monitor.dispatch(FlowMsg::Init).expect("dispatch");
    h.monitor.dispatch(FlowMsg::ManualRefresh).expect("dispatch");
    h.monitor.dispatch(FlowMsg::ManualRefresh).expect("dispatch");
    h.monitor
        .dispatch(FlowMsg::SetTimeRange(TimeRange::LastMonth))
        .expect("dispatch");
    h.monitor.settle(SETTLE).expect("settle");

    assert_eq!(h.cycles(), 2);
    assert_eq!(h.monitor.model().cycles.completed(), 2);
    assert_eq!(
        h.provider.calls().last(),
        Some(&ProviderCall::Fetch(FetchStage::Conflicts, TimeRange::LastMonth))
    );
    assert_eq!(h.sink.count_titled(CRITICAL_ALERT_TITLE), 2);
}
