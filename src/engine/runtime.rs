//! Command executor for the flow monitor.
//!
//! [`FlowMonitor`] owns the model, the providers, the notification sink, the
//! activity log and the single timer slot. Provider calls run on short-lived
//! worker threads that report back over a `crossbeam-channel` queue; the
//! caller drives the loop with [`FlowMonitor::pump`], [`FlowMonitor::wait_next`]
//! or [`FlowMonitor::settle`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use super::fetch::FetchOrchestrator;
use super::model::{Activity, FlowCmd, FlowMonitorModel, FlowMsg, ModelSettings};
use super::timer::{TickFn, TimerDriver, TimerHandle};
use super::update::update;
use crate::core::errors::{FetchError, FetchStage, FlowError, ProviderError, Result};
use crate::domain::{ResolutionRequest, TimeRange};
use crate::logger::jsonl::{ActivityLog, EventType, LogEntry, Severity};
use crate::notify::{Notice, NoticeKind, NotificationSink};
use crate::providers::Providers;

/// Everything a [`FlowMonitor`] is built from.
pub struct MonitorParts {
    pub providers: Providers,
    pub settings: ModelSettings,
    pub sink: Arc<dyn NotificationSink>,
    pub log: ActivityLog,
    pub timer_driver: Box<dyn TimerDriver>,
}

/// Runs the update loop and executes its commands.
pub struct FlowMonitor {
    model: FlowMonitorModel,
    orchestrator: FetchOrchestrator,
    sink: Arc<dyn NotificationSink>,
    log: ActivityLog,
    timer_driver: Box<dyn TimerDriver>,
    timer: Option<TimerHandle>,
    tx: Sender<FlowMsg>,
    rx: Receiver<FlowMsg>,
    workers: Vec<JoinHandle<()>>,
}

impl FlowMonitor {
    #[must_use]
    pub fn new(parts: MonitorParts) -> Self {
        let (tx, rx) = unbounded();
        Self {
            model: FlowMonitorModel::new(parts.settings),
            orchestrator: FetchOrchestrator::new(parts.providers),
            sink: parts.sink,
            log: parts.log,
            timer_driver: parts.timer_driver,
            timer: None,
            tx,
            rx,
            workers: Vec::new(),
        }
    }

    #[must_use]
    pub const fn model(&self) -> &FlowMonitorModel {
        &self.model
    }

    #[must_use]
    pub const fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// Whether the timer slot holds a live timer.
    #[must_use]
    pub const fn timer_active(&self) -> bool {
        self.timer.is_some()
    }

    /// Apply one message and execute the resulting commands.
    pub fn dispatch(&mut self, msg: FlowMsg) -> Result<()> {
        let cmd = update(&mut self.model, msg);
        for cmd in cmd.flatten() {
            self.execute(cmd)?;
        }
        Ok(())
    }

    /// Handle every queued message without blocking. Returns how many ran.
    pub fn pump(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.dispatch(msg)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Wait up to `timeout` for one message and handle it.
    pub fn wait_next(&mut self, timeout: Duration) -> Result<bool> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => {
                self.dispatch(msg)?;
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(FlowError::ChannelClosed {
                component: "flow monitor queue",
            }),
        }
    }

    /// Handle queued messages until no fetch or resolve call is outstanding.
    pub fn settle(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump()?;
            if !self.model.is_busy() {
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FlowError::Runtime {
                    details: format!("work still outstanding after {}ms", timeout.as_millis()),
                });
            }
            self.wait_next(remaining)?;
        }
    }

    /// Cancel the timer and wait for worker threads to finish.
    pub fn shutdown(mut self) {
        self.cancel_timer();
        for worker in std::mem::take(&mut self.workers) {
            let _ = worker.join();
        }
    }

    // ──────────────────── command execution ────────────────────

    fn execute(&mut self, cmd: FlowCmd) -> Result<()> {
        match cmd {
            FlowCmd::None | FlowCmd::Batch(_) => Ok(()),
            FlowCmd::Fetch { cycle, range } => self.spawn_fetch(cycle, range),
            FlowCmd::StartTimer {
                generation,
                interval,
            } => self.start_timer(generation, interval),
            FlowCmd::CancelTimer => {
                self.cancel_timer();
                Ok(())
            }
            FlowCmd::Notify(notice) => {
                self.notify(&notice);
                Ok(())
            }
            FlowCmd::Resolve(request) => self.spawn_resolve(request),
            FlowCmd::Record(activity) => {
                self.record(activity);
                Ok(())
            }
        }
    }

    fn spawn_fetch(&mut self, cycle: u64, range: TimeRange) -> Result<()> {
        let mut entry = LogEntry::new(EventType::FetchStarted, Severity::Info);
        entry.cycle = Some(cycle);
        entry.time_range = Some(range);
        self.log.write_entry(&entry);

        let orchestrator = self.orchestrator.clone();
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("cfm-fetch".to_string())
            .spawn(move || {
                let result = orchestrator.refresh(range).map(Box::new);
                let _ = tx.send(FlowMsg::FetchCompleted { cycle, result });
            });

        match spawned {
            Ok(handle) => {
                self.track_worker(handle);
                Ok(())
            }
            // Report the cycle as failed so the model does not wait forever.
            Err(source) => self.dispatch(FlowMsg::FetchCompleted {
                cycle,
                result: Err(FetchError {
                    stage: FetchStage::Metrics,
                    source: ProviderError::Unavailable(format!(
                        "failed to spawn fetch worker: {source}"
                    )),
                }),
            }),
        }
    }

    fn spawn_resolve(&mut self, request: ResolutionRequest) -> Result<()> {
        let provider = Arc::clone(&self.orchestrator.providers().conflicts);
        let tx = self.tx.clone();
        let conflict_id = request.conflict.id.clone();
        let spawned = thread::Builder::new()
            .name("cfm-resolve".to_string())
            .spawn(move || {
                let result = provider.resolve_conflict(&request);
                let _ = tx.send(FlowMsg::ResolutionCompleted {
                    conflict_id: request.conflict.id,
                    result,
                });
            });

        match spawned {
            Ok(handle) => {
                self.track_worker(handle);
                Ok(())
            }
            Err(source) => self.dispatch(FlowMsg::ResolutionCompleted {
                conflict_id,
                result: Err(ProviderError::Unavailable(format!(
                    "failed to spawn resolve worker: {source}"
                ))),
            }),
        }
    }

    fn track_worker(&mut self, handle: JoinHandle<()>) {
        self.workers.retain(|w| !w.is_finished());
        self.workers.push(handle);
    }

    fn start_timer(&mut self, generation: u64, interval: Duration) -> Result<()> {
        // Empty the slot first so two timers never run at once.
        self.cancel_timer();

        let tx = self.tx.clone();
        let on_tick: TickFn = Box::new(move || tx.send(FlowMsg::TimerTick { generation }).is_ok());
        let handle = self.timer_driver.start(interval, on_tick)?;
        self.timer = Some(handle);

        let mut entry = LogEntry::new(EventType::TimerStarted, Severity::Info);
        entry.interval_secs = Some(interval.as_secs());
        entry.details = Some(format!("generation {generation}"));
        self.log.write_entry(&entry);
        Ok(())
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            let interval = handle.interval();
            handle.cancel();
            let mut entry = LogEntry::new(EventType::TimerCancelled, Severity::Info);
            entry.interval_secs = Some(interval.as_secs());
            self.log.write_entry(&entry);
        }
    }

    fn notify(&mut self, notice: &Notice) {
        self.sink.notify(notice);
        let severity = match notice.kind {
            NoticeKind::Info | NoticeKind::Success => Severity::Info,
            NoticeKind::Error => Severity::Warning,
        };
        let mut entry = LogEntry::new(EventType::Notification, severity);
        entry.details = Some(format!("[{}] {}: {}", notice.kind, notice.title, notice.message));
        self.log.write_entry(&entry);
    }

    fn record(&mut self, activity: Activity) {
        let entry = match activity {
            Activity::FetchCompleted {
                cycle,
                range,
                entities,
                relations,
                updates,
                conflicts,
                high_severity,
                duration_ms,
            } => {
                let mut entry = LogEntry::new(EventType::FetchCompleted, Severity::Info);
                entry.cycle = Some(cycle);
                entry.time_range = Some(range);
                entry.entities = Some(entities);
                entry.relations = Some(relations);
                entry.updates = Some(updates);
                entry.conflicts = Some(conflicts);
                entry.high_severity = Some(high_severity);
                entry.duration_ms = Some(duration_ms);
                entry
            }
            Activity::FetchFailed {
                cycle,
                range,
                message,
            } => {
                let mut entry = LogEntry::new(EventType::FetchFailed, Severity::Warning);
                entry.cycle = Some(cycle);
                entry.time_range = Some(range);
                entry.error_code = Some("CFM-2001".to_string());
                entry.error_message = Some(message);
                entry
            }
            Activity::ConflictAlert {
                cycle,
                high_severity,
            } => {
                let mut entry = LogEntry::new(EventType::ConflictAlert, Severity::Critical);
                entry.cycle = Some(cycle);
                entry.high_severity = Some(high_severity);
                entry
            }
            Activity::ResolutionApplied { conflict_id } => {
                let mut entry = LogEntry::new(EventType::ResolutionApplied, Severity::Info);
                entry.conflict_id = Some(conflict_id);
                entry
            }
            Activity::ResolutionFailed {
                conflict_id,
                message,
            } => {
                let mut entry = LogEntry::new(EventType::ResolutionFailed, Severity::Warning);
                entry.conflict_id = Some(conflict_id);
                entry.error_code = Some("CFM-2002".to_string());
                entry.error_message = Some(message);
                entry
            }
        };
        self.log.write_entry(&entry);
    }
}

impl Drop for FlowMonitor {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

impl std::fmt::Debug for FlowMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowMonitor")
            .field("model", &self.model)
            .field("timer", &self.timer)
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityType, FlowEntity};
    use crate::engine::timer::ManualTimerDriver;
    use crate::notify::RecordingSink;
    use crate::providers::{ScriptedProvider, Snapshot};

    const SETTLE: Duration = Duration::from_secs(5);

    fn monitor(log: ActivityLog) -> (FlowMonitor, ManualTimerDriver, RecordingSink) {
        let provider = Arc::new(ScriptedProvider::new(Snapshot {
            entities: vec![FlowEntity::new("client-1", EntityType::Client, "Ada")],
            ..Snapshot::default()
        }));
        let driver = ManualTimerDriver::new();
        let sink = RecordingSink::new();
        let monitor = FlowMonitor::new(MonitorParts {
            providers: Providers::from_single(provider),
            settings: ModelSettings::default(),
            sink: Arc::new(sink.clone()),
            log,
            timer_driver: Box::new(driver.clone()),
        });
        (monitor, driver, sink)
    }

    #[test]
    fn init_settles_with_loaded_frame() {
        let (mut monitor, _, sink) = monitor(ActivityLog::discard());
        monitor.dispatch(FlowMsg::Init).unwrap();
        assert!(monitor.model().loading);
        monitor.settle(SETTLE).unwrap();
        assert!(!monitor.model().loading);
        assert_eq!(monitor.model().frame.entities().len(), 1);
        assert!(sink.notices().is_empty());
    }

    #[test]
    fn timer_slot_holds_one_timer() {
        let (mut monitor, driver, _) = monitor(ActivityLog::discard());
        monitor.dispatch(FlowMsg::EnableAuto(Duration::from_secs(30))).unwrap();
        monitor.dispatch(FlowMsg::ChangeInterval(Duration::from_secs(10))).unwrap();
        monitor.dispatch(FlowMsg::EnableAuto(Duration::from_secs(20))).unwrap();
        assert_eq!(driver.active_timers(), 1);
        assert!(monitor.timer_active());

        monitor.dispatch(FlowMsg::DisableAuto).unwrap();
        assert_eq!(driver.active_timers(), 0);
        assert!(!monitor.timer_active());
    }

    #[test]
    fn drop_cancels_timer() {
        let (mut monitor, driver, _) = monitor(ActivityLog::discard());
        monitor.dispatch(FlowMsg::EnableAuto(Duration::from_secs(30))).unwrap();
        drop(monitor);
        assert_eq!(driver.active_timers(), 0);
    }

    #[test]
    fn activity_log_records_cycle_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let (mut monitor, _, _) = monitor(ActivityLog::open(&path));
        monitor.dispatch(FlowMsg::Init).unwrap();
        monitor.settle(SETTLE).unwrap();
        monitor.shutdown();

        let content = std::fs::read_to_string(&path).unwrap();
        let events: Vec<String> = content
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                v["event"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(events, vec!["fetch_started", "fetch_completed"]);
    }
}
