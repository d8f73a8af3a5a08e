//! In-memory provider with call accounting and injectable failures.
//!
//! Serves the same [`Snapshot`] for every time range and records each call,
//! which makes it the workhorse for engine tests.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::snapshot::Snapshot;
use super::{
    ConflictList, ConflictProvider, FlowMetrics, HistoryProvider, MetricsProvider, ProviderResult,
    UpdateHistory,
};
use crate::core::errors::{FetchStage, ProviderError};
use crate::domain::{ResolutionAck, ResolutionRequest, TimeRange};

/// One recorded provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCall {
    Fetch(FetchStage, TimeRange),
    Resolve,
}

/// How the next resolve call answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveBehavior {
    /// Acknowledge and drop the conflict from later fetches.
    Accept,
    /// Answer `{ success: false }`.
    Decline,
    /// Fail the call.
    Fail(ProviderError),
}

#[derive(Debug)]
struct State {
    snapshot: Snapshot,
    resolved: HashSet<String>,
    calls: Vec<ProviderCall>,
    resolutions: Vec<ResolutionRequest>,
    failures: Vec<(FetchStage, ProviderError)>,
    resolve: ResolveBehavior,
    latency: Duration,
}

/// Scripted, thread-safe provider for all three roles.
#[derive(Debug)]
pub struct ScriptedProvider {
    state: Mutex<State>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(State {
                snapshot,
                resolved: HashSet::new(),
                calls: Vec::new(),
                resolutions: Vec::new(),
                failures: Vec::new(),
                resolve: ResolveBehavior::Accept,
                latency: Duration::ZERO,
            }),
        }
    }

    /// Make the next call to `stage` fail with `error` (one-shot).
    pub fn fail_next(&self, stage: FetchStage, error: ProviderError) {
        self.state.lock().failures.push((stage, error));
    }

    pub fn set_resolve_behavior(&self, behavior: ResolveBehavior) {
        self.state.lock().resolve = behavior;
    }

    /// Sleep this long inside every fetch call.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls made to `stage`.
    #[must_use]
    pub fn fetch_count(&self, stage: FetchStage) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProviderCall::Fetch(s, _) if *s == stage))
            .count()
    }

    /// Requests received by `resolve_conflict`, oldest first.
    #[must_use]
    pub fn resolutions(&self) -> Vec<ResolutionRequest> {
        self.state.lock().resolutions.clone()
    }

    fn begin(&self, stage: FetchStage, range: TimeRange) -> ProviderResult<()> {
        let latency = {
            let mut state = self.state.lock();
            state.calls.push(ProviderCall::Fetch(stage, range));
            if let Some(idx) = state.failures.iter().position(|(s, _)| *s == stage) {
                let (_, error) = state.failures.remove(idx);
                return Err(error);
            }
            state.latency
        };
        if !latency.is_zero() {
            thread::sleep(latency);
        }
        Ok(())
    }
}

impl MetricsProvider for ScriptedProvider {
    fn flow_metrics(&self, range: TimeRange) -> ProviderResult<FlowMetrics> {
        self.begin(FetchStage::Metrics, range)?;
        let state = self.state.lock();
        Ok(FlowMetrics {
            entities: state.snapshot.entities.clone(),
            relations: state.snapshot.relations.clone(),
        })
    }
}

impl HistoryProvider for ScriptedProvider {
    fn update_history(&self, range: TimeRange) -> ProviderResult<UpdateHistory> {
        self.begin(FetchStage::History, range)?;
        Ok(UpdateHistory {
            updates: self.state.lock().snapshot.updates.clone(),
        })
    }
}

impl ConflictProvider for ScriptedProvider {
    fn data_conflicts(&self, range: TimeRange) -> ProviderResult<ConflictList> {
        self.begin(FetchStage::Conflicts, range)?;
        let state = self.state.lock();
        Ok(ConflictList {
            conflicts: state
                .snapshot
                .conflicts
                .iter()
                .filter(|c| !state.resolved.contains(&c.id))
                .cloned()
                .collect(),
        })
    }

    fn resolve_conflict(&self, request: &ResolutionRequest) -> ProviderResult<ResolutionAck> {
        let mut state = self.state.lock();
        state.calls.push(ProviderCall::Resolve);
        state.resolutions.push(request.clone());
        match state.resolve.clone() {
            ResolveBehavior::Accept => {
                state.resolved.insert(request.conflict.id.clone());
                Ok(ResolutionAck { success: true })
            }
            ResolveBehavior::Decline => Ok(ResolutionAck { success: false }),
            ResolveBehavior::Fail(error) => Err(error),
        }
    }
}
