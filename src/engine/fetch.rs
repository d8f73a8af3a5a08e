//! One fetch cycle: metrics, then history, then conflicts.

use std::time::{Duration, Instant};

use crate::core::errors::{FetchError, FetchStage};
use crate::domain::{Conflict, FlowEntity, FlowRelation, TimeRange, UpdateEvent};
use crate::providers::Providers;

/// Everything a successful cycle produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchBundle {
    pub range: TimeRange,
    pub entities: Vec<FlowEntity>,
    pub relations: Vec<FlowRelation>,
    pub updates: Vec<UpdateEvent>,
    pub conflicts: Vec<Conflict>,
    pub elapsed: Duration,
}

/// Runs fetch cycles against a set of providers.
#[derive(Debug, Clone)]
pub struct FetchOrchestrator {
    providers: Providers,
}

impl FetchOrchestrator {
    #[must_use]
    pub const fn new(providers: Providers) -> Self {
        Self { providers }
    }

    #[must_use]
    pub const fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Query all three providers with `range`, in order.
    ///
    /// The first failure ends the cycle; results gathered before it are
    /// discarded along with it.
    pub fn refresh(&self, range: TimeRange) -> Result<FetchBundle, FetchError> {
        let started = Instant::now();

        let metrics = self
            .providers
            .metrics
            .flow_metrics(range)
            .map_err(|source| FetchError {
                stage: FetchStage::Metrics,
                source,
            })?;
        let history = self
            .providers
            .history
            .update_history(range)
            .map_err(|source| FetchError {
                stage: FetchStage::History,
                source,
            })?;
        let conflicts = self
            .providers
            .conflicts
            .data_conflicts(range)
            .map_err(|source| FetchError {
                stage: FetchStage::Conflicts,
                source,
            })?;

        Ok(FetchBundle {
            range,
            entities: metrics.entities,
            relations: metrics.relations,
            updates: history.updates,
            conflicts: conflicts.conflicts,
            elapsed: started.elapsed(),
        })
    }
}
