//! Provider seams: the three data calls and the resolve mutation.
//!
//! Implementations are shared with worker threads, hence `Send + Sync`.

pub mod scripted;
pub mod snapshot;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::ProviderError;
use crate::domain::{
    Conflict, FlowEntity, FlowRelation, ResolutionAck, ResolutionRequest, TimeRange, UpdateEvent,
};

pub use scripted::ScriptedProvider;
pub use snapshot::{Snapshot, SnapshotProvider};

/// Result alias for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Payload of `getFlowMetrics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowMetrics {
    #[serde(default)]
    pub entities: Vec<FlowEntity>,
    #[serde(default)]
    pub relations: Vec<FlowRelation>,
}

/// Payload of `getUpdateHistory`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateHistory {
    #[serde(default)]
    pub updates: Vec<UpdateEvent>,
}

/// Payload of `getDataConflicts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictList {
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
}

/// Entities and relations for a time window.
pub trait MetricsProvider: Send + Sync {
    fn flow_metrics(&self, range: TimeRange) -> ProviderResult<FlowMetrics>;
}

/// Time-ordered change events for a time window.
pub trait HistoryProvider: Send + Sync {
    fn update_history(&self, range: TimeRange) -> ProviderResult<UpdateHistory>;
}

/// Active conflicts and the resolve operation.
pub trait ConflictProvider: Send + Sync {
    fn data_conflicts(&self, range: TimeRange) -> ProviderResult<ConflictList>;
    fn resolve_conflict(&self, request: &ResolutionRequest) -> ProviderResult<ResolutionAck>;
}

/// The three collaborators one fetch cycle talks to.
#[derive(Clone)]
pub struct Providers {
    pub metrics: Arc<dyn MetricsProvider>,
    pub history: Arc<dyn HistoryProvider>,
    pub conflicts: Arc<dyn ConflictProvider>,
}

impl Providers {
    /// Use one object for all three roles.
    pub fn from_single<P>(provider: Arc<P>) -> Self
    where
        P: MetricsProvider + HistoryProvider + ConflictProvider + 'static,
    {
        Self {
            metrics: provider.clone(),
            history: provider.clone(),
            conflicts: provider,
        }
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers").finish_non_exhaustive()
    }
}
