//! File-backed provider reading JSON snapshots from a directory.
//!
//! Layout of the snapshot directory:
//!
//! ```text
//! <dir>/1h.json | 24h.json | 7d.json | 30d.json   per-range snapshot (optional)
//! <dir>/snapshot.json                             fallback for every range
//! <dir>/resolutions.jsonl                         append-only resolve log
//! ```
//!
//! Conflicts named in `resolutions.jsonl` are hidden from later fetches.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{
    ConflictList, ConflictProvider, FlowMetrics, HistoryProvider, MetricsProvider, ProviderResult,
    UpdateHistory,
};
use crate::core::errors::ProviderError;
use crate::domain::{
    Conflict, FlowEntity, FlowRelation, ResolutionAck, ResolutionRequest, TimeRange, UpdateEvent,
};

/// Name of the range-independent fallback file.
pub const FALLBACK_FILE: &str = "snapshot.json";
/// Name of the append-only resolution log.
pub const RESOLUTIONS_FILE: &str = "resolutions.jsonl";

/// Everything one time range serves, in wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub entities: Vec<FlowEntity>,
    #[serde(default)]
    pub relations: Vec<FlowRelation>,
    #[serde(default)]
    pub updates: Vec<UpdateEvent>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
}

impl Snapshot {
    /// Parse a snapshot document from `path`.
    pub fn load(path: &Path) -> ProviderResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ProviderError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| ProviderError::Malformed(format!("{}: {e}", path.display())))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolutionRecord {
    ts: String,
    conflict_id: String,
    #[serde(default)]
    resolution_option: Option<String>,
}

/// Serves snapshot files; every call re-reads the directory.
#[derive(Debug)]
pub struct SnapshotProvider {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotProvider {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that serves `range`: the per-range file if present, else the fallback.
    #[must_use]
    pub fn snapshot_path(&self, range: TimeRange) -> PathBuf {
        let specific = self.dir.join(format!("{}.json", range.tag()));
        if specific.is_file() {
            specific
        } else {
            self.dir.join(FALLBACK_FILE)
        }
    }

    fn load(&self, range: TimeRange) -> ProviderResult<Snapshot> {
        let path = self.snapshot_path(range);
        if !path.is_file() {
            return Err(ProviderError::Unavailable(format!(
                "no snapshot for {range} in {}",
                self.dir.display()
            )));
        }
        Snapshot::load(&path)
    }

    /// Conflict ids recorded in the resolution log. Unparseable lines are skipped.
    pub fn resolved_ids(&self) -> ProviderResult<HashSet<String>> {
        let path = self.dir.join(RESOLUTIONS_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(ProviderError::Io(format!("{}: {e}", path.display()))),
        };
        Ok(raw
            .lines()
            .filter_map(|line| serde_json::from_str::<ResolutionRecord>(line).ok())
            .map(|record| record.conflict_id)
            .collect())
    }

    fn append_resolution(&self, record: &ResolutionRecord) -> ProviderResult<()> {
        let path = self.dir.join(RESOLUTIONS_FILE);
        let json =
            serde_json::to_string(record).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ProviderError::Io(format!("{}: {e}", path.display())))?;
        file.write_all(format!("{json}\n").as_bytes())
            .map_err(|e| ProviderError::Io(format!("{}: {e}", path.display())))
    }
}

impl MetricsProvider for SnapshotProvider {
    fn flow_metrics(&self, range: TimeRange) -> ProviderResult<FlowMetrics> {
        let snapshot = self.load(range)?;
        Ok(FlowMetrics {
            entities: snapshot.entities,
            relations: snapshot.relations,
        })
    }
}

impl HistoryProvider for SnapshotProvider {
    fn update_history(&self, range: TimeRange) -> ProviderResult<UpdateHistory> {
        Ok(UpdateHistory {
            updates: self.load(range)?.updates,
        })
    }
}

impl ConflictProvider for SnapshotProvider {
    fn data_conflicts(&self, range: TimeRange) -> ProviderResult<ConflictList> {
        let snapshot = self.load(range)?;
        let resolved = self.resolved_ids()?;
        Ok(ConflictList {
            conflicts: snapshot
                .conflicts
                .into_iter()
                .filter(|c| !resolved.contains(&c.id))
                .collect(),
        })
    }

    /// Records the resolution. A conflict that is already resolved is declined.
    fn resolve_conflict(&self, request: &ResolutionRequest) -> ProviderResult<ResolutionAck> {
        let _guard = self.write_lock.lock();
        if self.resolved_ids()?.contains(&request.conflict.id) {
            return Ok(ResolutionAck { success: false });
        }
        self.append_resolution(&ResolutionRecord {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            conflict_id: request.conflict.id.clone(),
            resolution_option: request.resolution_option.clone(),
        })?;
        Ok(ResolutionAck { success: true })
    }
}
