#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};
use tempfile::TempDir;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout).unwrap_or_else(|e| {
            panic!(
                "stdout is not JSON ({e}); log: {}",
                self.log_path.display()
            )
        })
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_cfm") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "cfm.exe" } else { "cfm" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve cfm binary path for integration test"),
    }
}

/// Isolated HOME, snapshot directory and activity log for one test.
pub struct Workspace {
    root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create workspace");
        fs::create_dir_all(root.path().join("snapshots")).expect("create snapshot dir");
        Self { root }
    }

    /// Workspace with `sample_snapshot()` as the fallback snapshot.
    pub fn with_sample() -> Self {
        let workspace = Self::new();
        workspace.write_snapshot("snapshot.json", &sample_snapshot());
        workspace
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.root.path().join("snapshots")
    }

    pub fn activity_log(&self) -> PathBuf {
        self.root.path().join("activity.jsonl")
    }

    pub fn write_snapshot(&self, name: &str, snapshot: &Value) {
        let body = serde_json::to_string_pretty(snapshot).expect("serialize snapshot");
        fs::write(self.snapshot_dir().join(name), body).expect("write snapshot");
    }

    pub fn activity_lines(&self) -> Vec<Value> {
        fs::read_to_string(self.activity_log())
            .unwrap_or_default()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).expect("activity line is JSON"))
            .collect()
    }

    pub fn run(&self, case_name: &str, args: &[&str]) -> CmdResult {
        let log_root = std::env::temp_dir().join("cfm-test-logs");
        fs::create_dir_all(&log_root).expect("create temp test log dir");

        let log_path = log_root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
        let bin_path = resolve_bin_path();

        let output = Command::new(&bin_path)
            .args(args)
            .env("HOME", self.root())
            .env("CFM_SNAPSHOT_DIR", self.snapshot_dir())
            .env("CFM_ACTIVITY_LOG", self.activity_log())
            .env("CFM_NOTIFICATIONS_ENABLED", "false")
            .env_remove("CFM_OUTPUT_FORMAT")
            .env("RUST_BACKTRACE", "1")
            .output()
            .expect("execute cfm command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let mut log_content = String::new();
        log_content.push_str(&format!("case={case_name}\n"));
        log_content.push_str(&format!("bin={}\n", bin_path.display()));
        log_content.push_str(&format!("args={args:?}\n"));
        log_content.push_str(&format!("status={}\n", output.status));
        log_content.push_str("----- stdout -----\n");
        log_content.push_str(&stdout);
        log_content.push('\n');
        log_content.push_str("----- stderr -----\n");
        log_content.push_str(&stderr);
        log_content.push('\n');
        fs::write(&log_path, log_content).expect("write test log");

        CmdResult {
            status: output.status,
            stdout,
            stderr,
            log_path,
        }
    }
}

/// Three entities, two relations, three updates and two conflicts.
///
/// Sorted by id the ring order is `cg-1`, `client-1`, `sched-1`; with the
/// default 800x600 canvas `cg-1` sits at (550, 300).
pub fn sample_snapshot() -> Value {
    json!({
        "entities": [
            {
                "id": "client-1",
                "type": "client",
                "name": "Ada Lovelace",
                "updateCount": 2,
                "lastUpdate": "2026-10-01T09:30:00Z",
                "hasConflict": true
            },
            {
                "id": "cg-1",
                "type": "caregiver",
                "name": "Grace Hopper",
                "updateCount": 1,
                "lastUpdate": "2026-10-01T08:00:00Z",
                "hasConflict": true
            },
            {
                "id": "sched-1",
                "type": "schedule",
                "name": "Morning Visit"
            }
        ],
        "relations": [
            {
                "id": "rel-1",
                "sourceId": "cg-1",
                "targetId": "client-1",
                "strength": 3.0,
                "flowRate": 12.5,
                "hasConflict": true
            },
            {
                "id": "rel-2",
                "sourceId": "sched-1",
                "targetId": "cg-1"
            }
        ],
        "updates": [
            {
                "id": "upd-1",
                "entityId": "client-1",
                "entityType": "client",
                "entityName": "Ada Lovelace",
                "timestamp": "2026-10-01T09:30:00Z",
                "updateType": "modify",
                "userId": "coord-7",
                "description": "Updated care plan",
                "changes": {
                    "carePlan": { "previous": "basic", "new": "extended" },
                    "notes": { "previous": null, "new": "Prefers mornings" }
                }
            },
            {
                "id": "upd-2",
                "entityId": "client-1",
                "entityType": "client",
                "entityName": "Ada Lovelace",
                "timestamp": "2026-10-01T09:00:00Z",
                "updateType": "create"
            },
            {
                "id": "upd-3",
                "entityId": "cg-1",
                "entityType": "caregiver",
                "entityName": "Grace Hopper",
                "timestamp": "2026-10-01T08:00:00Z",
                "updateType": "modify",
                "userId": "coord-2"
            }
        ],
        "conflicts": [
            {
                "id": "conf-1",
                "title": "Double booking",
                "sourceEntityId": "client-1",
                "targetEntityId": "cg-1",
                "sourceType": "client",
                "targetType": "caregiver",
                "severity": "high",
                "type": "schedule_overlap",
                "description": "Two visits overlap on Tuesday",
                "detectedAt": "2026-10-01T10:00:00Z",
                "resolutionOptions": [
                    { "id": "keep-first", "label": "Keep the first visit" },
                    { "id": "keep-second", "label": "Keep the second visit" }
                ]
            },
            {
                "id": "conf-2",
                "title": "Stale phone number",
                "sourceEntityId": "client-1",
                "targetEntityId": "cg-1",
                "sourceType": "client",
                "targetType": "caregiver",
                "severity": "low",
                "type": "contact_mismatch",
                "detectedAt": "2026-10-01T10:05:00Z"
            }
        ]
    })
}
