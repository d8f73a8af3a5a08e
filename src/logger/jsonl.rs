//! JSONL activity log: append-only line-delimited JSON for every fetch cycle,
//! alert, resolution, and timer transition.
//!
//! Each line is a self-contained JSON object, assembled in memory and written
//! with a single `write_all` so tailing readers never see partial lines.
//!
//! Degradation chain:
//! 1. Primary file path
//! 2. stderr with `[CFM-JSONL]` prefix
//! 3. Silent discard (logging must never fail the engine)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::TimeRange;

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Activity event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FetchStarted,
    FetchCompleted,
    FetchFailed,
    ConflictAlert,
    ResolutionApplied,
    ResolutionFailed,
    TimerStarted,
    TimerCancelled,
    Notification,
}

/// A single JSONL log entry; everything but `ts`, `event`, `severity` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_severity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
            severity,
            cycle: None,
            time_range: None,
            entities: None,
            relations: None,
            updates: None,
            conflicts: None,
            high_severity: None,
            interval_secs: None,
            conflict_id: None,
            duration_ms: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Where lines currently go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL activity log with graceful degradation.
pub struct ActivityLog {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    lines_written: u64,
}

impl ActivityLog {
    /// Open (creating parents as needed). Falls back to stderr on failure.
    #[must_use]
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut log = Self {
            path: Some(path.clone()),
            writer: None,
            state: WriterState::Stderr,
            lines_written: 0,
        };
        match open_append(&path) {
            Ok(file) => {
                log.writer = Some(BufWriter::new(file));
                log.state = WriterState::Normal;
            }
            Err(e) => {
                let _ = writeln!(
                    io::stderr(),
                    "[CFM-JSONL] cannot open {}: {e}; logging to stderr",
                    path.display()
                );
            }
        }
        log
    }

    /// A log that discards everything.
    #[must_use]
    pub fn discard() -> Self {
        Self {
            path: None,
            writer: None,
            state: WriterState::Discard,
            lines_written: 0,
        }
    }

    /// Write one entry as one line and flush it.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        if self.state == WriterState::Discard {
            return;
        }
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[CFM-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    /// Lines successfully handed to the file or stderr.
    #[must_use]
    pub const fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Path of the primary file, if one was configured.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn write_line(&mut self, line: &str) {
        if self.state == WriterState::Normal {
            let ok = self.writer.as_mut().is_some_and(|w| {
                w.write_all(line.as_bytes()).is_ok() && w.flush().is_ok()
            });
            if ok {
                self.lines_written += 1;
                return;
            }
            self.writer = None;
            self.state = WriterState::Stderr;
        }

        if self.state == WriterState::Stderr {
            if write!(io::stderr(), "[CFM-JSONL] {line}").is_ok() {
                self.lines_written += 1;
            } else {
                self.state = WriterState::Discard;
            }
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
