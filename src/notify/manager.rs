//! Multi-channel notification dispatch: journal (stderr) and append-only JSONL
//! file channels with min-kind filtering.
//!
//! Each channel is fire-and-forget; delivery failures never reach the engine.

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{Notice, NoticeKind, NotificationSink};

// ──────────────────── configuration ────────────────────

/// Top-level notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Master switch for all notifications.
    pub enabled: bool,
    /// Which channel names to activate.
    pub channels: Vec<String>,
    pub journal: JournalConfig,
    pub file: FileConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: vec!["journal".to_string()],
            journal: JournalConfig::default(),
            file: FileConfig::default(),
        }
    }
}

/// Journal settings (structured lines on stderr).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JournalConfig {
    pub min_kind: NoticeKind,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            min_kind: NoticeKind::Info,
        }
    }
}

/// File settings (append-only JSONL).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        Self {
            path: home
                .join(".local")
                .join("share")
                .join("cfm")
                .join("notifications.jsonl"),
        }
    }
}

// ──────────────────── JSONL record ────────────────────

#[derive(Debug, Serialize)]
struct NoticeRecord<'a> {
    ts: String,
    #[serde(flatten)]
    notice: &'a Notice,
}

// ──────────────────── channels ────────────────────

trait Channel: Send + Sync {
    fn name(&self) -> &'static str;
    fn send(&self, notice: &Notice);
}

struct JournalChannel {
    min_kind: NoticeKind,
}

impl JournalChannel {
    fn line(notice: &Notice) -> String {
        let priority = match notice.kind {
            NoticeKind::Error => "ERR",
            NoticeKind::Success => "NOTICE",
            NoticeKind::Info => "INFO",
        };
        format!("[CFM-NOTIFY] [{priority}] {}: {}", notice.title, notice.message)
    }
}

impl Channel for JournalChannel {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn send(&self, notice: &Notice) {
        if notice.kind < self.min_kind {
            return;
        }
        eprintln!("{}", Self::line(notice));
    }
}

struct FileChannel {
    path: PathBuf,
}

impl Channel for FileChannel {
    fn name(&self) -> &'static str {
        "file"
    }

    fn send(&self, notice: &Notice) {
        let record = NoticeRecord {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            notice,
        };
        let Ok(json) = serde_json::to_string(&record) else {
            return;
        };

        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let file = {
            let mut opts = OpenOptions::new();
            opts.create(true).append(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt as _;
                opts.mode(0o600);
            }
            opts.open(&self.path)
        };

        if let Ok(mut f) = file {
            let _ = f.write_all(format!("{json}\n").as_bytes());
        }
    }
}

// ──────────────────── manager ────────────────────

/// Dispatches notices to every enabled channel.
pub struct NotificationManager {
    channels: Vec<Box<dyn Channel>>,
    enabled: bool,
}

impl NotificationManager {
    /// Build a manager from configuration. Unknown channel names are skipped.
    #[must_use]
    pub fn from_config(config: &NotificationConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let mut channels: Vec<Box<dyn Channel>> = Vec::new();
        for channel_name in &config.channels {
            match channel_name.as_str() {
                "journal" => channels.push(Box::new(JournalChannel {
                    min_kind: config.journal.min_kind,
                })),
                "file" => channels.push(Box::new(FileChannel {
                    path: config.file.path.clone(),
                })),
                _ => {}
            }
        }

        Self {
            channels,
            enabled: true,
        }
    }

    /// A manager that drops every notice.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            channels: Vec::new(),
            enabled: false,
        }
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

impl NotificationSink for NotificationManager {
    fn notify(&self, notice: &Notice) {
        if !self.enabled {
            return;
        }
        for channel in &self.channels {
            channel.send(notice);
        }
    }
}

// ──────────────────── tests ────────────────────
