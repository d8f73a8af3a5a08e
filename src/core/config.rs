//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{FlowError, Result};
use crate::domain::TimeRange;
use crate::flow::layout::Geometry;
use crate::flow::render::RenderOptions;
use crate::notify::NotificationConfig;

/// Full CFM configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub canvas: CanvasConfig,
    pub layout: LayoutConfig,
    pub refresh: RefreshConfig,
    pub notifications: NotificationConfig,
    pub paths: PathsConfig,
}

/// Drawing surface and ring geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    pub ring_radius: f64,
}

/// Entity ordering and edge styling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Sort entities by id before layout so slots stay put across refreshes.
    pub sort_entities_by_id: bool,
    pub min_edge_width: f64,
    pub max_edge_width: f64,
}

/// Query window and auto-refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RefreshConfig {
    pub time_range: TimeRange,
    pub auto_refresh: bool,
    pub interval_secs: u64,
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub snapshot_dir: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        let geometry = Geometry::default();
        Self {
            width: geometry.width,
            height: geometry.height,
            ring_radius: geometry.ring_radius,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sort_entities_by_id: true,
            min_edge_width: 1.0,
            max_edge_width: 8.0,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            time_range: TimeRange::LastDay,
            auto_refresh: false,
            interval_secs: 30,
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[CFM-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = home_dir();
        let data = home.join(".local").join("share").join("cfm");
        Self {
            config_file: home.join(".config").join("cfm").join("config.toml"),
            snapshot_dir: data.join("snapshots"),
            activity_log: data.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| FlowError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(FlowError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for log correlation.
    ///
    /// FNV-1a over canonical JSON, stable across processes and releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        Geometry {
            width: self.canvas.width,
            height: self.canvas.height,
            ring_radius: self.canvas.ring_radius,
        }
    }

    #[must_use]
    pub const fn render_options(&self) -> RenderOptions {
        RenderOptions {
            geometry: self.geometry(),
            min_edge_width: self.layout.min_edge_width,
            max_edge_width: self.layout.max_edge_width,
        }
    }

    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // canvas
        if let Some(raw) = lookup("CFM_CANVAS_WIDTH") {
            self.canvas.width = parse_env("CFM_CANVAS_WIDTH", &raw)?;
        }
        if let Some(raw) = lookup("CFM_CANVAS_HEIGHT") {
            self.canvas.height = parse_env("CFM_CANVAS_HEIGHT", &raw)?;
        }
        if let Some(raw) = lookup("CFM_CANVAS_RING_RADIUS") {
            self.canvas.ring_radius = parse_env("CFM_CANVAS_RING_RADIUS", &raw)?;
        }

        // layout
        if let Some(raw) = lookup("CFM_LAYOUT_SORT_ENTITIES_BY_ID") {
            self.layout.sort_entities_by_id = parse_env("CFM_LAYOUT_SORT_ENTITIES_BY_ID", &raw)?;
        }

        // refresh
        if let Some(raw) = lookup("CFM_REFRESH_TIME_RANGE") {
            self.refresh.time_range =
                raw.parse::<TimeRange>()
                    .map_err(|details| FlowError::ConfigParse {
                        context: "env",
                        details: format!("CFM_REFRESH_TIME_RANGE={raw:?}: {details}"),
                    })?;
        }
        if let Some(raw) = lookup("CFM_REFRESH_AUTO") {
            self.refresh.auto_refresh = parse_env("CFM_REFRESH_AUTO", &raw)?;
        }
        if let Some(raw) = lookup("CFM_REFRESH_INTERVAL_SECS") {
            self.refresh.interval_secs = parse_env("CFM_REFRESH_INTERVAL_SECS", &raw)?;
        }

        // notifications
        if let Some(raw) = lookup("CFM_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = parse_env("CFM_NOTIFICATIONS_ENABLED", &raw)?;
        }

        // paths
        if let Some(raw) = lookup("CFM_SNAPSHOT_DIR") {
            self.paths.snapshot_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("CFM_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Expand a leading `~/` in every configured path.
    fn normalize_paths(&mut self) {
        let home = home_dir();
        for path in [
            &mut self.paths.snapshot_dir,
            &mut self.paths.activity_log,
            &mut self.notifications.file.path,
        ] {
            if let Ok(rest) = path.strip_prefix("~") {
                *path = home.join(rest);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("canvas.width", self.canvas.width),
            ("canvas.height", self.canvas.height),
            ("canvas.ring_radius", self.canvas.ring_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FlowError::InvalidConfig {
                    details: format!("{name} must be a positive number, got {value}"),
                });
            }
        }

        let half_extent = self.canvas.width.min(self.canvas.height) / 2.0;
        if self.canvas.ring_radius > half_extent {
            return Err(FlowError::InvalidConfig {
                details: format!(
                    "canvas.ring_radius ({}) must fit inside the canvas (max {half_extent})",
                    self.canvas.ring_radius
                ),
            });
        }

        if !(self.layout.min_edge_width > 0.0
            && self.layout.min_edge_width <= self.layout.max_edge_width)
        {
            return Err(FlowError::InvalidConfig {
                details: format!(
                    "layout edge widths must satisfy 0 < min_edge_width <= max_edge_width, got {} and {}",
                    self.layout.min_edge_width, self.layout.max_edge_width
                ),
            });
        }

        if self.refresh.auto_refresh && self.refresh.interval_secs == 0 {
            return Err(FlowError::InvalidConfig {
                details: "refresh.interval_secs must be > 0 when auto_refresh is enabled"
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| FlowError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
