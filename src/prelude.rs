//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use care_flow_monitor::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{FetchError, FetchStage, FlowError, ProviderError, Result};

// Domain
pub use crate::domain::{
    Conflict, EntityType, FlowEntity, FlowRelation, ResolutionRequest, Severity, TimeRange,
    UpdateEvent, UpdateType,
};

// Flow diagram
pub use crate::flow::geometry::Point;
pub use crate::flow::hit_test::hit_test;
pub use crate::flow::layout::{FlowFrame, Geometry};
pub use crate::flow::render::{DrawCommand, RenderOptions, render};
pub use crate::flow::style::StyleRegistry;
pub use crate::flow::surface::{Surface, SvgSurface, replay};

// Engine
pub use crate::engine::panels::{conflicts_panel, detail_panel, history_panel};
pub use crate::engine::{
    FlowMonitor, FlowMonitorModel, FlowMsg, ManualTimerDriver, ModelSettings, MonitorParts,
    ThreadTimerDriver, View, ViewFilter,
};

// Providers
pub use crate::providers::{Providers, ScriptedProvider, Snapshot, SnapshotProvider};

// Notifications & logging
pub use crate::logger::jsonl::ActivityLog;
pub use crate::notify::{Notice, NoticeKind, NotificationManager, NotificationSink, RecordingSink};
