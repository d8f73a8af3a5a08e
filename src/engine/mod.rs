//! Refresh scheduling, fetch orchestration, triage and the Elm-style update
//! loop that ties them to the flow diagram.

pub mod fetch;
pub mod model;
pub mod panels;
pub mod runtime;
pub mod scheduler;
pub mod timeline;
pub mod timer;
pub mod triage;
pub mod update;

pub use fetch::{FetchBundle, FetchOrchestrator};
pub use model::{FlowCmd, FlowMonitorModel, FlowMsg, ModelSettings, View, ViewFilter};
pub use runtime::{FlowMonitor, MonitorParts};
pub use scheduler::{RefreshScheduler, SchedulerState};
pub use timer::{ManualTimerDriver, ThreadTimerDriver, TimerDriver, TimerHandle};
