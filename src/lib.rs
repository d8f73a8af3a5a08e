#![forbid(unsafe_code)]

//! Care Flow Monitor (cfm): live entity-relationship flow and conflict
//! monitoring for a care-coordination platform.
//!
//! The engine answers three questions for an operator:
//! 1. **Which entities interact**: a circular diagram of clients, caregivers,
//!    schedules, notifications and agents with their relations
//! 2. **How much flows between them**: weighted edges, flow rates and an
//!    update-history timeline
//! 3. **Where conflicts need attention**: severity triage with one aggregate
//!    alert per fetch cycle and a resolve round-trip
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use care_flow_monitor::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use care_flow_monitor::core::config::Config;
//! use care_flow_monitor::flow::layout::{FlowFrame, Geometry};
//! ```

pub mod prelude;

pub mod core;
pub mod domain;
pub mod engine;
pub mod flow;
pub mod logger;
pub mod notify;
pub mod providers;
