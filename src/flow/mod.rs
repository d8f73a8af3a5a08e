//! Flow diagram core: style registry, circular layout, draw-command rendering,
//! hit-testing, and drawing-surface adapters.

pub mod geometry;
pub mod layout;
pub mod render;
pub mod style;
pub mod surface;
