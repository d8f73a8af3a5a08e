//! Wire-level records exchanged with the providers: entities, relations,
//! conflicts, update events, and the query time range.

pub mod conflict;
pub mod entity;
pub mod history;
pub mod time_range;

pub use conflict::{Conflict, ResolutionAck, ResolutionOption, ResolutionRequest, Severity};
pub use entity::{EntityType, FlowEntity, FlowRelation, Position};
pub use history::{FieldChange, SYSTEM_USER, UpdateEvent, UpdateType};
pub use time_range::TimeRange;
