//! Data models for the events server

pub mod category;
pub mod datetime;
pub mod event;
pub mod location;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use category::Category;
pub use event::{Event, EventFull, EventShort, EventState, EventStateAction};
pub use location::{Location, LocationDescriptor};
pub use stats::{EndpointHit, RequestContext, StatsQuery, ViewStats};
pub use user::UserShort;
