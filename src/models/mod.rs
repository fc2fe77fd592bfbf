//! Models Module
//!
//! Data transfer objects for the control channel and the stats/health
//! endpoints.

mod messages;
mod responses;

// Re-export public types
pub use messages::{ControlMessage, VersionReply};
pub use responses::{HealthResponse, StatsResponse};
