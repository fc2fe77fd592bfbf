//! Control channel DTOs
//!
//! Message shapes accepted on the control endpoint. Unknown `type` values
//! fail deserialization and are rejected before reaching a handler.

use serde::{Deserialize, Serialize};

/// A control message posted to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Force a pending update to activate immediately; no reply
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    /// Query the current version; replied with `VersionReply`
    #[serde(rename = "GET_VERSION")]
    GetVersion,
}

/// Reply to `GET_VERSION`: the current static bucket name.
#[derive(Debug, Clone, Serialize)]
pub struct VersionReply {
    /// Reported version string
    pub version: String,
}
