//! Payloads of the built-in `get`, `set` and `update` events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Capability name for reads.
pub const GET: &str = "get";
/// Capability name for writes.
pub const SET: &str = "set";
/// Broadcast topic announcing a write.
pub const UPDATE: &str = "update";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

/// Broadcast after every accepted `set`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}
