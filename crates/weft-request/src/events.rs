//! Node-level events.
//!
//! A handler has no caller to fail when its reply cannot be written, so the
//! failure is published here instead.

use shared_types::CorrelationId;

/// Capacity of the node event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// The transport refused a response write.
    ResponseRefused {
        name: String,
        id: CorrelationId,
        reason: String,
    },
    /// A response could not be encoded and was not sent.
    ResponseUnencodable {
        name: String,
        id: CorrelationId,
        reason: String,
    },
}

impl std::fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResponseRefused { name, id, reason } => {
                write!(f, "response to `{name}` ({id}) refused: {reason}")
            }
            Self::ResponseUnencodable { name, id, reason } => {
                write!(f, "response to `{name}` ({id}) not encodable: {reason}")
            }
        }
    }
}
