//! Relay notifications.

use shared_types::CorrelationId;

/// Capacity of the relay event channel.
pub const RELAY_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A request was written to a backend pool under `internal_id`.
    Forwarded {
        internal_id: CorrelationId,
        service: String,
        name: String,
    },
    /// The backend answered and the response went back to the caller.
    Returned {
        internal_id: CorrelationId,
        service: String,
    },
    /// No backend answer within the timeout; the entry was dropped.
    Evicted {
        internal_id: CorrelationId,
        service: String,
    },
}
