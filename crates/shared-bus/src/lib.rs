//! # Shared Bus - Multipart Message Sockets
//!
//! The transport every weft node sits on. A socket moves multi-frame
//! messages between peers and knows nothing about correlation, events, or
//! payload encoding.
//!
//! ## Roles
//!
//! ```text
//!  Dealer ──┐                       ┌── Dealer
//!  Dealer ──┼──▶ Router ◀── ... ──▶ Router
//!  Dealer ──┘   (identity-routed)
//!
//!  Pub ──▶ Sub (prefix filter on the first frame)
//!      └─▶ Sub
//! ```
//!
//! ## Endpoints
//!
//! - `inproc://name`: same [`Context`] only; connect may precede bind
//! - `tcp://host:port`: `*` binds every interface, port `0` picks one
//! - `ipc:///path`: unix domain sockets
//!
//! ## Backpressure
//!
//! Every queue is bounded by the context's high-water mark. Sends never
//! wait; a full queue is reported as [`TransportError::Saturated`].

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod context;
pub mod endpoint;
pub mod error;
mod pipe;
pub mod pump;
mod socket;
mod stream;

pub use context::Context;
pub use endpoint::Endpoint;
pub use error::TransportError;
pub use pump::pump;
pub use shared_types::{Linger, Multipart};
pub use socket::{PeerId, Socket, SocketKind};
pub use stream::{MAX_FRAMES, MAX_MESSAGE_BYTES};

/// Messages buffered per queue before sends are refused.
pub const DEFAULT_HIGH_WATER_MARK: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_high_water_mark() {
        assert_eq!(DEFAULT_HIGH_WATER_MARK, 1000);
        assert_eq!(Context::new().high_water_mark(), 1000);
    }
}
