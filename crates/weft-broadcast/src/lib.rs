//! # Weft Broadcast
//!
//! Topic fan-out with no correlation and no delivery guarantee.
//!
//! ```text
//! Publisher ──[topic, payload]──┬──▶ Subscriber (filter: "update")
//!                               ├──▶ Subscriber (filter: "update", "stats")
//!                               └──▶ Subscriber (no filter: receives nothing)
//! ```
//!
//! A publish to a saturated subscriber is dropped and reported as `false`.
//! Envelopes that are not exactly `[topic, payload]` are foreign traffic and
//! are discarded.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod publisher;
pub mod subscriber;

pub use error::BroadcastError;
pub use publisher::Publisher;
pub use subscriber::{Listener, Subscriber};
