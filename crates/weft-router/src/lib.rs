//! # Weft Router
//!
//! Relays correlated requests between callers and backend pools.
//!
//! - [`Router`] picks the pool from the event name: `svc::ping` goes to pool
//!   `svc` as `ping`; names without the delimiter go to the fallback pool.
//! - [`Bridge`] forwards everything to a single pool, names untouched.
//!
//! Both allocate their own correlation id per forwarded request and keep the
//! caller's `(identity, id)` so the response can be routed back. Admission
//! failures and refused backend writes are answered to the caller with a
//! sanitized `ETOOMANY` or `EWRITE` error. Responses for ids the relay does
//! not know are dropped.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
mod relay;
pub mod router;

pub use bridge::Bridge;
pub use config::{RoutePolicy, RouterConfig, DEFAULT_DELIMITER, DEFAULT_FALLBACK_SERVICE};
pub use error::RouterError;
pub use events::{RelayEvent, RELAY_EVENT_CAPACITY};
pub use router::Router;
