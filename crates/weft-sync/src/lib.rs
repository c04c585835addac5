//! # Weft Synchronization
//!
//! Eventually consistent key/value state shared across nodes.
//!
//! ```text
//!                 get {key} / set {key, value}
//! ┌─────────────┐ ─────────────────────────────▶ ┌─────────────┐
//! │ SyncEmitter │                                │ SyncHandler │
//! │ LocalCache  │ ◀───── update {key, value} ─── │  SyncState  │
//! └─────────────┘        (broadcast)             └─────────────┘
//! ```
//!
//! - The handler owns the authoritative [`SyncState`]. `get` on an unset key
//!   answers `null`, never an error.
//! - Every accepted `set` is broadcast as `update`. Emitters with
//!   `auto_update` fill their [`LocalCache`] from it, after which `get` is
//!   served locally.
//! - The cache is never invalidated: staleness is bounded only by broadcast
//!   delivery.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod emitter;
pub mod error;
pub mod handler;
pub mod messages;
pub mod store;

pub use emitter::SyncEmitter;
pub use error::SyncError;
pub use handler::SyncHandler;
pub use messages::{GetRequest, SetRequest, Update, GET, SET, UPDATE};
pub use store::{LocalCache, SyncState};
