//! # Weft Request/Response
//!
//! Correlated single-round-trip RPC between nodes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  [name, id, payload]   ┌──────────────────┐
//! │  RequestEmitter  │ ─────────────────────▶ │  RequestHandler  │
//! │  (round-robin)   │                        │ (identity-routed)│
//! │                  │ ◀───────────────────── │                  │
//! │ CorrelationTable │   [id, error, result]  │ CapabilityRegistry│
//! └──────────────────┘                        └──────────────────┘
//!          ▲                                           ▲
//!          └──────────────── Prosumer ─────────────────┘
//! ```
//!
//! - The emitter allocates a random correlation id per attempt, arms an
//!   optional timeout, and retries with a fresh id when it expires.
//! - The handler dispatches by event name and answers unknown names with a
//!   sanitized `ENOEVENT` error.
//! - Errors crossing the wire are sanitized to `{name, message, code,
//!   isError}`; stacks only travel when the node is configured to expose them.
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::json;
//! use shared_bus::Context;
//! use shared_types::NodeConfig;
//! use weft_request::{RequestEmitter, RequestHandler, Responder};
//!
//! # async fn run() -> Result<(), weft_request::RequestError> {
//! let ctx = Context::new();
//! let handler = RequestHandler::new(&ctx, NodeConfig::default())?;
//! handler.on("test", |_payload, responder: Responder| responder.ok(json!({"ok": true})));
//! handler.listen("inproc://service")?;
//!
//! let emitter = RequestEmitter::new(&ctx, NodeConfig::default())?;
//! emitter.connect("inproc://service")?;
//! let reply = emitter.request("test", &json!({"answer": 42})).await?;
//! assert_eq!(reply, json!({"ok": true}));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod emitter;
pub mod error;
pub mod events;
pub mod handler;
pub mod ports;
pub mod prosumer;

pub use domain::{
    Admission, CapabilityFn, CapabilityRegistry, Completion, CorrelationTable, Origin,
    PendingRequest, PendingStats,
};
pub use emitter::RequestEmitter;
pub use error::RequestError;
pub use events::{NodeEvent, EVENT_CHANNEL_CAPACITY};
pub use handler::{RequestHandler, Responder};
pub use ports::Capability;
pub use prosumer::{Prosumer, NEW_LISTENER};
