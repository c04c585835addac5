//! # Shared Types Crate
//!
//! The vocabulary every weft node speaks on the wire.
//!
//! ## Contents
//!
//! - [`CorrelationId`]: the random decimal token pairing a request with its
//!   response inside one node's pending table.
//! - [`Address`]: endpoint construction from a port, a filesystem path, a
//!   fully-qualified URL, or a structured `{port, path, host}` record.
//! - [`Encoding`]: the payload codec (JSON or MessagePack named maps).
//! - [`RequestEnvelope`], [`ResponseEnvelope`], [`BroadcastEnvelope`]: the
//!   exact frame layouts exchanged over the transport.
//! - [`RemoteError`] / [`SanitizedError`] / [`Fault`]: error sanitization for
//!   the wire and approximate reconstruction on the far side.
//! - [`NodeConfig`]: the per-node options shared by every role.
//!
//! ## Frame Layouts
//!
//! ```text
//! request   [identity?, eventName, correlationId, payload]
//! response  [identity?, correlationId, serializedError, serializedResult]
//! broadcast [topicName, serializedPayload]
//! ```
//!
//! The identity frame is present only on the identity-routed (router) side.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod address;
pub mod codec;
pub mod config;
pub mod correlation;
pub mod envelope;
pub mod errors;
pub mod fault;

pub use address::{Address, AddressParts, DEFAULT_HOST};
pub use codec::Encoding;
pub use config::{Linger, NodeConfig};
pub use correlation::CorrelationId;
pub use envelope::{BroadcastEnvelope, Framing, RequestEnvelope, ResponseEnvelope};
pub use errors::{AddressError, CodecError, ConfigError, WireError};
pub use fault::{codes, Fault, RemoteError, SanitizedError};

/// Multi-frame message as moved by the transport.
pub type Multipart = Vec<bytes::Bytes>;

/// Application payloads are schemaless structured values.
pub type Value = serde_json::Value;
