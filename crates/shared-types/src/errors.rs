//! # Error Types
//!
//! Errors raised while encoding, framing, addressing, or configuring a node.

use thiserror::Error;

/// Payload encoding or decoding failed.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json codec: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

/// A multipart message did not have the shape of the expected envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Wrong number of frames for the envelope kind.
    #[error("expected {expected} frames, got {actual}")]
    FrameCount { expected: usize, actual: usize },

    /// A textual frame was not valid UTF-8.
    #[error("frame `{field}` is not valid utf-8")]
    NotUtf8 { field: &'static str },

    /// The correlation id frame was empty.
    #[error("empty correlation id")]
    EmptyId,
}

/// Address could not be turned into a transport URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("empty address")]
    Empty,

    /// A structured address carried neither a port nor a path.
    #[error("address has neither port nor path")]
    Incomplete,
}

/// Invalid node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid linger: {0}")]
    InvalidLinger(i64),

    #[error("unknown encoding `{0}` (expected json or msgpack)")]
    UnknownEncoding(String),

    #[error("correlation id space of {digits} digits cannot hold {max_pending} pending requests")]
    IdSpaceTooSmall { digits: usize, max_pending: usize },
}
