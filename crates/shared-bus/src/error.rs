//! Transport errors.

use thiserror::Error;

/// Errors raised by socket operations.
///
/// Every `try_send` failure means the message was not accepted; callers treat
/// them uniformly as a refused write.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The destination queue is at its high-water mark.
    #[error("transport saturated")]
    Saturated,

    /// No connected peer could take the message.
    #[error("no peer available")]
    NoPeers,

    /// Router send addressed an identity that is not connected.
    #[error("unroutable identity")]
    Unroutable,

    #[error("socket closed")]
    Closed,

    #[error("address already in use: {0}")]
    AddressInUse(String),

    #[error("operation not supported by {0} socket")]
    Unsupported(&'static str),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
