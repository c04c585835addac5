//! Error types for broadcast nodes.

use shared_bus::TransportError;
use shared_types::{AddressError, CodecError, ConfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("address: {0}")]
    Address(#[from] AddressError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}
