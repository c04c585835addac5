//! Error types for the router and bridge.

use shared_bus::TransportError;
use shared_types::{AddressError, ConfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("address: {0}")]
    Address(#[from] AddressError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid router config: {0}")]
    InvalidConfig(String),
}
