//! Error types for the synchronization layer.

use shared_types::ConfigError;
use thiserror::Error;
use weft_broadcast::BroadcastError;
use weft_request::RequestError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}
