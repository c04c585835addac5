//! Runtime errors.

use thiserror::Error;
use weft_request::RequestError;
use weft_router::RouterError;
use weft_sync::SyncError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown role `{0}` (expected router, bridge, sync or echo)")]
    UnknownRole(String),

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}
