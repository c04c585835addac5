//! Ports: the async capability seam.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::RemoteError;

/// An asynchronous capability served by a handler.
///
/// Implementations return the result or an application error; the handler
/// takes care of sanitizing and replying.
#[async_trait]
pub trait Capability: Send + Sync + 'static {
    async fn call(&self, payload: Value) -> Result<Value, RemoteError>;
}
