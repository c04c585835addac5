//! Caching side of the synchronization layer.
//!
//! `get` answers from the local cache when it can and asks the handler
//! otherwise. `set` always goes to the handler; its own write reaches the
//! cache only when the `update` broadcast comes back around.

use crate::error::SyncError;
use crate::messages::{GetRequest, SetRequest, Update, GET, SET, UPDATE};
use crate::store::LocalCache;
use serde_json::Value;
use shared_bus::Context;
use shared_types::{Address, NodeConfig};
use std::sync::Arc;
use tracing::{debug, info};
use weft_broadcast::Subscriber;
use weft_request::RequestEmitter;

#[derive(Clone, Debug)]
pub struct SyncEmitter {
    emitter: RequestEmitter,
    subscriber: Subscriber,
    cache: Arc<LocalCache>,
}

impl SyncEmitter {
    /// With `auto_update` set, the emitter subscribes to `update` and fills
    /// its cache from it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] for an invalid configuration.
    pub fn new(ctx: &Context, config: NodeConfig) -> Result<Self, SyncError> {
        let auto_update = config.auto_update;
        let emitter = RequestEmitter::new(ctx, config.clone())?;
        let subscriber = Subscriber::new(ctx, config)?;
        let cache = Arc::new(LocalCache::new());

        if auto_update {
            let sink = cache.clone();
            subscriber.on(UPDATE, move |payload| {
                match serde_json::from_value::<Update>(payload) {
                    Ok(Update { key, value }) => {
                        debug!(%key, "cache updated");
                        sink.insert(key, value);
                    }
                    Err(e) => debug!(error = %e, "ignoring malformed update"),
                }
            })?;
        }

        Ok(Self {
            emitter,
            subscriber,
            cache,
        })
    }

    /// Read `key`. `null` means the key is unset.
    ///
    /// A cache hit does no I/O but still yields once before resolving.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Request`] when the `get` request fails.
    pub async fn get(&self, key: &str) -> Result<Value, SyncError> {
        if let Some(value) = self.cache.get(key) {
            tokio::task::yield_now().await;
            return Ok(value);
        }
        let request = GetRequest {
            key: key.to_owned(),
        };
        Ok(self.emitter.request_as(GET, &request).await?)
    }

    /// Write `key` and return the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Request`] when the `set` request fails.
    pub async fn set(&self, key: &str, value: Value) -> Result<Value, SyncError> {
        let request = SetRequest {
            key: key.to_owned(),
            value,
        };
        Ok(self.emitter.request_as(SET, &request).await?)
    }

    /// Cached value without any I/O.
    #[must_use]
    pub fn cached(&self, key: &str) -> Option<Value> {
        self.cache.get(key)
    }

    #[must_use]
    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// The request side, for custom events against the same handler.
    #[must_use]
    pub fn emitter(&self) -> &RequestEmitter {
        &self.emitter
    }

    /// The broadcast side, for listening to further topics.
    #[must_use]
    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    /// # Errors
    ///
    /// Returns [`SyncError`] for an unresolvable address or a closed node.
    pub fn connect_for_requests(&self, address: impl Into<Address>) -> Result<(), SyncError> {
        Ok(self.emitter.connect(address)?)
    }

    /// # Errors
    ///
    /// Returns [`SyncError`] for an unresolvable address or a bind failure.
    pub fn listen_for_requests(&self, address: impl Into<Address>) -> Result<(), SyncError> {
        Ok(self.emitter.listen(address)?)
    }

    /// # Errors
    ///
    /// Returns [`SyncError`] for an unresolvable address or a closed node.
    pub fn connect_for_broadcasts(&self, address: impl Into<Address>) -> Result<(), SyncError> {
        Ok(self.subscriber.connect(address)?)
    }

    /// # Errors
    ///
    /// Returns [`SyncError`] for an unresolvable address or a bind failure.
    pub fn listen_for_broadcasts(&self, address: impl Into<Address>) -> Result<(), SyncError> {
        Ok(self.subscriber.listen(address)?)
    }

    pub fn close(&self) {
        self.emitter.close();
        self.subscriber.close();
        info!("sync emitter closed");
    }
}
