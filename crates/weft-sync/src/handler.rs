//! Authoritative side of the synchronization layer.
//!
//! Holds a request handler serving `get` and `set`, and a publisher that
//! announces every accepted `set` as `update {key, value}`.

use crate::error::SyncError;
use crate::messages::{GetRequest, SetRequest, Update, GET, SET, UPDATE};
use crate::store::SyncState;
use serde_json::Value;
use shared_bus::Context;
use shared_types::{Address, NodeConfig, RemoteError};
use std::sync::Arc;
use tracing::{debug, info};
use weft_broadcast::Publisher;
use weft_request::{RequestHandler, Responder};

fn bad_request(err: &serde_json::Error) -> RemoteError {
    RemoteError::named("TypeError", err.to_string())
}

#[derive(Clone, Debug)]
pub struct SyncHandler {
    handler: RequestHandler,
    publisher: Publisher,
    state: Arc<SyncState>,
}

impl SyncHandler {
    /// # Errors
    ///
    /// Returns [`SyncError`] for an invalid configuration.
    pub fn new(ctx: &Context, config: NodeConfig) -> Result<Self, SyncError> {
        let handler = RequestHandler::new(ctx, config.clone())?;
        let publisher = Publisher::new(ctx, config)?;
        let state = Arc::new(SyncState::new());

        let store = state.clone();
        handler.on(GET, move |payload: Value, responder: Responder| {
            match serde_json::from_value::<GetRequest>(payload) {
                Ok(GetRequest { key }) => {
                    debug!(%key, "sync get");
                    responder.ok(store.get(&key).unwrap_or(Value::Null));
                }
                Err(e) => responder.err(bad_request(&e)),
            }
        });

        let store = state.clone();
        let announcer = publisher.clone();
        handler.on(SET, move |payload: Value, responder: Responder| {
            let SetRequest { key, value } = match serde_json::from_value(payload) {
                Ok(request) => request,
                Err(e) => return responder.err(bad_request(&e)),
            };
            debug!(%key, "sync set");
            store.set(key.clone(), value.clone());
            let update = Update {
                key,
                value: value.clone(),
            };
            if !announcer.publish_as(UPDATE, &update) {
                debug!(key = %update.key, "update broadcast dropped");
            }
            responder.ok(value);
        });

        Ok(Self {
            handler,
            publisher,
            state,
        })
    }

    /// Current value of `key` on this node.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Value> {
        self.state.get(key)
    }

    #[must_use]
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// The request side, for registering further capabilities.
    #[must_use]
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    #[must_use]
    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// # Errors
    ///
    /// Returns [`SyncError`] for an unresolvable address or a bind failure.
    pub fn listen_for_requests(&self, address: impl Into<Address>) -> Result<(), SyncError> {
        Ok(self.handler.listen(address)?)
    }

    /// # Errors
    ///
    /// Returns [`SyncError`] for an unresolvable address or a closed node.
    pub fn connect_for_requests(&self, address: impl Into<Address>) -> Result<(), SyncError> {
        Ok(self.handler.connect(address)?)
    }

    /// # Errors
    ///
    /// Returns [`SyncError`] for an unresolvable address or a bind failure.
    pub fn listen_for_broadcasts(&self, address: impl Into<Address>) -> Result<(), SyncError> {
        Ok(self.publisher.listen(address)?)
    }

    /// # Errors
    ///
    /// Returns [`SyncError`] for an unresolvable address or a closed node.
    pub fn connect_for_broadcasts(&self, address: impl Into<Address>) -> Result<(), SyncError> {
        Ok(self.publisher.connect(address)?)
    }

    pub fn close(&self) {
        self.handler.close();
        self.publisher.close();
        info!(keys = self.state.len(), "sync handler closed");
    }
}
