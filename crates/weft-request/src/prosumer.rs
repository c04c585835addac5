//! # Prosumer
//!
//! A node that both serves capabilities and emits requests, so two peers can
//! call each other symmetrically.
//!
//! `emit` tries local dispatch first: a capability registered on this node is
//! invoked in-process with no network traffic. Otherwise the request goes out
//! through the emitter side exactly like [`RequestEmitter::request`].
//!
//! In a diamond topology a prosumer can receive responses meant for a peer;
//! the emitter side discards ids it does not have pending.

use crate::emitter::RequestEmitter;
use crate::error::RequestError;
use crate::handler::{RequestHandler, Responder};
use serde_json::Value;
use shared_bus::Context;
use shared_types::{Address, Fault, NodeConfig, RemoteError};
use std::future::Future;
use tokio::sync::oneshot;
use tracing::debug;

/// Meta-event reserved for listener bookkeeping. Never sent to the network.
pub const NEW_LISTENER: &str = "newListener";

#[derive(Clone, Debug)]
pub struct Prosumer {
    emitter: RequestEmitter,
    handler: RequestHandler,
}

impl Prosumer {
    /// # Errors
    ///
    /// Returns [`RequestError::Config`] for an invalid configuration.
    pub fn new(ctx: &Context, config: NodeConfig) -> Result<Self, RequestError> {
        Ok(Self {
            emitter: RequestEmitter::new(ctx, config.clone())?,
            handler: RequestHandler::new(ctx, config)?,
        })
    }

    pub fn on<F>(&self, name: impl Into<String>, capability: F)
    where
        F: Fn(Value, Responder) + Send + Sync + 'static,
    {
        self.handler.on(name, capability);
    }

    pub fn on_async<F, Fut>(&self, name: impl Into<String>, capability: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + Send + 'static,
    {
        self.handler.on_async(name, capability);
    }

    pub fn off(&self, name: &str) -> bool {
        self.handler.off(name)
    }

    /// Call `name`, locally if this node serves it.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::NoSuchEvent`] for the reserved
    /// [`NEW_LISTENER`] name, [`RequestError::Abandoned`] when a local
    /// capability drops its responder, and any emitter error otherwise.
    pub async fn emit(&self, name: &str, payload: &Value) -> Result<Value, RequestError> {
        if name == NEW_LISTENER {
            return Err(RequestError::NoSuchEvent {
                name: name.to_owned(),
            });
        }
        let Some(capability) = self.handler.capability(name) else {
            return self.emitter.request(name, payload).await;
        };

        debug!(event = %name, "dispatching locally");
        let (tx, rx) = oneshot::channel();
        capability(payload.clone(), Responder::local(name, tx));
        match rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(RequestError::Remote(Fault::Error(err))),
            Err(_) => Err(RequestError::Abandoned {
                name: name.to_owned(),
            }),
        }
    }

    #[must_use]
    pub fn emitter(&self) -> &RequestEmitter {
        &self.emitter
    }

    #[must_use]
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// Accept callers on the handler side.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] for an unresolvable address or a bind failure.
    pub fn listen_for_consumers(&self, address: impl Into<Address>) -> Result<(), RequestError> {
        self.handler.listen(address)
    }

    /// # Errors
    ///
    /// Returns [`RequestError`] for an unresolvable address or a closed node.
    pub fn connect_to_consumer(&self, address: impl Into<Address>) -> Result<(), RequestError> {
        self.handler.connect(address)
    }

    /// Accept services on the emitter side.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] for an unresolvable address or a bind failure.
    pub fn listen_for_services(&self, address: impl Into<Address>) -> Result<(), RequestError> {
        self.emitter.listen(address)
    }

    /// # Errors
    ///
    /// Returns [`RequestError`] for an unresolvable address or a closed node.
    pub fn connect_to_service(&self, address: impl Into<Address>) -> Result<(), RequestError> {
        self.emitter.connect(address)
    }

    pub fn close(&self) {
        self.emitter.close();
        self.handler.close();
    }
}
