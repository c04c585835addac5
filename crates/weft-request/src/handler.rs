//! # Request Handler
//!
//! Serves registered capabilities on an identity-routed socket.
//!
//! ```text
//! [identity, name, id, payload]
//!        │
//!        ▼
//!   registry.get(name) ── none ──▶ [identity, id, "No such event", null]
//!        │
//!        ▼
//!   capability(payload, Responder) ── respond() ──▶ [identity, id, err, result]
//! ```
//!
//! A [`Responder`] is consumed by `respond`, so a capability answers at most
//! once. A refused reply write is published as a [`NodeEvent`].

use crate::domain::{CapabilityFn, CapabilityRegistry};
use crate::error::RequestError;
use crate::events::{NodeEvent, EVENT_CHANNEL_CAPACITY};
use crate::ports::Capability;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use shared_bus::{Context, Socket, SocketKind};
use shared_types::{
    Address, CorrelationId, Encoding, Framing, NodeConfig, RemoteError, RequestEnvelope,
    ResponseEnvelope,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

enum Route {
    Remote {
        socket: Socket,
        identity: Bytes,
        encoding: Encoding,
        expose_stack: bool,
        events: broadcast::Sender<NodeEvent>,
    },
    Local(oneshot::Sender<Result<Value, RemoteError>>),
}

/// Completion handle passed to a capability.
pub struct Responder {
    name: String,
    id: CorrelationId,
    route: Option<Route>,
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("answered", &self.route.is_none())
            .finish()
    }
}

impl Responder {
    pub(crate) fn local(
        name: impl Into<String>,
        tx: oneshot::Sender<Result<Value, RemoteError>>,
    ) -> Self {
        Self {
            name: name.into(),
            id: CorrelationId::from("local"),
            route: Some(Route::Local(tx)),
        }
    }

    /// Event name being answered.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    pub fn respond(mut self, outcome: Result<Value, RemoteError>) {
        let Some(route) = self.route.take() else {
            return;
        };
        match route {
            Route::Local(tx) => {
                let _ = tx.send(outcome);
            }
            Route::Remote {
                socket,
                identity,
                encoding,
                expose_stack,
                events,
            } => {
                let envelope = match ResponseEnvelope::encode(
                    Some(identity),
                    self.id.clone(),
                    &outcome,
                    encoding,
                    expose_stack,
                ) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!(event = %self.name, correlation_id = %self.id, error = %e, "response not encodable");
                        let _ = events.send(NodeEvent::ResponseUnencodable {
                            name: self.name.clone(),
                            id: self.id.clone(),
                            reason: e.to_string(),
                        });
                        return;
                    }
                };
                match socket.try_send(envelope.into_frames()) {
                    Ok(()) => debug!(event = %self.name, correlation_id = %self.id, "response sent"),
                    Err(e) => {
                        warn!(event = %self.name, correlation_id = %self.id, error = %e, "response write refused");
                        let _ = events.send(NodeEvent::ResponseRefused {
                            name: self.name.clone(),
                            id: self.id.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    pub fn ok(self, value: Value) {
        self.respond(Ok(value));
    }

    pub fn err(self, error: RemoteError) {
        self.respond(Err(error));
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if self.route.is_some() {
            warn!(event = %self.name, correlation_id = %self.id, "responder dropped without a response");
        }
    }
}

struct HandlerInner {
    socket: Socket,
    registry: CapabilityRegistry,
    config: NodeConfig,
    events: broadcast::Sender<NodeEvent>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl HandlerInner {
    fn responder(&self, request: &RequestEnvelope, identity: Bytes) -> Responder {
        Responder {
            name: request.name.clone(),
            id: request.id.clone(),
            route: Some(Route::Remote {
                socket: self.socket.clone(),
                identity,
                encoding: self.config.encoding,
                expose_stack: self.config.expose_stack,
                events: self.events.clone(),
            }),
        }
    }

    fn on_request(&self, msg: Vec<Bytes>) {
        let request = match RequestEnvelope::from_frames(msg, Framing::Routed) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "discarding malformed request");
                return;
            }
        };
        let identity = request.identity.clone().unwrap_or_default();

        let Some(capability) = self.registry.get(&request.name) else {
            debug!(event = %request.name, correlation_id = %request.id, "no such event");
            self.responder(&request, identity)
                .err(RemoteError::no_such_event());
            return;
        };

        let payload: Value = match self.config.encoding.decode(&request.payload) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(event = %request.name, error = %e, "discarding undecodable request");
                return;
            }
        };
        debug!(event = %request.name, correlation_id = %request.id, "dispatching request");
        capability(payload, self.responder(&request, identity));
    }
}

impl Drop for HandlerInner {
    fn drop(&mut self) {
        self.socket.close();
    }
}

/// Serves capabilities to emitters, routers, and bridges.
#[derive(Clone)]
pub struct RequestHandler {
    inner: Arc<HandlerInner>,
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("capabilities", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl RequestHandler {
    /// Create the handler and start its receive loop. Must be called inside
    /// a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Config`] for an invalid configuration.
    pub fn new(ctx: &Context, config: NodeConfig) -> Result<Self, RequestError> {
        config.validate()?;
        let socket = ctx.socket(SocketKind::Router);
        socket.set_linger(config.linger());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(HandlerInner {
            socket: socket.clone(),
            registry: CapabilityRegistry::new(),
            config,
            events,
            pump: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let batch = inner.config.batch_size;
        let pump = tokio::spawn(shared_bus::pump(socket, batch, move |msg| {
            if let Some(inner) = weak.upgrade() {
                inner.on_request(msg);
            }
        }));
        *inner.pump.lock() = Some(pump);
        Ok(Self { inner })
    }

    /// Register a capability. A second registration under the same name
    /// replaces the first.
    pub fn on<F>(&self, name: impl Into<String>, capability: F)
    where
        F: Fn(Value, Responder) + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .inner
            .registry
            .register(name.clone(), Arc::new(capability))
            .is_some()
        {
            debug!(event = %name, "capability replaced");
        }
    }

    /// Register an async capability; its result is sent when the future
    /// completes.
    pub fn on_async<F, Fut>(&self, name: impl Into<String>, capability: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + Send + 'static,
    {
        self.on(name, move |payload, responder: Responder| {
            let fut = capability(payload);
            tokio::spawn(async move { responder.respond(fut.await) });
        });
    }

    /// Register a [`Capability`] implementation.
    pub fn serve(&self, name: impl Into<String>, capability: Arc<dyn Capability>) {
        self.on_async(name, move |payload| {
            let capability = capability.clone();
            async move { capability.call(payload).await }
        });
    }

    /// Unregister `name`. Returns whether it was registered.
    pub fn off(&self, name: &str) -> bool {
        self.inner.registry.remove(name).is_some()
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    pub(crate) fn capability(&self, name: &str) -> Option<CapabilityFn> {
        self.inner.registry.get(name)
    }

    /// Node-level failures (refused reply writes).
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<NodeEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// # Errors
    ///
    /// Returns [`RequestError`] for an unresolvable address or a bind failure.
    pub fn listen(&self, address: impl Into<Address>) -> Result<(), RequestError> {
        let url = address.into().to_url()?;
        self.inner.socket.bind(&url)?;
        info!(endpoint = %url, "handler listening");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`RequestError`] for an unresolvable address or a closed node.
    pub fn connect(&self, address: impl Into<Address>) -> Result<(), RequestError> {
        let url = address.into().to_url()?;
        self.inner.socket.connect(&url)?;
        info!(endpoint = %url, "handler connected");
        Ok(())
    }

    #[must_use]
    pub fn last_endpoint(&self) -> Option<String> {
        self.inner.socket.last_endpoint()
    }

    /// Release the socket. Closing is terminal.
    pub fn close(&self) {
        self.inner.socket.close();
        if let Some(pump) = self.inner.pump.lock().take() {
            pump.abort();
        }
    }
}
