//! # Relay Core
//!
//! ```text
//!  caller                     relay                       backend pool
//!    │  [id, name, id0, p]      │                              │
//!    │ ───────────────────────▶ │ admit id1, origin=(id, id0)  │
//!    │                          │  [name', id1, p]             │
//!    │                          │ ───────────────────────────▶ │
//!    │                          │  [id1, err, result]          │
//!    │  [id, id0, err, result]  │ ◀─────────────────────────── │
//!    │ ◀─────────────────────── │ remove id1                   │
//! ```
//!
//! Every forwarded request gets a fresh id from the relay's own table; the
//! caller's identity and id are kept as the entry's origin. Response frames
//! are passed back unchanged apart from the routing prefix.

use crate::config::RoutePolicy;
use crate::error::RouterError;
use crate::events::{RelayEvent, RELAY_EVENT_CAPACITY};
use bytes::Bytes;
use parking_lot::Mutex;
use shared_bus::{Context, Socket, SocketKind};
use shared_types::{
    Address, CorrelationId, Framing, Multipart, NodeConfig, RemoteError, RequestEnvelope,
    ResponseEnvelope,
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use weft_request::{CorrelationTable, Origin, PendingRequest};

struct Pool {
    socket: Socket,
    pump: JoinHandle<()>,
}

struct RelayInner {
    ctx: Context,
    front: Socket,
    pools: Mutex<HashMap<String, Pool>>,
    table: CorrelationTable,
    policy: RoutePolicy,
    config: NodeConfig,
    events: broadcast::Sender<RelayEvent>,
    front_pump: Mutex<Option<JoinHandle<()>>>,
}

impl RelayInner {
    /// Backend socket for `service`, created on first use.
    fn pool(self: &Arc<Self>, service: &str) -> Socket {
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get(service) {
            return pool.socket.clone();
        }
        let socket = self.ctx.socket(SocketKind::Dealer);
        socket.set_linger(self.config.linger());
        let weak = Arc::downgrade(self);
        let name = service.to_owned();
        let pump = tokio::spawn(shared_bus::pump(
            socket.clone(),
            self.config.batch_size,
            move |msg| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_response(&name, msg);
                }
            },
        ));
        debug!(%service, "backend pool created");
        pools.insert(
            service.to_owned(),
            Pool {
                socket: socket.clone(),
                pump,
            },
        );
        socket
    }

    fn reply_error(&self, identity: Bytes, id: CorrelationId, error: RemoteError) {
        let encoded = ResponseEnvelope::encode(
            Some(identity),
            id,
            &Err(error),
            self.config.encoding,
            false,
        );
        match encoded {
            Ok(envelope) => {
                if let Err(e) = self.front.try_send(envelope.into_frames()) {
                    warn!(error = %e, "error reply to caller refused");
                }
            }
            Err(e) => warn!(error = %e, "error reply not encodable"),
        }
    }

    fn on_request(self: &Arc<Self>, msg: Multipart) {
        let request = match RequestEnvelope::from_frames(msg, Framing::Routed) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "discarding malformed request");
                return;
            }
        };
        let identity = request.identity.unwrap_or_default();
        let (service, name) = self.policy.resolve(&request.name);

        let origin = Origin {
            identity: identity.clone(),
            request_id: request.id.clone(),
            service: service.clone(),
        };
        let internal_id = match self
            .table
            .admit(|id| PendingRequest::relayed(id, name.clone(), origin))
        {
            Ok(id) => id,
            Err(refused) => {
                debug!(correlation_id = %request.id, ?refused, "relay admission refused");
                self.reply_error(identity, request.id, RemoteError::too_many_requests());
                return;
            }
        };

        if let Some(timeout) = self.config.timeout() {
            let weak = Arc::downgrade(self);
            let evict_id = internal_id.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(inner) = weak.upgrade() {
                    inner.on_evict(&evict_id);
                }
            });
            if !self.table.attach_timer(&internal_id, timer.abort_handle()) {
                timer.abort();
            }
        }

        let backend = self.pool(&service);
        let forward = RequestEnvelope {
            identity: None,
            name: name.clone(),
            id: internal_id.clone(),
            payload: request.payload,
        };
        if let Err(e) = backend.try_send(forward.into_frames()) {
            if let Some(mut pending) = self.table.remove(&internal_id) {
                pending.cancel_timer();
            }
            warn!(%service, event = %name, error = %e, "backend write refused");
            self.reply_error(identity, request.id, RemoteError::write_refused());
            return;
        }

        debug!(%service, event = %name, correlation_id = %internal_id, "request forwarded");
        let _ = self.events.send(RelayEvent::Forwarded {
            internal_id,
            service,
            name,
        });
    }

    fn on_response(&self, service: &str, msg: Multipart) {
        let response = match ResponseEnvelope::from_frames(msg, Framing::Plain) {
            Ok(response) => response,
            Err(e) => {
                debug!(%service, error = %e, "discarding malformed response");
                return;
            }
        };
        let Some(mut pending) = self.table.remove(&response.id) else {
            // Possible when prosumers are wired front-to-front.
            self.table.record_stray();
            debug!(%service, correlation_id = %response.id, "discarding response for unknown id");
            return;
        };
        pending.cancel_timer();
        self.table.record_completed();
        let Some(origin) = pending.origin.take() else {
            return;
        };

        let back = ResponseEnvelope {
            identity: Some(origin.identity),
            id: origin.request_id,
            error: response.error,
            result: response.result,
        };
        if let Err(e) = self.front.try_send(back.into_frames()) {
            warn!(%service, correlation_id = %response.id, error = %e, "response to caller refused");
        }
        debug!(%service, correlation_id = %response.id, "response returned");
        let _ = self.events.send(RelayEvent::Returned {
            internal_id: response.id,
            service: origin.service,
        });
    }

    fn on_evict(&self, id: &CorrelationId) {
        let Some(mut pending) = self.table.remove(id) else {
            return;
        };
        self.table.record_timeout();
        let service = pending
            .origin
            .take()
            .map(|origin| origin.service)
            .unwrap_or_default();
        debug!(%service, correlation_id = %id, "relay entry evicted");
        let _ = self.events.send(RelayEvent::Evicted {
            internal_id: id.clone(),
            service,
        });
    }

    fn shutdown(&self) {
        self.front.close();
        if let Some(pump) = self.front_pump.lock().take() {
            pump.abort();
        }
        for (_, pool) in self.pools.lock().drain() {
            pool.socket.close();
            pool.pump.abort();
        }
        self.table.drain();
    }
}

impl Drop for RelayInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Shared engine behind [`Router`](crate::Router) and
/// [`Bridge`](crate::Bridge).
#[derive(Clone)]
pub(crate) struct Relay {
    inner: Arc<RelayInner>,
}

impl Relay {
    pub(crate) fn new(ctx: &Context, config: NodeConfig, policy: RoutePolicy) -> Self {
        let front = ctx.socket(SocketKind::Router);
        front.set_linger(config.linger());
        let (events, _) = broadcast::channel(RELAY_EVENT_CAPACITY);
        let inner = Arc::new(RelayInner {
            ctx: ctx.clone(),
            front: front.clone(),
            pools: Mutex::new(HashMap::new()),
            table: CorrelationTable::from_config(&config),
            policy,
            config,
            events,
            front_pump: Mutex::new(None),
        });

        let weak: Weak<RelayInner> = Arc::downgrade(&inner);
        let pump = tokio::spawn(shared_bus::pump(
            front,
            inner.config.batch_size,
            move |msg| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_request(msg);
                }
            },
        ));
        *inner.front_pump.lock() = Some(pump);
        Self { inner }
    }

    pub(crate) fn listen_front(&self, address: Address) -> Result<(), RouterError> {
        let url = address.to_url()?;
        self.inner.front.bind(&url)?;
        info!(endpoint = %url, "listening for consumers");
        Ok(())
    }

    pub(crate) fn connect_front(&self, address: Address) -> Result<(), RouterError> {
        let url = address.to_url()?;
        self.inner.front.connect(&url)?;
        info!(endpoint = %url, "connected to consumer");
        Ok(())
    }

    pub(crate) fn listen_back(&self, service: &str, address: Address) -> Result<(), RouterError> {
        let url = address.to_url()?;
        self.inner.pool(service).bind(&url)?;
        info!(%service, endpoint = %url, "listening for services");
        Ok(())
    }

    pub(crate) fn connect_back(&self, service: &str, address: Address) -> Result<(), RouterError> {
        let url = address.to_url()?;
        self.inner.pool(service).connect(&url)?;
        info!(%service, endpoint = %url, "connected to service");
        Ok(())
    }

    pub(crate) fn front_endpoint(&self) -> Option<String> {
        self.inner.front.last_endpoint()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.inner.table.count()
    }

    pub(crate) fn services(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.pools.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn events(&self) -> broadcast::Receiver<RelayEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn close(&self) {
        self.inner.shutdown();
        info!("relay closed");
    }
}
