//! # Request Emitter
//!
//! Sends correlated requests on a round-robin socket and resolves them from
//! responses, timeouts, or send-time refusals.
//!
//! ## Lifecycle of one request
//!
//! ```text
//! admit ──▶ start timer ──▶ write ──refused──▶ remove, fail (no retry)
//!                             │
//!               ┌─────────────┴─────────────┐
//!               ▼                           ▼
//!         response(id)                 timer expires
//!     remove, stop timer,          remove; retries left?
//!     deliver (err, result)         yes: new id, resend
//!                                   no:  fail with Timeout
//! ```
//!
//! Exactly one path removes the entry, so each request completes once.

use crate::domain::{Completion, CorrelationTable, PendingRequest, PendingStats};
use crate::error::RequestError;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared_bus::{Context, Socket, SocketKind};
use shared_types::{Address, CorrelationId, Framing, NodeConfig, RequestEnvelope, ResponseEnvelope};
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct EmitterInner {
    socket: Socket,
    table: CorrelationTable,
    config: NodeConfig,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl EmitterInner {
    fn write(&self, name: &str, id: CorrelationId, payload: Bytes) -> Result<(), RequestError> {
        let envelope = RequestEnvelope {
            identity: None,
            name: name.to_owned(),
            id,
            payload,
        };
        self.socket
            .try_send(envelope.into_frames())
            .map_err(RequestError::TransportWrite)
    }

    fn dispatch(
        self: &Arc<Self>,
        name: String,
        payload: Bytes,
        completion: Option<Completion>,
        retries: u32,
        attempt: u32,
    ) {
        let Some(completion) = completion else {
            let id = CorrelationId::random(self.config.id_digits);
            if let Err(e) = self.write(&name, id, payload) {
                warn!(event = %name, error = %e, "fire-and-forget write refused");
            }
            return;
        };

        let mut slot = Some(completion);
        let admitted = self.table.admit(|id| {
            let mut pending = PendingRequest::unbound(id, name.clone());
            pending.completion = slot.take();
            pending
        });
        let id = match admitted {
            Ok(id) => id,
            Err(refused) => {
                debug!(event = %name, ?refused, "request refused at admission");
                if let Some(completion) = slot {
                    let _ = completion.send(Err(refused.into()));
                }
                return;
            }
        };

        if let Some(timeout) = self.config.timeout() {
            let weak = Arc::downgrade(self);
            let timer_id = id.clone();
            let timer_name = name.clone();
            let timer_payload = payload.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(inner) = weak.upgrade() {
                    inner.on_timeout(&timer_id, timer_name, timer_payload, retries, attempt);
                }
            });
            if !self.table.attach_timer(&id, timer.abort_handle()) {
                timer.abort();
            }
        }

        debug!(event = %name, correlation_id = %id, attempt, "sending request");
        if let Err(e) = self.write(&name, id.clone(), payload) {
            if let Some(pending) = self.table.remove(&id) {
                warn!(event = %name, correlation_id = %id, error = %e, "request write refused");
                pending.complete(Err(e));
            }
        }
    }

    fn on_timeout(
        self: &Arc<Self>,
        id: &CorrelationId,
        name: String,
        payload: Bytes,
        retries: u32,
        attempt: u32,
    ) {
        let Some(mut pending) = self.table.remove(id) else {
            return;
        };
        self.table.record_timeout();
        let completion = pending.completion.take();
        if retries > 0 {
            debug!(event = %name, correlation_id = %id, retries_left = retries - 1, "request timed out, retrying");
            self.dispatch(name, payload, completion, retries - 1, attempt + 1);
        } else {
            warn!(event = %name, correlation_id = %id, attempts = attempt, "request timed out");
            if let Some(completion) = completion {
                let _ = completion.send(Err(RequestError::Timeout {
                    name,
                    attempts: attempt,
                }));
            }
        }
    }

    fn on_response(&self, msg: Vec<Bytes>) {
        let response = match ResponseEnvelope::from_frames(msg, Framing::Plain) {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "discarding malformed response");
                return;
            }
        };
        let outcome = match response.decode_outcome(self.config.encoding) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(correlation_id = %response.id, error = %e, "discarding undecodable response");
                return;
            }
        };
        let Some(pending) = self.table.remove(&response.id) else {
            self.table.record_stray();
            debug!(correlation_id = %response.id, "discarding response for unknown id");
            return;
        };
        self.table.record_completed();
        debug!(
            event = %pending.name,
            correlation_id = %response.id,
            elapsed_ms = pending.created_at.elapsed().as_millis() as u64,
            "response received"
        );
        pending.complete(outcome.map_err(RequestError::Remote));
    }

    fn fail_all(&self) {
        for pending in self.table.drain() {
            pending.complete(Err(RequestError::Closed));
        }
    }
}

impl Drop for EmitterInner {
    fn drop(&mut self) {
        self.socket.close();
        self.fail_all();
    }
}

/// Issues requests and awaits their responses.
#[derive(Clone)]
pub struct RequestEmitter {
    inner: Arc<EmitterInner>,
}

impl std::fmt::Debug for RequestEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEmitter")
            .field("table", &self.inner.table)
            .finish_non_exhaustive()
    }
}

impl RequestEmitter {
    /// Create the emitter and start its receive loop. Must be called inside a
    /// Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Config`] for an invalid configuration.
    pub fn new(ctx: &Context, config: NodeConfig) -> Result<Self, RequestError> {
        config.validate()?;
        let socket = ctx.socket(SocketKind::Dealer);
        socket.set_linger(config.linger());
        let inner = Arc::new(EmitterInner {
            socket: socket.clone(),
            table: CorrelationTable::from_config(&config),
            config,
            pump: Mutex::new(None),
        });

        let weak: Weak<EmitterInner> = Arc::downgrade(&inner);
        let batch = inner.config.batch_size;
        let pump = tokio::spawn(shared_bus::pump(socket, batch, move |msg| {
            if let Some(inner) = weak.upgrade() {
                inner.on_response(msg);
            }
        }));
        *inner.pump.lock() = Some(pump);
        Ok(Self { inner })
    }

    /// Send `payload` to `name`.
    ///
    /// Without a completion the request is fire-and-forget: written once, no
    /// table entry. Otherwise the completion receives exactly one outcome,
    /// after at most `retries` resends on timeout.
    pub fn send(&self, name: &str, payload: &Value, completion: Option<Completion>, retries: u32) {
        let payload = match self.inner.config.encoding.encode(payload) {
            Ok(payload) => payload,
            Err(e) => {
                if let Some(completion) = completion {
                    let _ = completion.send(Err(e.into()));
                }
                return;
            }
        };
        self.inner
            .dispatch(name.to_owned(), payload, completion, retries, 1);
    }

    /// Round-trip a request using the configured retry budget.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] for admission refusal, a refused write, a
    /// timeout, a remote error, or a close while pending.
    pub async fn request(&self, name: &str, payload: &Value) -> Result<Value, RequestError> {
        let (tx, rx) = oneshot::channel();
        self.send(name, payload, Some(tx), self.inner.config.retries);
        rx.await.unwrap_or(Err(RequestError::Closed))
    }

    /// Typed form of [`request`](Self::request).
    ///
    /// # Errors
    ///
    /// As [`request`](Self::request), plus [`RequestError::Codec`] when the
    /// payload or result does not fit the given types.
    pub async fn request_as<T, R>(&self, name: &str, payload: &T) -> Result<R, RequestError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_value(payload)?;
        let result = self.request(name, &payload).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::TransportWrite`] when the write was refused.
    pub fn notify(&self, name: &str, payload: &Value) -> Result<(), RequestError> {
        let payload = self.inner.config.encoding.encode(payload)?;
        let id = CorrelationId::random(self.inner.config.id_digits);
        self.inner.write(name, id, payload)
    }

    /// Outstanding requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.table.count()
    }

    #[must_use]
    pub fn stats(&self) -> &PendingStats {
        self.inner.table.stats()
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
        info!(endpoint = %url, "emitter listening");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`RequestError`] for an unresolvable address or a closed node.
    pub fn connect(&self, address: impl Into<Address>) -> Result<(), RequestError> {
        let url = address.into().to_url()?;
        self.inner.socket.connect(&url)?;
        info!(endpoint = %url, "emitter connected");
        Ok(())
    }

    #[must_use]
    pub fn last_endpoint(&self) -> Option<String> {
        self.inner.socket.last_endpoint()
    }

    /// Release the socket and fail every pending request with
    /// [`RequestError::Closed`]. Closing is terminal.
    pub fn close(&self) {
        self.inner.socket.close();
        if let Some(pump) = self.inner.pump.lock().take() {
            pump.abort();
        }
        self.inner.fail_all();
    }
}
