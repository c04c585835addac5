//! Subscribe side.
//!
//! Registering the first listener for a topic installs the transport filter;
//! removing the topic drops it. Delivery to listeners is by exact topic, so a
//! prefix match at the transport (`update` vs `updates`) never reaches the
//! wrong listener.

use crate::error::BroadcastError;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use shared_bus::{Context, Socket, SocketKind};
use shared_types::{Address, BroadcastEnvelope, Encoding, Multipart, NodeConfig};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Local listener for one topic.
pub type Listener = Arc<dyn Fn(Value) + Send + Sync>;

struct SubscriberInner {
    socket: Socket,
    encoding: Encoding,
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriberInner {
    fn on_broadcast(&self, msg: Multipart) {
        let envelope = match BroadcastEnvelope::from_frames(msg) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "discarding malformed broadcast");
                return;
            }
        };
        // Clone out so listeners may register or remove topics themselves.
        let listeners = match self.listeners.read().get(&envelope.topic) {
            Some(listeners) => listeners.clone(),
            None => return,
        };
        let payload: Value = match self.encoding.decode(&envelope.payload) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(topic = %envelope.topic, error = %e, "discarding undecodable broadcast");
                return;
            }
        };
        for listener in &listeners {
            listener(payload.clone());
        }
    }
}

impl Drop for SubscriberInner {
    fn drop(&mut self) {
        self.socket.close();
    }
}

#[derive(Clone)]
pub struct Subscriber {
    inner: Arc<SubscriberInner>,
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("topics", &self.topics())
            .finish_non_exhaustive()
    }
}

impl Subscriber {
    /// Create the subscriber and start its receive loop. Must be called
    /// inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Config`] for an invalid configuration.
    pub fn new(ctx: &Context, config: NodeConfig) -> Result<Self, BroadcastError> {
        config.validate()?;
        let socket = ctx.socket(SocketKind::Sub);
        socket.set_linger(config.linger());
        let inner = Arc::new(SubscriberInner {
            socket: socket.clone(),
            encoding: config.encoding,
            listeners: RwLock::new(HashMap::new()),
            pump: Mutex::new(None),
        });

        let weak: Weak<SubscriberInner> = Arc::downgrade(&inner);
        let pump = tokio::spawn(shared_bus::pump(socket, config.batch_size, move |msg| {
            if let Some(inner) = weak.upgrade() {
                inner.on_broadcast(msg);
            }
        }));
        *inner.pump.lock() = Some(pump);
        Ok(Self { inner })
    }

    /// Add a listener for `topic`. Several listeners may share a topic.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Transport`] if the subscriber is closed.
    pub fn on<F>(&self, topic: impl Into<String>, listener: F) -> Result<(), BroadcastError>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let mut listeners = self.inner.listeners.write();
        let entry = listeners.entry(topic.clone()).or_default();
        if entry.is_empty() {
            self.inner.socket.subscribe(topic.as_bytes())?;
            debug!(%topic, "subscribed");
        }
        entry.push(Arc::new(listener));
        Ok(())
    }

    /// Remove every listener for `topic` and its transport filter. Returns
    /// whether the topic had listeners.
    pub fn off(&self, topic: &str) -> bool {
        let removed = self.inner.listeners.write().remove(topic).is_some();
        if removed {
            // Only fails on a non-sub socket.
            let _ = self.inner.socket.unsubscribe(topic.as_bytes());
            debug!(%topic, "unsubscribed");
        }
        removed
    }

    /// Topics with at least one listener, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<_> = self.inner.listeners.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// # Errors
    ///
    /// Returns [`BroadcastError`] for an unresolvable address or a bind
    /// failure.
    pub fn listen(&self, address: impl Into<Address>) -> Result<(), BroadcastError> {
        let url = address.into().to_url()?;
        self.inner.socket.bind(&url)?;
        info!(endpoint = %url, "subscriber listening");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`BroadcastError`] for an unresolvable address or a closed
    /// node.
    pub fn connect(&self, address: impl Into<Address>) -> Result<(), BroadcastError> {
        let url = address.into().to_url()?;
        self.inner.socket.connect(&url)?;
        info!(endpoint = %url, "subscriber connected");
        Ok(())
    }

    #[must_use]
    pub fn last_endpoint(&self) -> Option<String> {
        self.inner.socket.last_endpoint()
    }

    pub fn close(&self) {
        self.inner.socket.close();
        if let Some(pump) = self.inner.pump.lock().take() {
            pump.abort();
        }
    }
}
