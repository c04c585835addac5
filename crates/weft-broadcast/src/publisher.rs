//! Publish side: encode and fan out, never queue past the high-water mark.

use crate::error::BroadcastError;
use serde::Serialize;
use serde_json::Value;
use shared_bus::{Context, Socket, SocketKind, TransportError};
use shared_types::{Address, BroadcastEnvelope, Encoding, NodeConfig};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct Publisher {
    socket: Socket,
    encoding: Encoding,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("encoding", &self.encoding)
            .field("peers", &self.socket.peer_count())
            .finish()
    }
}

impl Publisher {
    /// # Errors
    ///
    /// Returns [`BroadcastError::Config`] for an invalid configuration.
    pub fn new(ctx: &Context, config: NodeConfig) -> Result<Self, BroadcastError> {
        config.validate()?;
        let socket = ctx.socket(SocketKind::Pub);
        socket.set_linger(config.linger());
        Ok(Self {
            socket,
            encoding: config.encoding,
        })
    }

    /// Publish `payload` under `topic`.
    ///
    /// Returns false when the write was not accepted; the message is dropped
    /// with no retry.
    pub fn publish(&self, topic: &str, payload: &Value) -> bool {
        self.publish_as(topic, payload)
    }

    /// Typed form of [`publish`](Self::publish).
    pub fn publish_as<T: Serialize + ?Sized>(&self, topic: &str, payload: &T) -> bool {
        let payload = match self.encoding.encode(payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(topic, error = %e, "broadcast payload not encodable");
                return false;
            }
        };
        let envelope = BroadcastEnvelope {
            topic: topic.to_owned(),
            payload,
        };
        match self.socket.try_send(envelope.into_frames()) {
            Ok(()) => true,
            Err(TransportError::Saturated) => {
                debug!(topic, "broadcast dropped: subscribers saturated");
                false
            }
            Err(e) => {
                debug!(topic, error = %e, "broadcast refused");
                false
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`BroadcastError`] for an unresolvable address or a bind
    /// failure.
    pub fn listen(&self, address: impl Into<Address>) -> Result<(), BroadcastError> {
        let url = address.into().to_url()?;
        self.socket.bind(&url)?;
        info!(endpoint = %url, "publisher listening");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`BroadcastError`] for an unresolvable address or a closed
    /// node.
    pub fn connect(&self, address: impl Into<Address>) -> Result<(), BroadcastError> {
        let url = address.into().to_url()?;
        self.socket.connect(&url)?;
        info!(endpoint = %url, "publisher connected");
        Ok(())
    }

    #[must_use]
    pub fn last_endpoint(&self) -> Option<String> {
        self.socket.last_endpoint()
    }

    pub fn close(&self) {
        self.socket.close();
    }
}
