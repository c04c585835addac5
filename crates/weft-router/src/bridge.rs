//! Pass-through relay with a single backend pool.

use crate::config::{RoutePolicy, DEFAULT_FALLBACK_SERVICE};
use crate::error::RouterError;
use crate::events::RelayEvent;
use crate::relay::Relay;
use shared_bus::Context;
use shared_types::{Address, NodeConfig};
use tokio::sync::broadcast;

/// Relays every request to one backend pool without touching event names.
#[derive(Clone)]
pub struct Bridge {
    relay: Relay,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Bridge {
    /// # Errors
    ///
    /// Returns [`RouterError::Config`] for an invalid configuration.
    pub fn new(ctx: &Context, config: NodeConfig) -> Result<Self, RouterError> {
        config.validate()?;
        let policy = RoutePolicy::PassThrough {
            service: DEFAULT_FALLBACK_SERVICE.to_owned(),
        };
        Ok(Self {
            relay: Relay::new(ctx, config, policy),
        })
    }

    /// # Errors
    ///
    /// Returns [`RouterError`] for an unresolvable address or a bind failure.
    pub fn listen_for_consumers(&self, address: impl Into<Address>) -> Result<(), RouterError> {
        self.relay.listen_front(address.into())
    }

    /// # Errors
    ///
    /// Returns [`RouterError`] for an unresolvable address or a closed bridge.
    pub fn connect_to_consumer(&self, address: impl Into<Address>) -> Result<(), RouterError> {
        self.relay.connect_front(address.into())
    }

    /// # Errors
    ///
    /// Returns [`RouterError`] for an unresolvable address or a bind failure.
    pub fn listen_for_services(&self, address: impl Into<Address>) -> Result<(), RouterError> {
        self.relay
            .listen_back(DEFAULT_FALLBACK_SERVICE, address.into())
    }

    /// # Errors
    ///
    /// Returns [`RouterError`] for an unresolvable address or a closed bridge.
    pub fn connect_to_service(&self, address: impl Into<Address>) -> Result<(), RouterError> {
        self.relay
            .connect_back(DEFAULT_FALLBACK_SERVICE, address.into())
    }

    #[must_use]
    pub fn last_endpoint(&self) -> Option<String> {
        self.relay.front_endpoint()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.relay.pending_count()
    }

    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<RelayEvent> {
        self.relay.events()
    }

    pub fn close(&self) {
        self.relay.close();
    }
}
