//! Service-name router: one front socket, one backend pool per service.

use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::events::RelayEvent;
use crate::relay::Relay;
use shared_bus::Context;
use shared_types::Address;
use tokio::sync::broadcast;

/// Load-balancing relay between callers and named backend pools.
///
/// Pools are created lazily the first time a name is used, either by a
/// `listen_for_services`/`connect_to_service` call or by an inbound request
/// that resolves to it, and live until the router closes.
#[derive(Clone)]
pub struct Router {
    relay: Relay,
    config: RouterConfig,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("services", &self.services())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Router {
    /// Create the router and start its front receive loop. Must be called
    /// inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] for an invalid configuration.
    pub fn new(ctx: &Context, config: RouterConfig) -> Result<Self, RouterError> {
        config.validate()?;
        let relay = Relay::new(ctx, config.node.clone(), config.policy());
        Ok(Self { relay, config })
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Returns [`RouterError`] for an unresolvable address or a bind failure.
    pub fn listen_for_consumers(&self, address: impl Into<Address>) -> Result<(), RouterError> {
        self.relay.listen_front(address.into())
    }

    /// # Errors
    ///
    /// Returns [`RouterError`] for an unresolvable address or a closed router.
    pub fn connect_to_consumer(&self, address: impl Into<Address>) -> Result<(), RouterError> {
        self.relay.connect_front(address.into())
    }

    /// Accept backends for the `service` pool.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] for an unresolvable address or a bind failure.
    pub fn listen_for_services(
        &self,
        service: &str,
        address: impl Into<Address>,
    ) -> Result<(), RouterError> {
        self.relay.listen_back(service, address.into())
    }

    /// Add a backend to the `service` pool.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] for an unresolvable address or a closed router.
    pub fn connect_to_service(
        &self,
        service: &str,
        address: impl Into<Address>,
    ) -> Result<(), RouterError> {
        self.relay.connect_back(service, address.into())
    }

    #[must_use]
    pub fn last_endpoint(&self) -> Option<String> {
        self.relay.front_endpoint()
    }

    /// Requests forwarded and not yet answered or evicted.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.relay.pending_count()
    }

    /// Known backend pools, sorted.
    #[must_use]
    pub fn services(&self) -> Vec<String> {
        self.relay.services()
    }

    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<RelayEvent> {
        self.relay.events()
    }

    /// Close the front socket and every pool. Closing is terminal.
    pub fn close(&self) {
        self.relay.close();
    }
}
