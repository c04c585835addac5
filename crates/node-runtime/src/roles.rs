//! Builds the node for each role.

use crate::config::{Role, RuntimeConfig};
use crate::error::RuntimeError;
use serde_json::Value;
use shared_bus::Context;
use shared_types::RemoteError;
use weft_request::{RequestHandler, Responder};
use weft_router::{Bridge, Router};
use weft_sync::SyncHandler;
use weft_telemetry::{log_event, node_span};

/// The node a process is hosting.
#[derive(Debug)]
pub enum HostedNode {
    Router(Router),
    Bridge(Bridge),
    Sync(SyncHandler),
    Echo(RequestHandler),
}

impl HostedNode {
    /// Create the node for `config.role` and bind or connect its endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] for invalid configuration or a failed bind.
    pub fn start(ctx: &Context, config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let _span = node_span!("start", node = config.role.as_str()).entered();
        config.validate()?;
        let node = match config.role {
            Role::Router => Self::Router(start_router(ctx, config)?),
            Role::Bridge => Self::Bridge(start_bridge(ctx, config)?),
            Role::Sync => Self::Sync(start_sync(ctx, config)?),
            Role::Echo => Self::Echo(start_echo(ctx, config)?),
        };
        log_event!(info, config.role.as_str(), "node started");
        Ok(node)
    }

    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::Router(_) => Role::Router,
            Self::Bridge(_) => Role::Bridge,
            Self::Sync(_) => Role::Sync,
            Self::Echo(_) => Role::Echo,
        }
    }

    pub fn close(&self) {
        match self {
            Self::Router(router) => router.close(),
            Self::Bridge(bridge) => bridge.close(),
            Self::Sync(sync) => sync.close(),
            Self::Echo(handler) => handler.close(),
        }
        log_event!(info, self.role().as_str(), "node closed");
    }
}

fn start_router(ctx: &Context, config: &RuntimeConfig) -> Result<Router, RuntimeError> {
    let router = Router::new(ctx, config.router.clone())?;
    if let Some(front) = &config.front_url {
        router.listen_for_consumers(front.as_str())?;
        log_event!(info, "router", "front bound", endpoint = %front);
    }
    if let Some(back) = &config.back_url {
        router.listen_for_services(&config.service, back.as_str())?;
        log_event!(info, "router", "back bound", endpoint = %back, service = %config.service);
    }
    Ok(router)
}

fn start_bridge(ctx: &Context, config: &RuntimeConfig) -> Result<Bridge, RuntimeError> {
    let bridge = Bridge::new(ctx, config.node().clone())?;
    if let Some(front) = &config.front_url {
        bridge.listen_for_consumers(front.as_str())?;
        log_event!(info, "bridge", "front bound", endpoint = %front);
    }
    if let Some(back) = &config.back_url {
        bridge.listen_for_services(back.as_str())?;
        log_event!(info, "bridge", "back bound", endpoint = %back);
    }
    Ok(bridge)
}

fn start_sync(ctx: &Context, config: &RuntimeConfig) -> Result<SyncHandler, RuntimeError> {
    let sync = SyncHandler::new(ctx, config.node().clone())?;
    if let Some(front) = &config.front_url {
        sync.listen_for_requests(front.as_str())?;
        log_event!(info, "sync", "requests bound", endpoint = %front);
    }
    if let Some(broadcast) = &config.broadcast_url {
        sync.listen_for_broadcasts(broadcast.as_str())?;
        log_event!(info, "sync", "broadcasts bound", endpoint = %broadcast);
    }
    Ok(sync)
}

/// `echo` replies with its payload; `broken` always fails.
pub fn register_echo(handler: &RequestHandler) {
    handler.on("echo", |payload: Value, responder: Responder| {
        log_event!(debug, "echo", "echoing");
        responder.ok(payload);
    });
    handler.on("broken", |_: Value, responder: Responder| {
        responder.err(RemoteError::new("Broken"));
    });
}

fn start_echo(ctx: &Context, config: &RuntimeConfig) -> Result<RequestHandler, RuntimeError> {
    let handler = RequestHandler::new(ctx, config.node().clone())?;
    register_echo(&handler);
    if let Some(listen) = &config.listen_url {
        handler.listen(listen.as_str())?;
        log_event!(info, "echo", "listening", endpoint = %listen);
    }
    if let Some(connect) = &config.connect_url {
        handler.connect(connect.as_str())?;
        log_event!(info, "echo", "connected", endpoint = %connect);
    }
    Ok(handler)
}
