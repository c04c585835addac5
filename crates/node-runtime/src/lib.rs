//! # Weft Node Runtime
//!
//! Hosts one node role per process. The `weft-node` binary reads a
//! [`RuntimeConfig`] from the environment, starts the node, waits for Ctrl+C
//! and closes it.
//!
//! ```text
//!  WEFT_ROLE ──▶ RuntimeConfig ──▶ HostedNode::start ──▶ run until Ctrl+C ──▶ close
//! ```
//!
//! A typical three-process deployment:
//!
//! ```text
//! emitter ──▶ [router  front=tcp://*:5000 back=tcp://*:5001 service=svc]
//!                                                 ▲
//!                     [echo    connect=tcp://127.0.0.1:5001] (one or more)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod roles;

pub use config::{Role, RuntimeConfig};
pub use error::RuntimeError;
pub use roles::{register_echo, HostedNode};

use shared_bus::Context;
use tracing::info;

/// A started node and the context it lives in.
#[derive(Debug)]
pub struct NodeRuntime {
    ctx: Context,
    node: HostedNode,
}

impl NodeRuntime {
    /// Start the configured role. Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the configuration is incomplete or a
    /// bind fails.
    pub fn start(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let ctx = Context::new();
        let node = HostedNode::start(&ctx, config)?;
        Ok(Self { ctx, node })
    }

    #[must_use]
    pub fn node(&self) -> &HostedNode {
        &self.node
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Close the node. Unsent data follows the configured linger.
    pub fn shutdown(&self) {
        info!(role = %self.node.role(), "shutting down");
        self.node.close();
    }
}
