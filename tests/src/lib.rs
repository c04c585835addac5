//! # Weft Test Suite
//!
//! Scenarios that need more than one crate: an emitter talking to a handler
//! through a router, a sync emitter reading through its cache, a prosumer
//! pair, the node runtime's roles.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs         # Shared node builders
//! └── integration/
//!     ├── request_flows.rs  # Emitter <-> handler, timeouts, admission
//!     ├── routing.rs        # Router and bridge topologies
//!     ├── prosumers.rs      # Symmetric peers
//!     ├── sync_flows.rs     # Handler state, emitter cache, broadcasts
//!     └── transports.rs     # tcp and ipc variants, runtime roles
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p weft-tests
//! cargo test -p weft-tests integration::routing::
//! cargo bench -p weft-tests
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod fixtures;
pub mod integration;
