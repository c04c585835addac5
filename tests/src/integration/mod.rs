//! Cross-crate integration scenarios.

pub mod prosumers;
pub mod request_flows;
pub mod routing;
pub mod sync_flows;
pub mod transports;
