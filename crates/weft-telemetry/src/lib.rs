//! # Weft Telemetry
//!
//! Log setup shared by every weft binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use weft_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(&TelemetryConfig::for_role("router"))?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WEFT_SERVICE_NAME` | `weft` | Service name in logs |
//! | `WEFT_LOG_LEVEL` / `RUST_LOG` | `info` | `EnvFilter` directives |
//! | `WEFT_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `WEFT_JSON_LOGS` | `false` | JSON instead of pretty output |

mod config;
mod logging;
mod tracing_setup;

pub use config::{LogFormat, TelemetryConfig};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Install the global log subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError`] for an unparseable filter or when a global
/// subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    tracing_setup::init_tracing(config)?;
    tracing::info!(
        service = %config.service_name,
        format = ?config.format,
        "telemetry initialized"
    );
    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
    })
}

/// Held for the life of the process; logs shutdown when dropped.
#[must_use = "dropping the guard logs shutdown immediately"]
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "shutting down telemetry");
    }
}

/// Span carrying the `node` field.
///
/// ```rust,ignore
/// let _span = node_span!("dispatch", node = "router", service = "svc").entered();
/// ```
#[macro_export]
macro_rules! node_span {
    ($name:expr, $($field:tt)*) => {
        ::tracing::info_span!($name, $($field)*)
    };
}
