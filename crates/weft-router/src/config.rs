//! Router configuration and service-name resolution.

use crate::error::RouterError;
use serde::{Deserialize, Serialize};
use shared_types::NodeConfig;
use std::env;

/// Pool used when an event name carries no service prefix.
pub const DEFAULT_FALLBACK_SERVICE: &str = "fallback";

/// Separator between service prefix and event name.
pub const DEFAULT_DELIMITER: &str = "::";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Table capacity, timeout, linger and encoding for the relay.
    pub node: NodeConfig,
    pub fallback_service: String,
    pub delimiter: String,
    /// Forward `ping` rather than `svc::ping`.
    pub trim_service_name: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            fallback_service: DEFAULT_FALLBACK_SERVICE.to_owned(),
            delimiter: DEFAULT_DELIMITER.to_owned(),
            trim_service_name: true,
        }
    }
}

impl RouterConfig {
    /// Read overrides from the environment on top of [`NodeConfig::from_env`].
    ///
    /// # Environment Variables
    ///
    /// - `WEFT_FALLBACK_SERVICE` (default: fallback)
    /// - `WEFT_DELIMITER` (default: `::`)
    /// - `WEFT_TRIM_SERVICE_NAME` (default: true)
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            node: NodeConfig::from_env(),
            fallback_service: env::var("WEFT_FALLBACK_SERVICE")
                .unwrap_or(defaults.fallback_service),
            delimiter: env::var("WEFT_DELIMITER").unwrap_or(defaults.delimiter),
            trim_service_name: env::var("WEFT_TRIM_SERVICE_NAME")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.trim_service_name),
        }
    }

    #[must_use]
    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.node = node;
        self
    }

    #[must_use]
    pub fn with_fallback_service(mut self, service: impl Into<String>) -> Self {
        self.fallback_service = service.into();
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    #[must_use]
    pub fn with_trim_service_name(mut self, trim: bool) -> Self {
        self.trim_service_name = trim;
        self
    }

    /// # Errors
    ///
    /// Returns [`RouterError`] for an invalid node config, an empty delimiter
    /// or an empty fallback service.
    pub fn validate(&self) -> Result<(), RouterError> {
        self.node.validate()?;
        if self.delimiter.is_empty() {
            return Err(RouterError::InvalidConfig("delimiter cannot be empty".into()));
        }
        if self.fallback_service.is_empty() {
            return Err(RouterError::InvalidConfig(
                "fallback_service cannot be empty".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn policy(&self) -> RoutePolicy {
        RoutePolicy::ByServiceName {
            delimiter: self.delimiter.clone(),
            fallback: self.fallback_service.clone(),
            trim: self.trim_service_name,
        }
    }
}

/// Maps an inbound event name to `(pool, forwarded name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePolicy {
    /// `svc::ping` goes to pool `svc`; names without the delimiter go to the
    /// fallback pool unchanged.
    ByServiceName {
        delimiter: String,
        fallback: String,
        trim: bool,
    },
    /// Everything goes to one pool, names untouched.
    PassThrough { service: String },
}

impl RoutePolicy {
    /// Split on the first delimiter only: `a::b::c` selects `a` and forwards
    /// `b::c`.
    #[must_use]
    pub fn resolve(&self, name: &str) -> (String, String) {
        match self {
            Self::ByServiceName {
                delimiter,
                fallback,
                trim,
            } => match name.split_once(delimiter.as_str()) {
                Some((service, rest)) => {
                    let forwarded = if *trim { rest } else { name };
                    (service.to_owned(), forwarded.to_owned())
                }
                None => (fallback.clone(), name.to_owned()),
            },
            Self::PassThrough { service } => (service.clone(), name.to_owned()),
        }
    }
}
