//! # Runtime Configuration
//!
//! Everything comes from the environment so the same binary can be started
//! once per role.
//!
//! | Variable | Roles | Meaning |
//! |----------|-------|---------|
//! | `WEFT_ROLE` | all | `router`, `bridge`, `sync` or `echo` |
//! | `WEFT_FRONT_URL` | router, bridge, sync | Where callers connect |
//! | `WEFT_BACK_URL` | router, bridge | Where backends connect |
//! | `WEFT_SERVICE` | router | Pool served on the back URL (default `fallback`) |
//! | `WEFT_BROADCAST_URL` | sync | Where `update` broadcasts are published |
//! | `WEFT_LISTEN_URL` | echo | Accept callers directly |
//! | `WEFT_CONNECT_URL` | echo | Join a router or bridge back end |
//!
//! Node options (`WEFT_TIMEOUT_MS`, `WEFT_RETRIES`, ...) are read by
//! [`NodeConfig::from_env`].

use crate::error::RuntimeError;
use shared_types::NodeConfig;
use std::env;
use std::fmt;
use std::str::FromStr;
use weft_router::RouterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Router,
    Bridge,
    Sync,
    /// Test service answering `echo` and `broken`.
    Echo,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Bridge => "bridge",
            Self::Sync => "sync",
            Self::Echo => "echo",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "router" => Ok(Self::Router),
            "bridge" => Ok(Self::Bridge),
            "sync" => Ok(Self::Sync),
            "echo" | "service" => Ok(Self::Echo),
            other => Err(RuntimeError::UnknownRole(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub role: Role,
    pub front_url: Option<String>,
    pub back_url: Option<String>,
    pub service: String,
    pub broadcast_url: Option<String>,
    pub listen_url: Option<String>,
    pub connect_url: Option<String>,
    pub router: RouterConfig,
}

impl RuntimeConfig {
    /// Bare configuration for `role` with default node options.
    #[must_use]
    pub fn new(role: Role) -> Self {
        let router = RouterConfig::default();
        Self {
            role,
            front_url: None,
            back_url: None,
            service: router.fallback_service.clone(),
            broadcast_url: None,
            listen_url: None,
            connect_url: None,
            router,
        }
    }

    /// # Errors
    ///
    /// Returns [`RuntimeError`] when `WEFT_ROLE` is missing or unknown.
    pub fn from_env() -> Result<Self, RuntimeError> {
        let role: Role = env::var("WEFT_ROLE")
            .map_err(|_| RuntimeError::MissingEnv("WEFT_ROLE"))?
            .parse()?;
        let router = RouterConfig::from_env();
        Ok(Self {
            role,
            front_url: non_empty("WEFT_FRONT_URL"),
            back_url: non_empty("WEFT_BACK_URL"),
            service: non_empty("WEFT_SERVICE").unwrap_or_else(|| router.fallback_service.clone()),
            broadcast_url: non_empty("WEFT_BROADCAST_URL"),
            listen_url: non_empty("WEFT_LISTEN_URL"),
            connect_url: non_empty("WEFT_CONNECT_URL"),
            router,
        })
    }

    #[must_use]
    pub fn node(&self) -> &NodeConfig {
        &self.router.node
    }

    /// # Errors
    ///
    /// Returns [`RuntimeError::MissingEnv`] when the role has nothing to bind
    /// or connect, and [`RuntimeError::Router`] for invalid node options.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        self.router.validate()?;
        match self.role {
            Role::Router | Role::Bridge if self.front_url.is_none() => {
                Err(RuntimeError::MissingEnv("WEFT_FRONT_URL"))
            }
            Role::Sync if self.front_url.is_none() => {
                Err(RuntimeError::MissingEnv("WEFT_FRONT_URL"))
            }
            Role::Echo if self.listen_url.is_none() && self.connect_url.is_none() => {
                Err(RuntimeError::MissingEnv("WEFT_LISTEN_URL or WEFT_CONNECT_URL"))
            }
            _ => Ok(()),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
