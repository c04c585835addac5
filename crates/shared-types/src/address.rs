//! Endpoint address construction.
//!
//! ```text
//! 5555                         -> tcp://127.0.0.1:5555
//! "/tmp/weft.sock"             -> ipc:///tmp/weft.sock
//! "inproc://mesh"              -> inproc://mesh (verbatim)
//! {port: 80, host: "10.0.0.1"} -> tcp://10.0.0.1:80
//! {path: "/run/a.sock"}        -> ipc:///run/a.sock
//! ```

use crate::errors::AddressError;
use serde::{Deserialize, Serialize};

/// Host used when a port is given without one.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Anything that can be resolved to a transport URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Port(u16),
    Text(String),
    Parts(AddressParts),
}

/// Structured address. A port takes precedence over a path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressParts {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
}

impl Address {
    /// Resolve to a fully-qualified transport URL.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] for an empty string or a structured address
    /// with neither a port nor a path.
    pub fn to_url(&self) -> Result<String, AddressError> {
        match self {
            Self::Port(port) => Ok(tcp_url(None, *port)),
            Self::Text(text) if text.is_empty() => Err(AddressError::Empty),
            Self::Text(text) if text.starts_with('/') => Ok(format!("ipc://{text}")),
            Self::Text(text) => Ok(text.clone()),
            Self::Parts(parts) => parts.resolve(),
        }
    }
}

impl AddressParts {
    fn resolve(&self) -> Result<String, AddressError> {
        if let Some(port) = self.port {
            return Ok(tcp_url(self.host.as_deref(), port));
        }
        match &self.path {
            Some(path) => Address::Text(path.clone()).to_url(),
            None => Err(AddressError::Incomplete),
        }
    }
}

fn tcp_url(host: Option<&str>, port: u16) -> String {
    let host = host.filter(|h| !h.is_empty()).unwrap_or(DEFAULT_HOST);
    format!("tcp://{host}:{port}")
}

impl From<u16> for Address {
    fn from(port: u16) -> Self {
        Self::Port(port)
    }
}

impl From<&str> for Address {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Address {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<AddressParts> for Address {
    fn from(parts: AddressParts) -> Self {
        Self::Parts(parts)
    }
}

impl From<&Address> for Address {
    fn from(address: &Address) -> Self {
        address.clone()
    }
}
