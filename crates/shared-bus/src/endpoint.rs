//! Transport URL parsing.

use crate::error::TransportError;
use std::path::PathBuf;
use std::str::FromStr;

/// A parsed transport URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// In-process endpoint scoped to one [`crate::Context`].
    Inproc(String),
    /// `host:port`; a `*` host binds every interface.
    Tcp(String),
    /// Unix domain socket path.
    Ipc(PathBuf),
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::InvalidEndpoint(url.to_owned());
        let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
        if rest.is_empty() {
            return Err(invalid());
        }
        match scheme {
            "inproc" => Ok(Self::Inproc(rest.to_owned())),
            "tcp" => {
                let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
                port.parse::<u16>().map_err(|_| invalid())?;
                let host = if host == "*" { "0.0.0.0" } else { host };
                Ok(Self::Tcp(format!("{host}:{port}")))
            }
            "ipc" => Ok(Self::Ipc(PathBuf::from(rest))),
            _ => Err(invalid()),
        }
    }
}
