//! Error types for request/response nodes.

use shared_bus::TransportError;
use shared_types::{codes, AddressError, ConfigError, Fault};
use thiserror::Error;

/// Why a request did not produce a result.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Admission refused: the correlation table is full or no free id was
    /// found. Nothing was written.
    #[error("Too many requests")]
    TooManyRequests,

    /// Resolved locally: no capability under this name.
    #[error("No such event: {name}")]
    NoSuchEvent { name: String },

    /// No response after every retry.
    #[error("request `{name}` timed out after {attempts} attempt(s)")]
    Timeout { name: String, attempts: u32 },

    /// The transport refused the request write.
    #[error("transport refused the write: {0}")]
    TransportWrite(TransportError),

    /// The peer answered with an error.
    #[error(transparent)]
    Remote(#[from] Fault),

    /// A local capability dropped its responder without answering.
    #[error("capability `{name}` never responded")]
    Abandoned { name: String },

    #[error("codec: {0}")]
    Codec(String),

    /// The node was closed while the request was pending.
    #[error("node closed")]
    Closed,

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("address: {0}")]
    Address(#[from] AddressError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

impl RequestError {
    /// Well-known code for this failure, if it has one. Remote errors report
    /// the code the peer sent.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::TooManyRequests => Some(codes::ETOOMANY),
            Self::NoSuchEvent { .. } => Some(codes::ENOEVENT),
            Self::Timeout { .. } => Some(codes::ETIMEDOUT),
            Self::TransportWrite(_) => Some(codes::EWRITE),
            Self::Remote(fault) => fault.code(),
            _ => None,
        }
    }

    /// True for both the local and the remote "no such event" forms.
    #[must_use]
    pub fn is_no_such_event(&self) -> bool {
        self.code() == Some(codes::ENOEVENT)
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<shared_types::CodecError> for RequestError {
    fn from(err: shared_types::CodecError) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
