//! Per-node configuration.

use crate::codec::Encoding;
use crate::correlation::CorrelationId;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// How long unsent outbound data survives a socket close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Linger {
    /// Keep flushing until the data is delivered.
    #[default]
    Unbounded,
    /// Drop queued data immediately.
    Discard,
    /// Flush for at most this long.
    For(Duration),
}

impl Linger {
    /// `-1` (or below) is unbounded, `0` discards, anything else is a grace
    /// period in milliseconds.
    #[must_use]
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            i64::MIN..=-1 => Self::Unbounded,
            0 => Self::Discard,
            ms => Self::For(Duration::from_millis(ms.unsigned_abs())),
        }
    }
}

/// Options shared by every node role.
///
/// Every field is optional when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Milliseconds before a response is considered late. `0` disables.
    pub timeout_ms: u64,
    /// Retries after a timeout. `0` disables retrying.
    pub retries: u32,
    /// Milliseconds to retain unsent data after close (`-1` unbounded).
    pub linger_ms: i64,
    /// Fill the synchronization cache from `update` broadcasts.
    pub auto_update: bool,
    pub encoding: Encoding,
    /// Correlation table capacity.
    pub max_pending: usize,
    pub id_digits: usize,
    /// Random draws before id allocation gives up.
    pub id_tries: usize,
    /// Send stack traces with sanitized errors.
    pub expose_stack: bool,
    /// Messages drained per readiness before yielding.
    pub batch_size: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            retries: 3,
            linger_ms: -1,
            auto_update: true,
            encoding: Encoding::Json,
            max_pending: 4096,
            id_digits: 6,
            id_tries: 10,
            expose_stack: false,
            batch_size: 100,
        }
    }
}

impl NodeConfig {
    /// Read overrides from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `WEFT_TIMEOUT_MS` (default: 0)
    /// - `WEFT_RETRIES` (default: 3)
    /// - `WEFT_LINGER_MS` (default: -1)
    /// - `WEFT_AUTO_UPDATE` (default: true)
    /// - `WEFT_ENCODING`: `json` or `msgpack` (default: json)
    /// - `WEFT_MAX_PENDING` (default: 4096)
    /// - `WEFT_EXPOSE_STACK` (default: false)
    ///
    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_ms: parsed("WEFT_TIMEOUT_MS").unwrap_or(defaults.timeout_ms),
            retries: parsed("WEFT_RETRIES").unwrap_or(defaults.retries),
            linger_ms: parsed("WEFT_LINGER_MS").unwrap_or(defaults.linger_ms),
            auto_update: env::var("WEFT_AUTO_UPDATE")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.auto_update),
            encoding: parsed("WEFT_ENCODING").unwrap_or(defaults.encoding),
            max_pending: parsed("WEFT_MAX_PENDING").unwrap_or(defaults.max_pending),
            expose_stack: env::var("WEFT_EXPOSE_STACK")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.expose_stack),
            ..defaults
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] for zero limits, an id length outside 1..=18,
    /// a linger below -1, or a capacity larger than the id space.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pending == 0 {
            return Err(ConfigError::InvalidLimit("max_pending cannot be 0".into()));
        }
        if self.id_tries == 0 {
            return Err(ConfigError::InvalidLimit("id_tries cannot be 0".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidLimit("batch_size cannot be 0".into()));
        }
        if !(1..=CorrelationId::MAX_DIGITS).contains(&self.id_digits) {
            return Err(ConfigError::InvalidLimit(format!(
                "id_digits must be within 1..={}",
                CorrelationId::MAX_DIGITS
            )));
        }
        if self.linger_ms < -1 {
            return Err(ConfigError::InvalidLinger(self.linger_ms));
        }
        let space = CorrelationId::space(self.id_digits);
        if u64::try_from(self.max_pending).map_or(true, |cap| cap > space) {
            return Err(ConfigError::IdSpaceTooSmall {
                digits: self.id_digits,
                max_pending: self.max_pending,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    #[must_use]
    pub fn linger(&self) -> Linger {
        Linger::from_millis(self.linger_ms)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn with_linger_ms(mut self, linger_ms: i64) -> Self {
        self.linger_ms = linger_ms;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    #[must_use]
    pub fn with_id_digits(mut self, id_digits: usize) -> Self {
        self.id_digits = id_digits;
        self
    }

    #[must_use]
    pub fn with_auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = auto_update;
        self
    }

    #[must_use]
    pub fn with_expose_stack(mut self, expose_stack: bool) -> Self {
        self.expose_stack = expose_stack;
        self
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
