//! Where log lines go and how they look.

use std::env;

/// Rendering of each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, ANSI-coloured.
    #[default]
    Pretty,
    /// One JSON object per line, with file and thread ids.
    Json,
    /// Nothing is written; the filter still applies to other layers.
    Off,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Attached to the startup and shutdown lines.
    pub service_name: String,
    /// Level or full `EnvFilter` directive, e.g. `weft_router=debug,info`.
    pub log_level: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "weft".to_owned(),
            log_level: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// # Environment Variables
    ///
    /// - `WEFT_SERVICE_NAME` (default: weft)
    /// - `WEFT_LOG_LEVEL`, then `RUST_LOG` (default: info)
    /// - `WEFT_CONSOLE_OUTPUT`: `false` or `0` silences output
    /// - `WEFT_JSON_LOGS`: `true` or `1` selects JSON
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let format = if !flag("WEFT_CONSOLE_OUTPUT").unwrap_or(true) {
            LogFormat::Off
        } else if flag("WEFT_JSON_LOGS").unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };
        Self {
            service_name: env::var("WEFT_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: env::var("WEFT_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            format,
        }
    }

    /// [`from_env`](Self::from_env) with the service named `weft-{role}`.
    #[must_use]
    pub fn for_role(role: &str) -> Self {
        Self {
            service_name: format!("weft-{role}"),
            ..Self::from_env()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

fn flag(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
