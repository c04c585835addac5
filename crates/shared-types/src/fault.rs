//! Error sanitization across the wire.
//!
//! A handler's error is flattened into [`SanitizedError`] before encoding.
//! The receiver rebuilds a [`Fault`]: a [`RemoteError`] when the payload was
//! flagged `isError`, otherwise the structured value as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Well-known error codes produced by the mesh itself.
pub mod codes {
    /// No capability is registered under the requested event name.
    pub const ENOEVENT: &str = "ENOEVENT";
    /// Correlation table full or id space exhausted.
    pub const ETOOMANY: &str = "ETOOMANY";
    /// No response after every retry.
    pub const ETIMEDOUT: &str = "ETIMEDOUT";
    /// The transport refused a write.
    pub const EWRITE: &str = "EWRITE";
}

/// Application-level error carried in a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct RemoteError {
    pub name: String,
    pub message: String,
    pub code: Option<String>,
    pub stack: Option<String>,
}

impl RemoteError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self::named("Error", message)
    }

    #[must_use]
    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            code: None,
            stack: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn no_such_event() -> Self {
        Self::new("No such event").with_code(codes::ENOEVENT)
    }

    #[must_use]
    pub fn too_many_requests() -> Self {
        Self::new("Too many requests").with_code(codes::ETOOMANY)
    }

    #[must_use]
    pub fn write_refused() -> Self {
        Self::new("Transport refused the write").with_code(codes::EWRITE)
    }

    /// Flatten for the wire. The stack only travels when asked for.
    #[must_use]
    pub fn sanitize(&self, include_stack: bool) -> SanitizedError {
        SanitizedError {
            name: self.name.clone(),
            message: self.message.clone(),
            code: self.code.clone(),
            is_error: true,
            stack: if include_stack { self.stack.clone() } else { None },
        }
    }
}

/// Wire shape of an error: `{name, message, code, isError, stack?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedError {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl From<SanitizedError> for RemoteError {
    fn from(s: SanitizedError) -> Self {
        Self {
            name: s.name,
            message: s.message,
            code: s.code,
            stack: s.stack,
        }
    }
}

/// A non-null error slot received from a peer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error(transparent)]
    Error(RemoteError),

    /// The peer reported something that was not flagged as an error.
    #[error("remote failure: {0}")]
    Value(Value),
}

impl Fault {
    /// Rebuild from a decoded error slot. `null` means no error.
    #[must_use]
    pub fn from_wire(value: Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        let flagged = value.get("isError").and_then(Value::as_bool) == Some(true);
        if flagged {
            if let Ok(sanitized) = serde_json::from_value::<SanitizedError>(value.clone()) {
                return Some(Self::Error(sanitized.into()));
            }
        }
        Some(Self::Value(value))
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Error(e) => e.code.as_deref(),
            Self::Value(_) => None,
        }
    }

    #[must_use]
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Error(e) => Some(e),
            Self::Value(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_omits_stack_by_default() {
        let err = RemoteError::new("boom").with_stack("at line 1");
        let wire = serde_json::to_value(err.sanitize(false)).unwrap();
        assert_eq!(
            wire,
            json!({"name": "Error", "message": "boom", "code": null, "isError": true})
        );
    }

    #[test]
    fn test_sanitize_with_stack() {
        let err = RemoteError::new("boom").with_stack("at line 1");
        let wire = serde_json::to_value(err.sanitize(true)).unwrap();
        assert_eq!(wire["stack"], "at line 1");
    }

    #[test]
    fn test_reconstruct_preserves_fields() {
        let original = RemoteError::named("TypeError", "bad").with_code("E42");
        let wire = serde_json::to_value(original.sanitize(false)).unwrap();
        let fault = Fault::from_wire(wire).unwrap();
        assert_eq!(fault, Fault::Error(original));
        assert_eq!(fault.code(), Some("E42"));
    }

    #[test]
    fn test_unflagged_value_stays_plain() {
        let wire = json!({"name": "Error", "message": "m", "isError": false});
        assert_eq!(
            Fault::from_wire(wire.clone()),
            Some(Fault::Value(wire))
        );
        assert_eq!(
            Fault::from_wire(json!("oops")),
            Some(Fault::Value(json!("oops")))
        );
    }

    #[test]
    fn test_null_is_no_fault() {
        assert_eq!(Fault::from_wire(Value::Null), None);
    }
}
