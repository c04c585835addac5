//! Capability registry: event name to handler.
//!
//! Registering a name that is already present replaces the previous handler;
//! exactly one handler answers each name.

use crate::handler::Responder;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered capability. It must eventually consume the [`Responder`].
pub type CapabilityFn = Arc<dyn Fn(Value, Responder) + Send + Sync>;

#[derive(Default)]
pub struct CapabilityRegistry {
    entries: RwLock<HashMap<String, CapabilityFn>>,
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl CapabilityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, returning the handler it replaced.
    pub fn register(&self, name: impl Into<String>, capability: CapabilityFn) -> Option<CapabilityFn> {
        self.entries.write().insert(name.into(), capability)
    }

    pub fn remove(&self, name: &str) -> Option<CapabilityFn> {
        self.entries.write().remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<CapabilityFn> {
        self.entries.read().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
