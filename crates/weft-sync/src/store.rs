//! Key/value maps: the handler's authoritative state and the emitter's cache.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// Authoritative state owned by a [`SyncHandler`](crate::SyncHandler).
/// Mutated only by `set` requests.
#[derive(Debug, Default)]
pub struct SyncState {
    values: RwLock<HashMap<String, Value>>,
}

impl SyncState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, or `None` when the key was never set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Store `value`, returning the previous one.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.write().insert(key.into(), value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Sorted keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Last-known values held by a [`SyncEmitter`](crate::SyncEmitter).
///
/// Filled only from `update` broadcasts and never invalidated, so a value is
/// as fresh as the last broadcast that reached this node.
#[derive(Debug, Default)]
pub struct LocalCache {
    values: RwLock<HashMap<String, Value>>,
}

impl LocalCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cached `null` is still a hit.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.values.write().insert(key.into(), value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    pub fn clear(&self) {
        self.values.write().clear();
    }
}
