//! Transport context: the in-process endpoint registry.

use crate::error::TransportError;
use crate::pipe::InprocPipe;
use crate::socket::{new_peer_id, PeerId, Socket, SocketCore, SocketKind};
use crate::DEFAULT_HIGH_WATER_MARK;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// A connect issued before anything bound the endpoint.
struct PendingConnect {
    connector: Weak<SocketCore>,
    pipe: Arc<InprocPipe>,
    /// Identity the connector uses for the future binder.
    binder_id: PeerId,
}

#[derive(Default)]
struct InprocRegistry {
    bound: HashMap<String, Weak<SocketCore>>,
    pending: HashMap<String, Vec<PendingConnect>>,
}

impl InprocRegistry {
    /// Forget connects whose pipe closed before anything bound the name.
    /// A lingering backlog keeps its pipe open and its entry.
    fn prune_pending(&mut self) {
        self.pending.retain(|_, connects| {
            connects.retain(|c| !c.pipe.is_closed());
            !connects.is_empty()
        });
    }
}

struct ContextInner {
    high_water_mark: usize,
    inproc: Mutex<InprocRegistry>,
}

/// Factory for sockets. `inproc://` endpoints are only visible to sockets
/// created from the same context.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("high_water_mark", &self.inner.high_water_mark)
            .finish_non_exhaustive()
    }
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::with_high_water_mark(DEFAULT_HIGH_WATER_MARK)
    }

    /// Bound every queue (socket inboxes, pipe backlogs) to `high_water_mark`
    /// messages.
    #[must_use]
    pub fn with_high_water_mark(high_water_mark: usize) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                high_water_mark: high_water_mark.max(1),
                inproc: Mutex::new(InprocRegistry::default()),
            }),
        }
    }

    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.inner.high_water_mark
    }

    #[must_use]
    pub fn socket(&self, kind: SocketKind) -> Socket {
        Socket::new(self.clone(), kind)
    }

    pub(crate) fn bind_inproc(
        &self,
        name: &str,
        binder: &Arc<SocketCore>,
    ) -> Result<(), TransportError> {
        // Declared before the guard so upgraded sockets drop after it: the
        // last handle's drop unbinds, which takes the registry lock.
        let mut held: Vec<Arc<SocketCore>> = Vec::new();
        let mut registry = self.inner.inproc.lock();
        if let Some(existing) = registry.bound.get(name).and_then(Weak::upgrade) {
            let taken = !existing.is_closed();
            held.push(existing);
            if taken {
                return Err(TransportError::AddressInUse(format!("inproc://{name}")));
            }
        }
        registry
            .bound
            .insert(name.to_owned(), Arc::downgrade(binder));

        let waiting = registry.pending.remove(name).unwrap_or_default();
        debug!(endpoint = name, waiting = waiting.len(), "inproc bound");
        for connect in waiting {
            if connect.pipe.is_closed() {
                continue;
            }
            let connector_id = new_peer_id();
            if let Some(connector) = connect.connector.upgrade() {
                if !connector.is_closed() {
                    let reverse =
                        InprocPipe::attached(connector.inbox(), connect.binder_id.clone());
                    binder.add_peer(connector_id.clone(), Arc::new(reverse));
                }
                held.push(connector);
            }
            connect.pipe.attach(binder.inbox(), connector_id);
        }
        drop(registry);
        drop(held);
        Ok(())
    }

    pub(crate) fn connect_inproc(&self, name: &str, connector: &Arc<SocketCore>) {
        let mut held: Vec<Arc<SocketCore>> = Vec::new();
        let mut registry = self.inner.inproc.lock();
        registry.prune_pending();
        let binder = registry.bound.get(name).and_then(Weak::upgrade);
        let binder_id = new_peer_id();

        match binder {
            Some(binder) if !binder.is_closed() => {
                let connector_id = new_peer_id();
                let forward = InprocPipe::attached(binder.inbox(), connector_id.clone());
                let reverse = InprocPipe::attached(connector.inbox(), binder_id.clone());
                connector.add_peer(binder_id, Arc::new(forward));
                binder.add_peer(connector_id, Arc::new(reverse));
                held.push(binder);
            }
            stale => {
                held.extend(stale);
                let pipe = Arc::new(InprocPipe::pending(self.inner.high_water_mark));
                connector.add_peer(binder_id.clone(), pipe.clone());
                registry
                    .pending
                    .entry(name.to_owned())
                    .or_default()
                    .push(PendingConnect {
                        connector: Arc::downgrade(connector),
                        pipe,
                        binder_id,
                    });
            }
        }
        drop(registry);
        drop(held);
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.inner.inproc.lock().pending.values().map(Vec::len).sum()
    }

    pub(crate) fn unbind_inproc(&self, name: &str, binder: &SocketCore) {
        let mut registry = self.inner.inproc.lock();
        let owned = registry
            .bound
            .get(name)
            .is_some_and(|w| std::ptr::eq(w.as_ptr(), binder));
        if owned {
            registry.bound.remove(name);
        }
    }
}
