//! Correlation Table.
//!
//! Maps locally allocated correlation ids to pending request state and
//! enforces the node's outstanding-request budget.
//!
//! An id is in the table exactly while a response or final timeout is still
//! outstanding for it. Whoever removes an entry owns its single terminal
//! outcome; a second removal finds nothing.

use crate::error::RequestError;
use bytes::Bytes;
use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use shared_types::{CorrelationId, NodeConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::debug;

/// Delivers the terminal outcome of a request.
pub type Completion = oneshot::Sender<Result<Value, RequestError>>;

/// Where a relayed request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Transport identity of the upstream caller.
    pub identity: Bytes,
    /// The caller's own correlation id.
    pub request_id: CorrelationId,
    /// Backend pool the request was forwarded to.
    pub service: String,
}

/// State held for one outstanding request.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: CorrelationId,
    pub name: String,
    /// Absent on relay entries, which answer through `origin` instead.
    pub completion: Option<Completion>,
    pub origin: Option<Origin>,
    timer: Option<AbortHandle>,
    pub created_at: Instant,
}

impl PendingRequest {
    #[must_use]
    pub fn awaiting(id: CorrelationId, name: impl Into<String>, completion: Completion) -> Self {
        Self {
            id,
            name: name.into(),
            completion: Some(completion),
            origin: None,
            timer: None,
            created_at: Instant::now(),
        }
    }

    /// Entry whose completion is moved in after admission.
    #[must_use]
    pub fn unbound(id: CorrelationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            completion: None,
            origin: None,
            timer: None,
            created_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn relayed(id: CorrelationId, name: impl Into<String>, origin: Origin) -> Self {
        Self {
            id,
            name: name.into(),
            completion: None,
            origin: Some(origin),
            timer: None,
            created_at: Instant::now(),
        }
    }

    /// Stop the timeout timer, if one is running.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Deliver the terminal outcome. Relay entries have nobody to tell.
    pub fn complete(mut self, outcome: Result<Value, RequestError>) {
        self.cancel_timer();
        if let Some(completion) = self.completion.take() {
            // The caller may have stopped waiting.
            let _ = completion.send(outcome);
        }
    }
}

/// Admission failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// `count() == cap`.
    AtCapacity,
    /// Every random draw collided with a pending id.
    Exhausted,
}

impl From<Admission> for RequestError {
    fn from(_: Admission) -> Self {
        Self::TooManyRequests
    }
}

/// Statistics for the correlation table
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests admitted
    pub total_registered: AtomicU64,
    /// Total requests resolved by a response
    pub total_completed: AtomicU64,
    /// Total timer expiries (including ones followed by a retry)
    pub total_timeouts: AtomicU64,
    /// Total admissions refused
    pub total_rejected: AtomicU64,
    /// Total responses for ids not in the table
    pub total_stray: AtomicU64,
}

/// Per-node map from correlation id to pending request.
pub struct CorrelationTable {
    entries: Mutex<HashMap<CorrelationId, PendingRequest>>,
    cap: usize,
    digits: usize,
    tries: usize,
    stats: PendingStats,
}

impl std::fmt::Debug for CorrelationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationTable")
            .field("count", &self.count())
            .field("cap", &self.cap)
            .field("digits", &self.digits)
            .finish_non_exhaustive()
    }
}

impl CorrelationTable {
    #[must_use]
    pub fn new(cap: usize, digits: usize, tries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            cap,
            digits,
            tries: tries.max(1),
            stats: PendingStats::default(),
        }
    }

    #[must_use]
    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.max_pending, config.id_digits, config.id_tries)
    }

    #[must_use]
    pub fn cap(&self) -> usize {
        self.cap
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    fn draw(
        &self,
        entries: &HashMap<CorrelationId, PendingRequest>,
        rng: &mut impl Rng,
    ) -> Result<CorrelationId, Admission> {
        if entries.len() >= self.cap {
            return Err(Admission::AtCapacity);
        }
        (0..self.tries)
            .map(|_| CorrelationId::random_with(rng, self.digits))
            .find(|id| !entries.contains_key(id))
            .ok_or(Admission::Exhausted)
    }

    /// Pick an id not currently pending. Does not reserve it.
    ///
    /// # Errors
    ///
    /// Returns [`Admission`] when the table is full or every draw collided.
    pub fn allocate(&self) -> Result<CorrelationId, Admission> {
        let entries = self.entries.lock();
        self.draw(&entries, &mut rand::thread_rng())
    }

    /// Insert an entry under its own id.
    ///
    /// # Errors
    ///
    /// Hands the entry back if the id is already pending or the table is
    /// full.
    pub fn insert(&self, pending: PendingRequest) -> Result<(), PendingRequest> {
        let mut entries = self.entries.lock();
        if entries.len() >= self.cap || entries.contains_key(&pending.id) {
            return Err(pending);
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        entries.insert(pending.id.clone(), pending);
        Ok(())
    }

    /// Allocate an id and insert the entry built for it in one step.
    ///
    /// `build` is only called once admission succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Admission`] when the table is full or every draw collided.
    pub fn admit<F>(&self, build: F) -> Result<CorrelationId, Admission>
    where
        F: FnOnce(CorrelationId) -> PendingRequest,
    {
        let mut entries = self.entries.lock();
        let id = match self.draw(&entries, &mut rand::thread_rng()) {
            Ok(id) => id,
            Err(refused) => {
                self.stats.total_rejected.fetch_add(1, Ordering::Relaxed);
                debug!(?refused, pending = entries.len(), "admission refused");
                return Err(refused);
            }
        };
        let mut pending = build(id.clone());
        pending.id = id.clone();
        entries.insert(id.clone(), pending);
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    /// Remove an entry. The caller owns its terminal outcome.
    pub fn remove(&self, id: &CorrelationId) -> Option<PendingRequest> {
        self.entries.lock().remove(id)
    }

    /// Attach a running timer. Returns false if the entry is already gone, in
    /// which case the caller must stop the timer.
    pub fn attach_timer(&self, id: &CorrelationId, timer: AbortHandle) -> bool {
        match self.entries.lock().get_mut(id) {
            Some(entry) => {
                entry.timer = Some(timer);
                true
            }
            None => false,
        }
    }

    /// Remove every entry, stopping their timers.
    pub fn drain(&self) -> Vec<PendingRequest> {
        let drained: Vec<_> = self.entries.lock().drain().map(|(_, p)| p).collect();
        drained
            .into_iter()
            .map(|mut p| {
                p.cancel_timer();
                p
            })
            .collect()
    }

    /// Count an entry resolved by a response.
    pub fn record_completed(&self) {
        self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a timer expiry.
    pub fn record_timeout(&self) {
        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a response whose id was not pending.
    pub fn record_stray(&self) {
        self.stats.total_stray.fetch_add(1, Ordering::Relaxed);
    }
}
