//! Pipes: one direction of a connection between two sockets.
//!
//! A socket holds one pipe per peer. Delivering into a pipe never waits; a
//! full queue is reported as [`TransportError::Saturated`].

use crate::error::TransportError;
use crate::socket::{Inbound, PeerId};
use parking_lot::Mutex;
use shared_types::{Linger, Multipart};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

pub(crate) trait Pipe: Send + Sync {
    /// Queue a message for the peer without waiting.
    fn try_deliver(&self, msg: Multipart) -> Result<(), TransportError>;

    /// Stop the pipe. Unsent data is kept unless `linger` discards it.
    fn shutdown(&self, linger: Linger);

    /// The linger period ran out: drop anything still unsent.
    fn expire(&self);
}

pub(crate) fn map_try_send<T>(err: TrySendError<T>) -> TransportError {
    match err {
        TrySendError::Full(_) => TransportError::Saturated,
        TrySendError::Closed(_) => TransportError::Closed,
    }
}

enum InprocState {
    /// Connected before the peer bound; messages wait here.
    Pending(VecDeque<Multipart>),
    /// Writes go straight into the peer's inbox tagged with `as_peer`.
    Attached {
        inbox: mpsc::Sender<Inbound>,
        as_peer: PeerId,
    },
    Closed,
}

/// In-process pipe writing directly into the peer socket's inbox.
pub(crate) struct InprocPipe {
    state: Mutex<InprocState>,
    high_water_mark: usize,
}

impl InprocPipe {
    pub(crate) fn attached(inbox: mpsc::Sender<Inbound>, as_peer: PeerId) -> Self {
        Self {
            state: Mutex::new(InprocState::Attached { inbox, as_peer }),
            high_water_mark: 0,
        }
    }

    pub(crate) fn pending(high_water_mark: usize) -> Self {
        Self {
            state: Mutex::new(InprocState::Pending(VecDeque::new())),
            high_water_mark,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), InprocState::Closed)
    }

    /// Bind completed: flush the backlog and switch to direct delivery.
    pub(crate) fn attach(&self, inbox: mpsc::Sender<Inbound>, as_peer: PeerId) {
        let mut state = self.state.lock();
        let backlog = match &mut *state {
            InprocState::Pending(queue) => std::mem::take(queue),
            InprocState::Attached { .. } | InprocState::Closed => return,
        };
        let mut dropped = 0usize;
        for msg in backlog {
            if inbox.try_send((as_peer.clone(), msg)).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(dropped, "inproc backlog exceeded peer queue on attach");
        }
        *state = InprocState::Attached { inbox, as_peer };
    }
}

impl Pipe for InprocPipe {
    fn try_deliver(&self, msg: Multipart) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        match &mut *state {
            InprocState::Pending(queue) => {
                if queue.len() >= self.high_water_mark {
                    return Err(TransportError::Saturated);
                }
                queue.push_back(msg);
                Ok(())
            }
            InprocState::Attached { inbox, as_peer } => inbox
                .try_send((as_peer.clone(), msg))
                .map_err(map_try_send),
            InprocState::Closed => Err(TransportError::Closed),
        }
    }

    fn shutdown(&self, linger: Linger) {
        let mut state = self.state.lock();
        match &*state {
            // The backlog stays reachable from the context until the peer
            // binds or the linger period ends.
            InprocState::Pending(queue) if !queue.is_empty() && linger != Linger::Discard => {
                debug!(queued = queue.len(), ?linger, "inproc backlog lingering");
            }
            _ => *state = InprocState::Closed,
        }
    }

    fn expire(&self) {
        let mut state = self.state.lock();
        if matches!(*state, InprocState::Pending(_)) {
            *state = InprocState::Closed;
        }
    }
}
