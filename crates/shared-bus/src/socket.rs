//! # Sockets
//!
//! Four roles over one core:
//!
//! | Kind     | send                               | recv                         |
//! |----------|------------------------------------|------------------------------|
//! | `Router` | first frame selects the peer       | sender identity prepended    |
//! | `Dealer` | round-robin, skipping full peers   | as received                  |
//! | `Pub`    | every peer                         | never                        |
//! | `Sub`    | unsupported                        | first frame prefix-filtered  |
//!
//! Sends never wait. Receives wait for readability and can be drained without
//! waiting through [`Socket::try_recv`].

use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::pipe::Pipe;
use crate::stream::StreamPipe;
use bytes::Bytes;
use parking_lot::Mutex;
use shared_types::{Linger, Multipart};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Transport-assigned identity of a connected peer.
pub type PeerId = Bytes;

pub(crate) type Inbound = (PeerId, Multipart);

pub(crate) fn new_peer_id() -> PeerId {
    Bytes::copy_from_slice(Uuid::new_v4().as_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// Identity-routed fan-in.
    Router,
    /// Round-robin fan-out.
    Dealer,
    Pub,
    Sub,
}

impl SocketKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Dealer => "dealer",
            Self::Pub => "pub",
            Self::Sub => "sub",
        }
    }
}

#[derive(Default)]
struct PeerTable {
    order: Vec<PeerId>,
    pipes: HashMap<PeerId, Arc<dyn Pipe>>,
    cursor: usize,
}

impl PeerTable {
    fn remove(&mut self, peer: &PeerId) {
        if self.pipes.remove(peer).is_some() {
            self.order.retain(|p| p != peer);
        }
    }
}

struct Listener {
    task: AbortHandle,
    #[cfg_attr(not(unix), allow(dead_code))]
    path: Option<std::path::PathBuf>,
}

pub(crate) struct SocketCore {
    kind: SocketKind,
    ctx: Context,
    inbox_tx: mpsc::Sender<Inbound>,
    inbox_rx: tokio::sync::Mutex<mpsc::Receiver<Inbound>>,
    peers: Mutex<PeerTable>,
    subscriptions: Mutex<Vec<Bytes>>,
    linger: Mutex<Linger>,
    closed: watch::Sender<bool>,
    inproc_names: Mutex<Vec<String>>,
    listeners: Mutex<Vec<Listener>>,
    last_endpoint: Mutex<Option<String>>,
}

impl SocketCore {
    pub(crate) fn inbox(&self) -> mpsc::Sender<Inbound> {
        self.inbox_tx.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub(crate) fn add_peer(&self, peer: PeerId, pipe: Arc<dyn Pipe>) {
        let mut table = self.peers.lock();
        table.order.push(peer.clone());
        table.pipes.insert(peer, pipe);
    }

    pub(crate) fn remove_peer(&self, peer: &PeerId) {
        self.peers.lock().remove(peer);
    }

    /// Apply per-kind receive rules.
    fn accept(&self, (peer, mut msg): Inbound) -> Option<Multipart> {
        match self.kind {
            SocketKind::Router => {
                msg.insert(0, peer);
                Some(msg)
            }
            SocketKind::Sub => {
                let topic = msg.first()?;
                let matched = self
                    .subscriptions
                    .lock()
                    .iter()
                    .any(|prefix| topic.starts_with(prefix.as_ref()));
                matched.then_some(msg)
            }
            SocketKind::Dealer => Some(msg),
            SocketKind::Pub => None,
        }
    }

    fn shutdown(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        for name in self.inproc_names.lock().drain(..) {
            self.ctx.unbind_inproc(&name, self);
        }
        for listener in self.listeners.lock().drain(..) {
            listener.task.abort();
            #[cfg(unix)]
            if let Some(path) = listener.path {
                let _ = std::fs::remove_file(path);
            }
        }

        let linger = *self.linger.lock();
        let pipes: Vec<Arc<dyn Pipe>> = {
            let mut table = self.peers.lock();
            table.order.clear();
            table.pipes.drain().map(|(_, pipe)| pipe).collect()
        };
        for pipe in &pipes {
            pipe.shutdown(linger);
        }
        if let Linger::For(grace) = linger {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        tokio::time::sleep(grace).await;
                        for pipe in pipes {
                            pipe.expire();
                        }
                    });
                }
                Err(_) => pipes.iter().for_each(|pipe| pipe.expire()),
            }
        }

        if let Ok(mut rx) = self.inbox_rx.try_lock() {
            rx.close();
        }
        info!(kind = self.kind.name(), "socket closed");
    }
}

impl Drop for SocketCore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A message socket. Clones share the same underlying socket.
#[derive(Clone)]
pub struct Socket {
    core: Arc<SocketCore>,
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("kind", &self.core.kind)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Socket {
    pub(crate) fn new(ctx: Context, kind: SocketKind) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(ctx.high_water_mark());
        let (closed, _) = watch::channel(false);
        Self {
            core: Arc::new(SocketCore {
                kind,
                ctx,
                inbox_tx,
                inbox_rx: tokio::sync::Mutex::new(inbox_rx),
                peers: Mutex::new(PeerTable::default()),
                subscriptions: Mutex::new(Vec::new()),
                linger: Mutex::new(Linger::default()),
                closed,
                inproc_names: Mutex::new(Vec::new()),
                listeners: Mutex::new(Vec::new()),
                last_endpoint: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SocketKind {
        self.core.kind
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Number of attached or pending peers.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.core.peers.lock().order.len()
    }

    /// The most recently bound endpoint, with any wildcard port resolved.
    #[must_use]
    pub fn last_endpoint(&self) -> Option<String> {
        self.core.last_endpoint.lock().clone()
    }

    pub fn set_linger(&self, linger: Linger) {
        *self.core.linger.lock() = linger;
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    /// Bind to `url`. Takes effect immediately; no I/O wait.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for a malformed URL, an address in use, or
    /// a closed socket.
    pub fn bind(&self, url: &str) -> Result<(), TransportError> {
        self.ensure_open()?;
        let resolved = match url.parse::<Endpoint>()? {
            Endpoint::Inproc(name) => {
                self.core.ctx.bind_inproc(&name, &self.core)?;
                self.core.inproc_names.lock().push(name);
                url.to_owned()
            }
            Endpoint::Tcp(addr) => {
                let std_listener = std::net::TcpListener::bind(&addr).map_err(|e| in_use(e, url))?;
                std_listener.set_nonblocking(true)?;
                let local = std_listener.local_addr()?;
                let listener = tokio::net::TcpListener::from_std(std_listener)?;
                let task = spawn_tcp_accept(Arc::downgrade(&self.core), listener);
                self.core.listeners.lock().push(Listener { task, path: None });
                format!("tcp://{local}")
            }
            #[cfg(unix)]
            Endpoint::Ipc(path) => {
                let _ = std::fs::remove_file(&path);
                let std_listener =
                    std::os::unix::net::UnixListener::bind(&path).map_err(|e| in_use(e, url))?;
                std_listener.set_nonblocking(true)?;
                let listener = tokio::net::UnixListener::from_std(std_listener)?;
                let task = spawn_unix_accept(Arc::downgrade(&self.core), listener);
                self.core.listeners.lock().push(Listener {
                    task,
                    path: Some(path),
                });
                url.to_owned()
            }
            #[cfg(not(unix))]
            Endpoint::Ipc(_) => return Err(TransportError::Unsupported("ipc")),
        };
        info!(kind = self.kind().name(), endpoint = %resolved, "socket bound");
        *self.core.last_endpoint.lock() = Some(resolved);
        Ok(())
    }

    /// Connect to `url`. The peer need not be bound yet; messages queue until
    /// it is.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for a malformed URL or a closed socket.
    pub fn connect(&self, url: &str) -> Result<(), TransportError> {
        self.ensure_open()?;
        match url.parse::<Endpoint>()? {
            Endpoint::Inproc(name) => self.core.ctx.connect_inproc(&name, &self.core),
            #[cfg(not(unix))]
            Endpoint::Ipc(_) => return Err(TransportError::Unsupported("ipc")),
            endpoint => {
                let peer = new_peer_id();
                let pipe = StreamPipe::dial(
                    endpoint,
                    self.core.inbox(),
                    peer.clone(),
                    self.core.ctx.high_water_mark(),
                );
                self.core.add_peer(peer, Arc::new(pipe));
            }
        }
        info!(kind = self.kind().name(), endpoint = url, "socket connected");
        Ok(())
    }

    /// Queue a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the message was not accepted.
    pub fn try_send(&self, msg: Multipart) -> Result<(), TransportError> {
        self.ensure_open()?;
        match self.core.kind {
            SocketKind::Router => self.send_routed(msg),
            SocketKind::Dealer => self.send_round_robin(msg),
            SocketKind::Pub => self.send_fanout(msg),
            SocketKind::Sub => Err(TransportError::Unsupported("sub")),
        }
    }

    fn send_routed(&self, msg: Multipart) -> Result<(), TransportError> {
        let mut frames = msg.into_iter();
        let identity = frames.next().ok_or(TransportError::Unroutable)?;
        let pipe = self
            .core
            .peers
            .lock()
            .pipes
            .get(&identity)
            .cloned()
            .ok_or(TransportError::Unroutable)?;
        match pipe.try_deliver(frames.collect()) {
            Err(TransportError::Closed) => {
                self.core.remove_peer(&identity);
                Err(TransportError::Unroutable)
            }
            other => other,
        }
    }

    fn send_round_robin(&self, msg: Multipart) -> Result<(), TransportError> {
        let mut table = self.core.peers.lock();
        let n = table.order.len();
        if n == 0 {
            return Err(TransportError::NoPeers);
        }
        let mut dead = Vec::new();
        let mut delivered = None;
        for step in 0..n {
            let idx = (table.cursor + step) % n;
            let peer = &table.order[idx];
            let Some(pipe) = table.pipes.get(peer) else {
                continue;
            };
            match pipe.try_deliver(msg.clone()) {
                Ok(()) => {
                    delivered = Some(idx);
                    break;
                }
                Err(TransportError::Saturated) => {}
                Err(_) => dead.push(peer.clone()),
            }
        }
        if let Some(idx) = delivered {
            table.cursor = idx + 1;
        }
        for peer in &dead {
            table.remove(peer);
        }
        if !table.order.is_empty() {
            table.cursor %= table.order.len();
        }
        match delivered {
            Some(_) => Ok(()),
            None if table.order.is_empty() => Err(TransportError::NoPeers),
            None => Err(TransportError::Saturated),
        }
    }

    fn send_fanout(&self, msg: Multipart) -> Result<(), TransportError> {
        let mut table = self.core.peers.lock();
        let mut saturated = 0usize;
        let mut dead = Vec::new();
        for peer in &table.order {
            let Some(pipe) = table.pipes.get(peer) else {
                continue;
            };
            match pipe.try_deliver(msg.clone()) {
                Ok(()) => {}
                Err(TransportError::Saturated) => saturated += 1,
                Err(_) => dead.push(peer.clone()),
            }
        }
        for peer in &dead {
            table.remove(peer);
        }
        if saturated > 0 {
            debug!(saturated, "publish hit full subscriber queues");
            Err(TransportError::Saturated)
        } else {
            Ok(())
        }
    }

    /// Wait for the next message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the socket is closed.
    pub async fn recv(&self) -> Result<Multipart, TransportError> {
        let mut closed = self.core.closed.subscribe();
        let mut rx = self.core.inbox_rx.lock().await;
        loop {
            if *closed.borrow_and_update() {
                rx.close();
                return Err(TransportError::Closed);
            }
            let inbound = tokio::select! {
                biased;
                _ = closed.changed() => continue,
                inbound = rx.recv() => inbound,
            };
            match inbound {
                Some(inbound) => {
                    if let Some(msg) = self.core.accept(inbound) {
                        return Ok(msg);
                    }
                }
                None => return Err(TransportError::Closed),
            }
        }
    }

    /// Take the next message if one is ready.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the socket is closed.
    pub fn try_recv(&self) -> Result<Option<Multipart>, TransportError> {
        self.ensure_open()?;
        let Ok(mut rx) = self.core.inbox_rx.try_lock() else {
            return Ok(None);
        };
        loop {
            match rx.try_recv() {
                Ok(inbound) => {
                    if let Some(msg) = self.core.accept(inbound) {
                        return Ok(Some(msg));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(TransportError::Closed),
            }
        }
    }

    /// Deliver messages whose first frame starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unsupported`] on anything but a `Sub` socket.
    pub fn subscribe(&self, prefix: impl AsRef<[u8]>) -> Result<(), TransportError> {
        if self.core.kind != SocketKind::Sub {
            return Err(TransportError::Unsupported(self.core.kind.name()));
        }
        self.core
            .subscriptions
            .lock()
            .push(Bytes::copy_from_slice(prefix.as_ref()));
        Ok(())
    }

    /// Remove one matching subscription.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unsupported`] on anything but a `Sub` socket.
    pub fn unsubscribe(&self, prefix: impl AsRef<[u8]>) -> Result<(), TransportError> {
        if self.core.kind != SocketKind::Sub {
            return Err(TransportError::Unsupported(self.core.kind.name()));
        }
        let mut subs = self.core.subscriptions.lock();
        if let Some(pos) = subs.iter().position(|s| s.as_ref() == prefix.as_ref()) {
            subs.remove(pos);
        }
        Ok(())
    }

    /// Release the socket. Unsent data is kept per the linger setting.
    pub fn close(&self) {
        self.core.shutdown();
    }
}

fn in_use(err: std::io::Error, url: &str) -> TransportError {
    if err.kind() == std::io::ErrorKind::AddrInUse {
        TransportError::AddressInUse(url.to_owned())
    } else {
        TransportError::Io(err)
    }
}

/// Register an accepted stream as a peer. Returns false once the socket is
/// gone.
fn adopt<S>(weak: &Weak<SocketCore>, stream: S) -> bool
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
{
    let Some(core) = weak.upgrade().filter(|c| !c.is_closed()) else {
        return false;
    };
    let peer = new_peer_id();
    let on_close = {
        let weak = weak.clone();
        let peer = peer.clone();
        move || {
            if let Some(core) = weak.upgrade() {
                core.remove_peer(&peer);
            }
        }
    };
    let pipe = StreamPipe::accepted(
        stream,
        core.inbox(),
        peer.clone(),
        core.ctx.high_water_mark(),
        on_close,
    );
    core.add_peer(peer, Arc::new(pipe));
    true
}

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

fn spawn_tcp_accept(weak: Weak<SocketCore>, listener: tokio::net::TcpListener) -> AbortHandle {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, remote)) => {
                    let _ = stream.set_nodelay(true);
                    debug!(%remote, "accepted tcp peer");
                    if !adopt(&weak, stream) {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "tcp accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    })
    .abort_handle()
}

#[cfg(unix)]
fn spawn_unix_accept(weak: Weak<SocketCore>, listener: tokio::net::UnixListener) -> AbortHandle {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    debug!("accepted ipc peer");
                    if !adopt(&weak, stream) {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "ipc accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    })
    .abort_handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn frames(parts: &[&'static str]) -> Multipart {
        parts.iter().map(|p| Bytes::from_static(p.as_bytes())).collect()
    }

    async fn recv(socket: &Socket) -> Multipart {
        timeout(WAIT, socket.recv()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_dealer_router_round_trip() {
        let ctx = Context::new();
        let router = ctx.socket(SocketKind::Router);
        let dealer = ctx.socket(SocketKind::Dealer);
        router.bind("inproc://rt").unwrap();
        dealer.connect("inproc://rt").unwrap();

        dealer.try_send(frames(&["hello"])).unwrap();
        let msg = recv(&router).await;
        assert_eq!(msg.len(), 2);
        assert_eq!(msg[1], Bytes::from_static(b"hello"));

        let mut reply = vec![msg[0].clone()];
        reply.push(Bytes::from_static(b"world"));
        router.try_send(reply).unwrap();
        assert_eq!(recv(&dealer).await, frames(&["world"]));
    }

    #[tokio::test]
    async fn test_connect_before_bind_queues() {
        let ctx = Context::new();
        let dealer = ctx.socket(SocketKind::Dealer);
        dealer.connect("inproc://late").unwrap();
        dealer.try_send(frames(&["early"])).unwrap();

        let router = ctx.socket(SocketKind::Router);
        router.bind("inproc://late").unwrap();
        let msg = recv(&router).await;
        assert_eq!(msg[1], Bytes::from_static(b"early"));

        router.try_send(vec![msg[0].clone(), Bytes::from_static(b"ack")]).unwrap();
        assert_eq!(recv(&dealer).await, frames(&["ack"]));
    }

    #[tokio::test]
    async fn test_dealer_round_robin() {
        let ctx = Context::new();
        let a = ctx.socket(SocketKind::Router);
        let b = ctx.socket(SocketKind::Router);
        a.bind("inproc://a").unwrap();
        b.bind("inproc://b").unwrap();
        let dealer = ctx.socket(SocketKind::Dealer);
        dealer.connect("inproc://a").unwrap();
        dealer.connect("inproc://b").unwrap();

        for _ in 0..4 {
            dealer.try_send(frames(&["x"])).unwrap();
        }
        let mut got_a = 0;
        while a.try_recv().unwrap().is_some() {
            got_a += 1;
        }
        let mut got_b = 0;
        while b.try_recv().unwrap().is_some() {
            got_b += 1;
        }
        assert_eq!((got_a, got_b), (2, 2));
    }

    #[tokio::test]
    async fn test_saturation_is_reported() {
        let ctx = Context::with_high_water_mark(2);
        let router = ctx.socket(SocketKind::Router);
        router.bind("inproc://full").unwrap();
        let dealer = ctx.socket(SocketKind::Dealer);
        dealer.connect("inproc://full").unwrap();

        dealer.try_send(frames(&["1"])).unwrap();
        dealer.try_send(frames(&["2"])).unwrap();
        assert!(matches!(
            dealer.try_send(frames(&["3"])),
            Err(TransportError::Saturated)
        ));
    }

    #[tokio::test]
    async fn test_dealer_without_peers() {
        let dealer = Context::new().socket(SocketKind::Dealer);
        assert!(matches!(
            dealer.try_send(frames(&["x"])),
            Err(TransportError::NoPeers)
        ));
    }

    #[tokio::test]
    async fn test_router_unknown_identity() {
        let router = Context::new().socket(SocketKind::Router);
        assert!(matches!(
            router.try_send(frames(&["nobody", "x"])),
            Err(TransportError::Unroutable)
        ));
    }

    #[tokio::test]
    async fn test_pub_sub_prefix_filter() {
        let ctx = Context::new();
        let publisher = ctx.socket(SocketKind::Pub);
        publisher.bind("inproc://bus").unwrap();
        let sub = ctx.socket(SocketKind::Sub);
        sub.connect("inproc://bus").unwrap();
        sub.subscribe("update").unwrap();

        publisher.try_send(frames(&["other", "1"])).unwrap();
        publisher.try_send(frames(&["update", "2"])).unwrap();
        assert_eq!(recv(&sub).await, frames(&["update", "2"]));
        assert!(sub.try_recv().unwrap().is_none());

        sub.unsubscribe("update").unwrap();
        publisher.try_send(frames(&["update", "3"])).unwrap();
        assert!(sub.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sub_cannot_send() {
        let sub = Context::new().socket(SocketKind::Sub);
        assert!(matches!(
            sub.try_send(frames(&["x"])),
            Err(TransportError::Unsupported("sub"))
        ));
        let dealer = Context::new().socket(SocketKind::Dealer);
        assert!(dealer.subscribe("x").is_err());
    }

    #[tokio::test]
    async fn test_double_bind_in_use() {
        let ctx = Context::new();
        let a = ctx.socket(SocketKind::Router);
        let b = ctx.socket(SocketKind::Router);
        a.bind("inproc://same").unwrap();
        assert!(matches!(
            b.bind("inproc://same"),
            Err(TransportError::AddressInUse(_))
        ));
        a.close();
        assert!(b.bind("inproc://same").is_ok());
    }

    #[tokio::test]
    async fn test_close_wakes_receiver() {
        let socket = Context::new().socket(SocketKind::Dealer);
        let waiter = socket.clone();
        let handle = tokio::spawn(async move { waiter.recv().await });
        tokio::task::yield_now().await;
        socket.close();
        let result = timeout(WAIT, handle).await.unwrap().unwrap();
        assert!(matches!(result, Err(TransportError::Closed)));
        assert!(matches!(
            socket.try_send(frames(&["x"])),
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_lingering_backlog_reaches_late_binder() {
        let ctx = Context::new();
        let dealer = ctx.socket(SocketKind::Dealer);
        dealer.set_linger(Linger::Unbounded);
        dealer.connect("inproc://linger").unwrap();
        dealer.try_send(frames(&["kept"])).unwrap();
        dealer.close();

        let router = ctx.socket(SocketKind::Router);
        router.bind("inproc://linger").unwrap();
        assert_eq!(recv(&router).await[1], Bytes::from_static(b"kept"));
    }

    #[tokio::test]
    async fn test_discard_linger_drops_backlog() {
        let ctx = Context::new();
        let dealer = ctx.socket(SocketKind::Dealer);
        dealer.set_linger(Linger::Discard);
        dealer.connect("inproc://discard").unwrap();
        dealer.try_send(frames(&["lost"])).unwrap();
        dealer.close();

        let router = ctx.socket(SocketKind::Router);
        router.bind("inproc://discard").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(router.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let ctx = Context::new();
        let router = ctx.socket(SocketKind::Router);
        router.bind("tcp://127.0.0.1:0").unwrap();
        let url = router.last_endpoint().unwrap();

        let dealer = ctx.socket(SocketKind::Dealer);
        dealer.connect(&url).unwrap();
        dealer.try_send(frames(&["ping", ""])).unwrap();

        let msg = recv(&router).await;
        assert_eq!(&msg[1..], &frames(&["ping", ""])[..]);
        router
            .try_send(vec![msg[0].clone(), Bytes::from_static(b"pong")])
            .unwrap();
        assert_eq!(recv(&dealer).await, frames(&["pong"]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ipc_pub_sub() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("ipc://{}", dir.path().join("bus.sock").display());
        let ctx = Context::new();
        let publisher = ctx.socket(SocketKind::Pub);
        publisher.bind(&url).unwrap();
        let sub = ctx.socket(SocketKind::Sub);
        sub.subscribe("").unwrap();
        sub.connect(&url).unwrap();

        // The subscriber attaches asynchronously; publish until one arrives.
        let received = timeout(WAIT, async {
            loop {
                publisher.try_send(frames(&["t", "v"])).unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
                if let Some(msg) = sub.try_recv().unwrap() {
                    break msg;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(received, frames(&["t", "v"]));
    }
}
