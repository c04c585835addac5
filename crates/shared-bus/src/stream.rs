//! Stream transports (tcp, ipc).
//!
//! Each message is written as a little-endian `u32` frame count followed by
//! one `u32` length prefix per frame:
//!
//! ```text
//! [count: u32][len0: u32][frame0 ...][len1: u32][frame1 ...]...
//! ```
//!
//! Dialed pipes own a bounded outbox and reconnect after a dropped
//! connection, so messages queued while disconnected are sent once the peer
//! is reachable again.

use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::pipe::{map_try_send, Pipe};
use crate::socket::{Inbound, PeerId};
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use shared_types::{Linger, Multipart};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Largest message accepted from a stream, in bytes.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Most frames accepted in one message.
pub const MAX_FRAMES: usize = 1024;

const RECONNECT_MIN: Duration = Duration::from_millis(100);
const RECONNECT_MAX: Duration = Duration::from_secs(5);

pub(crate) async fn write_message<W>(writer: &mut W, msg: &[Bytes]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body: usize = msg.iter().map(|f| 4 + f.len()).sum();
    let mut buf = BytesMut::with_capacity(4 + body);
    buf.put_u32_le(frame_len(msg.len())?);
    for frame in msg {
        buf.put_u32_le(frame_len(frame.len())?);
        buf.put_slice(frame);
    }
    writer.write_all(&buf).await?;
    writer.flush().await
}

fn frame_len(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))
}

pub(crate) async fn read_message<R>(reader: &mut R) -> io::Result<Multipart>
where
    R: AsyncRead + Unpin,
{
    let count = reader.read_u32_le().await? as usize;
    if count > MAX_FRAMES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{count} frames exceeds limit"),
        ));
    }
    let mut total = 0usize;
    let mut msg = Vec::with_capacity(count);
    for _ in 0..count {
        let len = reader.read_u32_le().await? as usize;
        total = total.saturating_add(len);
        if total > MAX_MESSAGE_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "message exceeds size limit",
            ));
        }
        let mut frame = vec![0u8; len];
        reader.read_exact(&mut frame).await?;
        msg.push(Bytes::from(frame));
    }
    Ok(msg)
}

enum SessionEnd {
    /// The local side closed and every queued message was written.
    Drained,
    /// The connection dropped.
    Disconnected,
}

/// Pump one connection: inbound messages go to the socket inbox, the outbox
/// is written to the stream.
async fn run_session<S>(
    stream: S,
    inbox: &mpsc::Sender<Inbound>,
    peer: &PeerId,
    outbox: &mut mpsc::Receiver<Multipart>,
) -> SessionEnd
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let read_side = async {
        loop {
            match read_message(&mut reader).await {
                Ok(msg) => {
                    // A closed inbox means the socket is shutting down while
                    // its outbox drains; keep reading to notice disconnects.
                    let _ = inbox.send((peer.clone(), msg)).await;
                }
                Err(e) => {
                    debug!(error = %e, "stream read ended");
                    return SessionEnd::Disconnected;
                }
            }
        }
    };

    let write_side = async {
        while let Some(msg) = outbox.recv().await {
            if let Err(e) = write_message(&mut writer, &msg).await {
                debug!(error = %e, "stream write failed");
                return SessionEnd::Disconnected;
            }
        }
        let _ = writer.shutdown().await;
        SessionEnd::Drained
    };

    tokio::select! {
        end = read_side => end,
        end = write_side => end,
    }
}

/// One stream connection as seen by the owning socket.
pub(crate) struct StreamPipe {
    outbox: Mutex<Option<mpsc::Sender<Multipart>>>,
    task: Mutex<Option<AbortHandle>>,
}

impl StreamPipe {
    fn new(outbox: mpsc::Sender<Multipart>) -> Self {
        Self {
            outbox: Mutex::new(Some(outbox)),
            task: Mutex::new(None),
        }
    }

    fn set_task(&self, handle: AbortHandle) {
        *self.task.lock() = Some(handle);
    }

    /// Serve an accepted connection. `on_close` runs once it drops.
    pub(crate) fn accepted<S, F>(
        stream: S,
        inbox: mpsc::Sender<Inbound>,
        peer: PeerId,
        high_water_mark: usize,
        on_close: F,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel(high_water_mark.max(1));
        let pipe = Self::new(tx);
        let handle = tokio::spawn(async move {
            run_session(stream, &inbox, &peer, &mut rx).await;
            on_close();
        });
        pipe.set_task(handle.abort_handle());
        pipe
    }

    /// Dial `endpoint`, reconnecting with backoff until the pipe is shut
    /// down and drained.
    pub(crate) fn dial(
        endpoint: Endpoint,
        inbox: mpsc::Sender<Inbound>,
        peer: PeerId,
        high_water_mark: usize,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel(high_water_mark.max(1));
        let pipe = Self::new(tx);
        let handle = tokio::spawn(async move {
            let mut backoff = RECONNECT_MIN;
            loop {
                let end = match &endpoint {
                    Endpoint::Tcp(addr) => match tokio::net::TcpStream::connect(addr).await {
                        Ok(stream) => {
                            let _ = stream.set_nodelay(true);
                            Some(run_session(stream, &inbox, &peer, &mut rx).await)
                        }
                        Err(e) => {
                            debug!(addr = %addr, error = %e, "connect failed");
                            None
                        }
                    },
                    #[cfg(unix)]
                    Endpoint::Ipc(path) => match tokio::net::UnixStream::connect(path).await {
                        Ok(stream) => Some(run_session(stream, &inbox, &peer, &mut rx).await),
                        Err(e) => {
                            debug!(path = %path.display(), error = %e, "connect failed");
                            None
                        }
                    },
                    _ => {
                        warn!(?endpoint, "endpoint cannot be dialed");
                        return;
                    }
                };
                match end {
                    Some(SessionEnd::Drained) => return,
                    Some(SessionEnd::Disconnected) => backoff = RECONNECT_MIN,
                    None => {}
                }
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_MAX);
            }
        });
        pipe.set_task(handle.abort_handle());
        pipe
    }

    fn abort(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Pipe for StreamPipe {
    fn try_deliver(&self, msg: Multipart) -> Result<(), TransportError> {
        match &*self.outbox.lock() {
            Some(tx) => tx.try_send(msg).map_err(map_try_send),
            None => Err(TransportError::Closed),
        }
    }

    fn shutdown(&self, linger: Linger) {
        // Dropping the sender lets the session finish once the queue drains.
        self.outbox.lock().take();
        if linger == Linger::Discard {
            self.abort();
        }
    }

    fn expire(&self) {
        self.abort();
    }
}
