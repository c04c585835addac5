//! Batch drain loop for inbound sockets.

use crate::socket::Socket;
use shared_types::Multipart;
use tracing::debug;

/// Receive until the socket closes, handing every message to `handler`.
///
/// Each wake-up drains at most `batch` already-queued messages without
/// waiting, then yields to the scheduler before waiting again.
pub async fn pump<F>(socket: Socket, batch: usize, mut handler: F)
where
    F: FnMut(Multipart),
{
    let batch = batch.max(1);
    loop {
        let first = match socket.recv().await {
            Ok(msg) => msg,
            Err(_) => break,
        };
        handler(first);
        for _ in 1..batch {
            match socket.try_recv() {
                Ok(Some(msg)) => handler(msg),
                Ok(None) | Err(_) => break,
            }
        }
        tokio::task::yield_now().await;
    }
    debug!(kind = socket.kind().name(), "pump stopped");
}
