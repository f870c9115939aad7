use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{error, warn};

use crate::models::SendMessage;

/// A live client connection and the room it is bound to, if any.
///
/// A connection that cannot take a frame is closed rather than left behind:
/// once closed, the socket task ends the session and the client has to
/// reconnect and rejoin for a fresh snapshot.
#[derive(Debug)]
pub struct ConnCtx {
    pub id: String,
    tx: mpsc::Sender<Arc<String>>,
    room: Mutex<Option<String>>,
    dropped: AtomicU64,
    closed: CancellationToken,
}

impl ConnCtx {
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            room: Mutex::new(None),
            dropped: AtomicU64::new(0),
            closed: CancellationToken::new(),
        }
    }

    pub fn room(&self) -> Option<String> {
        self.room.lock().clone()
    }

    pub fn set_room(&self, code: String) {
        *self.room.lock() = Some(code);
    }

    /// Unbind from `code`. Returns `false` if bound elsewhere or not at all.
    pub fn release_room(&self, code: &str) -> bool {
        let mut room = self.room.lock();
        if room.as_deref() == Some(code) {
            *room = None;
            true
        } else {
            false
        }
    }

    /// Queue an already-encoded frame without waiting.
    ///
    /// Returns `false` when the queue is full or the socket writer is gone.
    /// Either way the connection is closed, since it has missed a frame.
    pub fn send_raw(&self, frame: Arc<String>) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(conn_id = %self.id, "outbound queue full, closing connection");
                self.close();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                self.close();
                false
            }
        }
    }

    /// Encode and queue a direct reply to this connection.
    pub fn send(&self, msg: &SendMessage) -> bool {
        match serde_json::to_string(msg) {
            Ok(json) => self.send_raw(Arc::new(json)),
            Err(e) => {
                error!(conn_id = %self.id, event = msg.kind(), "failed to serialize event: {}", e);
                false
            }
        }
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection has been closed.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }
}
