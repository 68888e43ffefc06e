//! Inbound message queue between a maintenance task and the reader.
//!
//! Bounded, so a reader that stops draining throttles the physical read
//! loop. The queue closes when the maintenance task drops its sender, which
//! only happens on permanent session termination.
//!
//! Entries are either messages or per-frame decode errors. An error entry
//! fails one read and leaves the session running.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constructor
// ============================================================================

/// Creates a queue holding at most `capacity` undelivered messages.
pub(crate) fn inbound_queue(capacity: usize) -> (InboundSender, InboundQueue) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        InboundSender { tx },
        InboundQueue {
            rx: Mutex::new(rx),
        },
    )
}

// ============================================================================
// InboundSender
// ============================================================================

/// Producer half, owned by the maintenance task.
#[derive(Debug)]
pub(crate) struct InboundSender {
    tx: mpsc::Sender<Result<String>>,
}

impl InboundSender {
    /// Enqueues `messages` in order, waiting for room when the queue is full.
    ///
    /// Returns `false` if `cancel` fired or the reader is gone.
    pub(crate) async fn push_all(
        &self,
        messages: Vec<String>,
        cancel: &CancellationToken,
    ) -> bool {
        for message in messages {
            trace!(len = message.len(), "Enqueueing message");
            if !self.push(Ok(message), cancel).await {
                return false;
            }
        }
        true
    }

    /// Enqueues an error for the next reader, in wire order with messages.
    ///
    /// Returns `false` if `cancel` fired or the reader is gone.
    pub(crate) async fn push_error(&self, error: Error, cancel: &CancellationToken) -> bool {
        self.push(Err(error), cancel).await
    }

    async fn push(&self, entry: Result<String>, cancel: &CancellationToken) -> bool {
        tokio::select! {
            () = cancel.cancelled() => false,
            result = self.tx.send(entry) => result.is_ok(),
        }
    }
}

// ============================================================================
// InboundQueue
// ============================================================================

/// Consumer half, owned by the transport handle.
///
/// Concurrent readers are serialized; each message goes to exactly one.
#[derive(Debug)]
pub(crate) struct InboundQueue {
    rx: Mutex<mpsc::Receiver<Result<String>>>,
}

impl InboundQueue {
    /// Waits for the next message.
    ///
    /// # Errors
    ///
    /// - the queued error, if the frame carrying this entry was malformed
    /// - [`Error::ConnectionClosed`] once the queue is drained and the
    ///   session has terminated
    pub(crate) async fn recv(&self) -> Result<String> {
        self.rx
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(Err(Error::ConnectionClosed))
    }
}

// ============================================================================
// Tests
// ============================================================================
