//! Connection lifecycle shared by both transports.
//!
//! A [`Lifecycle`] is owned jointly by a transport handle and its
//! maintenance task. It tracks the observable [`ConnectionState`], fans out
//! the `Reconnected` / `ConnectionLost` [`Signals`], and carries the
//! cancellation token that [`Transport::close`](super::Transport::close)
//! trips.
//!
//! # State Machine
//!
//! ```text
//! Connecting ──open frame──► Active ──I/O error / timeout──► Lost
//!     ▲                        │                               │
//!     └────────── backoff ◄────┼───────────────────────────────┘
//!                              │
//!        close frame / close() ▼
//!                            Closed
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;

// ============================================================================
// Constants
// ============================================================================

/// Buffered notifications per signal before slow observers start lagging.
const SIGNAL_CAPACITY: usize = 32;

// ============================================================================
// ConnectionState
// ============================================================================

/// Observable state of a transport's physical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Dialing, or waiting for the open frame.
    Connecting,
    /// Open frame received; frames are flowing.
    Active,
    /// Physical connection failed; waiting to retry.
    Lost,
    /// Session terminated. Terminal.
    Closed,
}

// ============================================================================
// Signals
// ============================================================================

/// Best-effort broadcast notifications.
///
/// Sending never blocks: with no subscribers the notification is dropped,
/// and a subscriber that falls more than 32 notifications behind skips the
/// oldest ones.
#[derive(Debug, Clone)]
pub struct Signals {
    reconnected: broadcast::Sender<()>,
    connection_lost: broadcast::Sender<()>,
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}

impl Signals {
    /// Creates a signal pair with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (reconnected, _) = broadcast::channel(SIGNAL_CAPACITY);
        let (connection_lost, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            reconnected,
            connection_lost,
        }
    }

    /// Subscribes to session (re)open notifications.
    #[must_use]
    pub fn reconnected(&self) -> broadcast::Receiver<()> {
        self.reconnected.subscribe()
    }

    /// Subscribes to connection loss notifications.
    #[must_use]
    pub fn connection_lost(&self) -> broadcast::Receiver<()> {
        self.connection_lost.subscribe()
    }

    fn notify_reconnected(&self) {
        let _ = self.reconnected.send(());
    }

    fn notify_connection_lost(&self) {
        let _ = self.connection_lost.send(());
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// Exponential reconnect delay: `base`, `2 * base`, ... capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    /// Creates a backoff starting at `base` and capped at `max`.
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    /// Returns the next delay and advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        self.attempt = self.attempt.saturating_add(1);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Resets to the base delay after a successful open.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset.
    #[inline]
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// State, signals and cancellation for one transport.
#[derive(Debug)]
pub struct Lifecycle {
    state: RwLock<ConnectionState>,
    signals: Signals,
    cancel: CancellationToken,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Creates a lifecycle in the [`ConnectionState::Connecting`] state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ConnectionState::Connecting),
            signals: Signals::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// The transport's signals.
    #[inline]
    #[must_use]
    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    /// Token cancelled by [`Lifecycle::shutdown`].
    #[inline]
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `true` once shutdown has been requested.
    #[inline]
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Marks a new attempt as dialing. No-op once closed.
    pub fn connecting(&self) {
        self.transition(ConnectionState::Connecting);
    }

    /// Marks the session open and broadcasts `Reconnected`.
    pub fn opened(&self) {
        if self.transition(ConnectionState::Active) {
            self.signals.notify_reconnected();
        }
    }

    /// Marks the connection lost.
    ///
    /// Broadcasts `ConnectionLost` only on the `Active → Lost` edge.
    pub fn lost(&self, error: &Error) {
        let was_active = self.state() == ConnectionState::Active;
        if self.transition(ConnectionState::Lost) && was_active {
            warn!(error = %error, "Connection lost");
            self.signals.notify_connection_lost();
        }
    }

    /// Marks the session closed. Terminal.
    pub fn closed(&self) {
        *self.state.write() = ConnectionState::Closed;
    }

    /// Requests shutdown: stops reconnects and wakes every waiting task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Sleeps for the next backoff delay.
    ///
    /// Returns `false` if shutdown was requested while waiting.
    pub async fn wait_backoff(&self, backoff: &mut Backoff) -> bool {
        let delay = backoff.next_delay();
        debug!(
            delay_ms = delay.as_millis() as u64,
            attempt = backoff.attempts(),
            "Waiting before reconnect"
        );

        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    /// Applies `next` unless already closed. Returns whether it applied.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.write();
        if *state == ConnectionState::Closed {
            return false;
        }
        *state = next;
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
