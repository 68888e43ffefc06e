//! Transport layer.
//!
//! A transport owns the physical connection(s) to one SockJS session and a
//! background maintenance task that keeps it alive.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                            ┌──────────────────┐
//! │  Client (Rust)   │   WebSocket  /websocket    │  SockJS server   │
//! │                  │◄──────────────────────────►│                  │
//! │  Transport       │   or XHR     /xhr          │  session         │
//! │  → maintenance   │              /xhr_send     │  <server>/<sid>  │
//! │    task          │                            │                  │
//! └──────────────────┘                            └──────────────────┘
//! ```
//!
//! # Transport Lifecycle
//!
//! 1. `connect` - Generate identity, start the maintenance task
//! 2. Block until the first open frame (or fail)
//! 3. Maintenance task decodes frames into the inbound queue
//! 4. Lost connections are re-dialed with exponential backoff
//! 5. `close` - Stop reconnecting and close the inbound queue
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | HTTP client abstraction |
//! | `lifecycle` | Connection state, signals, backoff |
//! | `websocket` | Streaming transport |
//! | `xhr` | Long-polling transport |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::SessionIdentity;

// ============================================================================
// Submodules
// ============================================================================

/// HTTP client abstraction.
pub mod http;

/// Connection state, signals and backoff.
pub mod lifecycle;

/// Inbound message queue.
mod queue;

/// WebSocket streaming transport.
pub mod websocket;

/// XHR long-polling transport.
pub mod xhr;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use lifecycle::{Backoff, ConnectionState, Signals};
pub use websocket::WebSocketTransport;
pub use xhr::XhrTransport;

// ============================================================================
// TransportKind
// ============================================================================

/// The two supported transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Raw WebSocket streaming (`/websocket`).
    WebSocket,
    /// HTTP long polling (`/xhr`, `/xhr_send`).
    XhrPolling,
}

impl TransportKind {
    /// URL suffix of the receiving endpoint.
    #[inline]
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::WebSocket => "/websocket",
            Self::XhrPolling => "/xhr",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebSocket => f.write_str("websocket"),
            Self::XhrPolling => f.write_str("xhr-polling"),
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// A connected SockJS session over one physical transport.
///
/// Reads and writes may run concurrently. Concurrent reads are serialized;
/// each message is delivered to exactly one reader.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Which transport this is.
    fn kind(&self) -> TransportKind;

    /// Session identity used for every physical connection.
    fn identity(&self) -> &SessionIdentity;

    /// Transport address (`<base>/<server>/<session><suffix>`).
    fn url(&self) -> &str;

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Reconnect / loss notifications.
    fn signals(&self) -> &Signals;

    /// Waits for the next inbound message (raw JSON text).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed)
    /// once the session has terminated and all messages were read.
    async fn recv(&self) -> Result<String>;

    /// Sends an already-encoded JSON array of messages.
    async fn send(&self, payload: String) -> Result<()>;

    /// Terminates the session: no further reconnects, pending reads end.
    async fn close(&self) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
