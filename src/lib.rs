//! SockJS client - Resilient sessions over WebSocket or XHR polling.
//!
//! This library connects to a SockJS server and keeps the logical session
//! alive across an unreliable network, reconnecting transparently.
//!
//! # Architecture
//!
//! The client follows a facade-over-transport model:
//!
//! - **Facade**: Negotiates via `GET <address>/info`, picks a transport
//! - **Transport**: Owns the physical connection and a maintenance task
//! - **Maintenance task**: Decodes frames into a bounded inbound queue and
//!   re-dials with exponential backoff when the connection drops
//!
//! Key design principles:
//!
//! - One session identity (`<server>/<session>`) for the client's lifetime
//! - Transient network faults never surface from reads
//! - Only a server close frame or [`Client::close`] ends a session
//!
//! # Quick Start
//!
//! ```no_run
//! use sockjs_client::{Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::connect("http://localhost:8081/echo").await?;
//!
//!     client.write_message(&"hello").await?;
//!     let reply: String = client.read_message().await?;
//!     println!("Echo: {}", reply);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Facade: [`Client`], [`ClientBuilder`], [`ClientOptions`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Random server and session IDs |
//! | [`protocol`] | Frame codec and `/info` descriptor |
//! | [`transport`] | WebSocket and XHR polling transports |
//!
//! # Features
//!
//! - **Automatic reconnect**: Streaming sessions resume on the same address
//! - **Backpressure**: A slow reader throttles the wire read
//! - **Signals**: Observe `Reconnected` / `ConnectionLost` without blocking
//! - **Pluggable HTTP**: Bring your own [`HttpClient`]

// ============================================================================
// Modules
// ============================================================================

/// Client facade and configuration.
///
/// Use [`Client::connect()`] or [`Client::builder()`] to open a session.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Random server and session identifiers.
pub mod identifiers;

/// SockJS wire format.
///
/// Frame codec and the `/info` capability descriptor.
pub mod protocol;

/// Transport layer.
///
/// Streaming and polling transports plus their shared lifecycle.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ServerId, SessionId, SessionIdentity};

// Protocol types
pub use protocol::{CloseReason, Frame, Info};

// Transport types
pub use transport::{ConnectionState, HttpClient, HttpResponse, ReqwestClient, TransportKind};
