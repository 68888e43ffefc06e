//! Error types for the SockJS client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use sockjs_client::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.write_message(&"ping").await?;
//!     let reply: String = client.read_message().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::HeartbeatTimeout`], [`Error::WriteTimeout`], [`Error::ConnectionClosed`], [`Error::NotConnected`] |
//! | Protocol | [`Error::Protocol`], [`Error::UnknownFrame`], [`Error::UnexpectedStatus`] |
//! | Startup | [`Error::Randomness`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`], [`Error::Url`] |
//!
//! Transient faults (dial failures, heartbeat timeouts, I/O errors) are
//! absorbed by the transport's maintenance task and never returned from
//! read operations. See [`Error::is_recoverable`].

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Server address cannot be used to build a transport URL.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        /// The offending address.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Physical connection failed.
    ///
    /// Returned when a dial or request cannot be completed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Session did not open within the connect timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// No frame (not even a heartbeat) arrived within the read timeout.
    #[error("No heartbeat received for {timeout_ms}ms")]
    HeartbeatTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// A write could not be handed to the peer within the read timeout.
    #[error("Write timed out after {timeout_ms}ms")]
    WriteTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Session terminated by the server or by the caller.
    ///
    /// Returned from reads once the inbound queue is drained and closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Write attempted while the transport is between physical connections.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected frame.
    ///
    /// Returned when a frame cannot be decoded or arrives out of order.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Frame with a type byte the protocol does not define.
    ///
    /// Skipped once a session is open; fatal only for the first frame.
    #[error("Protocol error: unknown frame type {tag:?}")]
    UnknownFrame {
        /// The offending type byte.
        tag: char,
    },

    /// HTTP response carried a status the protocol does not allow here.
    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus {
        /// Status code received.
        status: u16,
        /// Request URL.
        url: String,
    },

    // ========================================================================
    // Startup Errors
    // ========================================================================
    /// The OS random source failed while generating session identifiers.
    #[error("Random source failed: {message}")]
    Randomness {
        /// Error reported by the random source.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a heartbeat timeout error.
    #[inline]
    pub fn heartbeat_timeout(timeout_ms: u64) -> Self {
        Self::HeartbeatTimeout { timeout_ms }
    }

    /// Creates a write timeout error.
    #[inline]
    pub fn write_timeout(timeout_ms: u64) -> Self {
        Self::WriteTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unknown frame type error.
    #[inline]
    pub fn unknown_frame(tag: u8) -> Self {
        Self::UnknownFrame {
            tag: char::from(tag),
        }
    }

    /// Creates an unexpected status error.
    #[inline]
    pub fn unexpected_status(status: u16, url: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            url: url.into(),
        }
    }

    /// Creates a randomness error.
    #[inline]
    pub fn randomness(message: impl Into<String>) -> Self {
        Self::Randomness {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ConnectionTimeout { .. }
            | Self::HeartbeatTimeout { .. }
            | Self::WriteTimeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::HeartbeatTimeout { .. }
                | Self::WriteTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors are the transient faults a transport absorbs by
    /// reconnecting: dial failures, timeouts and generic I/O errors.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::HeartbeatTimeout { .. }
                | Self::WriteTimeout { .. }
                | Self::NotConnected
                | Self::Io(_)
                | Self::WebSocket(_)
                | Self::Http(_)
        )
    }

    /// Returns `true` if the server no longer knows the session.
    #[inline]
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::UnexpectedStatus { status: 404, .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
