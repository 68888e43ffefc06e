//! Client timing, queue and transport options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use sockjs_client::{ClientOptions, TransportKind};
//!
//! let options = ClientOptions::new()
//!     .with_read_timeout(Duration::from_secs(10))
//!     .with_backoff(Duration::from_millis(500), Duration::from_secs(30))
//!     .with_transport(TransportKind::XhrPolling);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::identifiers::MIN_SESSION_ID_LEN;
use crate::transport::TransportKind;

// ============================================================================
// Constants
// ============================================================================

/// Default per-read timeout. A silent connection is considered dead after this.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit for dialing and for the session to open.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default first reconnect delay.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Default reconnect delay cap.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Default number of undelivered inbound messages before reads throttle.
pub const DEFAULT_INBOUND_CAPACITY: usize = 32;

// ============================================================================
// ClientOptions
// ============================================================================

/// Options shared by the facade and both transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Maximum silence on a connection before it is treated as dead.
    pub read_timeout: Duration,

    /// Maximum time for a dial, and for [`Client::connect`](super::Client::connect)
    /// to see the session open.
    pub connect_timeout: Duration,

    /// First reconnect delay.
    pub backoff_base: Duration,

    /// Reconnect delay cap.
    pub backoff_max: Duration,

    /// Inbound queue capacity.
    pub inbound_capacity: usize,

    /// Session ID length (at least 16).
    pub session_id_len: usize,

    /// Forces a transport instead of following negotiation.
    pub transport: Option<TransportKind>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            session_id_len: MIN_SESSION_ID_LEN,
            transport: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the per-read timeout.
    #[inline]
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the reconnect backoff range.
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Sets the inbound queue capacity.
    #[inline]
    #[must_use]
    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    /// Sets the session ID length.
    #[inline]
    #[must_use]
    pub fn with_session_id_len(mut self, len: usize) -> Self {
        self.session_id_len = len;
        self
    }

    /// Forces a transport.
    #[inline]
    #[must_use]
    pub fn with_transport(mut self, kind: TransportKind) -> Self {
        self.transport = Some(kind);
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientOptions {
    /// Checks that the options describe a usable client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for zero timeouts, a zero queue capacity or
    /// a backoff base above its cap.
    pub fn validate(&self) -> Result<()> {
        if self.read_timeout.is_zero() {
            return Err(Error::config("read timeout must be non-zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect timeout must be non-zero"));
        }
        if self.backoff_base.is_zero() {
            return Err(Error::config("backoff base must be non-zero"));
        }
        if self.backoff_base > self.backoff_max {
            return Err(Error::config(format!(
                "backoff base {:?} exceeds backoff max {:?}",
                self.backoff_base, self.backoff_max
            )));
        }
        if self.inbound_capacity == 0 {
            return Err(Error::config("inbound capacity must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::new();
        assert_eq!(options.read_timeout, Duration::from_secs(30));
        assert_eq!(options.connect_timeout, Duration::from_secs(30));
        assert_eq!(options.backoff_base, Duration::from_secs(1));
        assert_eq!(options.backoff_max, Duration::from_secs(60));
        assert_eq!(options.inbound_capacity, 32);
        assert_eq!(options.session_id_len, 16);
        assert!(options.transport.is_none());
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn test_builder_methods() {
        let options = ClientOptions::new()
            .with_read_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(6))
            .with_backoff(Duration::from_millis(100), Duration::from_secs(2))
            .with_inbound_capacity(4)
            .with_session_id_len(24)
            .with_transport(TransportKind::XhrPolling);

        assert_eq!(options.read_timeout, Duration::from_secs(5));
        assert_eq!(options.connect_timeout, Duration::from_secs(6));
        assert_eq!(options.backoff_base, Duration::from_millis(100));
        assert_eq!(options.backoff_max, Duration::from_secs(2));
        assert_eq!(options.inbound_capacity, 4);
        assert_eq!(options.session_id_len, 24);
        assert_eq!(options.transport, Some(TransportKind::XhrPolling));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(ClientOptions::new().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_read_timeout() {
        let err = ClientOptions::new()
            .with_read_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("read timeout"));
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let err = ClientOptions::new()
            .with_backoff(Duration::from_secs(10), Duration::from_secs(1))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let result = ClientOptions::new().with_inbound_capacity(0).validate();
        assert!(result.is_err());
    }
}
