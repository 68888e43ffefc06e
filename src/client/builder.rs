//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and connecting [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use sockjs_client::{Client, TransportKind};
//!
//! # async fn example() -> sockjs_client::Result<()> {
//! let client = Client::builder()
//!     .read_timeout(Duration::from_secs(10))
//!     .transport(TransportKind::XhrPolling)
//!     .connect("http://localhost:8081/echo")
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::transport::{HttpClient, ReqwestClient, TransportKind};

use super::core::Client;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Clone, Default)]
pub struct ClientBuilder {
    /// Timing, queue and transport options.
    options: ClientOptions,
    /// HTTP client for negotiation and polling. Defaults to reqwest.
    http: Option<Arc<dyn HttpClient>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("custom_http", &self.http.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the maximum silence before a connection is considered dead.
    #[inline]
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = timeout;
        self
    }

    /// Sets the dial and open timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets the reconnect backoff range.
    ///
    /// # Arguments
    ///
    /// * `base` - First delay
    /// * `max` - Cap the doubling delay stops at
    #[inline]
    #[must_use]
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.options.backoff_base = base;
        self.options.backoff_max = max;
        self
    }

    /// Sets how many undelivered messages are buffered.
    #[inline]
    #[must_use]
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.options.inbound_capacity = capacity;
        self
    }

    /// Sets the session ID length. Values below 16 are raised to 16.
    #[inline]
    #[must_use]
    pub fn session_id_len(mut self, len: usize) -> Self {
        self.options.session_id_len = len;
        self
    }

    /// Forces a transport instead of following the server's `/info`.
    #[inline]
    #[must_use]
    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.options.transport = Some(kind);
        self
    }

    /// Uses a custom HTTP client for negotiation and polling.
    #[inline]
    #[must_use]
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Negotiates with the server and opens a session.
    ///
    /// # Arguments
    ///
    /// * `address` - Service address, e.g. `http://localhost:8081/echo`
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the options are invalid
    /// - [`Error::InvalidUrl`](crate::Error::InvalidUrl) if `address` is not
    ///   an `http` or `https` URL
    /// - any negotiation or transport construction error
    pub async fn connect(self, address: &str) -> Result<Client> {
        self.options.validate()?;

        let http = self
            .http
            .unwrap_or_else(|| Arc::new(ReqwestClient::new()) as Arc<dyn HttpClient>);

        Client::open(address, self.options, http).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Error;
    use crate::transport::testing::MockHttp;

    #[test]
    fn test_new_uses_default_options() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.options, ClientOptions::default());
        assert!(builder.http.is_none());
    }

    #[test]
    fn test_setters_update_options() {
        let builder = ClientBuilder::new()
            .read_timeout(Duration::from_secs(3))
            .connect_timeout(Duration::from_secs(4))
            .backoff(Duration::from_millis(5), Duration::from_millis(500))
            .inbound_capacity(8)
            .session_id_len(20)
            .transport(TransportKind::WebSocket);

        let expected = ClientOptions::new()
            .with_read_timeout(Duration::from_secs(3))
            .with_connect_timeout(Duration::from_secs(4))
            .with_backoff(Duration::from_millis(5), Duration::from_millis(500))
            .with_inbound_capacity(8)
            .with_session_id_len(20)
            .with_transport(TransportKind::WebSocket);

        assert_eq!(builder.options, expected);
    }

    #[test]
    fn test_options_replaces_everything() {
        let options = ClientOptions::new().with_inbound_capacity(2);
        let builder = ClientBuilder::new()
            .read_timeout(Duration::from_secs(1))
            .options(options.clone());
        assert_eq!(builder.options, options);
    }

    #[test]
    fn test_debug_hides_http_client() {
        let builder = ClientBuilder::new().http_client(MockHttp::new());
        let debug = format!("{builder:?}");
        assert!(debug.contains("custom_http: true"));
    }

    #[tokio::test]
    async fn test_connect_validates_before_negotiating() {
        let http = MockHttp::new();
        let result = ClientBuilder::new()
            .inbound_capacity(0)
            .http_client(http.clone())
            .connect("http://sockjs.test/echo")
            .await;

        assert!(matches!(result, Err(Error::Config { .. })));
        assert!(http.requests().is_empty());
    }
}
