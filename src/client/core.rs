//! Client facade.
//!
//! Negotiates with the server's `/info` endpoint, picks a transport and
//! exposes message-level reads and writes over it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::SessionIdentity;
use crate::protocol::{Info, encode_messages};
use crate::transport::{
    ConnectionState, HttpClient, Transport, TransportKind, WebSocketTransport, XhrTransport,
};

use super::builder::ClientBuilder;
use super::options::ClientOptions;

// ============================================================================
// Negotiation
// ============================================================================

/// Fetches the server's capability descriptor from `<address>/info`.
///
/// # Errors
///
/// - [`Error::UnexpectedStatus`] for a non-2xx response
/// - [`Error::Json`] if the body is not a valid descriptor
/// - any transport error from `http`
pub async fn negotiate(address: &Url, http: &dyn HttpClient, timeout: Duration) -> Result<Info> {
    let url = format!("{}/info", address.as_str().trim_end_matches('/'));
    debug!(url = %url, "Negotiating");

    let response = http.get(&url, timeout).await?;
    if !response.is_success() {
        return Err(Error::unexpected_status(response.status, url));
    }

    Ok(serde_json::from_slice(&response.body)?)
}

/// Rewrites an `http`/`https` address to its `ws`/`wss` form.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] for any other scheme.
pub fn websocket_url(address: &Url) -> Result<Url> {
    let scheme = match address.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(Error::invalid_url(
                address.as_str(),
                format!("unsupported scheme '{other}'"),
            ));
        }
    };

    let mut url = address.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::invalid_url(address.as_str(), "cannot rewrite scheme"))?;
    Ok(url)
}

/// Parses a service address, which must be `http` or `https`.
fn parse_address(address: &str) -> Result<Url> {
    let url = Url::parse(address).map_err(|e| Error::invalid_url(address, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::invalid_url(
            address,
            format!("expected http or https, got '{other}'"),
        )),
    }
}

// ============================================================================
// Client
// ============================================================================

/// A connected SockJS session.
///
/// Transient network faults are absorbed by the underlying transport; reads
/// only fail once the session has terminated.
///
/// # Example
///
/// ```no_run
/// use sockjs_client::Client;
///
/// # async fn example() -> sockjs_client::Result<()> {
/// let client = Client::connect("http://localhost:8081/echo").await?;
///
/// client.write_message(&"hello").await?;
/// let reply: String = client.read_message().await?;
///
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    transport: Box<dyn Transport>,
    info: Info,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport.kind())
            .field("url", &self.transport.url())
            .field("state", &self.transport.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Construction
// ============================================================================

impl Client {
    /// Connects with default options.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::connect`].
    pub async fn connect(address: &str) -> Result<Self> {
        ClientBuilder::new().connect(address).await
    }

    /// Creates a builder for custom options.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) async fn open(
        address: &str,
        options: ClientOptions,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self> {
        let address = parse_address(address)?;
        let info = negotiate(&address, http.as_ref(), options.connect_timeout).await?;

        let kind = options.transport.unwrap_or(if info.websocket {
            TransportKind::WebSocket
        } else {
            TransportKind::XhrPolling
        });
        debug!(transport = %kind, websocket = info.websocket, "Transport selected");

        let transport: Box<dyn Transport> = match kind {
            TransportKind::WebSocket => {
                let url = websocket_url(&address)?;
                Box::new(WebSocketTransport::connect(&url, &options).await?)
            }
            TransportKind::XhrPolling => {
                Box::new(XhrTransport::connect(&address, &options, http).await?)
            }
        };

        info!(url = %transport.url(), transport = %kind, "Client connected");
        Ok(Self { transport, info })
    }
}

// ============================================================================
// Client - Messaging
// ============================================================================

impl Client {
    /// Reads the next message and deserializes it.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] once the session has terminated
    /// - [`Error::Protocol`] if the frame carrying the message was malformed;
    ///   the session stays open
    /// - [`Error::Json`] if the message does not match `T`
    pub async fn read_message<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self.transport.recv().await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Reads the next message as raw JSON text.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] once the session has terminated
    /// - [`Error::Protocol`] if the frame carrying the message was malformed
    pub async fn read_raw(&self) -> Result<String> {
        self.transport.recv().await
    }

    /// Sends one message.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] while a WebSocket session is reconnecting
    /// - [`Error::WriteTimeout`] if the peer does not accept the write within
    ///   the read timeout
    /// - [`Error::ConnectionClosed`] after the session terminated
    /// - [`Error::UnexpectedStatus`] if an XHR send is rejected
    pub async fn write_message<T: Serialize>(&self, message: &T) -> Result<()> {
        self.write_messages(std::slice::from_ref(message)).await
    }

    /// Sends several messages in one frame.
    ///
    /// # Errors
    ///
    /// Same as [`Client::write_message`].
    pub async fn write_messages<T: Serialize>(&self, messages: &[T]) -> Result<()> {
        let payload = encode_messages(messages)?;
        self.transport.send(payload).await
    }

    /// Terminates the session. Pending and later reads end with
    /// [`Error::ConnectionClosed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to shut down cleanly.
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Subscribes to reconnect notifications.
    #[must_use]
    pub fn reconnected(&self) -> broadcast::Receiver<()> {
        self.transport.signals().reconnected()
    }

    /// Subscribes to connection loss notifications.
    #[must_use]
    pub fn connection_lost(&self) -> broadcast::Receiver<()> {
        self.transport.signals().connection_lost()
    }

    /// Current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Capability descriptor the server returned.
    #[inline]
    #[must_use]
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Transport in use.
    #[inline]
    #[must_use]
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Session identity.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &SessionIdentity {
        self.transport.identity()
    }
}

// ============================================================================
// Tests
// ============================================================================
