//! WebSocket streaming transport.
//!
//! Speaks raw SockJS frames over `<address>/<server>/<session>/websocket`.
//!
//! # Maintenance Task
//!
//! The transport spawns a tokio task that, for the lifetime of the session:
//!
//! - Dials the transport address
//! - Requires the first frame to be `o` (open)
//! - Reads frames with a per-read timeout; silence counts as a dead socket
//! - Unpacks `a` frames into the inbound queue, ignores `h`
//! - Skips unknown frame types and hands malformed arrays to the reader as
//!   errors, keeping the socket
//! - Stops on a `c` frame or on [`Transport::close`]
//! - Re-dials with exponential backoff after any other failure

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::client::ClientOptions;
use crate::error::{Error, Result};
use crate::identifiers::SessionIdentity;
use crate::protocol::Frame;

use super::lifecycle::{Backoff, ConnectionState, Lifecycle, Signals};
use super::queue::{InboundQueue, InboundSender, inbound_queue};
use super::{Transport, TransportKind};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on the closing handshake when the session ends.
const SINK_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsSink = SplitSink<WsStream, Message>;

type WsSource = SplitStream<WsStream>;

/// How a physical connection ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Server sent a close frame.
    ClosedByServer,
    /// Caller closed the transport.
    Shutdown,
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the transport handle and its maintenance task.
struct Shared {
    url: String,
    identity: SessionIdentity,
    options: ClientOptions,
    lifecycle: Lifecycle,
    /// Write half of the current physical connection, if any.
    writer: AsyncMutex<Option<WsSink>>,
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// SockJS session over WebSocket.
///
/// # Example
///
/// ```ignore
/// let url = Url::parse("ws://localhost:8081/echo")?;
/// let transport = WebSocketTransport::connect(&url, &ClientOptions::new()).await?;
/// transport.send(r#"["hello"]"#.to_string()).await?;
/// let reply = transport.recv().await?;
/// ```
pub struct WebSocketTransport {
    shared: Arc<Shared>,
    inbound: InboundQueue,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketTransport {
    /// Opens a session on the `ws://` or `wss://` address.
    ///
    /// Returns once the first open frame arrives. Failed attempts before
    /// that are retried with backoff until `connect_timeout` elapses.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::Randomness`] if the session identity cannot be generated
    /// - [`Error::Url`] if the transport address is not a valid URL
    /// - [`Error::ConnectionTimeout`] if the session does not open in time
    pub async fn connect(address: &Url, options: &ClientOptions) -> Result<Self> {
        options.validate()?;

        let identity = SessionIdentity::generate(options.session_id_len)?;
        let url = identity.url(address.as_str(), TransportKind::WebSocket.suffix());
        Url::parse(&url)?;

        let (inbound_tx, inbound) = inbound_queue(options.inbound_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();

        let shared = Arc::new(Shared {
            url,
            identity,
            options: options.clone(),
            lifecycle: Lifecycle::new(),
            writer: AsyncMutex::new(None),
        });

        let task = tokio::spawn(run_maintenance(Arc::clone(&shared), inbound_tx, ready_tx));

        let transport = Self {
            shared,
            inbound,
            task: Mutex::new(Some(task)),
        };

        let connect_timeout = options.connect_timeout;
        match timeout(connect_timeout, ready_rx).await {
            Ok(Ok(())) => {
                info!(url = %transport.shared.url, "WebSocket session established");
                Ok(transport)
            }
            // Dropping `transport` shuts the maintenance task down.
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => Err(Error::connection_timeout(
                connect_timeout.as_millis() as u64,
            )),
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    fn identity(&self) -> &SessionIdentity {
        &self.shared.identity
    }

    fn url(&self) -> &str {
        &self.shared.url
    }

    fn state(&self) -> ConnectionState {
        self.shared.lifecycle.state()
    }

    fn signals(&self) -> &Signals {
        self.shared.lifecycle.signals()
    }

    async fn recv(&self) -> Result<String> {
        self.inbound.recv().await
    }

    async fn send(&self, payload: String) -> Result<()> {
        let cancel = self.shared.lifecycle.cancel_token();
        if cancel.is_cancelled() {
            return Err(Error::ConnectionClosed);
        }

        let mut writer = tokio::select! {
            () = cancel.cancelled() => return Err(Error::ConnectionClosed),
            writer = self.shared.writer.lock() => writer,
        };
        let sink = writer.as_mut().ok_or(Error::NotConnected)?;

        // A peer that stops reading must not pin the writer lock.
        let write_timeout = self.shared.options.read_timeout;
        tokio::select! {
            () = cancel.cancelled() => return Err(Error::ConnectionClosed),
            result = timeout(write_timeout, sink.send(Message::Text(payload.into()))) => {
                result.map_err(|_| Error::write_timeout(write_timeout.as_millis() as u64))??;
            }
        }

        trace!("Message sent");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.shared.lifecycle.shutdown();

        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "WebSocket maintenance task failed");
        }

        self.shared.lifecycle.closed();
        Ok(())
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.shared.lifecycle.shutdown();
    }
}

// ============================================================================
// Maintenance Task
// ============================================================================

/// Runs physical connections until the session terminates.
async fn run_maintenance(
    shared: Arc<Shared>,
    inbound: InboundSender,
    ready: oneshot::Sender<()>,
) {
    let lifecycle = &shared.lifecycle;
    let mut ready = Some(ready);
    let mut backoff = Backoff::new(shared.options.backoff_base, shared.options.backoff_max);

    loop {
        lifecycle.connecting();

        match shared.run_connection(&inbound, &mut ready, &mut backoff).await {
            Ok(SessionEnd::ClosedByServer | SessionEnd::Shutdown) => break,
            Err(e) => {
                shared.writer.lock().await.take();
                lifecycle.lost(&e);
                debug!(url = %shared.url, error = %e, "WebSocket disconnected");

                if !lifecycle.wait_backoff(&mut backoff).await {
                    break;
                }
            }
        }
    }

    if let Some(mut sink) = shared.writer.lock().await.take() {
        match timeout(SINK_CLOSE_TIMEOUT, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "WebSocket close handshake failed"),
            Err(_) => debug!("WebSocket close handshake timed out"),
        }
    }
    lifecycle.closed();

    debug!(url = %shared.url, "WebSocket maintenance task terminated");
}

impl Shared {
    /// Drives one physical connection from dial to termination.
    async fn run_connection(
        &self,
        inbound: &InboundSender,
        ready: &mut Option<oneshot::Sender<()>>,
        backoff: &mut Backoff,
    ) -> Result<SessionEnd> {
        let cancel = self.lifecycle.cancel_token();
        let connect_timeout = self.options.connect_timeout;

        debug!(url = %self.url, "Dialing WebSocket");
        let (stream, _) = tokio::select! {
            () = cancel.cancelled() => return Ok(SessionEnd::Shutdown),
            result = timeout(connect_timeout, connect_async(self.url.as_str())) => {
                result.map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))??
            }
        };

        let (sink, mut source) = stream.split();

        tokio::select! {
            () = cancel.cancelled() => return Ok(SessionEnd::Shutdown),
            opened = self.expect_open(&mut source) => opened?,
        }

        *self.writer.lock().await = Some(sink);
        backoff.reset();
        self.lifecycle.opened();
        if let Some(ready) = ready.take() {
            let _ = ready.send(());
        }
        debug!(url = %self.url, "WebSocket session open");

        loop {
            let message = tokio::select! {
                () = cancel.cancelled() => return Ok(SessionEnd::Shutdown),
                message = self.next_message(&mut source) => message?,
            };

            let frame = match Frame::decode(&message.into_data()) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e @ Error::UnknownFrame { .. }) => {
                    warn!(url = %self.url, error = %e, "Skipping frame");
                    continue;
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, "Malformed frame");
                    if !inbound.push_error(e, cancel).await {
                        return Ok(SessionEnd::Shutdown);
                    }
                    continue;
                }
            };

            match frame {
                Frame::Heartbeat => trace!("Heartbeat"),
                Frame::Open => debug!("Ignoring repeated open frame"),
                Frame::Array(messages) => {
                    if !inbound.push_all(messages, cancel).await {
                        return Ok(SessionEnd::Shutdown);
                    }
                }
                Frame::Close(reason) => {
                    match reason {
                        Some(reason) => info!(
                            code = reason.code,
                            reason = %reason.reason,
                            "Session closed by server"
                        ),
                        None => info!("Session closed by server"),
                    }
                    return Ok(SessionEnd::ClosedByServer);
                }
            }
        }
    }

    /// Reads frames until the first non-empty one, which must be `o`.
    ///
    /// Anything else fails this attempt.
    async fn expect_open(&self, source: &mut WsSource) -> Result<()> {
        loop {
            let message = self.next_message(source).await?;
            match Frame::decode(&message.into_data())? {
                None => continue,
                Some(Frame::Open) => return Ok(()),
                Some(other) => {
                    return Err(Error::protocol(format!(
                        "expected open frame, got {} frame",
                        other.name()
                    )));
                }
            }
        }
    }

    /// Reads the next text or binary message.
    ///
    /// Each socket read is bounded by the read timeout.
    async fn next_message(&self, source: &mut WsSource) -> Result<Message> {
        let read_timeout = self.options.read_timeout;

        loop {
            let message = timeout(read_timeout, source.next())
                .await
                .map_err(|_| Error::heartbeat_timeout(read_timeout.as_millis() as u64))?;

            match message {
                Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => return Ok(message),
                Some(Ok(Message::Close(close))) => {
                    return Err(Error::connection(format!(
                        "socket closed by server: {close:?}"
                    )));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(Error::connection("socket stream ended")),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
