//! XHR long-polling transport.
//!
//! Receives with repeated `POST <base>/xhr` requests, each answered with
//! exactly one frame, and sends each outbound payload as its own
//! `POST <base>/xhr_send`.
//!
//! Unlike the WebSocket transport, a failed opening request is fatal: the
//! server never saw the session, so there is nothing to resume.
//!
//! A poll that succeeds at the HTTP level but carries a malformed frame is
//! not a poll failure. The decode error goes to the reader and polling
//! continues.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::client::ClientOptions;
use crate::error::{Error, Result};
use crate::identifiers::SessionIdentity;
use crate::protocol::Frame;

use super::http::{HttpClient, HttpResponse};
use super::lifecycle::{Backoff, ConnectionState, Lifecycle, Signals};
use super::queue::{InboundQueue, InboundSender, inbound_queue};
use super::{Transport, TransportKind};

// ============================================================================
// Constants
// ============================================================================

/// Status a successful `xhr_send` must return.
const NO_CONTENT: u16 = 204;

/// Suffix of the send endpoint.
const SEND_SUFFIX: &str = "/xhr_send";

// ============================================================================
// Types
// ============================================================================

/// Outcome of one successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    /// Keep polling.
    Continue,
    /// Server closed the session, or the transport is shutting down.
    Stop,
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the transport handle and its poll task.
struct Shared {
    receive_url: String,
    send_url: String,
    identity: SessionIdentity,
    options: ClientOptions,
    lifecycle: Lifecycle,
    http: Arc<dyn HttpClient>,
}

// ============================================================================
// XhrTransport
// ============================================================================

/// SockJS session over XHR long polling.
pub struct XhrTransport {
    shared: Arc<Shared>,
    inbound: InboundQueue,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl XhrTransport {
    /// Opens a session on the `http://` or `https://` address.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::Randomness`] if the session identity cannot be generated
    /// - [`Error::UnexpectedStatus`] if the opening request is rejected
    /// - [`Error::Protocol`] if the first frame is not an open frame
    /// - any error from `http` for the opening request
    pub async fn connect(
        address: &Url,
        options: &ClientOptions,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self> {
        options.validate()?;

        let identity = SessionIdentity::generate(options.session_id_len)?;
        let receive_url = identity.url(address.as_str(), TransportKind::XhrPolling.suffix());
        let send_url = identity.url(address.as_str(), SEND_SUFFIX);
        Url::parse(&receive_url)?;

        let shared = Arc::new(Shared {
            receive_url,
            send_url,
            identity,
            options: options.clone(),
            lifecycle: Lifecycle::new(),
            http,
        });

        debug!(url = %shared.receive_url, "Opening XHR session");
        let response = shared
            .http
            .post(&shared.receive_url, Vec::new(), options.connect_timeout)
            .await?;
        let body = shared.check_status(response)?;
        match Frame::decode(&body)? {
            Some(Frame::Open) => {}
            Some(other) => {
                return Err(Error::protocol(format!(
                    "expected open frame, got {} frame",
                    other.name()
                )));
            }
            None => return Err(Error::protocol("expected open frame, got empty response")),
        }

        shared.lifecycle.opened();
        info!(url = %shared.receive_url, "XHR session established");

        let (inbound_tx, inbound) = inbound_queue(options.inbound_capacity);
        let task = tokio::spawn(run_poll_loop(Arc::clone(&shared), inbound_tx));

        Ok(Self {
            shared,
            inbound,
            task: Mutex::new(Some(task)),
        })
    }
}

#[async_trait]
impl Transport for XhrTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::XhrPolling
    }

    fn identity(&self) -> &SessionIdentity {
        &self.shared.identity
    }

    fn url(&self) -> &str {
        &self.shared.receive_url
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
        if self.shared.lifecycle.is_shutdown()
            || self.shared.lifecycle.state() == ConnectionState::Closed
        {
            return Err(Error::ConnectionClosed);
        }

        let url = &self.shared.send_url;
        let response = self
            .shared
            .http
            .post(url, payload.into_bytes(), self.shared.options.read_timeout)
            .await?;

        if response.status != NO_CONTENT {
            return Err(Error::unexpected_status(response.status, url.as_str()));
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
            warn!(error = %e, "XHR poll task failed");
        }

        self.shared.lifecycle.closed();
        Ok(())
    }
}

impl Drop for XhrTransport {
    fn drop(&mut self) {
        self.shared.lifecycle.shutdown();
    }
}

// ============================================================================
// Poll Loop
// ============================================================================

/// Polls until the session terminates.
async fn run_poll_loop(shared: Arc<Shared>, inbound: InboundSender) {
    let lifecycle = &shared.lifecycle;
    let cancel = lifecycle.cancel_token();
    let mut backoff = Backoff::new(shared.options.backoff_base, shared.options.backoff_max);

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = shared.poll_once() => result,
        };

        match result {
            Ok(body) => {
                if lifecycle.state() == ConnectionState::Lost {
                    info!(url = %shared.receive_url, "XHR polling recovered");
                    lifecycle.opened();
                }
                backoff.reset();

                if shared.handle_body(&body, &inbound).await == PollOutcome::Stop {
                    break;
                }
            }
            Err(e) if e.is_session_expired() => {
                warn!(url = %shared.receive_url, "Server no longer knows the session");
                break;
            }
            Err(e) => {
                warn!(url = %shared.receive_url, error = %e, "XHR poll failed");
                lifecycle.lost(&e);

                if !lifecycle.wait_backoff(&mut backoff).await {
                    break;
                }
            }
        }
    }

    lifecycle.closed();
    debug!(url = %shared.receive_url, "XHR poll task terminated");
}

impl Shared {
    /// Issues one long poll and returns the response body.
    async fn poll_once(&self) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(&self.receive_url, Vec::new(), self.options.read_timeout)
            .await?;
        self.check_status(response)
    }

    /// Decodes and applies the frame in one poll response.
    async fn handle_body(&self, body: &[u8], inbound: &InboundSender) -> PollOutcome {
        let cancel = self.lifecycle.cancel_token();

        let frame = match Frame::decode(body) {
            Ok(Some(frame)) => frame,
            Ok(None) => return PollOutcome::Continue,
            Err(e @ Error::UnknownFrame { .. }) => {
                warn!(url = %self.receive_url, error = %e, "Skipping frame");
                return PollOutcome::Continue;
            }
            Err(e) => {
                warn!(url = %self.receive_url, error = %e, "Malformed frame");
                return if inbound.push_error(e, cancel).await {
                    PollOutcome::Continue
                } else {
                    PollOutcome::Stop
                };
            }
        };

        match frame {
            Frame::Heartbeat => trace!("Heartbeat"),
            Frame::Open => debug!("Ignoring repeated open frame"),
            Frame::Array(messages) => {
                if !inbound.push_all(messages, cancel).await {
                    return PollOutcome::Stop;
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
                return PollOutcome::Stop;
            }
        }
        PollOutcome::Continue
    }

    /// Checks the status of a receive response and returns its body.
    fn check_status(&self, response: HttpResponse) -> Result<Vec<u8>> {
        if !response.is_success() {
            return Err(Error::unexpected_status(
                response.status,
                self.receive_url.as_str(),
            ));
        }
        Ok(response.body)
    }
}

// ============================================================================
// Tests
// ============================================================================
