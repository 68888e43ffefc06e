//! Test doubles: a scripted SockJS WebSocket server and a scripted
//! [`HttpClient`].

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::result::Result as StdResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::client::ClientOptions;
use crate::error::{Error, Result};

use super::http::{HttpClient, HttpResponse};

// ============================================================================
// Options
// ============================================================================

/// Installs a log subscriber honouring `RUST_LOG`, once per test binary.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Options with short timers so reconnect paths run quickly.
///
/// Also installs the test log subscriber.
pub(crate) fn fast_options() -> ClientOptions {
    init_tracing();
    ClientOptions::new()
        .with_read_timeout(Duration::from_secs(5))
        .with_connect_timeout(Duration::from_secs(5))
        .with_backoff(Duration::from_millis(10), Duration::from_millis(50))
}

// ============================================================================
// TestServer
// ============================================================================

/// One scripted action of the test server on a connection.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Send a text frame.
    Send(&'static str),
    /// Pause.
    Sleep(Duration),
    /// Drop the socket without a close handshake.
    Drop,
    /// Refuse the WebSocket upgrade with `503`. Only meaningful first.
    Reject,
}

/// WebSocket server replaying one script per accepted connection.
///
/// Connection `n` runs `scripts[n]`; connections past the end reuse the
/// last script. After a script finishes (without [`Step::Drop`]) the server
/// keeps the socket open and records every text message the client sends.
pub(crate) struct TestServer {
    addr: SocketAddr,
    paths: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    received: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

impl TestServer {
    pub(crate) async fn spawn(scripts: Vec<Vec<Step>>) -> Self {
        assert!(!scripts.is_empty(), "at least one script is required");

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("local addr");
        let paths = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let (received_tx, received_rx) = mpsc::unbounded_channel();

        let scripts = Arc::new(scripts);
        let accept_paths = Arc::clone(&paths);
        let accept_connections = Arc::clone(&connections);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let index = accept_connections.fetch_add(1, Ordering::SeqCst);
                let script = scripts[index.min(scripts.len() - 1)].clone();
                tokio::spawn(serve_connection(
                    stream,
                    script,
                    Arc::clone(&accept_paths),
                    received_tx.clone(),
                ));
            }
        });

        Self {
            addr,
            paths,
            connections,
            received: tokio::sync::Mutex::new(received_rx),
        }
    }

    /// Base address as the client would be given it.
    pub(crate) fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("valid url")
    }

    /// WebSocket form of [`TestServer::base_url`].
    pub(crate) fn ws_url(&self) -> Url {
        Url::parse(&format!("ws://{}", self.addr)).expect("valid url")
    }

    /// Request paths of every upgraded connection, in accept order.
    pub(crate) fn paths(&self) -> Vec<String> {
        self.paths.lock().clone()
    }

    /// Number of accepted TCP connections.
    pub(crate) fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Next text message received from the client.
    pub(crate) async fn next_received(&self) -> Option<String> {
        let mut received = self.received.lock().await;
        tokio::time::timeout(Duration::from_secs(5), received.recv())
            .await
            .ok()
            .flatten()
    }
}

async fn serve_connection(
    stream: TcpStream,
    script: Vec<Step>,
    paths: Arc<Mutex<Vec<String>>>,
    received: mpsc::UnboundedSender<String>,
) {
    let reject = matches!(script.first(), Some(Step::Reject));
    let record =
        move |request: &Request, response: Response| -> StdResult<Response, ErrorResponse> {
            paths.lock().push(request.uri().path().to_string());
            if reject {
                let mut refusal = ErrorResponse::new(Some("unavailable".to_string()));
                *refusal.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
                return Err(refusal);
            }
            Ok(response)
        };

    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, record).await else {
        return;
    };

    for step in script {
        match step {
            Step::Send(text) => {
                if ws.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
            }
            Step::Sleep(duration) => tokio::time::sleep(duration).await,
            Step::Drop | Step::Reject => return,
        }
    }

    while let Some(Ok(message)) = ws.next().await {
        if let Message::Text(text) = message {
            let _ = received.send(text.to_string());
        }
    }
}

// ============================================================================
// MockHttp
// ============================================================================

/// Scripted reply for one request.
#[derive(Debug, Clone)]
pub(crate) enum MockReply {
    /// Respond with a status and body.
    Respond(u16, &'static str),
    /// Fail as if the network were down.
    Fail(&'static str),
}

/// A request seen by [`MockHttp`].
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: &'static str,
    pub url: String,
    pub body: Vec<u8>,
}

/// [`HttpClient`] double answering from per-suffix reply queues.
///
/// A request whose queue is empty hangs until its timeout, like an idle
/// long poll.
#[derive(Default)]
pub(crate) struct MockHttp {
    routes: Mutex<Vec<(&'static str, VecDeque<MockReply>)>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockHttp {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues `reply` for the next request whose URL ends with `suffix`.
    pub(crate) fn push(&self, suffix: &'static str, reply: MockReply) {
        let mut routes = self.routes.lock();
        if let Some((_, queue)) = routes.iter_mut().find(|(s, _)| *s == suffix) {
            queue.push_back(reply);
        } else {
            routes.push((suffix, VecDeque::from([reply])));
        }
    }

    /// Every request seen so far.
    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    /// Requests whose URL ends with `suffix`.
    pub(crate) fn requests_to(&self, suffix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with(suffix))
            .collect()
    }

    async fn reply(
        &self,
        method: &'static str,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        self.requests.lock().push(Recorded {
            method,
            url: url.to_string(),
            body,
        });

        let next = self
            .routes
            .lock()
            .iter_mut()
            .find(|(suffix, _)| url.ends_with(*suffix))
            .and_then(|(_, queue)| queue.pop_front());

        match next {
            Some(MockReply::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(MockReply::Fail(message)) => Err(Error::connection(message)),
            None => {
                tokio::time::sleep(timeout).await;
                Err(Error::connection_timeout(timeout.as_millis() as u64))
            }
        }
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        self.reply("GET", url, Vec::new(), timeout).await
    }

    async fn post(&self, url: &str, body: Vec<u8>, timeout: Duration) -> Result<HttpResponse> {
        self.reply("POST", url, body, timeout).await
    }
}
