//! HTTP client abstraction for negotiation and XHR polling.
//!
//! Each transport owns its own [`HttpClient`] handle instead of sharing a
//! process-wide client, so tests can substitute a scripted double.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::trace;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Content type used for outbound message bodies.
const SEND_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

// ============================================================================
// HttpResponse
// ============================================================================

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    #[inline]
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// HttpClient
// ============================================================================

/// The HTTP operations the client needs: `GET /info` and `POST` for polling.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse>;

    /// Sends a POST request with `body`.
    async fn post(&self, url: &str, body: Vec<u8>, timeout: Duration) -> Result<HttpResponse>;
}

// ============================================================================
// ReqwestClient
// ============================================================================

/// [`HttpClient`] backed by [`reqwest`].
#[derive(Clone, Default)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing reqwest client (custom TLS, proxies, headers).
    #[inline]
    #[must_use]
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        trace!(url, "GET");
        let response = self.inner.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }

    async fn post(&self, url: &str, body: Vec<u8>, timeout: Duration) -> Result<HttpResponse> {
        trace!(url, len = body.len(), "POST");
        let response = self
            .inner
            .post(url)
            .header(CONTENT_TYPE, SEND_CONTENT_TYPE)
            .body(body)
            .timeout(timeout)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Tests
// ============================================================================
