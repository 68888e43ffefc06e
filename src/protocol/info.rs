//! Server capability descriptor returned by `GET <address>/info`.
//!
//! # Format
//!
//! ```json
//! {
//!   "websocket": true,
//!   "cookie_needed": false,
//!   "origins": ["*:*"],
//!   "entropy": 1234567890
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Info
// ============================================================================

/// Capabilities a SockJS server advertises before a session is opened.
///
/// Only [`Info::websocket`] influences transport selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    /// Whether the server accepts the WebSocket transport.
    pub websocket: bool,

    /// Whether transports must carry the load-balancer cookie.
    #[serde(default)]
    pub cookie_needed: bool,

    /// Allowed origins. Informational only.
    #[serde(default)]
    pub origins: Vec<String>,

    /// Random number from the server, in `[0, 2^31 - 1]`.
    #[serde(default)]
    pub entropy: i64,
}

// ============================================================================
// Tests
// ============================================================================
