//! SockJS protocol types.
//!
//! This module defines the wire format spoken between the client and a
//! SockJS server.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`Info`] | Server → Client | Capability negotiation (`GET /info`) |
//! | [`Frame`] | Server → Client | Open, heartbeat, messages, close |
//! | JSON array | Client → Server | Outbound messages ([`encode_messages`]) |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Frame codec |
//! | `info` | Capability descriptor |

// ============================================================================
// Submodules
// ============================================================================

/// Frame codec.
pub mod frame;

/// Capability descriptor.
pub mod info;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{CloseReason, Frame, encode_messages};
pub use info::Info;
