//! Client facade.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Connected session: read, write, close, signals |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Timing, queue and transport options |
//!
//! # Example
//!
//! ```no_run
//! use sockjs_client::{Client, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = Client::connect("http://localhost:8081/echo").await?;
//!
//! let mut reconnected = client.reconnected();
//! tokio::spawn(async move {
//!     while reconnected.recv().await.is_ok() {
//!         println!("session resumed");
//!     }
//! });
//!
//! client.write_message(&"ping").await?;
//! let reply: String = client.read_message().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Negotiation and the client facade.
pub mod core;

/// Client options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::{Client, negotiate, websocket_url};
pub use options::ClientOptions;
