//! Echo round trip against a SockJS server.
//!
//! Demonstrates:
//! - Negotiating and connecting with a custom builder
//! - Observing reconnect / loss signals
//! - Writing messages and reading the echoes back
//!
//! Usage:
//!   cargo run --example echo -- http://localhost:8081/echo
//!   cargo run --example echo -- http://localhost:8081/echo --xhr
//!   cargo run --example echo -- http://localhost:8081/echo --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Context;
use sockjs_client::{Client, TransportKind};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_ADDRESS: &str = "http://localhost:8081/echo";
const MESSAGE_COUNT: usize = 5;

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    address: String,
    debug: bool,
    xhr: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self {
            address: args
                .iter()
                .find(|a| !a.starts_with("--"))
                .cloned()
                .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            debug: args.iter().any(|a| a == "--debug"),
            xhr: args.iter().any(|a| a == "--xhr"),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "sockjs_client=debug"
    } else {
        "sockjs_client=info"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== SockJS Echo ===\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[1] Connecting to {}...", args.address);

    let mut builder = Client::builder()
        .read_timeout(Duration::from_secs(30))
        .backoff(Duration::from_millis(500), Duration::from_secs(10));
    if args.xhr {
        builder = builder.transport(TransportKind::XhrPolling);
    }
    let client = builder
        .connect(&args.address)
        .await
        .with_context(|| format!("failed to open a session at {}", args.address))?;

    println!("    ✓ Transport: {}", client.transport_kind());
    let identity = client.identity();
    println!("    ✓ Session: {}/{}\n", identity.server_id, identity.session_id);

    let mut reconnected = client.reconnected();
    let mut lost = client.connection_lost();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                Ok(()) = lost.recv() => println!("    ! Connection lost, reconnecting..."),
                Ok(()) = reconnected.recv() => println!("    ✓ Session resumed"),
                else => break,
            }
        }
    });

    // ========================================================================
    // Echo
    // ========================================================================

    println!("[2] Sending {MESSAGE_COUNT} messages...");

    for i in 0..MESSAGE_COUNT {
        let message = format!("message #{i}");
        client.write_message(&message).await?;

        let echo: String = client
            .read_message()
            .await
            .context("session ended before the echo arrived")?;
        println!("    ← {echo}");
    }

    // ========================================================================
    // Close
    // ========================================================================

    println!("\n[3] Closing...");
    client.close().await?;
    println!("    ✓ Done");

    Ok(())
}
