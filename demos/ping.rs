//! Host and embedded context exchanging requests and events.
//!
//! Demonstrates:
//! - Queueing a request before the embedded context has loaded
//! - The readiness handshake and port upgrade of a scoped driver
//! - Answering requests and observing events on both sides
//!
//! Usage:
//!   cargo run --example ping
//!   cargo run --example ping -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Context;
use frame_rpc::{
    Bus, Driver, EmbeddedClient, Envelope, MESSAGE_SENT_EVENT, listener,
};
use serde_json::{Map, json};
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const FRAME_URL: &str = "https://sim.example/run.html?frameid=sim-1";
const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|arg| arg == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "frame_rpc=trace"
    } else {
        "frame_rpc=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

async fn run() -> anyhow::Result<()> {
    println!("=== Ping ===\n");

    let bus = Bus::new();

    // ========================================================================
    // Host
    // ========================================================================

    println!("[1] Spawning driver for {FRAME_URL}...");
    let driver = Driver::builder(&bus).frame_url(FRAME_URL).spawn()?;

    driver.on(
        MESSAGE_SENT_EVENT,
        listener(|envelope| println!("    -> {}", envelope.kind)),
    );
    driver.on(
        "simevent",
        listener(|envelope| println!("    <- simevent state={}", envelope.get_str("state"))),
    );

    let pending = driver.send_request(Envelope::new("ping").field("n", 1))?;
    println!("    ✓ Request {} queued ({} waiting)\n", pending.id(), driver.queued_count());

    // ========================================================================
    // Embedded Context
    // ========================================================================

    println!("[2] Loading embedded context...");
    let client = EmbeddedClient::builder(&bus).location(FRAME_URL).spawn()?;

    let responder = client.clone();
    let notifier = client.clone();
    client.on(
        "ping",
        listener(move |request| {
            let mut fields = Map::new();
            fields.insert("pong".into(), json!(request.get("n")));
            if let Err(e) = responder.respond(request, Ok(fields)) {
                eprintln!("    respond failed: {e}");
            }
            let _ = notifier.post_message(Envelope::new("simevent").field("state", "running"));
        }),
    );

    // ========================================================================
    // Exchange
    // ========================================================================

    let transport = timeout(WAIT, driver.wait_ready())
        .await
        .context("handshake timed out")??;
    println!("    ✓ Link ready over {transport}\n");

    println!("[3] Awaiting response...");
    let response = timeout(WAIT, pending).await.context("response timed out")??;
    println!("    ✓ pong={}\n", response.get_u64("pong"));

    // ========================================================================
    // Cleanup
    // ========================================================================

    driver.dispose();
    client.dispose();
    println!("=== Done ===");

    Ok(())
}
