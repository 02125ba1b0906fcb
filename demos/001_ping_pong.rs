//! Basic request/response over a serial link.
//!
//! Demonstrates:
//! - Listing paired devices filtered by name
//! - Connecting and waiting for the Connected event
//! - Writing commands and reading replies from the event stream
//! - Observing the peer hang up
//!
//! Usage:
//!   cargo run --example 001_ping_pong
//!   cargo run --example 001_ping_pong -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::{Args, DEVICE_FILTER};
use spp_link::{Error, Event, EventStream, Result, Session};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== 001: Ping Pong ===\n");

    // ========================================================================
    // Pick Device
    // ========================================================================

    println!("[1] Listing paired devices matching '{DEVICE_FILTER}'...");

    let (session, mut events) = Session::builder()
        .adapter(common::simulated_adapter())
        .build()?;

    for device in session.catalog().list_all() {
        println!("    - {device}");
    }

    let device = session
        .list_candidates(DEVICE_FILTER)
        .into_iter()
        .next()
        .ok_or_else(|| Error::config(format!("no paired device matches '{DEVICE_FILTER}'")))?;

    println!("    ✓ Selected {device}\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[2] Connecting...");

    let id = session.connect(&device).await?;
    if let Some(Event::Connected { device, .. }) = events.recv().await {
        println!("    ✓ Connected to {device} ({id})\n");
    }

    // ========================================================================
    // Exchange
    // ========================================================================

    println!("[3] Sending commands...");

    for command in ["PING", "READ", "READ"] {
        session.write(format!("{command}\n").as_bytes()).await?;
        println!("    > {command}");
        print_reply(&mut events).await;
    }

    println!();

    // ========================================================================
    // Hang Up
    // ========================================================================

    println!("[4] Asking the peer to hang up...");

    session.write(b"BYE\n").await?;
    while let Some(event) = events.recv().await {
        if let Event::Disconnected { reason, .. } = event {
            println!("    ✓ Disconnected: {reason}");
            break;
        }
    }

    println!("\n=== Done ===");
    Ok(())
}

/// Prints data events until a full line has arrived.
async fn print_reply(events: &mut EventStream) {
    let mut line = Vec::new();
    while !line.ends_with(b"\n") {
        match events.recv().await {
            Some(Event::DataReceived { data, .. }) => line.extend_from_slice(&data),
            Some(other) => {
                println!("    ! {other:?}");
                return;
            }
            None => return,
        }
    }
    println!("    < {}", String::from_utf8_lossy(&line).trim_end());
}
