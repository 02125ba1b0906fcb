//! Reconnecting after the link drops.
//!
//! Demonstrates:
//! - Handling a refused connect and retrying
//! - Cancelling a connect that never completes
//! - Disconnecting and reconnecting on the same session
//! - Telling connections apart by ID in the event stream
//!
//! Usage:
//!   cargo run --example 002_reconnect
//!   cargo run --example 002_reconnect -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use common::Args;
use spp_link::{Device, Event, LoopbackAdapter, PeerBehavior, Result, Session};

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
    println!("=== 002: Reconnect ===\n");

    let device = Device::new("98:D3:31:F5:12:7A", "HC-05");
    let adapter = LoopbackAdapter::new().with_device(device.clone(), PeerBehavior::Refuse);

    let (session, mut events) = Session::builder()
        .adapter(adapter.clone())
        .connect_timeout(Duration::from_secs(2))
        .build()?;

    // ========================================================================
    // Refused
    // ========================================================================

    println!("[1] Connecting to a device that refuses...");

    match session.connect(&device).await {
        Ok(_) => println!("    ? Unexpectedly connected"),
        Err(e) if e.is_retryable() => println!("    ✓ Failed, retryable: {e}"),
        Err(e) => return Err(e),
    }
    println!("    State: {}\n", session.state());

    // ========================================================================
    // Cancelled
    // ========================================================================

    println!("[2] Connecting to a device that never answers, then cancelling...");

    adapter.add_device(device.clone(), PeerBehavior::Hang);
    let pending = session.spawn_connect(&device)?;
    println!("    State: {}", session.state());
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.cancel()?;

    match pending.await {
        Ok(Err(e)) => println!("    ✓ {e}\n"),
        Ok(Ok(_)) => println!("    ? Handshake finished before cancel\n"),
        Err(e) => println!("    ! Handshake task failed: {e}\n"),
    }

    // ========================================================================
    // Connect, Drop, Reconnect
    // ========================================================================

    println!("[3] Peer comes back; connecting twice...");

    adapter.add_device(device.clone(), PeerBehavior::echo());

    let first = session.connect(&device).await?;
    session.write(b"hello\n").await?;
    session.disconnect()?;

    let second = session.connect(&device).await?;
    session.write(b"again\n").await?;
    session.disconnect()?;

    // ========================================================================
    // Event Log
    // ========================================================================

    println!("\n[4] Events (first = {first}, second = {second}):");

    let mut disconnects = 0;
    while disconnects < 2 {
        let Some(event) = events.recv().await else {
            break;
        };
        match &event {
            Event::Connected { connection, device } => {
                println!("    {connection}: connected to {device}");
            }
            Event::DataReceived { connection, data } => {
                println!("    {connection}: {} bytes", data.len());
            }
            Event::Disconnected { connection, reason } => {
                println!("    {connection}: disconnected ({reason})");
                disconnects += 1;
            }
        }
    }

    println!("\n=== Done ===");
    Ok(())
}
