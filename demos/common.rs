//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - A simulated paired device

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use spp_link::{Device, LoopbackAdapter, PeerBehavior};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Name filter used to pick the demo device.
pub const DEVICE_FILTER: &str = "esp32";

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "spp_link=debug"
    } else {
        "spp_link=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Adapter with one line-oriented sensor and one unrelated paired device.
///
/// The sensor answers `PING` with `PONG` and `READ` with a reading.
/// `BYE` makes it hang up.
pub fn simulated_adapter() -> LoopbackAdapter {
    LoopbackAdapter::new()
        .with_device(
            Device::new("98:D3:31:F5:12:7A", "HC-05 Printer"),
            PeerBehavior::sink(),
        )
        .with_device(
            Device::new("24:0A:C4:9B:3E:01", "ESP32-Sensor"),
            PeerBehavior::serve(|stream| async move {
                let (reader, mut writer) = tokio::io::split(stream);
                let mut lines = BufReader::new(reader).lines();
                let mut reading = 20.0_f32;

                while let Ok(Some(line)) = lines.next_line().await {
                    let reply = match line.trim() {
                        "PING" => "PONG".to_string(),
                        "READ" => {
                            reading += 0.5;
                            format!("TEMP {reading:.1}")
                        }
                        "BYE" => break,
                        other => format!("ERR unknown command {other}"),
                    };
                    if writer.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
                        break;
                    }
                }
            }),
        )
}
