//! Telemetry initialisation for the image-encryptor binary.
//!
//! Structured JSON logs only, written to stderr; stdout carries the per-file
//! result lines.
//!
//! # Telemetry invariants
//!
//! - **No key material, nonce or plaintext** appears in any span or log field.
//! - Log level comes from `IMAGE_ENCRYPTOR_LOG_LEVEL` (default: `info`);
//!   `RUST_LOG` overrides it.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise image-encryptor tracing subscriber: {e}"))
}
