// src/logging.rs

//! Structured logging setup shared by all three binaries.

use crate::core::log_capture::CaptureLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Initializes the global tracing subscriber: an `EnvFilter` driven by
/// `RUST_LOG` (defaulting to `info`), compact formatting, and the capture
/// layer operator-triggered reconciliation passes use to return their log
/// output as an HTTP response body.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(CaptureLayer)
        .init();
}
