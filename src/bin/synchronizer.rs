// src/bin/synchronizer.rs

//! Entry point for the serving-config synchronizer process.

use anyhow::Result;
use fleetmodeld::config::SynchronizerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    fleetmodeld::logging::init();
    let config = SynchronizerConfig::from_env()?;
    fleetmodeld::synchronizer::run(config).await
}
