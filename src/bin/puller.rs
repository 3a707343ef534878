// src/bin/puller.rs

//! Entry point for the artifact puller process.

use anyhow::Result;
use fleetmodeld::config::PullerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    fleetmodeld::logging::init();
    let config = PullerConfig::from_env()?;
    fleetmodeld::puller::run(config).await
}
