// src/bin/coordinator.rs

//! Entry point for the coordinator process.

use anyhow::Result;
use fleetmodeld::config::CoordinatorConfig;

#[tokio::main]
async fn main() -> Result<()> {
    fleetmodeld::logging::init();
    let config = CoordinatorConfig::from_env()?;
    fleetmodeld::coordinator::run(config).await
}
