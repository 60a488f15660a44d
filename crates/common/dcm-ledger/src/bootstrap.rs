//! Turns an `EngineConfig` into a running engine.

use crate::clock::Clock;
use crate::engine::Engine;
use crate::event_log::{EventLog, JsonlEventLog, MemoryEventLog};
use crate::state::Genesis;
use crate::token::Implementation;
use anyhow::{anyhow, Context, Result};
use dcm_config::{EngineConfig, EventLogConfig, ImplementationLabel};
use log::info;
use std::sync::Arc;

pub fn genesis_from_config(config: &EngineConfig) -> Result<Genesis> {
    config.validate()?;

    let implementation = match config.token.implementation {
        ImplementationLabel::V1 => Implementation::V1,
        ImplementationLabel::V2 => {
            let max_supply = config
                .max_supply_units()?
                .ok_or_else(|| anyhow!("token.max_supply is required for implementation v2"))?;
            Implementation::V2 { max_supply }
        }
    };

    let mut genesis = Genesis::new(config.bootstrap.admin, config.token.address);
    genesis.token_name = config.token.name.clone();
    genesis.token_symbol = config.token.symbol.clone();
    genesis.implementation = implementation;
    genesis.minters = config.bootstrap.minters.clone();
    genesis.pausers = config.bootstrap.pausers.clone();
    genesis.operators = config.bootstrap.operators.clone();
    genesis.reporters = config.bootstrap.reporters.clone();
    Ok(genesis)
}

/// JSON-lines file when a path is configured, in-memory otherwise.
pub async fn open_event_log(config: &EventLogConfig) -> Result<Arc<dyn EventLog>> {
    match &config.path {
        Some(path) => {
            let log = JsonlEventLog::open(path)
                .await
                .with_context(|| format!("Failed to open event log at {}", path.display()))?;
            info!("Using event log file {}", path.display());
            Ok(Arc::new(log))
        }
        None => Ok(Arc::new(MemoryEventLog::new(config.channel_capacity))),
    }
}

pub async fn open_engine(config: &EngineConfig, clock: Arc<dyn Clock>) -> Result<Engine> {
    let genesis = genesis_from_config(config)?;
    let log = open_event_log(&config.event_log).await?;
    Engine::new(&genesis, log, clock)
        .await
        .context("Failed to start ledger engine")
}
