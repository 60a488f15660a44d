//! dcm-cli: operator tooling for the ledger engine.

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::{Cli, Commands};
pub use error::{CliError, CliResult};

use dcm_config::{load_engine_config, EngineConfig};

/// Load the `--config` file when one was given.
pub fn load_config(cli: &Cli) -> CliResult<Option<EngineConfig>> {
    match &cli.config {
        Some(path) => Ok(Some(load_engine_config(path)?)),
        None => Ok(None),
    }
}

fn require_config(config: Option<&EngineConfig>) -> CliResult<&EngineConfig> {
    config.ok_or_else(|| CliError::Config("this command needs --config <engine.toml>".to_string()))
}

pub async fn run(cli: Cli, config: Option<EngineConfig>) -> CliResult<()> {
    let config = config.as_ref();
    match &cli.command {
        Commands::Apply(args) => commands::apply::handle_apply(require_config(config)?, args).await,
        Commands::Replay(args) => commands::replay::handle_replay(args).await,
        Commands::InspectDeployment(args) => commands::deployment::handle_inspect_deployment(args),
        Commands::Keygen(args) => commands::keygen::handle_keygen(args),
        Commands::SignPermit(args) => commands::permit::handle_sign_permit(require_config(config)?, args),
    }
}
