use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{apply::ApplyArgs, deployment::InspectDeploymentArgs, keygen::KeygenArgs, permit::SignPermitArgs, replay::ReplayArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Operate the compute marketplace ledger", long_about = None)]
pub struct Cli {
    /// Engine configuration (TOML)
    #[arg(short, long, global = true, env = "DCM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a JSON batch of calls against a fresh engine
    Apply(ApplyArgs),

    /// Print the events stored in a JSON-lines event log
    Replay(ReplayArgs),

    /// Summarise a deployment record file
    #[command(name = "inspect-deployment")]
    InspectDeployment(InspectDeploymentArgs),

    /// Generate a principal keypair
    Keygen(KeygenArgs),

    /// Sign a permit and print the relayable call
    #[command(name = "sign-permit")]
    SignPermit(SignPermitArgs),
}
