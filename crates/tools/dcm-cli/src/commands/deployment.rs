use crate::error::CliResult;
use clap::Args;
use dcm_config::{DeploymentForm, DeploymentRecord};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct InspectDeploymentArgs {
    /// Deployment record (network record, latest pointer or flat map)
    pub path: PathBuf,

    /// Print only the address of this contract
    #[arg(long)]
    pub contract: Option<String>,
}

pub fn handle_inspect_deployment(args: &InspectDeploymentArgs) -> CliResult<()> {
    let record = DeploymentRecord::load(&args.path)?;

    if let Some(contract) = &args.contract {
        let address = record
            .address_of(contract)
            .ok_or_else(|| crate::error::CliError::Input(format!("no contract named {} in record", contract)))?;
        println!("{}", address);
        return Ok(());
    }

    let form = match record.form() {
        DeploymentForm::Network => "network record",
        DeploymentForm::Latest => "latest pointer",
        DeploymentForm::Flat => "flat address map",
    };
    println!("Form: {}", form);
    if let Some(network) = record.network() {
        println!("Network: {}", network);
    }
    for (name, address) in record.addresses() {
        println!("  {:<24} {}", name, address);
    }
    Ok(())
}
