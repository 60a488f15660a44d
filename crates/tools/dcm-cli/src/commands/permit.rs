use crate::commands::keygen::load_key_file;
use crate::error::{CliError, CliResult};
use chrono::{Duration, Utc};
use clap::Args;
use dcm_config::EngineConfig;
use dcm_core_types::{parse_units, Principal};
use dcm_ledger::{domain_separator, Call, PermitAuthorization};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct SignPermitArgs {
    /// Owner key file written by `keygen`
    #[arg(short, long)]
    pub key: PathBuf,

    /// Principal receiving the allowance
    #[arg(long)]
    pub spender: Principal,

    /// Allowance in whole tokens (up to 18 decimals)
    #[arg(long)]
    pub amount: String,

    /// Owner's current permit nonce
    #[arg(long, default_value_t = 0)]
    pub nonce: u64,

    /// Seconds until the permit expires
    #[arg(long, default_value_t = 3600)]
    pub valid_for: i64,
}

pub fn handle_sign_permit(config: &EngineConfig, args: &SignPermitArgs) -> CliResult<()> {
    let key = load_key_file(&args.key)?;
    let amount = parse_units(&args.amount).map_err(|e| CliError::Input(e.to_string()))?;
    if args.valid_for <= 0 {
        return Err(CliError::Input("--valid-for must be positive".to_string()));
    }

    let domain = domain_separator(&config.token.name, &config.token.address);
    let authorization = PermitAuthorization {
        owner: key.principal(),
        spender: args.spender,
        amount,
        deadline: Utc::now() + Duration::seconds(args.valid_for),
        nonce: args.nonce,
    };
    let signature = authorization.sign(&key, &domain);

    let call = Call::Permit {
        owner: authorization.owner,
        spender: authorization.spender,
        amount: authorization.amount,
        deadline: authorization.deadline,
        signature: hex::encode(signature),
    };
    println!("{}", serde_json::to_string_pretty(&call)?);
    Ok(())
}
