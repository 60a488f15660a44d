use crate::error::{CliError, CliResult};
use clap::Args;
use dcm_core_types::PrincipalKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk form of a principal keypair.
#[derive(Serialize, Deserialize, Debug)]
pub struct KeyFile {
    pub principal: String,
    /// Hex-encoded 32-byte secret seed.
    pub seed: String,
}

#[derive(Args, Debug, Clone)]
pub struct KeygenArgs {
    /// Write the key file here instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing key file
    #[arg(short, long)]
    pub force: bool,
}

pub fn handle_keygen(args: &KeygenArgs) -> CliResult<()> {
    let key = PrincipalKey::generate();
    let file = KeyFile { principal: key.principal().to_string(), seed: hex::encode(key.seed()) };
    let json = serde_json::to_string_pretty(&file)?;

    match &args.output {
        Some(path) => {
            if path.exists() && !args.force {
                return Err(CliError::Input(format!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                )));
            }
            fs::write(path, json)?;
            println!("{}", file.principal);
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn load_key_file(path: &Path) -> CliResult<PrincipalKey> {
    let file: KeyFile = serde_json::from_str(&fs::read_to_string(path)?)?;
    let bytes = hex::decode(file.seed.trim_start_matches("0x"))
        .map_err(|e| CliError::Input(format!("key seed is not hex: {}", e)))?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CliError::Input("key seed must be 32 bytes".to_string()))?;
    let key = PrincipalKey::from_seed(seed);
    if key.principal().to_string() != file.principal {
        return Err(CliError::Input(format!(
            "key file principal {} does not match its seed",
            file.principal
        )));
    }
    Ok(key)
}
