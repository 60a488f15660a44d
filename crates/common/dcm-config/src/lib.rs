use anyhow::{bail, Context};
use dcm_core_types::{parse_units, Principal};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod deployment;

pub use deployment::{ContractDeployment, DeploymentForm, DeploymentRecord, NetworkDeployment};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    pub token: TokenConfig,
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub event_log: EventLogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImplementationLabel {
    #[default]
    V1,
    V2,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    /// Fixed external identity of the token proxy.
    pub address: Principal,
    #[serde(default)]
    pub implementation: ImplementationLabel,
    /// Whole tokens, e.g. "1000000000". Required by v2, ignored by v1.
    pub max_supply: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BootstrapConfig {
    pub admin: Principal,
    #[serde(default)]
    pub minters: Vec<Principal>,
    #[serde(default)]
    pub pausers: Vec<Principal>,
    #[serde(default)]
    pub operators: Vec<Principal>,
    #[serde(default)]
    pub reporters: Vec<Principal>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EventLogConfig {
    /// JSON-lines file; the log is kept in memory when unset.
    pub path: Option<PathBuf>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self { path: None, channel_capacity: default_channel_capacity() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_filter() }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bootstrap.admin.is_zero() {
            bail!("bootstrap.admin must not be the null principal");
        }
        if self.token.address.is_zero() {
            bail!("token.address must not be the null principal");
        }
        if self.token.name.trim().is_empty() || self.token.symbol.trim().is_empty() {
            bail!("token.name and token.symbol must not be empty");
        }
        if self.token.implementation == ImplementationLabel::V2 && self.token.max_supply.is_none() {
            bail!("token.max_supply is required for implementation v2");
        }
        self.max_supply_units()?;
        if self.event_log.channel_capacity == 0 {
            bail!("event_log.channel_capacity must be positive");
        }
        Ok(())
    }

    /// `token.max_supply` converted to base units.
    pub fn max_supply_units(&self) -> anyhow::Result<Option<u128>> {
        self.token
            .max_supply
            .as_deref()
            .map(|raw| parse_units(raw).with_context(|| format!("Invalid token.max_supply {:?}", raw)))
            .transpose()
    }
}

pub fn parse_engine_config(content: &str) -> anyhow::Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(content).context("Failed to parse engine TOML config")?;
    config.validate()?;
    Ok(config)
}

pub fn load_engine_config(path: impl AsRef<Path>) -> anyhow::Result<EngineConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file from {}", path.display()))?;
    parse_engine_config(&content).with_context(|| format!("Invalid config at {}", path.display()))
}
