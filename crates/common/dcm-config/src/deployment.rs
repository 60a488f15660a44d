//! Readers for the deployment records external tooling writes: the full
//! per-network record, the "latest" pointer, and the flat name -> address map.
//! All three are keyed by contract name.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ContractDeployment {
    pub address: String,
    #[serde(default)]
    pub implementation: Option<String>,
    #[serde(default, rename = "txHash", alias = "tx_hash")]
    pub tx_hash: Option<String>,
    #[serde(default, rename = "blockNumber", alias = "block_number")]
    pub block_number: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkDeployment {
    pub network: String,
    #[serde(default, rename = "chainId", alias = "chain_id")]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub deployer: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub contracts: BTreeMap<String, ContractDeployment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentForm {
    Network,
    Latest,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentRecord {
    Network(NetworkDeployment),
    Latest(NetworkDeployment),
    Flat(BTreeMap<String, String>),
}

impl DeploymentRecord {
    /// Parse a record. Structured records are `Network` unless `latest` is
    /// set, which is how the pointer file is told apart.
    pub fn from_json(content: &str, latest: bool) -> anyhow::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content).context("Deployment record is not JSON")?;
        let object = match value.as_object() {
            Some(object) => object,
            None => bail!("Deployment record must be a JSON object"),
        };

        if object.contains_key("contracts") {
            let record: NetworkDeployment =
                serde_json::from_value(value).context("Malformed network deployment record")?;
            return Ok(if latest {
                DeploymentRecord::Latest(record)
            } else {
                DeploymentRecord::Network(record)
            });
        }

        let flat: BTreeMap<String, String> =
            serde_json::from_value(value).context("Flat deployment record must map names to address strings")?;
        Ok(DeploymentRecord::Flat(flat))
    }

    /// Load from disk; a file stem ending in `latest` marks the pointer form.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment record {}", path.display()))?;
        let latest = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.ends_with("latest"))
            .unwrap_or(false);
        Self::from_json(&content, latest).with_context(|| format!("Invalid deployment record {}", path.display()))
    }

    pub fn form(&self) -> DeploymentForm {
        match self {
            DeploymentRecord::Network(_) => DeploymentForm::Network,
            DeploymentRecord::Latest(_) => DeploymentForm::Latest,
            DeploymentRecord::Flat(_) => DeploymentForm::Flat,
        }
    }

    pub fn network(&self) -> Option<&str> {
        match self {
            DeploymentRecord::Network(r) | DeploymentRecord::Latest(r) => Some(&r.network),
            DeploymentRecord::Flat(_) => None,
        }
    }

    /// Uniform name -> address view of any form.
    pub fn addresses(&self) -> BTreeMap<String, String> {
        match self {
            DeploymentRecord::Network(r) | DeploymentRecord::Latest(r) => r
                .contracts
                .iter()
                .map(|(name, c)| (name.clone(), c.address.clone()))
                .collect(),
            DeploymentRecord::Flat(map) => map.clone(),
        }
    }

    pub fn address_of(&self, contract: &str) -> Option<String> {
        self.addresses().remove(contract)
    }
}
