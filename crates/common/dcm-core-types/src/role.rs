use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque role identifier: SHA-256 of the role name, except the default admin
/// role which is all zeroes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(#[serde(with = "hex_bytes")] [u8; 32]);

impl RoleId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        RoleId(bytes)
    }

    pub fn named(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        RoleId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Human-readable label for the well-known roles, hex otherwise.
    pub fn label(&self) -> String {
        let known: [(&RoleId, &str); 7] = [
            (&DEFAULT_ADMIN_ROLE, "DEFAULT_ADMIN_ROLE"),
            (&*MINTER_ROLE, "MINTER_ROLE"),
            (&*PAUSER_ROLE, "PAUSER_ROLE"),
            (&*UPGRADER_ROLE, "UPGRADER_ROLE"),
            (&*PROFILE_UPDATER_ROLE, "PROFILE_UPDATER_ROLE"),
            (&*METRICS_REPORTER_ROLE, "METRICS_REPORTER_ROLE"),
            (&*CLUSTER_OPERATOR_ROLE, "CLUSTER_OPERATOR_ROLE"),
        ];
        known
            .iter()
            .find(|(role, _)| *role == self)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("0x{}", hex::encode(self.0)))
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl fmt::Debug for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoleId({})", self.label())
    }
}

pub const DEFAULT_ADMIN_ROLE: RoleId = RoleId([0u8; 32]);

lazy_static! {
    pub static ref MINTER_ROLE: RoleId = RoleId::named("MINTER_ROLE");
    pub static ref PAUSER_ROLE: RoleId = RoleId::named("PAUSER_ROLE");
    pub static ref UPGRADER_ROLE: RoleId = RoleId::named("UPGRADER_ROLE");
    pub static ref PROFILE_UPDATER_ROLE: RoleId = RoleId::named("PROFILE_UPDATER_ROLE");
    pub static ref METRICS_REPORTER_ROLE: RoleId = RoleId::named("METRICS_REPORTER_ROLE");
    pub static ref CLUSTER_OPERATOR_ROLE: RoleId = RoleId::named("CLUSTER_OPERATOR_ROLE");
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        raw.as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected 32 role bytes, got {}", raw.len())))
    }
}
