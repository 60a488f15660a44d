use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrincipalError {
    #[error("Principal must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("Invalid hex in principal: {0}")]
    InvalidHex(String),
    #[error("Invalid principal length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("Principal is not a valid Ed25519 public key")]
    NotAKey,
}

/// Account identity: the 32 bytes of an Ed25519 verifying key.
///
/// Principals need no registration; they exist as soon as a grant, balance or
/// record mentions them. `Principal::ZERO` is the null identity and is never a
/// valid transfer or mint target.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Principal([u8; PUBLIC_KEY_LENGTH]);

impl Principal {
    pub const ZERO: Principal = Principal([0u8; PUBLIC_KEY_LENGTH]);

    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Principal(bytes)
    }

    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Principal(key.to_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; PUBLIC_KEY_LENGTH]
    }

    /// Recover the verifying key behind this principal. Fails for byte strings
    /// that do not decode to a curve point (including `ZERO` on most builds).
    pub fn to_verifying_key(&self) -> Result<VerifyingKey, PrincipalError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| PrincipalError::NotAKey)
    }

    /// Short form used in log lines: `0x1234abcd…`.
    pub fn short(&self) -> String {
        format!("0x{}…", hex::encode(&self.0[..4]))
    }
}

impl From<&VerifyingKey> for Principal {
    fn from(key: &VerifyingKey) -> Self {
        Principal::from_verifying_key(key)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.short())
    }
}

impl FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| PrincipalError::MissingPrefix(s.to_string()))?;
        let bytes = hex::decode(hex_part).map_err(|e| PrincipalError::InvalidHex(e.to_string()))?;
        let array: [u8; PUBLIC_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PrincipalError::InvalidLength { expected: PUBLIC_KEY_LENGTH, got: bytes.len() })?;
        Ok(Principal(array))
    }
}

// Principals travel as hex strings in configs, call batches and event logs.
impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
