//! Versioned token implementations behind the fixed-address proxy.

use super::storage::TokenStorage;
use crate::error::{LedgerError, LedgerResult};
use dcm_core_types::units::amount_str;
use dcm_core_types::{format_units, Principal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Selects the implementation a proxy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version", rename_all = "snake_case")]
pub enum Implementation {
    V1,
    V2 {
        #[serde(with = "amount_str")]
        max_supply: u128,
    },
}

impl Implementation {
    pub fn version(&self) -> u32 {
        match self {
            Implementation::V1 => 1,
            Implementation::V2 { .. } => 2,
        }
    }

    pub fn instantiate(&self) -> Arc<dyn TokenLogic> {
        match *self {
            Implementation::V1 => Arc::new(TokenLogicV1),
            Implementation::V2 { max_supply } => Arc::new(TokenLogicV2 { max_supply }),
        }
    }
}

/// Balance-moving rules of one token version. Role, pause and argument checks
/// stay in the proxy so they never change across upgrades.
pub trait TokenLogic: Send + Sync + fmt::Debug {
    fn version(&self) -> u32;

    fn supply_cap(&self) -> Option<u128> {
        None
    }

    fn mint(&self, storage: &mut TokenStorage, to: Principal, amount: u128) -> LedgerResult<()> {
        storage.mint(to, amount)
    }

    fn burn(&self, storage: &mut TokenStorage, from: Principal, amount: u128) -> LedgerResult<()> {
        storage.burn(from, amount)
    }

    fn transfer(&self, storage: &mut TokenStorage, from: Principal, to: Principal, amount: u128) -> LedgerResult<()> {
        storage.transfer(from, to, amount)
    }
}

#[derive(Debug)]
pub struct TokenLogicV1;

impl TokenLogic for TokenLogicV1 {
    fn version(&self) -> u32 {
        1
    }
}

/// V1 plus a hard cap on total supply.
#[derive(Debug)]
pub struct TokenLogicV2 {
    pub max_supply: u128,
}

impl TokenLogic for TokenLogicV2 {
    fn version(&self) -> u32 {
        2
    }

    fn supply_cap(&self) -> Option<u128> {
        Some(self.max_supply)
    }

    fn mint(&self, storage: &mut TokenStorage, to: Principal, amount: u128) -> LedgerResult<()> {
        let after = storage.total_supply().checked_add(amount).ok_or_else(LedgerError::overflow)?;
        if after > self.max_supply {
            return Err(LedgerError::invalid(format!(
                "mint would raise supply to {} above cap {}",
                format_units(after),
                format_units(self.max_supply)
            )));
        }
        storage.mint(to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v2_enforces_cap() {
        let logic = Implementation::V2 { max_supply: 100 }.instantiate();
        let mut storage = TokenStorage::default();
        let to = Principal::from_bytes([1; 32]);
        logic.mint(&mut storage, to, 100).unwrap();
        assert!(logic.mint(&mut storage, to, 1).is_err());
        assert_eq!(storage.total_supply(), 100);
    }

    #[test]
    fn test_implementation_serde() {
        let json = serde_json::to_string(&Implementation::V2 { max_supply: 5 }).unwrap();
        assert_eq!(json, r#"{"version":"v2","max_supply":"5"}"#);
        let v1: Implementation = serde_json::from_str(r#"{"version":"v1"}"#).unwrap();
        assert_eq!(v1.version(), 1);
    }
}
