use crate::error::{LedgerError, LedgerResult};
use dcm_core_types::Principal;
use std::collections::HashMap;

/// Allowance value treated as "unlimited": never decremented when spent.
pub const UNLIMITED_ALLOWANCE: u128 = u128::MAX;

/// Token storage that outlives implementation upgrades.
///
/// Every mutator computes all new values with checked arithmetic before it
/// writes anything, so an `Err` never leaves a half-applied change behind.
/// `sum(balances) == total_supply` holds after every call.
#[derive(Debug, Clone, Default)]
pub struct TokenStorage {
    balances: HashMap<Principal, u128>,
    allowances: HashMap<(Principal, Principal), u128>,
    nonces: HashMap<Principal, u64>,
    total_supply: u128,
}

impl TokenStorage {
    pub fn balance_of(&self, account: &Principal) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Principal, spender: &Principal) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    pub fn nonce(&self, owner: &Principal) -> u64 {
        self.nonces.get(owner).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Sum of all balances; equals `total_supply` unless storage is corrupt.
    pub fn balance_sum(&self) -> Option<u128> {
        self.balances.values().try_fold(0u128, |acc, b| acc.checked_add(*b))
    }

    pub fn holders(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    pub(crate) fn mint(&mut self, to: Principal, amount: u128) -> LedgerResult<()> {
        let supply = self.total_supply.checked_add(amount).ok_or_else(LedgerError::overflow)?;
        let balance = self.balance_of(&to).checked_add(amount).ok_or_else(LedgerError::overflow)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    pub(crate) fn burn(&mut self, from: Principal, amount: u128) -> LedgerResult<()> {
        let balance = self.balance_of(&from);
        let remaining = balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::invalid(format!("burn amount {} exceeds balance {}", amount, balance))
        })?;
        let supply = self.total_supply.checked_sub(amount).ok_or_else(LedgerError::overflow)?;
        self.total_supply = supply;
        self.set_balance(from, remaining);
        Ok(())
    }

    pub(crate) fn transfer(&mut self, from: Principal, to: Principal, amount: u128) -> LedgerResult<()> {
        let from_balance = self.balance_of(&from);
        let from_after = from_balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::invalid(format!("transfer amount {} exceeds balance {}", amount, from_balance))
        })?;
        if from == to {
            return Ok(());
        }
        let to_after = self.balance_of(&to).checked_add(amount).ok_or_else(LedgerError::overflow)?;
        self.set_balance(from, from_after);
        self.set_balance(to, to_after);
        Ok(())
    }

    pub(crate) fn set_allowance(&mut self, owner: Principal, spender: Principal, amount: u128) {
        if amount == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }

    /// Allowance left after `spender` uses `amount` of `owner`'s tokens.
    pub(crate) fn allowance_after_spend(&self, owner: &Principal, spender: &Principal, amount: u128) -> LedgerResult<u128> {
        let current = self.allowance(owner, spender);
        if current == UNLIMITED_ALLOWANCE {
            return Ok(current);
        }
        current.checked_sub(amount).ok_or_else(|| {
            LedgerError::invalid(format!("amount {} exceeds allowance {}", amount, current))
        })
    }

    pub(crate) fn increment_nonce(&mut self, owner: Principal) -> LedgerResult<u64> {
        let current = self.nonce(&owner);
        let next = current.checked_add(1).ok_or_else(LedgerError::overflow)?;
        self.nonces.insert(owner, next);
        Ok(current)
    }

    fn set_balance(&mut self, account: Principal, balance: u128) {
        if balance == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u8) -> Principal {
        Principal::from_bytes([n; 32])
    }

    #[test]
    fn test_mint_burn_keep_supply_in_sync() {
        let mut s = TokenStorage::default();
        s.mint(p(1), 1000).unwrap();
        s.mint(p(2), 500).unwrap();
        s.burn(p(1), 400).unwrap();
        assert_eq!(s.total_supply(), 1100);
        assert_eq!(s.balance_sum(), Some(1100));
        assert_eq!(s.holders(), 2);
    }

    #[test]
    fn test_overflow_is_rejected_without_mutation() {
        let mut s = TokenStorage::default();
        s.mint(p(1), u128::MAX).unwrap();
        assert!(s.mint(p(2), 1).is_err());
        assert_eq!(s.balance_of(&p(2)), 0);
        assert_eq!(s.total_supply(), u128::MAX);
    }

    #[test]
    fn test_transfer_underflow_leaves_balances() {
        let mut s = TokenStorage::default();
        s.mint(p(1), 10).unwrap();
        assert!(s.transfer(p(1), p(2), 11).is_err());
        assert_eq!(s.balance_of(&p(1)), 10);
        assert_eq!(s.balance_of(&p(2)), 0);
    }

    #[test]
    fn test_unlimited_allowance_is_not_consumed() {
        let mut s = TokenStorage::default();
        s.set_allowance(p(1), p(2), UNLIMITED_ALLOWANCE);
        assert_eq!(s.allowance_after_spend(&p(1), &p(2), 1_000).unwrap(), UNLIMITED_ALLOWANCE);
        s.set_allowance(p(1), p(3), 5);
        assert!(s.allowance_after_spend(&p(1), &p(3), 6).is_err());
    }
}
