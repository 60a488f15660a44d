//! The utility token: a fixed-address proxy over swappable balance logic.

pub mod logic;
pub mod permit;
pub mod storage;

pub use logic::{Implementation, TokenLogic, TokenLogicV1, TokenLogicV2};
pub use permit::{domain_separator, PermitAuthorization};
pub use storage::{TokenStorage, UNLIMITED_ALLOWANCE};

use crate::context::{CallContext, Guard};
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventSink, LedgerEvent};
use chrono::{DateTime, Utc};
use dcm_core_types::{format_units, verify_message, Principal, DECIMALS, MINTER_ROLE, UPGRADER_ROLE};
use log::{debug, info};
use std::sync::Arc;

/// Stable public face of the token. `address`, metadata and storage are fixed
/// for the lifetime of the ledger; only `logic` is replaced on upgrade.
#[derive(Debug, Clone)]
pub struct TokenLedger {
    address: Principal,
    name: String,
    symbol: String,
    domain_separator: [u8; 32],
    storage: TokenStorage,
    logic: Arc<dyn TokenLogic>,
}

impl TokenLedger {
    pub fn new(address: Principal, name: &str, symbol: &str, implementation: Implementation) -> Self {
        Self {
            address,
            name: name.to_string(),
            symbol: symbol.to_string(),
            domain_separator: domain_separator(name, &address),
            storage: TokenStorage::default(),
            logic: implementation.instantiate(),
        }
    }

    pub fn address(&self) -> Principal {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u32 {
        DECIMALS
    }

    pub fn implementation_version(&self) -> u32 {
        self.logic.version()
    }

    pub fn supply_cap(&self) -> Option<u128> {
        self.logic.supply_cap()
    }

    pub fn domain_separator(&self) -> [u8; 32] {
        self.domain_separator
    }

    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    pub fn balance_of(&self, account: &Principal) -> u128 {
        self.storage.balance_of(account)
    }

    pub fn total_supply(&self) -> u128 {
        self.storage.total_supply()
    }

    pub fn allowance(&self, owner: &Principal, spender: &Principal) -> u128 {
        self.storage.allowance(owner, spender)
    }

    pub fn nonces(&self, owner: &Principal) -> u64 {
        self.storage.nonce(owner)
    }

    pub fn mint(&mut self, guard: &Guard, ctx: &CallContext, to: Principal, amount: u128, sink: &mut EventSink) -> LedgerResult<()> {
        guard.when_not_paused()?;
        guard.authorize(&ctx.caller, &MINTER_ROLE)?;
        validate_recipient(&to, "mint")?;
        validate_amount(amount)?;

        self.logic.mint(&mut self.storage, to, amount)?;
        debug!("Minted {} {} to {}", format_units(amount), self.symbol, to.short());
        sink.emit(LedgerEvent::Transfer { from: Principal::ZERO, to, amount });
        sink.emit(LedgerEvent::Minted { to, amount });
        Ok(())
    }

    pub fn mint_rewards(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        to: Principal,
        amount: u128,
        reason: &str,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        guard.authorize(&ctx.caller, &MINTER_ROLE)?;
        validate_recipient(&to, "mint")?;
        validate_amount(amount)?;
        if reason.trim().is_empty() {
            return Err(LedgerError::invalid("reward reason must not be empty"));
        }

        self.logic.mint(&mut self.storage, to, amount)?;
        info!("Minted {} {} rewards to {}: {}", format_units(amount), self.symbol, to.short(), reason);
        sink.emit(LedgerEvent::Transfer { from: Principal::ZERO, to, amount });
        sink.emit(LedgerEvent::RewardsMinted { to, amount, reason: reason.to_string() });
        Ok(())
    }

    pub fn burn(&mut self, guard: &Guard, ctx: &CallContext, amount: u128, sink: &mut EventSink) -> LedgerResult<()> {
        guard.when_not_paused()?;
        validate_amount(amount)?;

        self.logic.burn(&mut self.storage, ctx.caller, amount)?;
        sink.emit(LedgerEvent::Transfer { from: ctx.caller, to: Principal::ZERO, amount });
        sink.emit(LedgerEvent::Burned { from: ctx.caller, amount });
        Ok(())
    }

    pub fn burn_from(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        owner: Principal,
        amount: u128,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        validate_amount(amount)?;
        let remaining_allowance = self.storage.allowance_after_spend(&owner, &ctx.caller, amount)?;
        ensure_balance(&self.storage, &owner, amount)?;

        self.logic.burn(&mut self.storage, owner, amount)?;
        self.storage.set_allowance(owner, ctx.caller, remaining_allowance);
        sink.emit(LedgerEvent::Transfer { from: owner, to: Principal::ZERO, amount });
        sink.emit(LedgerEvent::Burned { from: owner, amount });
        Ok(())
    }

    pub fn transfer(&mut self, guard: &Guard, ctx: &CallContext, to: Principal, amount: u128, sink: &mut EventSink) -> LedgerResult<()> {
        guard.when_not_paused()?;
        validate_recipient(&to, "transfer")?;
        validate_amount(amount)?;

        self.logic.transfer(&mut self.storage, ctx.caller, to, amount)?;
        sink.emit(LedgerEvent::Transfer { from: ctx.caller, to, amount });
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        owner: Principal,
        to: Principal,
        amount: u128,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        validate_recipient(&to, "transfer")?;
        validate_amount(amount)?;
        let remaining_allowance = self.storage.allowance_after_spend(&owner, &ctx.caller, amount)?;
        ensure_balance(&self.storage, &owner, amount)?;

        self.logic.transfer(&mut self.storage, owner, to, amount)?;
        self.storage.set_allowance(owner, ctx.caller, remaining_allowance);
        sink.emit(LedgerEvent::Transfer { from: owner, to, amount });
        Ok(())
    }

    /// Set `spender`'s allowance outright. Zero clears it.
    pub fn approve(&mut self, guard: &Guard, ctx: &CallContext, spender: Principal, amount: u128, sink: &mut EventSink) -> LedgerResult<()> {
        guard.when_not_paused()?;
        validate_recipient(&spender, "approve")?;
        self.write_allowance(ctx.caller, spender, amount, sink);
        Ok(())
    }

    pub fn increase_allowance(&mut self, guard: &Guard, ctx: &CallContext, spender: Principal, added: u128, sink: &mut EventSink) -> LedgerResult<()> {
        guard.when_not_paused()?;
        validate_recipient(&spender, "approve")?;
        let amount = self
            .storage
            .allowance(&ctx.caller, &spender)
            .checked_add(added)
            .ok_or_else(LedgerError::overflow)?;
        self.write_allowance(ctx.caller, spender, amount, sink);
        Ok(())
    }

    pub fn decrease_allowance(&mut self, guard: &Guard, ctx: &CallContext, spender: Principal, subtracted: u128, sink: &mut EventSink) -> LedgerResult<()> {
        guard.when_not_paused()?;
        validate_recipient(&spender, "approve")?;
        let current = self.storage.allowance(&ctx.caller, &spender);
        let amount = current.checked_sub(subtracted).ok_or_else(|| {
            LedgerError::invalid(format!("decrease of {} exceeds allowance {}", subtracted, current))
        })?;
        self.write_allowance(ctx.caller, spender, amount, sink);
        Ok(())
    }

    /// Apply an owner-signed allowance submitted by any caller.
    #[allow(clippy::too_many_arguments)]
    pub fn permit(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        owner: Principal,
        spender: Principal,
        amount: u128,
        deadline: DateTime<Utc>,
        signature: &[u8],
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        validate_recipient(&owner, "permit")?;
        validate_recipient(&spender, "permit")?;
        if ctx.now > deadline {
            return Err(LedgerError::Expired { deadline, now: ctx.now });
        }

        let nonce = self.storage.nonce(&owner);
        let authorization = PermitAuthorization { owner, spender, amount, deadline, nonce };
        let digest = authorization.digest(&self.domain_separator);
        verify_message(&owner, &digest, signature)
            .map_err(|e| LedgerError::invalid(format!("invalid permit signature: {}", e)))?;

        self.storage.increment_nonce(owner)?;
        self.write_allowance(owner, spender, amount, sink);
        debug!("Permit #{} consumed for {} -> {}", nonce, owner.short(), spender.short());
        sink.emit(LedgerEvent::PermitConsumed { owner, spender, nonce });
        Ok(())
    }

    /// Swap the logic behind the proxy. Storage, address and outstanding
    /// permits carry over unchanged.
    pub fn upgrade_implementation(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        implementation: Implementation,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        guard.authorize(&ctx.caller, &UPGRADER_ROLE)?;
        let from_version = self.logic.version();
        let to_version = implementation.version();
        if to_version <= from_version {
            return Err(LedgerError::state(format!(
                "cannot move implementation from v{} to v{}",
                from_version, to_version
            )));
        }
        if let Implementation::V2 { max_supply } = implementation {
            if max_supply < self.storage.total_supply() {
                return Err(LedgerError::state(format!(
                    "supply cap {} is below current supply {}",
                    format_units(max_supply),
                    format_units(self.storage.total_supply())
                )));
            }
        }

        self.logic = implementation.instantiate();
        info!("Token implementation upgraded v{} -> v{} by {}", from_version, to_version, ctx.caller.short());
        sink.emit(LedgerEvent::ImplementationUpgraded { from_version, to_version });
        Ok(())
    }

    fn write_allowance(&mut self, owner: Principal, spender: Principal, amount: u128, sink: &mut EventSink) {
        self.storage.set_allowance(owner, spender, amount);
        sink.emit(LedgerEvent::Approval { owner, spender, amount });
    }
}

fn validate_recipient(account: &Principal, action: &str) -> LedgerResult<()> {
    if account.is_zero() {
        return Err(LedgerError::invalid(format!("cannot {} with the null principal", action)));
    }
    Ok(())
}

fn validate_amount(amount: u128) -> LedgerResult<()> {
    if amount == 0 {
        return Err(LedgerError::invalid("amount must be greater than zero"));
    }
    Ok(())
}

fn ensure_balance(storage: &TokenStorage, owner: &Principal, amount: u128) -> LedgerResult<()> {
    let balance = storage.balance_of(owner);
    if balance < amount {
        return Err(LedgerError::invalid(format!("amount {} exceeds balance {}", amount, balance)));
    }
    Ok(())
}
