use crate::access::{authorize, AccessControlLedger};
use crate::context::CallContext;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventSink, LedgerEvent};
use dcm_core_types::PAUSER_ROLE;
use log::info;

/// Process-wide emergency switch. While engaged, every mutating entry point of
/// the token, registry and cluster stores fails before touching state.
#[derive(Debug, Clone, Default)]
pub struct PauseGate {
    paused: bool,
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self, access: &AccessControlLedger, ctx: &CallContext, sink: &mut EventSink) -> LedgerResult<()> {
        authorize(access, &ctx.caller, &PAUSER_ROLE)?;
        if self.paused {
            return Err(LedgerError::state("already paused"));
        }
        self.paused = true;
        info!("Ledger paused by {}", ctx.caller.short());
        sink.emit(LedgerEvent::Paused { by: ctx.caller });
        Ok(())
    }

    pub fn unpause(&mut self, access: &AccessControlLedger, ctx: &CallContext, sink: &mut EventSink) -> LedgerResult<()> {
        authorize(access, &ctx.caller, &PAUSER_ROLE)?;
        if !self.paused {
            return Err(LedgerError::state("not paused"));
        }
        self.paused = false;
        info!("Ledger unpaused by {}", ctx.caller.short());
        sink.emit(LedgerEvent::Unpaused { by: ctx.caller });
        Ok(())
    }
}
