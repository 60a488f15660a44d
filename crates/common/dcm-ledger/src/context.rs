use crate::access::{authorize, AccessControlLedger};
use crate::error::{LedgerError, LedgerResult};
use crate::pause::PauseGate;
use chrono::{DateTime, Utc};
use dcm_core_types::{Principal, RoleId};

/// Who is calling and at what execution time.
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    pub caller: Principal,
    pub now: DateTime<Utc>,
}

impl CallContext {
    pub fn new(caller: Principal, now: DateTime<Utc>) -> Self {
        Self { caller, now }
    }
}

/// Read-only view of the pause flag and role map handed to the stores, so
/// each entry point can run its preconditions in order: pause, then role.
#[derive(Clone, Copy)]
pub struct Guard<'a> {
    access: &'a AccessControlLedger,
    pause: &'a PauseGate,
}

impl<'a> Guard<'a> {
    pub fn new(access: &'a AccessControlLedger, pause: &'a PauseGate) -> Self {
        Self { access, pause }
    }

    pub fn when_not_paused(&self) -> LedgerResult<()> {
        if self.pause.is_paused() {
            return Err(LedgerError::Paused);
        }
        Ok(())
    }

    pub fn authorize(&self, principal: &Principal, role: &RoleId) -> LedgerResult<()> {
        authorize(self.access, principal, role)
    }

    pub fn has_role(&self, role: &RoleId, principal: &Principal) -> bool {
        self.access.has_role(role, principal)
    }
}
