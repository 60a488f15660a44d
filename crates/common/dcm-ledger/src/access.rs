//! Role grants and the single authorization check every entry point uses.

use crate::context::CallContext;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventSink, LedgerEvent};
use dcm_core_types::{Principal, RoleId, DEFAULT_ADMIN_ROLE};
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};

/// Fails with an authorization error unless `principal` holds `role`.
pub fn authorize(access: &AccessControlLedger, principal: &Principal, role: &RoleId) -> LedgerResult<()> {
    if access.has_role(role, principal) {
        Ok(())
    } else {
        Err(LedgerError::MissingRole { principal: *principal, role: *role })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessControlLedger {
    members: HashMap<RoleId, BTreeSet<Principal>>,
    /// Roles whose admin is not the default admin role.
    admins: HashMap<RoleId, RoleId>,
}

impl AccessControlLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the first default admin. Only used while building genesis state.
    pub(crate) fn bootstrap_admin(&mut self, admin: Principal) {
        self.members.entry(DEFAULT_ADMIN_ROLE).or_default().insert(admin);
    }

    /// Grant without an authorization check; genesis only.
    pub(crate) fn bootstrap_grant(&mut self, role: RoleId, account: Principal) {
        self.members.entry(role).or_default().insert(account);
    }

    pub fn has_role(&self, role: &RoleId, principal: &Principal) -> bool {
        self.members
            .get(role)
            .map(|set| set.contains(principal))
            .unwrap_or(false)
    }

    pub fn role_admin(&self, role: &RoleId) -> RoleId {
        self.admins.get(role).copied().unwrap_or(DEFAULT_ADMIN_ROLE)
    }

    pub fn role_members(&self, role: &RoleId) -> Vec<Principal> {
        self.members
            .get(role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Idempotent: granting a held role succeeds without an event.
    pub fn grant_role(
        &mut self,
        ctx: &CallContext,
        role: RoleId,
        account: Principal,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        authorize(self, &ctx.caller, &self.role_admin(&role))?;
        if account.is_zero() {
            return Err(LedgerError::invalid("cannot grant a role to the null principal"));
        }

        if self.members.entry(role).or_default().insert(account) {
            info!("Role {} granted to {} by {}", role, account.short(), ctx.caller.short());
            sink.emit(LedgerEvent::RoleChanged { role, account, sender: ctx.caller, granted: true });
        } else {
            debug!("Role {} already held by {}", role, account.short());
        }
        Ok(())
    }

    /// Idempotent: revoking an unheld role succeeds without an event.
    pub fn revoke_role(
        &mut self,
        ctx: &CallContext,
        role: RoleId,
        account: Principal,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        authorize(self, &ctx.caller, &self.role_admin(&role))?;
        self.remove_member(ctx, role, account, sink);
        Ok(())
    }

    /// A principal may only give up its own roles.
    pub fn renounce_role(
        &mut self,
        ctx: &CallContext,
        role: RoleId,
        account: Principal,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        if account != ctx.caller {
            return Err(LedgerError::Unauthorized("roles can only be renounced for self".to_string()));
        }
        self.remove_member(ctx, role, account, sink);
        Ok(())
    }

    pub fn set_role_admin(
        &mut self,
        ctx: &CallContext,
        role: RoleId,
        admin_role: RoleId,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        authorize(self, &ctx.caller, &DEFAULT_ADMIN_ROLE)?;
        if role == DEFAULT_ADMIN_ROLE {
            return Err(LedgerError::invalid("the default admin role administers itself"));
        }
        let previous_admin = self.role_admin(&role);
        if previous_admin == admin_role {
            return Ok(());
        }
        if admin_role == DEFAULT_ADMIN_ROLE {
            self.admins.remove(&role);
        } else {
            self.admins.insert(role, admin_role);
        }
        info!("Admin of role {} changed from {} to {}", role, previous_admin, admin_role);
        sink.emit(LedgerEvent::RoleAdminChanged { role, previous_admin, new_admin: admin_role });
        Ok(())
    }

    fn remove_member(&mut self, ctx: &CallContext, role: RoleId, account: Principal, sink: &mut EventSink) {
        let removed = self
            .members
            .get_mut(&role)
            .map(|set| set.remove(&account))
            .unwrap_or(false);
        if removed {
            info!("Role {} revoked from {} by {}", role, account.short(), ctx.caller.short());
            sink.emit(LedgerEvent::RoleChanged { role, account, sender: ctx.caller, granted: false });
        } else {
            debug!("Role {} not held by {}", role, account.short());
        }
    }
}
