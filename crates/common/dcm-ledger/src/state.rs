use crate::access::AccessControlLedger;
use crate::call::Call;
use crate::cluster::ClusterManager;
use crate::context::{CallContext, Guard};
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventSink, LedgerEvent};
use crate::pause::PauseGate;
use crate::registry::RegistryStore;
use crate::token::{Implementation, TokenLedger};
use dcm_core_types::{
    Principal, RoleId, CLUSTER_OPERATOR_ROLE, METRICS_REPORTER_ROLE, MINTER_ROLE, PAUSER_ROLE,
    PROFILE_UPDATER_ROLE, UPGRADER_ROLE,
};

/// Initial state of a fresh ledger.
#[derive(Debug, Clone)]
pub struct Genesis {
    pub token_address: Principal,
    pub token_name: String,
    pub token_symbol: String,
    pub implementation: Implementation,
    /// Holds the default admin role and every well-known role.
    pub admin: Principal,
    pub minters: Vec<Principal>,
    pub pausers: Vec<Principal>,
    pub operators: Vec<Principal>,
    pub reporters: Vec<Principal>,
}

impl Genesis {
    pub fn new(admin: Principal, token_address: Principal) -> Self {
        Self {
            token_address,
            token_name: "Compute Token".to_string(),
            token_symbol: "DCT".to_string(),
            implementation: Implementation::V1,
            admin,
            minters: Vec::new(),
            pausers: Vec::new(),
            operators: Vec::new(),
            reporters: Vec::new(),
        }
    }
}

/// The whole ledger: five components, each owning its own maps.
#[derive(Debug, Clone)]
pub struct LedgerState {
    access: AccessControlLedger,
    pause: PauseGate,
    token: TokenLedger,
    registry: RegistryStore,
    clusters: ClusterManager,
}

impl LedgerState {
    pub fn from_genesis(genesis: &Genesis) -> LedgerResult<Self> {
        if genesis.admin.is_zero() {
            return Err(LedgerError::invalid("genesis admin must not be the null principal"));
        }
        if genesis.token_address.is_zero() {
            return Err(LedgerError::invalid("token address must not be the null principal"));
        }

        let mut access = AccessControlLedger::new();
        access.bootstrap_admin(genesis.admin);
        let admin_roles: [RoleId; 6] = [
            *MINTER_ROLE,
            *PAUSER_ROLE,
            *UPGRADER_ROLE,
            *PROFILE_UPDATER_ROLE,
            *METRICS_REPORTER_ROLE,
            *CLUSTER_OPERATOR_ROLE,
        ];
        for role in admin_roles {
            access.bootstrap_grant(role, genesis.admin);
        }
        let extra: [(&RoleId, &Vec<Principal>); 4] = [
            (&*MINTER_ROLE, &genesis.minters),
            (&*PAUSER_ROLE, &genesis.pausers),
            (&*CLUSTER_OPERATOR_ROLE, &genesis.operators),
            (&*METRICS_REPORTER_ROLE, &genesis.reporters),
        ];
        for (role, members) in extra {
            for member in members.iter().filter(|m| !m.is_zero()) {
                access.bootstrap_grant(*role, *member);
            }
        }

        Ok(Self {
            access,
            pause: PauseGate::new(),
            token: TokenLedger::new(
                genesis.token_address,
                &genesis.token_name,
                &genesis.token_symbol,
                genesis.implementation,
            ),
            registry: RegistryStore::new(),
            clusters: ClusterManager::new(),
        })
    }

    pub fn access(&self) -> &AccessControlLedger {
        &self.access
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn token(&self) -> &TokenLedger {
        &self.token
    }

    pub fn registry(&self) -> &RegistryStore {
        &self.registry
    }

    pub fn clusters(&self) -> &ClusterManager {
        &self.clusters
    }

    /// Apply one call atomically: it runs against a working copy that only
    /// replaces `self` when every step succeeded.
    pub fn execute(&mut self, ctx: &CallContext, call: &Call) -> LedgerResult<Vec<LedgerEvent>> {
        let (next, events) = self.apply(ctx, call)?;
        *self = next;
        Ok(events)
    }

    /// Run `call` against a copy of this state and return the would-be
    /// successor without committing it.
    pub fn apply(&self, ctx: &CallContext, call: &Call) -> LedgerResult<(LedgerState, Vec<LedgerEvent>)> {
        let mut working = self.clone();
        let mut sink = EventSink::default();
        working.dispatch(ctx, call, &mut sink)?;
        if call.touches_cluster_health() {
            working.clusters.reconcile_health(&working.registry, ctx.now, &mut sink)?;
        }
        Ok((working, sink.into_events()))
    }

    fn dispatch(&mut self, ctx: &CallContext, call: &Call, sink: &mut EventSink) -> LedgerResult<()> {
        let LedgerState { access, pause, token, registry, clusters } = self;
        match call {
            Call::GrantRole { role, account } => {
                Guard::new(access, pause).when_not_paused()?;
                access.grant_role(ctx, *role, *account, sink)
            }
            Call::RevokeRole { role, account } => {
                Guard::new(access, pause).when_not_paused()?;
                access.revoke_role(ctx, *role, *account, sink)
            }
            Call::RenounceRole { role, account } => {
                Guard::new(access, pause).when_not_paused()?;
                access.renounce_role(ctx, *role, *account, sink)
            }
            Call::SetRoleAdmin { role, admin_role } => {
                Guard::new(access, pause).when_not_paused()?;
                access.set_role_admin(ctx, *role, *admin_role, sink)
            }

            Call::Pause => pause.pause(access, ctx, sink),
            Call::Unpause => pause.unpause(access, ctx, sink),

            Call::Mint { to, amount } => token.mint(&Guard::new(access, pause), ctx, *to, *amount, sink),
            Call::MintRewards { to, amount, reason } => {
                token.mint_rewards(&Guard::new(access, pause), ctx, *to, *amount, reason, sink)
            }
            Call::Burn { amount } => token.burn(&Guard::new(access, pause), ctx, *amount, sink),
            Call::BurnFrom { owner, amount } => token.burn_from(&Guard::new(access, pause), ctx, *owner, *amount, sink),
            Call::Transfer { to, amount } => token.transfer(&Guard::new(access, pause), ctx, *to, *amount, sink),
            Call::TransferFrom { owner, to, amount } => {
                token.transfer_from(&Guard::new(access, pause), ctx, *owner, *to, *amount, sink)
            }
            Call::Approve { spender, amount } => token.approve(&Guard::new(access, pause), ctx, *spender, *amount, sink),
            Call::IncreaseAllowance { spender, added } => {
                token.increase_allowance(&Guard::new(access, pause), ctx, *spender, *added, sink)
            }
            Call::DecreaseAllowance { spender, subtracted } => {
                token.decrease_allowance(&Guard::new(access, pause), ctx, *spender, *subtracted, sink)
            }
            Call::Permit { owner, spender, amount, deadline, signature } => {
                Guard::new(access, pause).when_not_paused()?;
                let signature = hex::decode(signature.trim_start_matches("0x"))
                    .map_err(|e| LedgerError::invalid(format!("permit signature is not hex: {}", e)))?;
                token.permit(&Guard::new(access, pause), ctx, *owner, *spender, *amount, *deadline, &signature, sink)
            }
            Call::UpgradeImplementation { implementation } => {
                token.upgrade_implementation(&Guard::new(access, pause), ctx, *implementation, sink)
            }

            Call::RegisterUser { address, profile_hash, user_type } => {
                registry.register_user(&Guard::new(access, pause), ctx, *address, profile_hash, *user_type, sink)
            }
            Call::UpdateUserProfile { address, profile_hash } => {
                registry.update_user_profile(&Guard::new(access, pause), ctx, *address, profile_hash, sink)
            }
            Call::DeactivateUser { address } => registry.deactivate_user(&Guard::new(access, pause), ctx, *address, sink),
            Call::RegisterNode { node_id, metadata } => {
                registry.register_node(&Guard::new(access, pause), ctx, node_id, metadata.clone(), sink)
            }
            Call::UpdateNodeMetrics { node_id, metrics } => {
                registry.update_node_metrics(&Guard::new(access, pause), ctx, node_id, metrics.clone(), sink)
            }
            Call::UpdateNodeStatus { node_id, status } => {
                registry.update_node_status(&Guard::new(access, pause), ctx, node_id, *status, sink)
            }

            Call::RegisterCluster { cluster_id, spec } => {
                clusters.register_cluster(&Guard::new(access, pause), ctx, registry, cluster_id, spec.clone(), sink)
            }
            Call::UpdateClusterStatus { cluster_id, status } => {
                clusters.update_cluster_status(&Guard::new(access, pause), ctx, registry, cluster_id, *status, sink)
            }
            Call::AddClusterNode { cluster_id, node_id } => {
                clusters.add_node(&Guard::new(access, pause), ctx, registry, cluster_id, node_id, sink)
            }
            Call::RemoveClusterNode { cluster_id, node_id } => {
                clusters.remove_node(&Guard::new(access, pause), ctx, registry, cluster_id, node_id, sink)
            }
            Call::UpdateClusterStrategy { cluster_id, strategy } => {
                clusters.update_strategy(&Guard::new(access, pause), ctx, cluster_id, *strategy, sink)
            }
            Call::SetClusterAutoManaged { cluster_id, auto_managed } => {
                clusters.set_auto_managed(&Guard::new(access, pause), ctx, cluster_id, *auto_managed, sink)
            }
            Call::ReconcileClusters => Guard::new(access, pause).when_not_paused(),
        }
    }
}
