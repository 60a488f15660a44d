#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use dcm_core_types::{
    Principal, RoleId, CLUSTER_OPERATOR_ROLE, DEFAULT_ADMIN_ROLE, METRICS_REPORTER_ROLE, MINTER_ROLE,
    PAUSER_ROLE, PROFILE_UPDATER_ROLE, UPGRADER_ROLE,
};
use dcm_ledger::{Call, CallContext, Genesis, LedgerEvent, LedgerResult, LedgerState, NodeMetadata};

pub const ADMIN: u8 = 1;
pub const TOKEN: u8 = 0xAA;

pub fn p(n: u8) -> Principal {
    Principal::from_bytes([n; 32])
}

pub fn genesis_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now)
}

/// Synchronous driver over `LedgerState` with a controllable clock.
pub struct Harness {
    pub state: LedgerState,
    pub now: DateTime<Utc>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_genesis(Genesis::new(p(ADMIN), p(TOKEN)))
    }

    pub fn with_genesis(genesis: Genesis) -> Self {
        Self {
            state: LedgerState::from_genesis(&genesis).unwrap(),
            now: genesis_time(),
        }
    }

    pub fn call(&mut self, caller: Principal, call: Call) -> LedgerResult<Vec<LedgerEvent>> {
        let ctx = CallContext::new(caller, self.now);
        self.state.execute(&ctx, &call)
    }

    pub fn advance(&mut self, seconds: i64) {
        self.now += Duration::seconds(seconds);
    }

    pub fn register_node(&mut self, owner: Principal, node_id: &str) {
        self.call(owner, Call::RegisterNode { node_id: node_id.to_string(), metadata: NodeMetadata::default() })
            .unwrap();
    }

    /// Render every observable view touching `accounts` so two moments can be
    /// compared for "nothing changed".
    pub fn fingerprint(&self, accounts: &[Principal]) -> String {
        let token = self.state.token();
        let mut out = format!(
            "paused={} supply={} version={}\n",
            self.state.is_paused(),
            token.total_supply(),
            token.implementation_version()
        );
        let roles: [&RoleId; 7] = [
            &DEFAULT_ADMIN_ROLE,
            &*MINTER_ROLE,
            &*PAUSER_ROLE,
            &*UPGRADER_ROLE,
            &*PROFILE_UPDATER_ROLE,
            &*METRICS_REPORTER_ROLE,
            &*CLUSTER_OPERATOR_ROLE,
        ];
        for role in roles {
            out.push_str(&format!("{} {:?}\n", role, self.state.access().role_members(role)));
        }
        for a in accounts {
            out.push_str(&format!("{} bal={} nonce={}", a, token.balance_of(a), token.nonces(a)));
            for b in accounts {
                out.push_str(&format!(" allow[{}]={}", b.short(), token.allowance(a, b)));
            }
            out.push_str(&format!(
                " user={:?} nodes={:?}\n",
                self.state.registry().get_user_profile(a).ok(),
                self.state.registry().nodes_by_owner(a)
            ));
        }
        out.push_str(&format!("{:?}", self.state.clusters().list_clusters()));
        out
    }
}
