//! Audit events emitted by successful calls.

use crate::cluster::{ClusterStatus, LoadBalancingStrategy, StatusTrigger};
use crate::registry::{NodeStatus, UserType};
use chrono::{DateTime, Utc};
use dcm_core_types::units::amount_str;
use dcm_core_types::{Principal, RoleId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    RoleChanged {
        role: RoleId,
        account: Principal,
        sender: Principal,
        granted: bool,
    },
    RoleAdminChanged {
        role: RoleId,
        previous_admin: RoleId,
        new_admin: RoleId,
    },
    Paused {
        by: Principal,
    },
    Unpaused {
        by: Principal,
    },
    Transfer {
        from: Principal,
        to: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    Approval {
        owner: Principal,
        spender: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    Minted {
        to: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    RewardsMinted {
        to: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
        reason: String,
    },
    Burned {
        from: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    PermitConsumed {
        owner: Principal,
        spender: Principal,
        nonce: u64,
    },
    ImplementationUpgraded {
        from_version: u32,
        to_version: u32,
    },
    UserRegistered {
        address: Principal,
        user_type: UserType,
    },
    UserProfileUpdated {
        address: Principal,
        profile_hash: String,
    },
    UserDeactivated {
        address: Principal,
    },
    NodeRegistered {
        node_id: String,
        owner: Principal,
    },
    NodeMetricsUpdated {
        node_id: String,
    },
    NodeStatusChanged {
        node_id: String,
        from: NodeStatus,
        to: NodeStatus,
    },
    ClusterRegistered {
        cluster_id: String,
        node_ids: Vec<String>,
        strategy: LoadBalancingStrategy,
        status: ClusterStatus,
    },
    ClusterStatusChanged {
        cluster_id: String,
        from: ClusterStatus,
        to: ClusterStatus,
        trigger: StatusTrigger,
    },
    ClusterNodeAdded {
        cluster_id: String,
        node_id: String,
    },
    ClusterNodeRemoved {
        cluster_id: String,
        node_id: String,
    },
    ClusterStrategyUpdated {
        cluster_id: String,
        strategy: LoadBalancingStrategy,
    },
    ClusterAutoManagedChanged {
        cluster_id: String,
        auto_managed: bool,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::RoleChanged { .. } => "role_changed",
            LedgerEvent::RoleAdminChanged { .. } => "role_admin_changed",
            LedgerEvent::Paused { .. } => "paused",
            LedgerEvent::Unpaused { .. } => "unpaused",
            LedgerEvent::Transfer { .. } => "transfer",
            LedgerEvent::Approval { .. } => "approval",
            LedgerEvent::Minted { .. } => "minted",
            LedgerEvent::RewardsMinted { .. } => "rewards_minted",
            LedgerEvent::Burned { .. } => "burned",
            LedgerEvent::PermitConsumed { .. } => "permit_consumed",
            LedgerEvent::ImplementationUpgraded { .. } => "implementation_upgraded",
            LedgerEvent::UserRegistered { .. } => "user_registered",
            LedgerEvent::UserProfileUpdated { .. } => "user_profile_updated",
            LedgerEvent::UserDeactivated { .. } => "user_deactivated",
            LedgerEvent::NodeRegistered { .. } => "node_registered",
            LedgerEvent::NodeMetricsUpdated { .. } => "node_metrics_updated",
            LedgerEvent::NodeStatusChanged { .. } => "node_status_changed",
            LedgerEvent::ClusterRegistered { .. } => "cluster_registered",
            LedgerEvent::ClusterStatusChanged { .. } => "cluster_status_changed",
            LedgerEvent::ClusterNodeAdded { .. } => "cluster_node_added",
            LedgerEvent::ClusterNodeRemoved { .. } => "cluster_node_removed",
            LedgerEvent::ClusterStrategyUpdated { .. } => "cluster_strategy_updated",
            LedgerEvent::ClusterAutoManagedChanged { .. } => "cluster_auto_managed_changed",
        }
    }
}

/// An event once it has been committed to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 1.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Principal whose call produced the event.
    pub caller: Principal,
    pub event: LedgerEvent,
}

/// Collects the events of one in-flight call. Dropped with the working state
/// when the call fails.
#[derive(Debug, Default)]
pub struct EventSink {
    events: Vec<LedgerEvent>,
}

impl EventSink {
    pub fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<LedgerEvent> {
        self.events
    }
}
