//! Serializable form of every mutating entry point.

use crate::cluster::{ClusterSpec, ClusterStatus, LoadBalancingStrategy};
use crate::registry::{NodeMetadata, NodeStatus, PerformanceMetrics, UserType};
use crate::token::Implementation;
use chrono::{DateTime, Utc};
use dcm_core_types::units::amount_str;
use dcm_core_types::{Principal, RoleId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Call {
    // access control
    GrantRole { role: RoleId, account: Principal },
    RevokeRole { role: RoleId, account: Principal },
    RenounceRole { role: RoleId, account: Principal },
    SetRoleAdmin { role: RoleId, admin_role: RoleId },

    // pause gate
    Pause,
    Unpause,

    // token
    Mint {
        to: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    MintRewards {
        to: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
        reason: String,
    },
    Burn {
        #[serde(with = "amount_str")]
        amount: u128,
    },
    BurnFrom {
        owner: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    Transfer {
        to: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    TransferFrom {
        owner: Principal,
        to: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    Approve {
        spender: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    IncreaseAllowance {
        spender: Principal,
        #[serde(with = "amount_str")]
        added: u128,
    },
    DecreaseAllowance {
        spender: Principal,
        #[serde(with = "amount_str")]
        subtracted: u128,
    },
    Permit {
        owner: Principal,
        spender: Principal,
        #[serde(with = "amount_str")]
        amount: u128,
        deadline: DateTime<Utc>,
        /// Hex-encoded Ed25519 signature over the permit digest.
        signature: String,
    },
    UpgradeImplementation { implementation: Implementation },

    // registry
    RegisterUser { address: Principal, profile_hash: String, user_type: UserType },
    UpdateUserProfile { address: Principal, profile_hash: String },
    DeactivateUser { address: Principal },
    RegisterNode { node_id: String, metadata: NodeMetadata },
    UpdateNodeMetrics { node_id: String, metrics: PerformanceMetrics },
    UpdateNodeStatus { node_id: String, status: NodeStatus },

    // clusters
    RegisterCluster { cluster_id: String, spec: ClusterSpec },
    UpdateClusterStatus { cluster_id: String, status: ClusterStatus },
    AddClusterNode { cluster_id: String, node_id: String },
    RemoveClusterNode { cluster_id: String, node_id: String },
    UpdateClusterStrategy { cluster_id: String, strategy: LoadBalancingStrategy },
    SetClusterAutoManaged { cluster_id: String, auto_managed: bool },
    ReconcileClusters,
}

impl Call {
    /// Stable operation label for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Call::GrantRole { .. } => "grant_role",
            Call::RevokeRole { .. } => "revoke_role",
            Call::RenounceRole { .. } => "renounce_role",
            Call::SetRoleAdmin { .. } => "set_role_admin",
            Call::Pause => "pause",
            Call::Unpause => "unpause",
            Call::Mint { .. } => "mint",
            Call::MintRewards { .. } => "mint_rewards",
            Call::Burn { .. } => "burn",
            Call::BurnFrom { .. } => "burn_from",
            Call::Transfer { .. } => "transfer",
            Call::TransferFrom { .. } => "transfer_from",
            Call::Approve { .. } => "approve",
            Call::IncreaseAllowance { .. } => "increase_allowance",
            Call::DecreaseAllowance { .. } => "decrease_allowance",
            Call::Permit { .. } => "permit",
            Call::UpgradeImplementation { .. } => "upgrade_implementation",
            Call::RegisterUser { .. } => "register_user",
            Call::UpdateUserProfile { .. } => "update_user_profile",
            Call::DeactivateUser { .. } => "deactivate_user",
            Call::RegisterNode { .. } => "register_node",
            Call::UpdateNodeMetrics { .. } => "update_node_metrics",
            Call::UpdateNodeStatus { .. } => "update_node_status",
            Call::RegisterCluster { .. } => "register_cluster",
            Call::UpdateClusterStatus { .. } => "update_cluster_status",
            Call::AddClusterNode { .. } => "add_cluster_node",
            Call::RemoveClusterNode { .. } => "remove_cluster_node",
            Call::UpdateClusterStrategy { .. } => "update_cluster_strategy",
            Call::SetClusterAutoManaged { .. } => "set_cluster_auto_managed",
            Call::ReconcileClusters => "reconcile_clusters",
        }
    }

    /// Calls after which cluster health is re-evaluated.
    pub(crate) fn touches_cluster_health(&self) -> bool {
        matches!(
            self,
            Call::UpdateNodeMetrics { .. }
                | Call::UpdateNodeStatus { .. }
                | Call::RegisterCluster { .. }
                | Call::AddClusterNode { .. }
                | Call::RemoveClusterNode { .. }
                | Call::SetClusterAutoManaged { .. }
                | Call::ReconcileClusters
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_json_shape() {
        let to = Principal::from_bytes([1; 32]);
        let json = format!(r#"{{"op":"mint","to":"{}","amount":"1000000000000000000000"}}"#, to);
        let call: Call = serde_json::from_str(&json).unwrap();
        assert_eq!(call, Call::Mint { to, amount: 1_000_000_000_000_000_000_000 });
        assert_eq!(call.name(), "mint");

        let pause: Call = serde_json::from_str(r#"{"op":"pause"}"#).unwrap();
        assert_eq!(pause, Call::Pause);
    }

    #[test]
    fn test_cluster_spec_defaults() {
        let json = r#"{"op":"register_cluster","cluster_id":"c1",
            "spec":{"node_ids":["n1"],"strategy":"ROUND_ROBIN","min_active_nodes":1}}"#;
        match serde_json::from_str::<Call>(json).unwrap() {
            Call::RegisterCluster { spec, .. } => {
                assert_eq!(spec.status, ClusterStatus::Active);
                assert!(!spec.auto_managed);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }
}
