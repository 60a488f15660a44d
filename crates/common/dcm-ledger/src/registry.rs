//! User and compute-node records.

use crate::context::{CallContext, Guard};
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventSink, LedgerEvent};
use chrono::{DateTime, Utc};
use dcm_core_types::{Principal, METRICS_REPORTER_ROLE, PROFILE_UPDATER_ROLE};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Basis points: 10_000 == 100%.
pub const MAX_BPS: u16 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    Consumer,
    Provider,
    Hybrid,
    Enterprise,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub address: Principal,
    /// Content hash of the off-ledger profile document.
    pub profile_hash: String,
    pub user_type: UserType,
    pub registered_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Online,
    Degraded,
    Maintenance,
    Offline,
}

impl NodeStatus {
    /// Only online nodes count towards a cluster's active minimum.
    pub fn is_healthy(&self) -> bool {
        matches!(self, NodeStatus::Online)
    }
}

/// Static description a provider publishes when registering a node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub endpoint: String,
    pub region: String,
    pub cpu_cores: u32,
    pub memory_gb: u32,
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default)]
    pub storage_gb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub uptime_bps: u16,
    pub latency_ms: u32,
    pub load_bps: u16,
    pub jobs_completed: u64,
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: String,
    pub owner: Principal,
    pub metadata: NodeMetadata,
    pub metrics: PerformanceMetrics,
    pub status: NodeStatus,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct RegistryStore {
    users: BTreeMap<Principal, User>,
    nodes: BTreeMap<String, Node>,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_user_profile(&self, address: &Principal) -> LedgerResult<&User> {
        self.users
            .get(address)
            .ok_or_else(|| LedgerError::not_found("user", address.to_string()))
    }

    pub fn is_registered(&self, address: &Principal) -> bool {
        self.users.contains_key(address)
    }

    pub fn users_by_type(&self, user_type: UserType) -> Vec<&User> {
        self.users.values().filter(|u| u.user_type == user_type).collect()
    }

    pub fn get_node(&self, node_id: &str) -> LedgerResult<&Node> {
        self.nodes
            .get(node_id)
            .ok_or_else(|| LedgerError::not_found("node", node_id))
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn nodes_by_owner(&self, owner: &Principal) -> Vec<&Node> {
        self.nodes.values().filter(|n| &n.owner == owner).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Self-registration, or registration on someone's behalf by a profile updater.
    pub fn register_user(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        address: Principal,
        profile_hash: &str,
        user_type: UserType,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        self.ensure_self_or_updater(guard, ctx, &address)?;
        if address.is_zero() {
            return Err(LedgerError::invalid("cannot register the null principal"));
        }
        validate_profile_hash(profile_hash)?;
        if self.users.contains_key(&address) {
            return Err(LedgerError::invalid(format!("user {} already registered", address)));
        }

        self.users.insert(
            address,
            User {
                address,
                profile_hash: profile_hash.to_string(),
                user_type,
                registered_at: ctx.now,
                active: true,
            },
        );
        debug!("Registered {:?} user {}", user_type, address.short());
        sink.emit(LedgerEvent::UserRegistered { address, user_type });
        Ok(())
    }

    pub fn update_user_profile(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        address: Principal,
        profile_hash: &str,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        self.ensure_self_or_updater(guard, ctx, &address)?;
        validate_profile_hash(profile_hash)?;
        let user = self
            .users
            .get_mut(&address)
            .ok_or_else(|| LedgerError::not_found("user", address.to_string()))?;
        if !user.active {
            return Err(LedgerError::state(format!("user {} is deactivated", address)));
        }

        user.profile_hash = profile_hash.to_string();
        sink.emit(LedgerEvent::UserProfileUpdated { address, profile_hash: profile_hash.to_string() });
        Ok(())
    }

    /// Soft delete: the record is kept, only `active` flips.
    pub fn deactivate_user(&mut self, guard: &Guard, ctx: &CallContext, address: Principal, sink: &mut EventSink) -> LedgerResult<()> {
        guard.when_not_paused()?;
        self.ensure_self_or_updater(guard, ctx, &address)?;
        let user = self
            .users
            .get_mut(&address)
            .ok_or_else(|| LedgerError::not_found("user", address.to_string()))?;
        if !user.active {
            return Err(LedgerError::state(format!("user {} is already deactivated", address)));
        }

        user.active = false;
        sink.emit(LedgerEvent::UserDeactivated { address });
        Ok(())
    }

    /// The caller becomes the node's owner. New nodes start `Online`.
    pub fn register_node(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        node_id: &str,
        metadata: NodeMetadata,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        if node_id.trim().is_empty() {
            return Err(LedgerError::invalid("node id must not be empty"));
        }
        if self.nodes.contains_key(node_id) {
            return Err(LedgerError::invalid(format!("node {} already registered", node_id)));
        }

        self.nodes.insert(
            node_id.to_string(),
            Node {
                node_id: node_id.to_string(),
                owner: ctx.caller,
                metadata,
                metrics: PerformanceMetrics::default(),
                status: NodeStatus::Online,
                registered_at: ctx.now,
            },
        );
        debug!("Registered node {} for {}", node_id, ctx.caller.short());
        sink.emit(LedgerEvent::NodeRegistered { node_id: node_id.to_string(), owner: ctx.caller });
        Ok(())
    }

    pub fn update_node_metrics(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        node_id: &str,
        mut metrics: PerformanceMetrics,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| LedgerError::not_found("node", node_id))?;
        ensure_owner_or_reporter(guard, ctx, node)?;
        if metrics.uptime_bps > MAX_BPS || metrics.load_bps > MAX_BPS {
            return Err(LedgerError::invalid(format!("basis-point metrics must not exceed {}", MAX_BPS)));
        }

        metrics.reported_at = Some(ctx.now);
        node.metrics = metrics;
        sink.emit(LedgerEvent::NodeMetricsUpdated { node_id: node_id.to_string() });
        Ok(())
    }

    pub fn update_node_status(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        node_id: &str,
        status: NodeStatus,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| LedgerError::not_found("node", node_id))?;
        ensure_owner_or_reporter(guard, ctx, node)?;
        if node.status == status {
            return Ok(());
        }

        let from = node.status;
        node.status = status;
        debug!("Node {} status {:?} -> {:?}", node_id, from, status);
        sink.emit(LedgerEvent::NodeStatusChanged { node_id: node_id.to_string(), from, to: status });
        Ok(())
    }

    fn ensure_self_or_updater(&self, guard: &Guard, ctx: &CallContext, address: &Principal) -> LedgerResult<()> {
        if &ctx.caller == address || guard.has_role(&PROFILE_UPDATER_ROLE, &ctx.caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(format!(
                "{} may not manage the profile of {}",
                ctx.caller, address
            )))
        }
    }
}

fn ensure_owner_or_reporter(guard: &Guard, ctx: &CallContext, node: &Node) -> LedgerResult<()> {
    if node.owner == ctx.caller || guard.has_role(&METRICS_REPORTER_ROLE, &ctx.caller) {
        Ok(())
    } else {
        Err(LedgerError::Unauthorized(format!(
            "{} may not report for node {}",
            ctx.caller, node.node_id
        )))
    }
}

fn validate_profile_hash(profile_hash: &str) -> LedgerResult<()> {
    if profile_hash.trim().is_empty() {
        return Err(LedgerError::invalid("profile hash must not be empty"));
    }
    Ok(())
}
