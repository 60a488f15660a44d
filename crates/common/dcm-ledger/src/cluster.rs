//! Node clusters and their minimum-availability invariant.
//!
//! While a cluster is `Active`, the number of member nodes reporting
//! `Online` must be at least `min_active_nodes`. Every membership edit and
//! operator status change is evaluated against a candidate copy of the
//! cluster and only written back when the candidate satisfies the invariant.
//! Node status changes cannot be refused, so an active cluster that loses
//! its minimum through one is forced into `Maintenance` instead.

use crate::context::{CallContext, Guard};
use crate::error::{LedgerError, LedgerResult};
use crate::events::{EventSink, LedgerEvent};
use crate::registry::RegistryStore;
use chrono::{DateTime, Utc};
use dcm_core_types::{Principal, CLUSTER_OPERATOR_ROLE};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadBalancingStrategy {
    RoundRobin,
    LeastLoaded,
    Random,
    Weighted,
    Geographic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    Active,
    Maintenance,
    /// Terminal; the record is kept for audit.
    Decommissioned,
}

/// What caused a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusTrigger {
    Operator { principal: Principal },
    HealthCheck,
}

/// Caller-supplied part of a cluster registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub node_ids: Vec<String>,
    pub strategy: LoadBalancingStrategy,
    pub min_active_nodes: u32,
    #[serde(default = "default_status")]
    pub status: ClusterStatus,
    #[serde(default)]
    pub auto_managed: bool,
}

fn default_status() -> ClusterStatus {
    ClusterStatus::Active
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCluster {
    pub cluster_id: String,
    pub node_ids: Vec<String>,
    pub strategy: LoadBalancingStrategy,
    pub min_active_nodes: u32,
    pub status: ClusterStatus,
    pub auto_managed: bool,
    pub created_by: Principal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHealth {
    pub healthy: u32,
    pub total: u32,
    pub min_active_nodes: u32,
    pub satisfied: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterManager {
    clusters: BTreeMap<String, NodeCluster>,
}

impl ClusterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_cluster(&self, cluster_id: &str) -> LedgerResult<&NodeCluster> {
        self.clusters
            .get(cluster_id)
            .ok_or_else(|| LedgerError::not_found("cluster", cluster_id))
    }

    pub fn list_clusters(&self) -> Vec<&NodeCluster> {
        self.clusters.values().collect()
    }

    pub fn clusters_by_status(&self, status: ClusterStatus) -> Vec<&NodeCluster> {
        self.clusters.values().filter(|c| c.status == status).collect()
    }

    pub fn cluster_health(&self, registry: &RegistryStore, cluster_id: &str) -> LedgerResult<ClusterHealth> {
        let cluster = self.get_cluster(cluster_id)?;
        let healthy = healthy_count(registry, &cluster.node_ids);
        Ok(ClusterHealth {
            healthy,
            total: cluster.node_ids.len() as u32,
            min_active_nodes: cluster.min_active_nodes,
            satisfied: healthy >= cluster.min_active_nodes,
        })
    }

    pub fn register_cluster(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        registry: &RegistryStore,
        cluster_id: &str,
        spec: ClusterSpec,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        if cluster_id.trim().is_empty() {
            return Err(LedgerError::invalid("cluster id must not be empty"));
        }
        if self.clusters.contains_key(cluster_id) {
            return Err(LedgerError::invalid(format!("cluster {} already exists", cluster_id)));
        }
        if spec.node_ids.is_empty() {
            return Err(LedgerError::invalid("cluster must have at least one node"));
        }
        let mut seen = HashSet::new();
        for node_id in &spec.node_ids {
            if !seen.insert(node_id.as_str()) {
                return Err(LedgerError::invalid(format!("node {} listed twice", node_id)));
            }
            if !registry.contains_node(node_id) {
                return Err(LedgerError::invalid(format!("unknown node {}", node_id)));
            }
        }
        if spec.min_active_nodes as usize > spec.node_ids.len() {
            return Err(LedgerError::invalid(format!(
                "min_active_nodes {} exceeds member count {}",
                spec.min_active_nodes,
                spec.node_ids.len()
            )));
        }
        if spec.status == ClusterStatus::Decommissioned {
            return Err(LedgerError::invalid("a cluster cannot be created decommissioned"));
        }

        let cluster = NodeCluster {
            cluster_id: cluster_id.to_string(),
            node_ids: spec.node_ids,
            strategy: spec.strategy,
            min_active_nodes: spec.min_active_nodes,
            status: spec.status,
            auto_managed: spec.auto_managed,
            created_by: ctx.caller,
            created_at: ctx.now,
            updated_at: ctx.now,
        };
        ensure_invariant(registry, &cluster)?;

        info!("Cluster {} registered with {} nodes ({:?})", cluster_id, cluster.node_ids.len(), cluster.status);
        sink.emit(LedgerEvent::ClusterRegistered {
            cluster_id: cluster_id.to_string(),
            node_ids: cluster.node_ids.clone(),
            strategy: cluster.strategy,
            status: cluster.status,
        });
        self.clusters.insert(cluster_id.to_string(), cluster);
        Ok(())
    }

    /// Operator-driven transition. Auto-managed clusters only move through
    /// their own health checks; turn `auto_managed` off first to steer them.
    pub fn update_cluster_status(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        registry: &RegistryStore,
        cluster_id: &str,
        new_status: ClusterStatus,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        guard.authorize(&ctx.caller, &CLUSTER_OPERATOR_ROLE)?;
        let current = self.get_cluster(cluster_id)?;
        if current.auto_managed {
            return Err(LedgerError::Unauthorized(format!(
                "cluster {} is auto-managed; its status follows health checks",
                cluster_id
            )));
        }

        let from = current.status;
        let candidate = transition(current, new_status, ctx.now)?;
        ensure_invariant(registry, &candidate)?;
        self.commit_status(candidate, from, StatusTrigger::Operator { principal: ctx.caller }, sink);
        Ok(())
    }

    pub fn add_node(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        registry: &RegistryStore,
        cluster_id: &str,
        node_id: &str,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        guard.authorize(&ctx.caller, &CLUSTER_OPERATOR_ROLE)?;
        let current = self.get_cluster(cluster_id)?;
        ensure_not_decommissioned(current)?;
        if !registry.contains_node(node_id) {
            return Err(LedgerError::invalid(format!("unknown node {}", node_id)));
        }
        if current.node_ids.iter().any(|n| n == node_id) {
            return Err(LedgerError::invalid(format!("node {} is already in cluster {}", node_id, cluster_id)));
        }

        let mut candidate = current.clone();
        candidate.node_ids.push(node_id.to_string());
        candidate.updated_at = ctx.now;
        ensure_invariant(registry, &candidate)?;

        self.clusters.insert(cluster_id.to_string(), candidate);
        sink.emit(LedgerEvent::ClusterNodeAdded { cluster_id: cluster_id.to_string(), node_id: node_id.to_string() });
        Ok(())
    }

    /// Fails without touching membership if an active cluster would drop
    /// below its healthy minimum.
    pub fn remove_node(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        registry: &RegistryStore,
        cluster_id: &str,
        node_id: &str,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        guard.authorize(&ctx.caller, &CLUSTER_OPERATOR_ROLE)?;
        let current = self.get_cluster(cluster_id)?;
        ensure_not_decommissioned(current)?;
        if !current.node_ids.iter().any(|n| n == node_id) {
            return Err(LedgerError::invalid(format!("node {} is not in cluster {}", node_id, cluster_id)));
        }

        let mut candidate = current.clone();
        candidate.node_ids.retain(|n| n != node_id);
        candidate.updated_at = ctx.now;
        ensure_invariant(registry, &candidate)?;

        self.clusters.insert(cluster_id.to_string(), candidate);
        sink.emit(LedgerEvent::ClusterNodeRemoved { cluster_id: cluster_id.to_string(), node_id: node_id.to_string() });
        Ok(())
    }

    pub fn update_strategy(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        cluster_id: &str,
        strategy: LoadBalancingStrategy,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        guard.authorize(&ctx.caller, &CLUSTER_OPERATOR_ROLE)?;
        let current = self.get_cluster(cluster_id)?;
        ensure_not_decommissioned(current)?;
        if current.strategy == strategy {
            return Ok(());
        }

        let cluster = self.cluster_mut(cluster_id)?;
        cluster.strategy = strategy;
        cluster.updated_at = ctx.now;
        sink.emit(LedgerEvent::ClusterStrategyUpdated { cluster_id: cluster_id.to_string(), strategy });
        Ok(())
    }

    pub fn set_auto_managed(
        &mut self,
        guard: &Guard,
        ctx: &CallContext,
        cluster_id: &str,
        auto_managed: bool,
        sink: &mut EventSink,
    ) -> LedgerResult<()> {
        guard.when_not_paused()?;
        guard.authorize(&ctx.caller, &CLUSTER_OPERATOR_ROLE)?;
        let current = self.get_cluster(cluster_id)?;
        ensure_not_decommissioned(current)?;
        if current.auto_managed == auto_managed {
            return Ok(());
        }

        let cluster = self.cluster_mut(cluster_id)?;
        cluster.auto_managed = auto_managed;
        cluster.updated_at = ctx.now;
        sink.emit(LedgerEvent::ClusterAutoManagedChanged { cluster_id: cluster_id.to_string(), auto_managed });
        Ok(())
    }

    /// Internal health logic for one cluster. Any active cluster that fell
    /// below its minimum is forced into maintenance; only auto-managed ones
    /// are restored once they recover. Returns the new status when a
    /// transition happened.
    pub fn evaluate_health(
        &mut self,
        registry: &RegistryStore,
        cluster_id: &str,
        now: DateTime<Utc>,
        sink: &mut EventSink,
    ) -> LedgerResult<Option<ClusterStatus>> {
        let current = self.get_cluster(cluster_id)?;
        let healthy = healthy_count(registry, &current.node_ids);
        let target = match current.status {
            ClusterStatus::Active if healthy < current.min_active_nodes => ClusterStatus::Maintenance,
            ClusterStatus::Maintenance
                if current.auto_managed && healthy >= current.min_active_nodes && !current.node_ids.is_empty() =>
            {
                ClusterStatus::Active
            }
            _ => return Ok(None),
        };

        if target == ClusterStatus::Maintenance {
            warn!(
                "Cluster {} has {} healthy nodes, below minimum {}; moving to maintenance",
                cluster_id, healthy, current.min_active_nodes
            );
        }
        let from = current.status;
        let candidate = transition(current, target, now)?;
        self.commit_status(candidate, from, StatusTrigger::HealthCheck, sink);
        Ok(Some(target))
    }

    /// Run [`evaluate_health`](Self::evaluate_health) over every live cluster.
    pub fn reconcile_health(
        &mut self,
        registry: &RegistryStore,
        now: DateTime<Utc>,
        sink: &mut EventSink,
    ) -> LedgerResult<usize> {
        let ids: Vec<String> = self
            .clusters
            .values()
            .filter(|c| c.status != ClusterStatus::Decommissioned)
            .map(|c| c.cluster_id.clone())
            .collect();

        let mut changed = 0;
        for id in ids {
            if self.evaluate_health(registry, &id, now, sink)?.is_some() {
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn cluster_mut(&mut self, cluster_id: &str) -> LedgerResult<&mut NodeCluster> {
        self.clusters
            .get_mut(cluster_id)
            .ok_or_else(|| LedgerError::not_found("cluster", cluster_id))
    }

    fn commit_status(&mut self, candidate: NodeCluster, from: ClusterStatus, trigger: StatusTrigger, sink: &mut EventSink) {
        info!("Cluster {} status {:?} -> {:?}", candidate.cluster_id, from, candidate.status);
        sink.emit(LedgerEvent::ClusterStatusChanged {
            cluster_id: candidate.cluster_id.clone(),
            from,
            to: candidate.status,
            trigger,
        });
        self.clusters.insert(candidate.cluster_id.clone(), candidate);
    }
}

fn healthy_count(registry: &RegistryStore, node_ids: &[String]) -> u32 {
    node_ids
        .iter()
        .filter(|id| registry.get_node(id).map(|n| n.status.is_healthy()).unwrap_or(false))
        .count() as u32
}

fn ensure_not_decommissioned(cluster: &NodeCluster) -> LedgerResult<()> {
    if cluster.status == ClusterStatus::Decommissioned {
        return Err(LedgerError::state(format!("cluster {} is decommissioned", cluster.cluster_id)));
    }
    Ok(())
}

/// Build the post-transition record, rejecting illegal moves.
fn transition(cluster: &NodeCluster, to: ClusterStatus, now: DateTime<Utc>) -> LedgerResult<NodeCluster> {
    ensure_not_decommissioned(cluster)?;
    if cluster.status == to {
        return Err(LedgerError::state(format!("cluster {} is already {:?}", cluster.cluster_id, to)));
    }
    if to == ClusterStatus::Decommissioned && !cluster.node_ids.is_empty() {
        return Err(LedgerError::state(format!(
            "cluster {} still has {} nodes attached",
            cluster.cluster_id,
            cluster.node_ids.len()
        )));
    }
    let mut next = cluster.clone();
    next.status = to;
    next.updated_at = now;
    Ok(next)
}

fn ensure_invariant(registry: &RegistryStore, cluster: &NodeCluster) -> LedgerResult<()> {
    if cluster.status != ClusterStatus::Active {
        return Ok(());
    }
    let healthy = healthy_count(registry, &cluster.node_ids);
    if healthy < cluster.min_active_nodes {
        debug!("Cluster {} invariant check failed: {} < {}", cluster.cluster_id, healthy, cluster.min_active_nodes);
        return Err(LedgerError::state(format!(
            "cluster {} would have {} healthy nodes, below minimum {}",
            cluster.cluster_id, healthy, cluster.min_active_nodes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessControlLedger;
    use crate::error::ErrorKind;
    use crate::pause::PauseGate;
    use crate::registry::{NodeMetadata, NodeStatus};

    fn p(n: u8) -> Principal {
        Principal::from_bytes([n; 32])
    }

    struct Fixture {
        access: AccessControlLedger,
        pause: PauseGate,
        registry: RegistryStore,
        clusters: ClusterManager,
        sink: EventSink,
    }

    const OWNER: u8 = 1;
    const OPERATOR: u8 = 2;
    const PAUSER: u8 = 3;

    impl Fixture {
        fn new(nodes: &[&str]) -> Self {
            let mut access = AccessControlLedger::new();
            access.bootstrap_grant(*CLUSTER_OPERATOR_ROLE, p(OPERATOR));
            access.bootstrap_grant(*dcm_core_types::PAUSER_ROLE, p(PAUSER));
            let pause = PauseGate::new();
            let mut registry = RegistryStore::new();
            let mut sink = EventSink::default();
            {
                let guard = Guard::new(&access, &pause);
                let ctx = CallContext::new(p(OWNER), Utc::now());
                for node in nodes {
                    registry.register_node(&guard, &ctx, node, NodeMetadata::default(), &mut sink).unwrap();
                }
            }
            Self { access, pause, registry, clusters: ClusterManager::new(), sink }
        }

        fn ctx(&self, who: u8) -> CallContext {
            CallContext::new(p(who), Utc::now())
        }

        fn register(&mut self, id: &str, nodes: &[&str], min: u32, status: ClusterStatus) -> LedgerResult<()> {
            let spec = ClusterSpec {
                node_ids: nodes.iter().map(|n| n.to_string()).collect(),
                strategy: LoadBalancingStrategy::RoundRobin,
                min_active_nodes: min,
                status,
                auto_managed: false,
            };
            let ctx = self.ctx(OPERATOR);
            let guard = Guard::new(&self.access, &self.pause);
            self.clusters.register_cluster(&guard, &ctx, &self.registry, id, spec, &mut self.sink)
        }

        fn set_status(&mut self, id: &str, status: ClusterStatus) -> LedgerResult<()> {
            let ctx = self.ctx(OPERATOR);
            let guard = Guard::new(&self.access, &self.pause);
            self.clusters.update_cluster_status(&guard, &ctx, &self.registry, id, status, &mut self.sink)
        }

        fn remove(&mut self, id: &str, node: &str) -> LedgerResult<()> {
            let ctx = self.ctx(OPERATOR);
            let guard = Guard::new(&self.access, &self.pause);
            self.clusters.remove_node(&guard, &ctx, &self.registry, id, node, &mut self.sink)
        }

        fn node_status(&mut self, node: &str, status: NodeStatus) {
            let ctx = self.ctx(OWNER);
            let guard = Guard::new(&self.access, &self.pause);
            self.registry.update_node_status(&guard, &ctx, node, status, &mut self.sink).unwrap();
        }
    }

    #[test]
    fn test_registration_validation() {
        let mut f = Fixture::new(&["n1", "n2"]);

        assert_eq!(f.register("c", &[], 0, ClusterStatus::Active).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(f.register("c", &["ghost"], 0, ClusterStatus::Active).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(f.register("c", &["n1", "n1"], 1, ClusterStatus::Active).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(f.register("c", &["n1"], 2, ClusterStatus::Active).unwrap_err().kind(), ErrorKind::Validation);

        f.register("c", &["n1", "n2"], 2, ClusterStatus::Active).unwrap();
        let err = f.register("c", &["n1"], 1, ClusterStatus::Maintenance).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(f.clusters.get_cluster("c").unwrap().node_ids.len(), 2);
    }

    #[test]
    fn test_active_registration_must_satisfy_minimum() {
        let mut f = Fixture::new(&["n1", "n2"]);
        f.node_status("n2", NodeStatus::Offline);

        let err = f.register("c", &["n1", "n2"], 2, ClusterStatus::Active).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        f.register("c", &["n1", "n2"], 2, ClusterStatus::Maintenance).unwrap();
    }

    #[test]
    fn test_removal_below_minimum_is_atomic() {
        let mut f = Fixture::new(&["n1"]);
        f.register("c1", &["n1"], 1, ClusterStatus::Active).unwrap();

        let err = f.remove("c1", "n1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(f.clusters.get_cluster("c1").unwrap().node_ids, vec!["n1".to_string()]);

        f.set_status("c1", ClusterStatus::Maintenance).unwrap();
        f.remove("c1", "n1").unwrap();
        assert!(f.clusters.get_cluster("c1").unwrap().node_ids.is_empty());
    }

    #[test]
    fn test_decommission_requires_detached_members_and_is_terminal() {
        let mut f = Fixture::new(&["n1"]);
        f.register("c", &["n1"], 0, ClusterStatus::Maintenance).unwrap();

        assert_eq!(f.set_status("c", ClusterStatus::Decommissioned).unwrap_err().kind(), ErrorKind::State);
        f.remove("c", "n1").unwrap();
        f.set_status("c", ClusterStatus::Decommissioned).unwrap();

        assert_eq!(f.set_status("c", ClusterStatus::Active).unwrap_err().kind(), ErrorKind::State);
        assert_eq!(f.clusters.clusters_by_status(ClusterStatus::Decommissioned).len(), 1);
    }

    #[test]
    fn test_status_change_requires_operator() {
        let mut f = Fixture::new(&["n1"]);
        f.register("c", &["n1"], 1, ClusterStatus::Active).unwrap();

        let ctx = f.ctx(OWNER);
        let guard = Guard::new(&f.access, &f.pause);
        let err = f
            .clusters
            .update_cluster_status(&guard, &ctx, &f.registry, "c", ClusterStatus::Maintenance, &mut f.sink)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(f.clusters.get_cluster("c").unwrap().status, ClusterStatus::Active);
    }

    #[test]
    fn test_auto_managed_cluster_follows_health() {
        let mut f = Fixture::new(&["n1", "n2"]);
        let spec = ClusterSpec {
            node_ids: vec!["n1".into(), "n2".into()],
            strategy: LoadBalancingStrategy::LeastLoaded,
            min_active_nodes: 2,
            status: ClusterStatus::Active,
            auto_managed: true,
        };
        {
            let ctx = f.ctx(OPERATOR);
            let guard = Guard::new(&f.access, &f.pause);
            f.clusters.register_cluster(&guard, &ctx, &f.registry, "auto", spec, &mut f.sink).unwrap();
        }

        // Operators cannot steer an auto-managed cluster.
        assert_eq!(f.set_status("auto", ClusterStatus::Maintenance).unwrap_err().kind(), ErrorKind::Authorization);

        f.node_status("n2", NodeStatus::Degraded);
        let now = Utc::now();
        let changed = f.clusters.reconcile_health(&f.registry, now, &mut f.sink).unwrap();
        assert_eq!(changed, 1);
        assert_eq!(f.clusters.get_cluster("auto").unwrap().status, ClusterStatus::Maintenance);

        f.node_status("n2", NodeStatus::Online);
        assert_eq!(
            f.clusters.evaluate_health(&f.registry, "auto", now, &mut f.sink).unwrap(),
            Some(ClusterStatus::Active)
        );
        assert_eq!(f.clusters.evaluate_health(&f.registry, "auto", now, &mut f.sink).unwrap(), None);

        let health = f.clusters.cluster_health(&f.registry, "auto").unwrap();
        assert_eq!(health, ClusterHealth { healthy: 2, total: 2, min_active_nodes: 2, satisfied: true });
    }

    #[test]
    fn test_paused_edits_are_rejected_before_authorization() {
        let mut f = Fixture::new(&["n1"]);
        f.register("c", &["n1"], 0, ClusterStatus::Active).unwrap();
        let pauser = f.ctx(PAUSER);
        f.pause.pause(&f.access, &pauser, &mut f.sink).unwrap();

        let ctx = f.ctx(OWNER);
        let guard = Guard::new(&f.access, &f.pause);
        let err = f
            .clusters
            .update_strategy(&guard, &ctx, "c", LoadBalancingStrategy::Geographic, &mut f.sink)
            .unwrap_err();
        assert_eq!(err, LedgerError::Paused);
    }
}
