//! dcm-ledger: the permissioned registry and ledger engine.
//!
//! Five components share one state: role-based access control, a global
//! pause switch, the upgradeable compute token, the user and node registry,
//! and node clusters. Every mutating entry point runs its checks in a fixed
//! order (pause, then authorization, then argument validation) before any
//! state changes, and a failed call has no effect at all.

pub mod access;
pub mod bootstrap;
pub mod call;
pub mod clock;
pub mod cluster;
pub mod context;
pub mod engine;
pub mod error;
pub mod event_log;
pub mod events;
pub mod metrics;
pub mod pause;
pub mod registry;
pub mod state;
pub mod token;

pub use access::AccessControlLedger;
pub use call::Call;
pub use clock::{Clock, ManualClock, SystemClock};
pub use cluster::{
    ClusterHealth, ClusterManager, ClusterSpec, ClusterStatus, LoadBalancingStrategy, NodeCluster,
    StatusTrigger,
};
pub use context::{CallContext, Guard};
pub use engine::{Engine, Receipt};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use event_log::{EventLog, EventLogError, JsonlEventLog, MemoryEventLog};
pub use events::{EventRecord, EventSink, LedgerEvent};
pub use metrics::{LedgerMetrics, MetricsError};
pub use pause::PauseGate;
pub use registry::{
    Node, NodeMetadata, NodeStatus, PerformanceMetrics, RegistryStore, User, UserType, MAX_BPS,
};
pub use state::{Genesis, LedgerState};
pub use token::{
    domain_separator, Implementation, PermitAuthorization, TokenLedger, TokenLogic, TokenStorage,
    UNLIMITED_ALLOWANCE,
};
