//! Async owner of the ledger state.
//!
//! Calls are serialized through one lock. Each call runs against a working
//! copy; its events are appended to the event log and only then is the copy
//! committed. A rejected call or a failed append leaves state, log and
//! sequence numbering untouched.

use crate::call::Call;
use crate::clock::Clock;
use crate::context::CallContext;
use crate::error::{LedgerError, LedgerResult};
use crate::event_log::EventLog;
use crate::events::EventRecord;
use crate::metrics::LedgerMetrics;
use crate::state::{Genesis, LedgerState};
use dcm_core_types::Principal;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of a committed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub operation: &'static str,
    pub events: Vec<EventRecord>,
}

impl Receipt {
    /// First and last sequence numbers written, `None` for a call that
    /// changed nothing observable.
    pub fn sequence_range(&self) -> Option<(u64, u64)> {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => Some((first.sequence, last.sequence)),
            _ => None,
        }
    }
}

struct EngineInner {
    state: LedgerState,
    next_sequence: u64,
}

pub struct Engine {
    inner: Mutex<EngineInner>,
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
    metrics: Option<LedgerMetrics>,
}

impl Engine {
    /// Build a fresh ledger from `genesis`. Sequence numbers continue from
    /// whatever `log` already holds.
    pub async fn new(genesis: &Genesis, log: Arc<dyn EventLog>, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        let state = LedgerState::from_genesis(genesis)?;
        let last = log
            .last_sequence()
            .await
            .map_err(|e| LedgerError::EventLog(e.to_string()))?;

        info!(
            "Ledger engine started: token {} ({}) v{}, admin {}",
            state.token().name(),
            state.token().address(),
            state.token().implementation_version(),
            genesis.admin.short()
        );

        Ok(Self {
            inner: Mutex::new(EngineInner { state, next_sequence: last + 1 }),
            log,
            clock,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: LedgerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn event_log(&self) -> Arc<dyn EventLog> {
        Arc::clone(&self.log)
    }

    /// Execute one call on behalf of `caller`.
    pub async fn execute(&self, caller: Principal, call: Call) -> LedgerResult<Receipt> {
        let operation = call.name();
        let mut inner = self.inner.lock().await;
        let ctx = CallContext::new(caller, self.clock.now());

        let (next, events) = match inner.state.apply(&ctx, &call) {
            Ok(applied) => applied,
            Err(e) => {
                warn!("Rejected {} from {}: {} ({})", operation, caller.short(), e, e.kind().as_str());
                self.record(operation, Err(&e));
                return Err(e);
            }
        };

        let first = inner.next_sequence;
        let records: Vec<EventRecord> = events
            .into_iter()
            .enumerate()
            .map(|(offset, event)| EventRecord {
                sequence: first + offset as u64,
                timestamp: ctx.now,
                caller,
                event,
            })
            .collect();

        if !records.is_empty() {
            if let Err(e) = self.log.append(records.clone()).await {
                let err = LedgerError::EventLog(e.to_string());
                warn!("Aborted {} from {}: {}", operation, caller.short(), err);
                self.record(operation, Err(&err));
                return Err(err);
            }
        }

        inner.next_sequence = first + records.len() as u64;
        inner.state = next;
        if let Some(metrics) = &self.metrics {
            metrics.set_total_supply(inner.state.token().total_supply());
        }
        self.record(operation, Ok(()));
        debug!("Applied {} from {} ({} events)", operation, caller.short(), records.len());

        Ok(Receipt { operation, events: records })
    }

    /// Run a read-only view against the committed state.
    pub async fn read<R>(&self, view: impl FnOnce(&LedgerState) -> R) -> R {
        let inner = self.inner.lock().await;
        view(&inner.state)
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> LedgerState {
        self.read(|state| state.clone()).await
    }

    fn record(&self, operation: &str, outcome: Result<(), &LedgerError>) {
        if let Some(metrics) = &self.metrics {
            metrics.record(operation, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event_log::{EventLogError, MemoryEventLog};
    use crate::events::LedgerEvent;
    use async_trait::async_trait;
    use chrono::Utc;
    use prometheus::Registry;

    fn principal(byte: u8) -> Principal {
        Principal::from_bytes([byte; 32])
    }

    async fn engine_with(log: Arc<dyn EventLog>) -> Engine {
        let genesis = Genesis::new(principal(1), principal(9));
        Engine::new(&genesis, log, Arc::new(ManualClock::new(Utc::now()))).await.unwrap()
    }

    #[tokio::test]
    async fn test_commit_assigns_contiguous_sequences() {
        let log = Arc::new(MemoryEventLog::default());
        let engine = engine_with(log.clone()).await;

        let receipt = engine.execute(principal(1), Call::Mint { to: principal(2), amount: 10 }).await.unwrap();
        assert_eq!(receipt.sequence_range(), Some((1, 2)));

        let receipt = engine.execute(principal(1), Call::Pause).await.unwrap();
        assert_eq!(receipt.sequence_range(), Some((3, 3)));
        assert!(matches!(receipt.events[0].event, LedgerEvent::Paused { .. }));

        assert_eq!(log.last_sequence().await.unwrap(), 3);
        assert_eq!(engine.read(|s| s.token().balance_of(&principal(2))).await, 10);
    }

    #[tokio::test]
    async fn test_rejected_call_leaves_no_trace() {
        let log = Arc::new(MemoryEventLog::default());
        let engine = engine_with(log.clone()).await;

        let err = engine
            .execute(principal(2), Call::Mint { to: principal(2), amount: 10 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Authorization);
        assert_eq!(log.last_sequence().await.unwrap(), 0);
        assert_eq!(engine.read(|s| s.token().total_supply()).await, 0);

        // Numbering resumes without a gap.
        let receipt = engine.execute(principal(1), Call::Pause).await.unwrap();
        assert_eq!(receipt.sequence_range(), Some((1, 1)));
    }

    #[derive(Debug)]
    struct FailingLog;

    #[async_trait]
    impl EventLog for FailingLog {
        async fn append(&self, _batch: Vec<EventRecord>) -> Result<(), EventLogError> {
            Err(EventLogError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        }

        async fn replay(&self, _from_sequence: u64) -> Result<Vec<EventRecord>, EventLogError> {
            Ok(Vec::new())
        }

        async fn last_sequence(&self) -> Result<u64, EventLogError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_failed_append_aborts_the_call() {
        let engine = engine_with(Arc::new(FailingLog)).await;
        let err = engine
            .execute(principal(1), Call::Mint { to: principal(2), amount: 10 })
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::EventLog(_)));
        assert_eq!(engine.read(|s| s.token().total_supply()).await, 0);
    }

    #[tokio::test]
    async fn test_metrics_follow_calls() {
        let registry = Registry::new();
        let metrics = LedgerMetrics::new(&registry).unwrap();
        let engine = engine_with(Arc::new(MemoryEventLog::default()))
            .await
            .with_metrics(metrics.clone());

        engine
            .execute(principal(1), Call::Mint { to: principal(2), amount: 5 * dcm_core_types::ONE_TOKEN })
            .await
            .unwrap();
        let _ = engine.execute(principal(3), Call::Pause).await;

        assert_eq!(metrics.calls.with_label_values(&["mint", "ok"]).get(), 1);
        assert_eq!(metrics.calls.with_label_values(&["pause", "authorization"]).get(), 1);
        assert_eq!(metrics.total_supply.get(), 5);
    }
}
