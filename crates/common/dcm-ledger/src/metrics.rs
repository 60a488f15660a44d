use crate::error::LedgerError;
use dcm_core_types::ONE_TOKEN;
use prometheus::{IntCounterVec, IntGauge, Registry};

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    RegistrationError(String),
}

/// Call counters and supply gauge for one engine.
#[derive(Debug, Clone)]
pub struct LedgerMetrics {
    /// Calls by operation and result (`ok` or the error kind).
    pub calls: IntCounterVec,
    /// Total supply in whole tokens, rounded down.
    pub total_supply: IntGauge,
}

impl LedgerMetrics {
    /// Create the metrics and register them on `registry`.
    pub fn new(registry: &Registry) -> Result<Self, MetricsError> {
        let calls = IntCounterVec::new(
            prometheus::opts!("dcm_ledger_calls_total", "Ledger calls by operation and result"),
            &["operation", "result"],
        )
        .map_err(|e| MetricsError::RegistrationError(format!("Failed to create counter: {}", e)))?;
        let total_supply = IntGauge::new("dcm_token_total_supply_whole", "Token total supply in whole units")
            .map_err(|e| MetricsError::RegistrationError(format!("Failed to create gauge: {}", e)))?;

        registry
            .register(Box::new(calls.clone()))
            .map_err(|e| MetricsError::RegistrationError(format!("Failed to register counter: {}", e)))?;
        registry
            .register(Box::new(total_supply.clone()))
            .map_err(|e| MetricsError::RegistrationError(format!("Failed to register gauge: {}", e)))?;

        Ok(Self { calls, total_supply })
    }

    pub fn record(&self, operation: &str, outcome: Result<(), &LedgerError>) {
        let result = match outcome {
            Ok(()) => "ok",
            Err(e) => e.kind().as_str(),
        };
        self.calls.with_label_values(&[operation, result]).inc();
    }

    pub fn set_total_supply(&self, base_units: u128) {
        let whole = base_units / ONE_TOKEN;
        self.total_supply.set(i64::try_from(whole).unwrap_or(i64::MAX));
    }
}
