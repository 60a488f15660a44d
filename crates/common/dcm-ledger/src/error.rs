use chrono::{DateTime, Utc};
use dcm_core_types::{Principal, RoleId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authorization,
    Validation,
    State,
    Expired,
    NotFound,
    /// Host-side failure (event log I/O); never produced by ledger logic.
    Internal,
}

/// Every way a ledger call can fail. A failed call leaves no trace in state
/// or in the event log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{principal} is missing role {role}")]
    MissingRole { principal: Principal, role: RoleId },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Operation not allowed in current state: {0}")]
    State(String),

    #[error("Operations suspended: ledger is paused")]
    Paused,

    #[error("Permit expired at {deadline} (now {now})")]
    Expired { deadline: DateTime<Utc>, now: DateTime<Utc> },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Event log error: {0}")]
    EventLog(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authorization => "authorization",
            ErrorKind::Validation => "validation",
            ErrorKind::State => "state",
            ErrorKind::Expired => "expired",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::MissingRole { .. } | LedgerError::Unauthorized(_) => ErrorKind::Authorization,
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::State(_) | LedgerError::Paused => ErrorKind::State,
            LedgerError::Expired { .. } => ErrorKind::Expired,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::EventLog(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        LedgerError::Validation(reason.into())
    }

    pub(crate) fn state(reason: impl Into<String>) -> Self {
        LedgerError::State(reason.into())
    }

    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        LedgerError::NotFound { entity, key: key.into() }
    }

    pub(crate) fn overflow() -> Self {
        LedgerError::Validation("arithmetic overflow".to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
