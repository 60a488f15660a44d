//! Append-only storage for committed events. Records are never rewritten;
//! observers catch up with `replay` and follow new records via `subscribe`
//! on the in-memory log.

use crate::events::EventRecord;
use async_trait::async_trait;
use thiserror::Error;

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlEventLog;
pub use memory::MemoryEventLog;

#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Out-of-order append: expected sequence {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u64 },

    #[error("Corrupt log at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}

#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append a batch whose sequences continue exactly from `last_sequence() + 1`.
    async fn append(&self, batch: Vec<EventRecord>) -> Result<(), EventLogError>;

    /// All records with `sequence >= from_sequence`, oldest first.
    async fn replay(&self, from_sequence: u64) -> Result<Vec<EventRecord>, EventLogError>;

    /// Sequence of the newest record, 0 for an empty log.
    async fn last_sequence(&self) -> Result<u64, EventLogError>;
}

/// Check that `batch` continues a log whose newest record is `last`.
pub(crate) fn check_contiguous(last: u64, batch: &[EventRecord]) -> Result<(), EventLogError> {
    let mut expected = last + 1;
    for record in batch {
        if record.sequence != expected {
            return Err(EventLogError::OutOfOrder { expected, got: record.sequence });
        }
        expected += 1;
    }
    Ok(())
}
