use super::{check_contiguous, EventLog, EventLogError};
use crate::events::EventRecord;
use async_trait::async_trait;
use log::trace;
use tokio::sync::{broadcast, RwLock};

/// In-memory event log with live tailing.
#[derive(Debug)]
pub struct MemoryEventLog {
    records: RwLock<Vec<EventRecord>>,
    tail: broadcast::Sender<EventRecord>,
}

impl MemoryEventLog {
    pub fn new(channel_capacity: usize) -> Self {
        let (tail, _) = broadcast::channel(channel_capacity.max(1));
        Self { records: RwLock::new(Vec::new()), tail }
    }

    /// Receive every record appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tail.subscribe()
    }
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(&self, batch: Vec<EventRecord>) -> Result<(), EventLogError> {
        let mut records = self.records.write().await;
        let last = records.last().map(|r| r.sequence).unwrap_or(0);
        check_contiguous(last, &batch)?;

        for record in batch {
            // No subscribers is not an error.
            let _ = self.tail.send(record.clone());
            trace!("Appended event #{} {}", record.sequence, record.event.name());
            records.push(record);
        }
        Ok(())
    }

    async fn replay(&self, from_sequence: u64) -> Result<Vec<EventRecord>, EventLogError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| r.sequence >= from_sequence).cloned().collect())
    }

    async fn last_sequence(&self) -> Result<u64, EventLogError> {
        Ok(self.records.read().await.last().map(|r| r.sequence).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LedgerEvent;
    use chrono::Utc;
    use dcm_core_types::Principal;

    fn record(sequence: u64) -> EventRecord {
        EventRecord {
            sequence,
            timestamp: Utc::now(),
            caller: Principal::from_bytes([1; 32]),
            event: LedgerEvent::Paused { by: Principal::from_bytes([1; 32]) },
        }
    }

    #[tokio::test]
    async fn test_append_replay_and_tail() {
        let log = MemoryEventLog::new(16);
        let mut tail = log.subscribe();

        log.append(vec![record(1), record(2)]).await.unwrap();
        log.append(vec![record(3)]).await.unwrap();

        assert_eq!(log.last_sequence().await.unwrap(), 3);
        let replayed = log.replay(2).await.unwrap();
        assert_eq!(replayed.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(tail.recv().await.unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn test_rejects_gaps_and_rewrites() {
        let log = MemoryEventLog::default();
        log.append(vec![record(1)]).await.unwrap();

        assert!(matches!(
            log.append(vec![record(1)]).await,
            Err(EventLogError::OutOfOrder { expected: 2, got: 1 })
        ));
        assert!(log.append(vec![record(3)]).await.is_err());
        assert_eq!(log.last_sequence().await.unwrap(), 1);
    }
}
