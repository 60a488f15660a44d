use super::{check_contiguous, EventLog, EventLogError};
use crate::events::EventRecord;
use async_trait::async_trait;
use log::{debug, error};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Event log persisted as one JSON record per line. The file is only ever
/// opened in append mode.
#[derive(Debug)]
pub struct JsonlEventLog {
    path: PathBuf,
    last_sequence: Mutex<u64>,
}

impl JsonlEventLog {
    /// Open (or create on first append) the log at `path`, scanning any
    /// existing records to find where the sequence continues.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, EventLogError> {
        let path = path.as_ref().to_path_buf();
        let existing = read_records(&path).await?;
        let last = existing.last().map(|r| r.sequence).unwrap_or(0);
        check_contiguous(0, &existing)?;
        debug!("Opened event log {} at sequence {}", path.display(), last);
        Ok(Self { path, last_sequence: Mutex::new(last) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// File operations the append path relies on.
#[async_trait]
trait AppendTarget: Send {
    async fn current_len(&mut self) -> io::Result<u64>;
    async fn write_synced(&mut self, bytes: &[u8]) -> io::Result<()>;
    async fn truncate(&mut self, len: u64) -> io::Result<()>;
}

#[async_trait]
impl AppendTarget for File {
    async fn current_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata().await?.len())
    }

    async fn write_synced(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes).await?;
        self.flush().await?;
        self.sync_data().await
    }

    async fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await?;
        self.sync_data().await
    }
}

/// Append `bytes`, cutting the target back to its previous length when any
/// part of the write fails so no torn or orphaned records remain.
async fn append_all_or_nothing<T: AppendTarget>(target: &mut T, bytes: &[u8]) -> io::Result<()> {
    let committed = target.current_len().await?;
    if let Err(e) = target.write_synced(bytes).await {
        if let Err(rollback) = target.truncate(committed).await {
            error!("Could not roll back failed append to {} bytes: {}", committed, rollback);
        }
        return Err(e);
    }
    Ok(())
}

async fn read_records(path: &Path) -> Result<Vec<EventRecord>, EventLogError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<EventRecord>(line).map_err(|e| EventLogError::Corrupt {
                line: index + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl EventLog for JsonlEventLog {
    async fn append(&self, batch: Vec<EventRecord>) -> Result<(), EventLogError> {
        let mut last = self.last_sequence.lock().await;
        check_contiguous(*last, &batch)?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for record in &batch {
            buffer.push_str(&serde_json::to_string(record)?);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        append_all_or_nothing(&mut file, buffer.as_bytes()).await?;

        if let Some(newest) = batch.last() {
            *last = newest.sequence;
        }
        Ok(())
    }

    async fn replay(&self, from_sequence: u64) -> Result<Vec<EventRecord>, EventLogError> {
        let _guard = self.last_sequence.lock().await;
        let records = read_records(&self.path).await?;
        Ok(records.into_iter().filter(|r| r.sequence >= from_sequence).collect())
    }

    async fn last_sequence(&self) -> Result<u64, EventLogError> {
        Ok(*self.last_sequence.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LedgerEvent;
    use chrono::Utc;
    use dcm_core_types::Principal;

    fn record(sequence: u64, amount: u128) -> EventRecord {
        let account = Principal::from_bytes([2; 32]);
        EventRecord {
            sequence,
            timestamp: Utc::now(),
            caller: account,
            event: LedgerEvent::Minted { to: account, amount },
        }
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let log = JsonlEventLog::open(&path).await.unwrap();
        assert_eq!(log.last_sequence().await.unwrap(), 0);
        // Amounts beyond u64 must survive the JSON round trip.
        log.append(vec![record(1, u128::MAX), record(2, 5)]).await.unwrap();
        drop(log);

        let reopened = JsonlEventLog::open(&path).await.unwrap();
        assert_eq!(reopened.last_sequence().await.unwrap(), 2);
        reopened.append(vec![record(3, 7)]).await.unwrap();

        let all = reopened.replay(1).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], record_with_ts(&all[0], 1, u128::MAX));
    }

    fn record_with_ts(original: &EventRecord, sequence: u64, amount: u128) -> EventRecord {
        let mut expected = record(sequence, amount);
        expected.timestamp = original.timestamp;
        expected
    }

    /// In-memory target whose write stops after `accept` bytes.
    struct TornWrite {
        content: Vec<u8>,
        accept: usize,
    }

    #[async_trait]
    impl AppendTarget for TornWrite {
        async fn current_len(&mut self) -> io::Result<u64> {
            Ok(self.content.len() as u64)
        }

        async fn write_synced(&mut self, bytes: &[u8]) -> io::Result<()> {
            let written = bytes.len().min(self.accept);
            self.content.extend_from_slice(&bytes[..written]);
            if written < bytes.len() {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            Ok(())
        }

        async fn truncate(&mut self, len: u64) -> io::Result<()> {
            self.content.truncate(len as usize);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_append_leaves_no_partial_line() {
        let mut target = TornWrite { content: b"{\"sequence\":1}\n".to_vec(), accept: 4 };
        let before = target.content.clone();

        assert!(append_all_or_nothing(&mut target, b"{\"sequence\":2}\n").await.is_err());
        assert_eq!(target.content, before);

        target.accept = usize::MAX;
        append_all_or_nothing(&mut target, b"{\"sequence\":2}\n").await.unwrap();
        assert_eq!(target.content.len(), before.len() * 2);
    }

    #[tokio::test]
    async fn test_corrupt_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        tokio::fs::write(&path, "{not json}\n").await.unwrap();
        assert!(matches!(
            JsonlEventLog::open(&path).await,
            Err(EventLogError::Corrupt { line: 1, .. })
        ));
    }
}
