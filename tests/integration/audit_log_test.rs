// The JSON-lines log is enough to audit supply and role history after the fact.

use anyhow::Result;
use chrono::Utc;
use dcm_core_types::{Principal, MINTER_ROLE};
use dcm_ledger::{Call, Engine, EventLog, Genesis, JsonlEventLog, LedgerEvent, ManualClock};
use std::sync::Arc;

fn p(n: u8) -> Principal {
    Principal::from_bytes([n; 32])
}

#[tokio::test]
async fn test_supply_can_be_rebuilt_from_transfer_events() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("audit.jsonl");
    let log = Arc::new(JsonlEventLog::open(&path).await?);
    let engine = Engine::new(&Genesis::new(p(1), p(0xAA)), log, Arc::new(ManualClock::new(Utc::now()))).await?;

    engine.execute(p(1), Call::GrantRole { role: *MINTER_ROLE, account: p(2) }).await?;
    engine.execute(p(2), Call::Mint { to: p(3), amount: 700 }).await?;
    engine.execute(p(3), Call::Transfer { to: p(4), amount: 200 }).await?;
    engine.execute(p(4), Call::Burn { amount: 50 }).await?;
    // Rejected calls never reach the log.
    assert!(engine.execute(p(4), Call::Burn { amount: 1_000 }).await.is_err());
    engine.execute(p(1), Call::RevokeRole { role: *MINTER_ROLE, account: p(2) }).await?;

    let reopened = JsonlEventLog::open(&path).await?;
    let records = reopened.replay(1).await?;
    assert!(records.windows(2).all(|w| w[1].sequence == w[0].sequence + 1));

    let mut supply: i128 = 0;
    let mut role_changes = Vec::new();
    for record in &records {
        match &record.event {
            LedgerEvent::Transfer { from, amount, .. } if from.is_zero() => supply += *amount as i128,
            LedgerEvent::Transfer { to, amount, .. } if to.is_zero() => supply -= *amount as i128,
            LedgerEvent::RoleChanged { account, granted, .. } => role_changes.push((*account, *granted)),
            _ => {}
        }
    }

    let live_supply = engine.read(|s| s.token().total_supply()).await;
    assert_eq!(supply, live_supply as i128);
    assert_eq!(supply, 650);
    assert_eq!(role_changes, vec![(p(2), true), (p(2), false)]);
    Ok(())
}
