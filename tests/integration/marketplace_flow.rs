// End-to-end: TOML config -> engine -> JSON-lines audit log.

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use dcm_config::parse_engine_config;
use dcm_core_types::{Principal, PrincipalKey, ONE_TOKEN};
use dcm_ledger::bootstrap::open_engine;
use dcm_ledger::{
    Call, Clock, ClusterSpec, ClusterStatus, Engine, ErrorKind, EventLog, Implementation, LedgerError,
    LoadBalancingStrategy, ManualClock, NodeMetadata, NodeStatus, PermitAuthorization, UserType,
};
use std::path::Path;
use std::sync::Arc;

fn p(n: u8) -> Principal {
    Principal::from_bytes([n; 32])
}

const ADMIN: u8 = 1;
const OPERATOR: u8 = 4;
const REPORTER: u8 = 5;

fn config_toml(log: &Path) -> String {
    format!(
        r#"
[token]
name = "Compute Token"
symbol = "DCT"
address = "{token}"
implementation = "v2"
max_supply = "1000000"

[bootstrap]
admin = "{admin}"
operators = ["{operator}"]
reporters = ["{reporter}"]

[event_log]
path = "{log}"
"#,
        token = p(0xAA),
        admin = p(ADMIN),
        operator = p(OPERATOR),
        reporter = p(REPORTER),
        log = log.display()
    )
}

async fn start(dir: &Path) -> Result<(Engine, Arc<ManualClock>)> {
    let config = parse_engine_config(&config_toml(&dir.join("events.jsonl")))?;
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap_or_else(Utc::now);
    let clock = Arc::new(ManualClock::new(start));
    let engine = open_engine(&config, clock.clone()).await?;
    Ok((engine, clock))
}

#[tokio::test]
async fn test_provider_lifecycle() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (engine, clock) = start(dir.path()).await?;
    let admin = p(ADMIN);
    let provider = PrincipalKey::from_seed([42; 32]);
    let consumer = p(7);

    // Onboarding.
    engine
        .execute(
            provider.principal(),
            Call::RegisterUser {
                address: provider.principal(),
                profile_hash: "bafy-provider".into(),
                user_type: UserType::Provider,
            },
        )
        .await?;
    engine
        .execute(
            consumer,
            Call::RegisterUser { address: consumer, profile_hash: "bafy-consumer".into(), user_type: UserType::Consumer },
        )
        .await?;
    for node in ["gpu-a", "gpu-b"] {
        engine
            .execute(
                provider.principal(),
                Call::RegisterNode {
                    node_id: node.into(),
                    metadata: NodeMetadata { region: "eu-west".into(), gpu_count: 8, ..Default::default() },
                },
            )
            .await?;
    }
    engine
        .execute(
            p(OPERATOR),
            Call::RegisterCluster {
                cluster_id: "eu-gpu".into(),
                spec: ClusterSpec {
                    node_ids: vec!["gpu-a".into(), "gpu-b".into()],
                    strategy: LoadBalancingStrategy::LeastLoaded,
                    min_active_nodes: 2,
                    status: ClusterStatus::Active,
                    auto_managed: true,
                },
            },
        )
        .await?;

    // Rewards, then a delegated payment through a permit.
    engine
        .execute(
            admin,
            Call::MintRewards { to: provider.principal(), amount: 500 * ONE_TOKEN, reason: "epoch-12 uptime".into() },
        )
        .await?;
    let domain = engine.read(|s| s.token().domain_separator()).await;
    let deadline = clock.now() + Duration::minutes(10);
    let permit = PermitAuthorization {
        owner: provider.principal(),
        spender: consumer,
        amount: 50 * ONE_TOKEN,
        deadline,
        nonce: 0,
    };
    engine
        .execute(
            consumer,
            Call::Permit {
                owner: permit.owner,
                spender: consumer,
                amount: permit.amount,
                deadline,
                signature: hex::encode(permit.sign(&provider, &domain)),
            },
        )
        .await?;
    engine
        .execute(consumer, Call::TransferFrom { owner: provider.principal(), to: consumer, amount: 50 * ONE_TOKEN })
        .await?;

    // A node drops out; the reporter's status update demotes the cluster.
    engine
        .execute(p(REPORTER), Call::UpdateNodeStatus { node_id: "gpu-b".into(), status: NodeStatus::Offline })
        .await?;
    let status = engine.read(|s| s.clusters().get_cluster("eu-gpu").map(|c| c.status)).await?;
    assert_eq!(status, ClusterStatus::Maintenance);

    // The v2 cap holds.
    let err = engine
        .execute(admin, Call::Mint { to: admin, amount: 1_000_000 * ONE_TOKEN })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let (provider_balance, consumer_balance, supply, cap) = engine
        .read(|s| {
            let token = s.token();
            (
                token.balance_of(&provider.principal()),
                token.balance_of(&consumer),
                token.total_supply(),
                token.supply_cap(),
            )
        })
        .await;
    assert_eq!(provider_balance, 450 * ONE_TOKEN);
    assert_eq!(consumer_balance, 50 * ONE_TOKEN);
    assert_eq!(supply, 500 * ONE_TOKEN);
    assert_eq!(cap, Some(1_000_000 * ONE_TOKEN));

    let names: Vec<&'static str> = engine
        .event_log()
        .replay(1)
        .await?
        .iter()
        .map(|r| r.event.name())
        .collect();
    assert!(names.contains(&"rewards_minted"));
    assert!(names.contains(&"permit_consumed"));
    assert_eq!(names.last(), Some(&"cluster_status_changed"));
    Ok(())
}

#[tokio::test]
async fn test_emergency_pause() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (engine, _clock) = start(dir.path()).await?;
    let admin = p(ADMIN);

    engine.execute(admin, Call::Mint { to: p(2), amount: 10 * ONE_TOKEN }).await?;
    engine.execute(admin, Call::Pause).await?;

    let blocked = engine.execute(p(2), Call::Transfer { to: p(3), amount: ONE_TOKEN }).await;
    assert_eq!(blocked, Err(LedgerError::Paused));
    let blocked = engine
        .execute(admin, Call::UpgradeImplementation { implementation: Implementation::V2 { max_supply: u128::MAX } })
        .await;
    assert_eq!(blocked, Err(LedgerError::Paused));

    engine.execute(admin, Call::Unpause).await?;
    // Already on v2: re-selecting it is not an upgrade.
    let same = engine
        .execute(admin, Call::UpgradeImplementation { implementation: Implementation::V2 { max_supply: u128::MAX } })
        .await
        .unwrap_err();
    assert_eq!(same.kind(), ErrorKind::State);

    engine.execute(p(2), Call::Transfer { to: p(3), amount: ONE_TOKEN }).await?;
    let balances = engine.read(|s| (s.token().balance_of(&p(2)), s.token().balance_of(&p(3)))).await;
    assert_eq!(balances, (9 * ONE_TOKEN, ONE_TOKEN));
    Ok(())
}
