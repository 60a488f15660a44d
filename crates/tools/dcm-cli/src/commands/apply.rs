use crate::error::{CliError, CliResult};
use clap::Args;
use dcm_config::EngineConfig;
use dcm_core_types::{format_units, Principal};
use dcm_ledger::bootstrap::open_engine;
use dcm_ledger::{Call, LedgerMetrics, SystemClock};
use log::info;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// JSON array of {"caller": "0x…", "call": {"op": …}} steps
    pub script: PathBuf,

    /// Continue with the next step after a rejected call
    #[arg(long)]
    pub keep_going: bool,

    /// Print Prometheus metrics once the batch is done
    #[arg(long)]
    pub metrics: bool,
}

/// One entry of a batch script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub caller: Principal,
    pub call: Call,
}

pub fn parse_script(content: &str) -> CliResult<Vec<Step>> {
    let steps: Vec<Step> = serde_json::from_str(content)?;
    if steps.is_empty() {
        return Err(CliError::Input("script contains no steps".to_string()));
    }
    Ok(steps)
}

pub async fn handle_apply(config: &EngineConfig, args: &ApplyArgs) -> CliResult<()> {
    let steps = parse_script(&fs::read_to_string(&args.script)?)?;

    let registry = Registry::new();
    let metrics = LedgerMetrics::new(&registry).map_err(|e| CliError::Config(e.to_string()))?;
    let engine = open_engine(config, Arc::new(SystemClock)).await?.with_metrics(metrics);
    info!("Applying {} steps from {}", steps.len(), args.script.display());

    let mut rejected = 0usize;
    for (index, step) in steps.into_iter().enumerate() {
        let operation = step.call.name();
        match engine.execute(step.caller, step.call).await {
            Ok(receipt) => {
                println!("[{}] {} by {}: ok", index + 1, operation, step.caller.short());
                for record in &receipt.events {
                    println!("    #{} {}", record.sequence, serde_json::to_string(&record.event)?);
                }
            }
            Err(e) => {
                println!("[{}] {} by {}: rejected ({}) {}", index + 1, operation, step.caller.short(), e.kind().as_str(), e);
                rejected += 1;
                if !args.keep_going {
                    return Err(e.into());
                }
            }
        }
    }

    let summary = engine
        .read(|state| {
            format!(
                "Total supply: {} {}\nPaused: {}\nUsers: {}\nNodes: {}\nClusters: {}",
                format_units(state.token().total_supply()),
                state.token().symbol(),
                state.is_paused(),
                state.registry().user_count(),
                state.registry().node_count(),
                state.clusters().list_clusters().len()
            )
        })
        .await;
    println!("{}", summary);
    if rejected > 0 {
        println!("Rejected steps: {}", rejected);
    }

    if args.metrics {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(|e| CliError::Input(format!("Failed to encode metrics: {}", e)))?;
        println!("{}", String::from_utf8_lossy(&buffer));
    }
    Ok(())
}
