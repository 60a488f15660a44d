use crate::error::CliResult;
use clap::Args;
use dcm_ledger::{EventLog, JsonlEventLog};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// JSON-lines event log file
    pub log: PathBuf,

    /// First sequence number to print
    #[arg(long, default_value_t = 1)]
    pub from: u64,

    /// Only print events of this type (e.g. "transfer")
    #[arg(long = "type")]
    pub event_type: Option<String>,
}

pub async fn handle_replay(args: &ReplayArgs) -> CliResult<()> {
    let log = JsonlEventLog::open(&args.log).await?;
    let records = log.replay(args.from).await?;

    let mut shown = 0usize;
    for record in records
        .iter()
        .filter(|r| args.event_type.as_deref().map_or(true, |t| r.event.name() == t))
    {
        println!(
            "#{} {} {} {}",
            record.sequence,
            record.timestamp.to_rfc3339(),
            record.caller.short(),
            serde_json::to_string(&record.event)?
        );
        shown += 1;
    }
    println!("{} events (log ends at #{})", shown, log.last_sequence().await?);
    Ok(())
}
