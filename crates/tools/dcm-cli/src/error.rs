use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Serialization/Deserialization Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid Input: {0}")]
    Input(String),

    #[error("Ledger Error: {0}")]
    Ledger(#[from] dcm_ledger::LedgerError),

    #[error("Event Log Error: {0}")]
    EventLog(#[from] dcm_ledger::EventLogError),

    #[error("Generic Error: {0}")]
    Any(#[from] anyhow::Error),
}

pub type CliResult<T = ()> = Result<T, CliError>;
