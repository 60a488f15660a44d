use clap::Parser;
use dcm_cli::{load_config, run, Cli};
use env_logger::Env;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Default filter comes from the config when one is given; RUST_LOG wins.
    let filter = config
        .as_ref()
        .map(|config| config.logging.filter.clone())
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    if let Err(e) = run(cli, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
