//! Conductor CLI binary entry point.

use clap::Parser;
use conductor::cli::{Cli, Commands};
use conductor::config::ConductorConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conductor=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match ConductorConfig::load(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Graph(args) => conductor::cli::handle_graph(args, &config).await,
            Commands::Replay(args) => conductor::cli::handle_replay(args).await,
            Commands::History(args) => conductor::cli::handle_history(args, &config).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
