use clap::Parser;
use std::io::Write;
use tracing_subscriber::EnvFilter;

use multigit::presentation::cli::{Cli, CliApp};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging: RUST_LOG wins, otherwise warn (info with --verbose)
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Run the CLI application
    let code = CliApp::from_cli(cli).run().await;
    let _ = std::io::stdout().flush();
    std::process::exit(code);
}
