//! apitest - declarative API test runner
//!
//! Runs YAML-described HTTP test suites: ordered cases with dependencies,
//! variable capture, retries and assertions on the decoded responses.

use std::path::PathBuf;

use apitest::{cli, commands, common::logging};
use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "apitest", about = "Declarative API test runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _guard = logging::init_cli(cli.log_file.as_deref());

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
