//! CLI command definitions
//!
//! Defines the clap commands for the apitest CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a YAML test suite
    Run {
        /// Path to the YAML suite file
        path: PathBuf,

        /// Override the suite's base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Write results as JSON to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Overall run deadline in seconds (overrides the config file)
        #[arg(long)]
        deadline: Option<u64>,

        /// Path to the tool configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the response of each failing case
        #[arg(long, short)]
        verbose: bool,
    },

    /// Load and validate a YAML test suite without running it
    Validate {
        /// Path to the YAML suite file
        path: PathBuf,
    },
}
