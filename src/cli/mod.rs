//! CLI command handling
//!
//! Dispatches CLI commands and formats their output.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::cleanup::LocalCleanup;
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::testing::{print_summary, ResultLog, Runner, TestSuite};
use crate::transport::HttpTransport;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            path,
            base_url,
            export,
            deadline,
            config,
            verbose,
        } => {
            let config = Config::load(config.as_deref())?;
            let mut suite = TestSuite::load(&path)?;
            if let Some(base_url) = base_url {
                suite.suite.base_url = base_url;
            }
            let name = suite.suite.name.clone();

            let deadline = match deadline {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => config.run.deadline(),
            };

            let transport = HttpTransport::new(&config.http)?;
            let cleanup = LocalCleanup::new().with_working_dir(suite_dir(&path));

            let report = Runner::new(suite, Box::new(transport))?
                .with_cleanup(Box::new(cleanup))
                .with_deadline(deadline)
                .with_echo(true)
                .run()
                .await?;

            if verbose {
                print_failed_responses(&report.results)?;
            }

            print_summary(&name, &report.results);

            for error in &report.teardown_errors {
                println!("  {} teardown: {}", "!".yellow(), error);
            }

            if let Some(export) = export {
                report.results.export(&export)?;
                println!("\nResults written to {}", export.display());
            }

            let summary = report.results.summary();
            let failed = summary.failed + summary.skipped;
            if failed > 0 {
                return Err(Error::RunFailed {
                    failed,
                    total: summary.total,
                });
            }
            Ok(())
        }

        Commands::Validate { path } => {
            let suite = TestSuite::load(&path)?;

            println!(
                "{} {} is valid",
                "✓".green(),
                suite.suite.name.white().bold()
            );
            println!(
                "  {} scenarios, {} test cases, {} setup / {} teardown actions",
                suite.scenarios.len(),
                suite.case_count(),
                suite.suite.setup.len(),
                suite.suite.teardown.len()
            );
            Ok(())
        }
    }
}

/// Shell actions run relative to the suite file
fn suite_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn print_failed_responses(log: &ResultLog) -> Result<()> {
    for result in log.failures() {
        let Some(response) = &result.response else {
            continue;
        };
        println!(
            "\n{} {} (status {})",
            "Response:".dimmed(),
            result.name,
            response.status_code
        );
        println!("{}", serde_json::to_string_pretty(&response.body)?);
    }
    Ok(())
}
