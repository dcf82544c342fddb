//! Per-case results and run summary

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use serde::{Serialize, Serializer};

use crate::common::{Error, Result};
use crate::value::Value;

/// Final state of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    /// Never sent: its dependency had not passed
    Skipped,
}

/// What was received for a case's last attempt
#[derive(Debug, Clone, Serialize)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub body: Value,
    pub headers: BTreeMap<String, Vec<String>>,
}

/// Result of one case, recorded exactly once per run
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub scenario: String,
    pub name: String,
    pub passed: bool,
    /// Wall time across all attempts, exported in milliseconds
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSnapshot>,
    #[serde(skip)]
    pub outcome: Outcome,
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis().try_into().unwrap_or(u64::MAX))
}

impl TestResult {
    pub fn passed(
        scenario: &str,
        name: &str,
        duration: Duration,
        response: Option<ResponseSnapshot>,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            name: name.to_string(),
            passed: true,
            duration,
            error: None,
            response,
            outcome: Outcome::Passed,
        }
    }

    pub fn failed(
        scenario: &str,
        name: &str,
        duration: Duration,
        error: &Error,
        response: Option<ResponseSnapshot>,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            name: name.to_string(),
            passed: false,
            duration,
            error: Some(error.to_string()),
            response,
            outcome: Outcome::Failed,
        }
    }

    pub fn skipped(scenario: &str, name: &str, error: &Error) -> Self {
        Self {
            scenario: scenario.to_string(),
            name: name.to_string(),
            passed: false,
            duration: Duration::ZERO,
            error: Some(error.to_string()),
            response: None,
            outcome: Outcome::Skipped,
        }
    }
}

/// Counts for the console summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

/// Append-only log of case results in execution order
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    results: Vec<TestResult>,
}

impl ResultLog {
    pub(crate) fn record(&mut self, result: TestResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn find(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Whether the named case ran and passed
    pub fn has_passed(&self, name: &str) -> bool {
        self.find(name).is_some_and(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn summary(&self) -> Summary {
        self.results.iter().fold(Summary::default(), |mut s, r| {
            s.total += 1;
            s.duration += r.duration;
            match r.outcome {
                Outcome::Passed => s.passed += 1,
                Outcome::Failed => s.failed += 1,
                Outcome::Skipped => s.skipped += 1,
            }
            s
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.results)?)
    }

    /// Write the results as a JSON array
    pub fn export(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Print the end-of-run summary to stdout
pub fn print_summary(suite: &str, log: &ResultLog) {
    let summary = log.summary();

    println!("\n{} {}", "Summary:".blue().bold(), suite.white().bold());
    println!(
        "  Total: {}  {}  {}  {}  ({:.2}s)",
        summary.total,
        format!("Passed: {}", summary.passed).green(),
        format!("Failed: {}", summary.failed).red(),
        format!("Skipped: {}", summary.skipped).yellow(),
        summary.duration.as_secs_f64()
    );

    if summary.failed + summary.skipped > 0 {
        println!("\n{}", "Failures:".red().bold());
        for result in log.failures() {
            println!(
                "  {} {} / {}: {}",
                "✗".red(),
                result.scenario.dimmed(),
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
