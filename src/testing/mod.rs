//! Suite runner
//!
//! Reads YAML test suites, executes their cases in order against a
//! [`Transport`](crate::transport::Transport) and accumulates one result per
//! case.

mod config;
mod results;
mod runner;

pub use config::*;
pub use results::{print_summary, Outcome, ResponseSnapshot, ResultLog, Summary, TestResult};
pub use runner::{RunReport, Runner};
