//! apitest - declarative API test runner
//!
//! This library loads YAML test suites and executes them against an HTTP
//! service: template substitution, dependency gating, retries, assertions
//! and per-case results.

pub mod cleanup;
pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod testing;
pub mod transport;
pub mod value;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use engine::{Resolver, VariableStore};
pub use testing::{RunReport, Runner, TestSuite};
pub use value::{Mapping, Value};
