//! Test suite configuration types
//!
//! Defines the data structures for deserializing YAML test suites and the
//! load-time checks run before any case executes.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cleanup::Action;
use crate::common::{Error, Result};
use crate::engine::{Expectation, RequestTemplate};
use crate::value::Mapping;

/// A complete test suite loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct TestSuite {
    pub suite: SuiteConfig,
    /// Initial variable bindings
    #[serde(default)]
    pub variables: Mapping,
    /// Scenarios, run in declaration order
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// Suite header
#[derive(Deserialize, Debug, Clone)]
pub struct SuiteConfig {
    pub name: String,
    /// Prefix for every request path
    #[serde(default)]
    pub base_url: String,
    /// Actions run once before the first scenario
    #[serde(default)]
    pub setup: Vec<Action>,
    /// Actions run once after the last scenario
    #[serde(default)]
    pub teardown: Vec<Action>,
}

/// A named group of cases
#[derive(Deserialize, Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default, rename = "testcases")]
    pub cases: Vec<TestCase>,
}

/// A single request/expectation unit
#[derive(Deserialize, Debug, Clone)]
pub struct TestCase {
    /// Unique across the suite; other cases refer to it by this name
    pub name: String,
    /// Name of a case that must have passed earlier in the run
    #[serde(default)]
    pub depends_on: Option<String>,
    pub request: RequestTemplate,
    #[serde(default)]
    pub expect: Expectation,
    /// Variable name -> response path to capture after a pass
    #[serde(default)]
    pub save: BTreeMap<String, String>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

/// How many times to attempt a case and how long to wait between attempts
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    #[serde(rename = "times")]
    pub attempts: u32,
    /// Wait between attempts, in milliseconds
    #[serde(default)]
    pub interval: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            interval: 0,
        }
    }
}

impl RetryPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }
}

impl TestCase {
    /// The dependency, if one is declared and non-empty
    pub fn dependency(&self) -> Option<&str> {
        self.depends_on.as_deref().filter(|d| !d.is_empty())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        self.request
            .validate()
            .map_err(|e| case_error(&self.name, e))?;

        if let Some(retry) = &self.retry {
            if retry.attempts == 0 {
                return Err(case_error(
                    &self.name,
                    Error::Config("retry.times must be at least 1".into()),
                ));
            }
        }

        for (var, path) in &self.save {
            if var.is_empty() || path.is_empty() {
                return Err(case_error(
                    &self.name,
                    Error::Config(format!("save entry '{var}' needs a variable name and a path")),
                ));
            }
        }

        Ok(())
    }
}

fn case_error(case: &str, err: Error) -> Error {
    match err {
        Error::Config(reason) => Error::Config(format!("test case '{case}': {reason}")),
        other => other,
    }
}

impl TestSuite {
    /// Load and validate a suite from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            Error::Yaml(err) => Error::ScenarioParse {
                path: path.display().to_string(),
                reason: err.to_string(),
            },
            other => other,
        })
    }

    /// Parse and validate a suite from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        let suite: TestSuite = serde_yaml::from_str(content)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Check everything that can be checked before the run starts
    pub fn validate(&self) -> Result<()> {
        if self.suite.name.trim().is_empty() {
            return Err(Error::Config("suite name is required".into()));
        }

        for action in self.suite.setup.iter().chain(&self.suite.teardown) {
            action.validate()?;
        }

        let mut seen = HashSet::new();
        for case in self.cases() {
            if case.name.trim().is_empty() {
                return Err(Error::Config("test case name is required".into()));
            }
            if !seen.insert(case.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate test case name '{}'",
                    case.name
                )));
            }
            case.validate()?;
        }

        Ok(())
    }

    /// Every case in run order
    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.scenarios.iter().flat_map(|s| s.cases.iter())
    }

    pub fn case_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.cases.len()).sum()
    }
}
