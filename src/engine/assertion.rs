//! Response expectations and assertion operators
//!
//! Validation order for a response: status code (short-circuits on
//! mismatch), then the partial match on top-level fields, then each
//! assertion in declaration order. The first failure is reported.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::template::Resolver;
use crate::common::{Error, Result};
use crate::value::{coerce, path, Mapping, Value};

/// Assertion operators accepted in scenario files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    NotEmpty,
    IsArray,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::NotEmpty => "notEmpty",
            Operator::IsArray => "isArray",
            Operator::GreaterThan => "greaterThan",
            Operator::GreaterThanOrEqual => "greaterThanOrEqual",
            Operator::LessThan => "lessThan",
        };
        f.write_str(name)
    }
}

/// A single `path operator value` check
#[derive(Deserialize, Debug, Clone)]
pub struct Assertion {
    pub path: String,
    pub operator: Operator,
    /// Expected operand; unused by `notEmpty` and `isArray`
    #[serde(default)]
    pub value: Value,
}

/// What a response must satisfy for its case to pass
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Expectation {
    /// Expected HTTP status; 0 leaves the status unchecked
    #[serde(default)]
    pub status_code: u16,
    /// Top-level fields that must be present with these values
    #[serde(default)]
    pub response_body: Option<Mapping>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

impl Expectation {
    /// Validate a decoded response against this expectation
    pub fn check(&self, status: u16, body: &Value, resolver: &Resolver<'_>) -> Result<()> {
        if self.status_code != 0 && self.status_code != status {
            return Err(Error::Assertion(format!(
                "status code mismatch: expected {}, got {}",
                self.status_code, status
            )));
        }

        if let Some(fields) = &self.response_body {
            check_fields(fields, body, resolver)?;
        }

        for assertion in &self.assertions {
            assertion.evaluate(body, resolver)?;
        }

        Ok(())
    }
}

fn check_fields(fields: &Mapping, body: &Value, resolver: &Resolver<'_>) -> Result<()> {
    for (key, expected) in fields {
        let actual = body
            .get(key)
            .ok_or_else(|| Error::Assertion(format!("field '{key}' not found in response")))?;

        let expected = resolve_operand(expected, resolver);
        if expected.is_null() {
            if !actual.is_null() {
                return Err(Error::Assertion(format!(
                    "field '{key}' expected null, got {}",
                    describe(Some(actual))
                )));
            }
            continue;
        }

        if !coerce::values_equal(actual, &expected) {
            return Err(Error::Assertion(format!(
                "field '{key}' mismatch: expected {}, got {}",
                describe(Some(&expected)),
                describe(Some(actual))
            )));
        }
    }
    Ok(())
}

impl Assertion {
    /// Evaluate against a decoded response body
    pub fn evaluate(&self, body: &Value, resolver: &Resolver<'_>) -> Result<()> {
        let actual = path::lookup(body, &self.path);
        let expected = resolve_operand(&self.value, resolver);
        let path = &self.path;

        let passed = match self.operator {
            Operator::Equals => actual.is_some_and(|a| coerce::values_equal(a, &expected)),
            Operator::NotEquals => !actual.is_some_and(|a| coerce::values_equal(a, &expected)),
            Operator::Contains => actual.is_some_and(|a| a.to_string().contains(&expected.to_string())),
            Operator::StartsWith => {
                actual.is_some_and(|a| a.to_string().starts_with(&expected.to_string()))
            }
            Operator::NotEmpty => match actual {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.is_empty(),
                Some(_) => true,
            },
            Operator::IsArray => matches!(actual, Some(Value::List(_))),
            Operator::GreaterThan | Operator::GreaterThanOrEqual | Operator::LessThan => {
                let ordering = self.order(actual, &expected)?;
                match self.operator {
                    Operator::GreaterThan => ordering == Ordering::Greater,
                    Operator::GreaterThanOrEqual => ordering != Ordering::Less,
                    _ => ordering == Ordering::Less,
                }
            }
        };

        if passed {
            return Ok(());
        }

        let message = match self.operator {
            Operator::NotEmpty => format!(
                "assertion failed: {path} should not be empty, got {}",
                describe(actual)
            ),
            Operator::IsArray => format!(
                "assertion failed: {path} should be an array, got {}",
                describe(actual)
            ),
            operator => format!(
                "assertion failed: {path} {operator} {}, got {}",
                describe(Some(&expected)),
                describe(actual)
            ),
        };
        Err(Error::Assertion(message))
    }

    /// Numeric ordering of actual against expected; either side failing to
    /// coerce is an error rather than a silent `false`
    fn order(&self, actual: Option<&Value>, expected: &Value) -> Result<Ordering> {
        let path = &self.path;
        let actual = actual
            .filter(|a| coerce::number(a).is_some())
            .ok_or_else(|| {
                Error::Assertion(format!(
                    "assertion failed: {path} should be a number, got {}",
                    describe(actual)
                ))
            })?;

        coerce::compare(actual, expected).ok_or_else(|| {
            Error::Assertion(format!(
                "assertion failed: expected operand of {} on {path} should be a number, got {}",
                self.operator,
                describe(Some(expected))
            ))
        })
    }
}

/// String operands are resolved textually, including strings nested in
/// lists and maps; other operands are used as-is
fn resolve_operand(operand: &Value, resolver: &Resolver<'_>) -> Value {
    match operand {
        Value::String(s) => Value::String(resolver.resolve_str(s)),
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| resolve_operand(item, resolver))
                .collect(),
        ),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), resolve_operand(value, resolver)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// `5 (int)`, `"5" (string)`, or `nothing (path not found)`
fn describe(value: Option<&Value>) -> String {
    match value {
        None => "nothing (path not found)".to_string(),
        Some(Value::String(s)) => format!("{s:?} (string)"),
        Some(v) => format!("{v} ({})", v.kind()),
    }
}
