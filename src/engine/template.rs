//! `{{placeholder}}` substitution
//!
//! Plain strings (paths, headers, query values, assertion operands) are
//! resolved textually. Structured request bodies resolve each string field
//! by one of three tiers:
//!
//! 1. The field is exactly one placeholder naming a stored variable: the
//!    field becomes the variable's value as stored, kind included.
//! 2. The field is exactly one placeholder resolved some other way (a
//!    reserved generator): if the resulting text looks numeric it is parsed
//!    back into a number.
//! 3. Anything else, including literal text mixed with placeholders: the
//!    substituted text, always as a string.
//!
//! Reserved names are never looked up in the store: `uuid` yields a fresh
//! v4 UUID per occurrence and `env.NAME` reads the process environment.
//! Unknown placeholders are left in place verbatim.

use uuid::Uuid;

use super::variables::VariableStore;
use crate::value::{coerce, Value};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Resolves templates against a borrowed variable store
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    variables: &'a VariableStore,
}

impl<'a> Resolver<'a> {
    pub fn new(variables: &'a VariableStore) -> Self {
        Self { variables }
    }

    /// Substitute every resolvable placeholder in `template` with its text
    pub fn resolve_str(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find(OPEN) {
            let after = &rest[start + OPEN.len()..];
            let Some(end) = after.find(CLOSE) else {
                break;
            };
            let inner = &after[..end];

            // "{{a {{b}}": restart at the innermost opener
            if let Some(nested) = inner.rfind(OPEN) {
                let restart = start + OPEN.len() + nested;
                out.push_str(&rest[..restart]);
                rest = &rest[restart..];
                continue;
            }

            out.push_str(&rest[..start]);
            match self.lookup_text(inner.trim()) {
                Some(text) => out.push_str(&text),
                None => out.push_str(&rest[start..start + OPEN.len() + end + CLOSE.len()]),
            }
            rest = &after[end + CLOSE.len()..];
        }

        out.push_str(rest);
        out
    }

    /// Resolve one string field of a structured body, following the tiers
    /// described in the module docs
    pub fn resolve_field(&self, field: &str) -> Value {
        let Some(name) = whole_placeholder(field) else {
            return Value::String(self.resolve_str(field));
        };

        if !is_reserved(name) {
            if let Some(value) = self.variables.get(name) {
                return value.clone();
            }
        }

        let resolved = self.resolve_str(field);
        if resolved != field && coerce::looks_numeric(&resolved) {
            if let Some(number) = coerce::parse_number(&resolved) {
                return number;
            }
        }
        Value::String(resolved)
    }

    /// Resolve a structured value recursively. Keys are left untouched;
    /// non-string scalars pass through unchanged.
    pub fn resolve_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => self.resolve_field(s),
            Value::List(items) => Value::List(items.iter().map(|v| self.resolve_value(v)).collect()),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.resolve_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn lookup_text(&self, name: &str) -> Option<String> {
        if name == "uuid" {
            return Some(Uuid::new_v4().to_string());
        }
        if let Some(var) = name.strip_prefix("env.") {
            return std::env::var(var).ok();
        }
        self.variables.get(name).map(Value::to_string)
    }
}

fn is_reserved(name: &str) -> bool {
    name == "uuid" || name.starts_with("env.")
}

/// The trimmed name when `s` is exactly one placeholder and nothing else
fn whole_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix(OPEN)?.strip_suffix(CLOSE)?;
    if inner.contains(OPEN) || inner.contains(CLOSE) {
        return None;
    }
    Some(inner.trim())
}
