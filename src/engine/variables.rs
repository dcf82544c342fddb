//! Run-scoped variable store
//!
//! Seeded from the suite's `variables` block and grown by capture steps.
//! Template resolution and assertions only ever borrow it; the runner's
//! capture step is the single writer.

use crate::value::{Mapping, Value};

#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    values: Mapping,
}

impl VariableStore {
    pub fn new(initial: Mapping) -> Self {
        Self { values: initial }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Bind a captured response value, replacing any previous binding
    pub(crate) fn capture(&mut self, name: &str, value: Value) -> Option<Value> {
        self.values.insert(name.to_string(), value)
    }
}
