//! Argument binding: raw tokens against a command's parameter specs.
//!
//! The matcher walks the token list once, producing either fully bound and
//! validated values or a structured failure carrying every problem found in
//! that single pass.

mod matcher;

pub use matcher::bind;

use serde_json::Value;

use crate::error::ArgonError;
use crate::value::ArgValue;

/// Terminal result of one matching pass; consumed exactly once by the
/// dispatcher.
#[derive(Debug)]
pub enum ParseOutcome {
    /// Every parameter bound and validated
    Bound(BoundArgs),

    /// Help was requested, or required parameters were absent with an
    /// empty argument vector
    Help,

    /// Version was requested
    Version,

    /// One or more binding problems, aggregated from the full pass
    Failure(Vec<ArgonError>),
}

/// Fully resolved, validated parameter values ready for invocation.
///
/// Entries are aligned with the command's parameter declaration order. The
/// `supplied` mask records which parameters were explicitly present in the
/// argument vector, as opposed to filled from defaults.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    entries: Vec<(String, ArgValue)>,
    supplied: u64,
}

impl BoundArgs {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(entries: Vec<(String, ArgValue)>, supplied: u64) -> Self {
        Self { entries, supplied }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by parameter name.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Value at a parameter's declaration index.
    pub fn index(&self, index: usize) -> Option<&ArgValue> {
        self.entries.get(index).map(|(_, v)| v)
    }

    /// Whether the parameter at a declaration index was explicitly
    /// supplied rather than defaulted.
    pub fn was_supplied(&self, index: usize) -> bool {
        index < 64 && self.supplied & (1 << index) != 0
    }

    /// JSON object view of the bound values, for logging and output.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (name, value) in &self.entries {
            map.insert(name.clone(), value.to_json());
        }
        Value::Object(map)
    }
}
