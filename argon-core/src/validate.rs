//! Declarative validation rules for converted argument values.
//!
//! Rules never mutate a value; they accept or reject with a message. Every
//! applicable rule for a parameter runs even after one fails, and the
//! messages are newline-joined into a single aggregate error.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::ArgonError;
use crate::value::ArgValue;

/// A single validation rule attached to a parameter.
#[derive(Clone)]
pub enum ValidationRule {
    /// Numeric bound check; applies to integer and float values
    Range { min: Option<f64>, max: Option<f64> },

    /// The rendered value must match the pattern
    Matches(Regex),

    /// The value must be present and non-empty
    Required,

    /// Arbitrary predicate; returns a message to reject
    Custom(Arc<dyn Fn(&ArgValue) -> Option<String> + Send + Sync>),
}

impl ValidationRule {
    /// Inclusive numeric range.
    pub fn range(min: f64, max: f64) -> Self {
        ValidationRule::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn min(min: f64) -> Self {
        ValidationRule::Range {
            min: Some(min),
            max: None,
        }
    }

    pub fn max(max: f64) -> Self {
        ValidationRule::Range {
            min: None,
            max: Some(max),
        }
    }

    pub fn matches(pattern: Regex) -> Self {
        ValidationRule::Matches(pattern)
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&ArgValue) -> Option<String> + Send + Sync + 'static,
    {
        ValidationRule::Custom(Arc::new(predicate))
    }

    /// Check a value against this rule.
    fn check(&self, value: &ArgValue) -> Option<String> {
        match self {
            ValidationRule::Range { min, max } => {
                // Only numeric values are in range's jurisdiction
                let n = value.as_f64()?;
                if let Some(min) = min {
                    if n < *min {
                        return Some(format!("value {} is below the minimum {}", value.render(), min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Some(format!("value {} is above the maximum {}", value.render(), max));
                    }
                }
                None
            }

            ValidationRule::Matches(pattern) => {
                if pattern.is_match(&value.render()) {
                    None
                } else {
                    Some(format!(
                        "value '{}' does not match pattern '{}'",
                        value.render(),
                        pattern.as_str()
                    ))
                }
            }

            ValidationRule::Required => {
                let empty = match value {
                    ArgValue::Absent => true,
                    ArgValue::String(s) => s.is_empty(),
                    ArgValue::Array(items) => items.is_empty(),
                    _ => false,
                };
                if empty {
                    Some("a value is required".to_string())
                } else {
                    None
                }
            }

            ValidationRule::Custom(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationRule::Range { min, max } => {
                f.debug_struct("Range").field("min", min).field("max", max).finish()
            }
            ValidationRule::Matches(p) => f.debug_tuple("Matches").field(&p.as_str()).finish(),
            ValidationRule::Required => write!(f, "Required"),
            ValidationRule::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Run every rule for a parameter and aggregate the failures.
///
/// Validation does not short-circuit within a parameter: all rules run and
/// their messages are joined into one `ArgonError::Validation`. A parameter
/// with no rules always passes.
pub fn run_rules(param: &str, value: &ArgValue, rules: &[ValidationRule]) -> Option<ArgonError> {
    let messages: Vec<String> = rules.iter().filter_map(|rule| rule.check(value)).collect();

    if messages.is_empty() {
        None
    } else {
        Some(ArgonError::Validation {
            param: param.to_string(),
            message: messages.join("\n"),
        })
    }
}
