//! Typed argument values and token conversion.
//!
//! This module converts raw command-line tokens into typed values according
//! to a parameter's declared type tag. Scalars parse a single token,
//! collections accept either a delimited list or a JSON array literal, and
//! rest collectors sweep up every remaining token.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{ArgonError, Result};

/// Default delimiter for list-valued tokens.
pub const LIST_DELIMITER: char = ',';

/// Declared type of a command parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTag {
    Integer,
    Float,
    Boolean,
    String,

    /// One of a fixed set of allowed spellings, matched case-insensitively
    Enum(Vec<String>),

    /// Ordered collection of the element type
    Array(Box<TypeTag>),

    /// Present-or-absent wrapper around the element type
    Optional(Box<TypeTag>),

    /// Resolved from the service locator, never from tokens.
    /// Carries the service's type name for diagnostics.
    Service(&'static str),
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Integer => write!(f, "int"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Boolean => write!(f, "bool"),
            TypeTag::String => write!(f, "string"),
            TypeTag::Enum(allowed) => write!(f, "enum({})", allowed.join("|")),
            TypeTag::Array(elem) => write!(f, "list<{}>", elem),
            TypeTag::Optional(elem) => write!(f, "optional<{}>", elem),
            TypeTag::Service(name) => write!(f, "service<{}>", name),
        }
    }
}

/// A converted, strongly typed argument value.
#[derive(Clone)]
pub enum ArgValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Array(Vec<ArgValue>),

    /// An optional parameter that was never supplied
    Absent,

    /// A dependency-injected service handle
    Service(Arc<dyn Any + Send + Sync>),
}

impl ArgValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Float(v) => Some(*v),
            ArgValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ArgValue::Absent)
    }

    /// Downcast a service handle to its concrete type.
    pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            ArgValue::Service(handle) => Arc::clone(handle).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Render the value back to its canonical textual form.
    ///
    /// Re-parsing the rendered text under the same type tag yields an
    /// equal value (format/parse/format idempotence).
    pub fn render(&self) -> String {
        match self {
            ArgValue::Integer(v) => v.to_string(),
            ArgValue::Float(v) => v.to_string(),
            ArgValue::Boolean(v) => v.to_string(),
            ArgValue::String(v) => v.clone(),
            ArgValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.render()).collect();
                parts.join(",")
            }
            ArgValue::Absent => String::new(),
            ArgValue::Service(_) => "<service>".to_string(),
        }
    }

    /// Convert to a JSON value for logging and structured output.
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Integer(v) => Value::from(*v),
            ArgValue::Float(v) => Value::from(*v),
            ArgValue::Boolean(v) => Value::from(*v),
            ArgValue::String(v) => Value::from(v.clone()),
            ArgValue::Array(items) => Value::Array(items.iter().map(|i| i.to_json()).collect()),
            ArgValue::Absent => Value::Null,
            ArgValue::Service(_) => Value::from("<service>"),
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Integer(v) => write!(f, "Integer({})", v),
            ArgValue::Float(v) => write!(f, "Float({})", v),
            ArgValue::Boolean(v) => write!(f, "Boolean({})", v),
            ArgValue::String(v) => write!(f, "String({:?})", v),
            ArgValue::Array(items) => f.debug_tuple("Array").field(items).finish(),
            ArgValue::Absent => write!(f, "Absent"),
            ArgValue::Service(_) => write!(f, "Service(..)"),
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArgValue::Integer(a), ArgValue::Integer(b)) => a == b,
            (ArgValue::Float(a), ArgValue::Float(b)) => a == b,
            (ArgValue::Boolean(a), ArgValue::Boolean(b)) => a == b,
            (ArgValue::String(a), ArgValue::String(b)) => a == b,
            (ArgValue::Array(a), ArgValue::Array(b)) => a == b,
            (ArgValue::Absent, ArgValue::Absent) => true,
            (ArgValue::Service(a), ArgValue::Service(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Convert a single raw token into a typed value.
pub fn convert(param: &str, raw: &str, tag: &TypeTag) -> Result<ArgValue> {
    match tag {
        TypeTag::Integer | TypeTag::Float | TypeTag::Boolean | TypeTag::String | TypeTag::Enum(_) => {
            convert_scalar(param, raw, tag)
        }
        TypeTag::Array(elem) => {
            // A leading '[' selects the JSON literal grammar; anything else
            // is a delimited list.
            if raw.starts_with('[') {
                convert_json_array(param, raw, elem)
            } else {
                convert_delimited(param, raw, elem)
            }
        }
        TypeTag::Optional(elem) => convert(param, raw, elem),
        TypeTag::Service(name) => Err(ArgonError::Config(format!(
            "parameter '{}' is an injected service ({}) and takes no value",
            param, name
        ))),
    }
}

/// Convert every remaining token for a trailing rest collector.
///
/// Each token is converted independently with the element type's scalar
/// grammar; the result preserves token order.
pub fn convert_rest(param: &str, tokens: &[String], elem: &TypeTag) -> Result<ArgValue> {
    let mut items = Vec::with_capacity(tokens.len());
    for token in tokens {
        items.push(convert_scalar(param, token, elem)?);
    }
    Ok(ArgValue::Array(items))
}

fn convert_scalar(param: &str, raw: &str, tag: &TypeTag) -> Result<ArgValue> {
    match tag {
        TypeTag::Integer => raw
            .parse::<i64>()
            .map(ArgValue::Integer)
            .map_err(|_| invalid(param, raw, "an integer")),

        TypeTag::Float => raw
            .parse::<f64>()
            .map(ArgValue::Float)
            .map_err(|_| invalid(param, raw, "a number")),

        TypeTag::Boolean => parse_bool(raw)
            .map(ArgValue::Boolean)
            .ok_or_else(|| invalid(param, raw, "a boolean")),

        TypeTag::String => Ok(ArgValue::String(raw.to_string())),

        TypeTag::Enum(allowed) => allowed
            .iter()
            .find(|a| a.eq_ignore_ascii_case(raw))
            .map(|a| ArgValue::String(a.clone()))
            .ok_or_else(|| ArgonError::Conversion {
                param: param.to_string(),
                reason: format!("expected one of [{}], got: {}", allowed.join(", "), raw),
            }),

        // Nested composites only appear inside array elements
        other => Err(ArgonError::Conversion {
            param: param.to_string(),
            reason: format!("unsupported element type {}", other),
        }),
    }
}

/// Parse a boolean token.
///
/// Accepts the usual CLI spellings in either case.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Convert a delimited list token, one segment at a time.
///
/// Segments are borrowed slices of the original token; nothing is copied
/// until a segment converts into its element value, so the allocation is
/// bounded by the result. A trailing delimiter yields an empty final
/// segment, which fails unless the element type accepts empty input.
fn convert_delimited(param: &str, raw: &str, elem: &TypeTag) -> Result<ArgValue> {
    let mut items = Vec::new();
    for segment in raw.split(LIST_DELIMITER) {
        items.push(convert_scalar(param, segment, elem)?);
    }
    Ok(ArgValue::Array(items))
}

/// Convert a JSON array literal token.
fn convert_json_array(param: &str, raw: &str, elem: &TypeTag) -> Result<ArgValue> {
    let parsed: Value = serde_json::from_str(raw).map_err(|e| ArgonError::Conversion {
        param: param.to_string(),
        reason: format!("malformed array literal: {}", e),
    })?;

    let Value::Array(entries) = parsed else {
        return Err(invalid(param, raw, "a JSON array"));
    };

    let mut items = Vec::with_capacity(entries.len());
    for entry in &entries {
        items.push(convert_json_value(param, entry, elem)?);
    }
    Ok(ArgValue::Array(items))
}

/// Convert one JSON value to the element type.
fn convert_json_value(param: &str, entry: &Value, elem: &TypeTag) -> Result<ArgValue> {
    // String entries go through the normal scalar grammar so that
    // ["1","2"] and [1,2] bind identically.
    if let Value::String(s) = entry {
        return convert_scalar(param, s, elem);
    }

    match elem {
        TypeTag::Integer => entry
            .as_i64()
            .map(ArgValue::Integer)
            .ok_or_else(|| invalid(param, &entry.to_string(), "an integer")),

        TypeTag::Float => entry
            .as_f64()
            .map(ArgValue::Float)
            .ok_or_else(|| invalid(param, &entry.to_string(), "a number")),

        TypeTag::Boolean => entry
            .as_bool()
            .map(ArgValue::Boolean)
            .ok_or_else(|| invalid(param, &entry.to_string(), "a boolean")),

        TypeTag::Array(inner) => {
            let Value::Array(entries) = entry else {
                return Err(invalid(param, &entry.to_string(), "a nested array"));
            };
            let mut items = Vec::with_capacity(entries.len());
            for e in entries {
                items.push(convert_json_value(param, e, inner)?);
            }
            Ok(ArgValue::Array(items))
        }

        other => Err(ArgonError::Conversion {
            param: param.to_string(),
            reason: format!("cannot read {} as {}", entry, other),
        }),
    }
}

fn invalid(param: &str, raw: &str, expected: &str) -> ArgonError {
    ArgonError::Conversion {
        param: param.to_string(),
        reason: format!("expected {}, got: {}", expected, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_grammars() {
        assert_eq!(
            convert("n", "42", &TypeTag::Integer).unwrap(),
            ArgValue::Integer(42)
        );
        assert_eq!(
            convert("n", "-7", &TypeTag::Integer).unwrap(),
            ArgValue::Integer(-7)
        );
        assert_eq!(
            convert("f", "2.5", &TypeTag::Float).unwrap(),
            ArgValue::Float(2.5)
        );
        assert_eq!(
            convert("b", "TRUE", &TypeTag::Boolean).unwrap(),
            ArgValue::Boolean(true)
        );
        assert_eq!(
            convert("b", "off", &TypeTag::Boolean).unwrap(),
            ArgValue::Boolean(false)
        );
        assert_eq!(
            convert("s", "hello", &TypeTag::String).unwrap(),
            ArgValue::String("hello".into())
        );
    }

    #[test]
    fn scalar_failures_name_the_parameter() {
        let err = convert("count", "abc", &TypeTag::Integer).unwrap_err();
        assert!(matches!(err, ArgonError::Conversion { ref param, .. } if param == "count"));
    }

    #[test]
    fn enum_matches_case_insensitively() {
        let tag = TypeTag::Enum(vec!["fast".into(), "slow".into()]);
        assert_eq!(
            convert("mode", "FAST", &tag).unwrap(),
            ArgValue::String("fast".into())
        );
        assert!(convert("mode", "medium", &tag).is_err());
    }

    #[test]
    fn delimited_list() {
        let tag = TypeTag::Array(Box::new(TypeTag::Integer));
        assert_eq!(
            convert("xs", "1,2,3", &tag).unwrap(),
            ArgValue::Array(vec![
                ArgValue::Integer(1),
                ArgValue::Integer(2),
                ArgValue::Integer(3),
            ])
        );
    }

    #[test]
    fn json_array_literal_binds_like_delimited() {
        let tag = TypeTag::Array(Box::new(TypeTag::Integer));
        assert_eq!(
            convert("xs", "[1,2,3]", &tag).unwrap(),
            convert("xs", "1,2,3", &tag).unwrap()
        );
        // String entries go through the scalar grammar
        assert_eq!(
            convert("xs", "[\"4\",5]", &tag).unwrap(),
            ArgValue::Array(vec![ArgValue::Integer(4), ArgValue::Integer(5)])
        );
    }

    #[test]
    fn bad_element_fails_with_parameter_name() {
        let tag = TypeTag::Array(Box::new(TypeTag::Integer));
        let err = convert("xs", "1,2,x", &tag).unwrap_err();
        assert!(matches!(err, ArgonError::Conversion { ref param, .. } if param == "xs"));
    }

    #[test]
    fn trailing_delimiter_fails_for_integers_but_not_strings() {
        let ints = TypeTag::Array(Box::new(TypeTag::Integer));
        assert!(convert("xs", "1,2,", &ints).is_err());

        let strings = TypeTag::Array(Box::new(TypeTag::String));
        assert_eq!(
            convert("xs", "a,b,", &strings).unwrap(),
            ArgValue::Array(vec![
                ArgValue::String("a".into()),
                ArgValue::String("b".into()),
                ArgValue::String("".into()),
            ])
        );
    }

    #[test]
    fn rest_collection_preserves_order() {
        let tokens: Vec<String> = vec!["3".into(), "1".into(), "2".into()];
        assert_eq!(
            convert_rest("rest", &tokens, &TypeTag::Integer).unwrap(),
            ArgValue::Array(vec![
                ArgValue::Integer(3),
                ArgValue::Integer(1),
                ArgValue::Integer(2),
            ])
        );
    }

    #[test]
    fn render_round_trips() {
        let cases = [
            (ArgValue::Integer(42), TypeTag::Integer),
            (ArgValue::Float(2.5), TypeTag::Float),
            (ArgValue::Boolean(true), TypeTag::Boolean),
            (ArgValue::String("hi".into()), TypeTag::String),
            (
                ArgValue::Array(vec![ArgValue::Integer(1), ArgValue::Integer(2)]),
                TypeTag::Array(Box::new(TypeTag::Integer)),
            ),
        ];
        for (value, tag) in cases {
            let reparsed = convert("p", &value.render(), &tag).unwrap();
            assert_eq!(reparsed, value);
            assert_eq!(reparsed.render(), value.render());
        }
    }
}
