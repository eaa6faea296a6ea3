//! Coercion of values toward a primitive kind.
//!
//! Coercion is only consulted after a strict check failed and only when the
//! policy enables it. It is deliberately narrow: a conversion either keeps
//! the value's meaning exactly or it fails. Numeric literals must match the
//! whole string; there is no trimming and no partial parse.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use super::type_name;
use crate::spec::{is_symbol, PrimitiveKind};

static INTEGER_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("integer literal grammar"));

static FLOAT_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?$")
        .expect("float literal grammar")
});

/// The outcome of a coercion attempt.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Coercion {
    /// The value was converted.
    Coerced(Value),
    /// The value already satisfied the kind; nothing to do.
    Unchanged,
    /// No conversion exists; the reason is reported to the caller.
    Failed(String),
}

/// Attempts to convert `value` so that it satisfies `kind`.
pub(crate) fn coerce(kind: &PrimitiveKind, value: &Value) -> Coercion {
    if kind.matches(value) {
        return Coercion::Unchanged;
    }

    match (kind, value) {
        (PrimitiveKind::Integer, Value::String(s)) => integer_from_str(s),
        (PrimitiveKind::Float, Value::String(s)) => float_from_str(s),
        (PrimitiveKind::Float, Value::Number(n)) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(|f| Coercion::Coerced(Value::Number(f)))
            .unwrap_or_else(|| Coercion::Failed(format!("{} is not representable as a float", n))),
        (PrimitiveKind::String, Value::Number(n)) => Coercion::Coerced(Value::String(n.to_string())),
        (PrimitiveKind::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Coercion::Coerced(Value::Bool(true)),
            "false" => Coercion::Coerced(Value::Bool(false)),
            _ => Coercion::Failed(format!("'{}' is not a boolean literal", s)),
        },
        (PrimitiveKind::Atom, Value::String(s)) => match s.strip_prefix(':') {
            Some(symbol) if is_symbol(symbol) => Coercion::Coerced(Value::String(symbol.to_string())),
            _ => Coercion::Failed(format!("'{}' is not a known symbol", s)),
        },
        (PrimitiveKind::Custom(tag), _) => Coercion::Failed(format!("unknown type '{}'", tag)),
        (_, Value::Bool(_)) => Coercion::Failed("booleans are never coerced".to_string()),
        (kind, other) => Coercion::Failed(format!(
            "no coercion from {} to {}",
            type_name(other),
            kind
        )),
    }
}

fn integer_from_str(s: &str) -> Coercion {
    if !INTEGER_LITERAL.is_match(s) {
        return Coercion::Failed(format!("'{}' is not an integer literal", s));
    }
    if let Ok(i) = s.parse::<i64>() {
        return Coercion::Coerced(Value::Number(i.into()));
    }
    match s.parse::<u64>() {
        Ok(u) => Coercion::Coerced(Value::Number(u.into())),
        Err(_) => Coercion::Failed(format!("'{}' is out of integer range", s)),
    }
}

fn float_from_str(s: &str) -> Coercion {
    if !FLOAT_LITERAL.is_match(s) {
        return Coercion::Failed(format!("'{}' is not a float literal", s));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(|n| Coercion::Coerced(Value::Number(n)))
        .unwrap_or_else(|| Coercion::Failed(format!("'{}' is not a finite float", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coerced(kind: PrimitiveKind, value: Value) -> Value {
        match coerce(&kind, &value) {
            Coercion::Coerced(v) => v,
            other => panic!("expected coercion of {} to {}, got {:?}", value, kind, other),
        }
    }

    fn failed(kind: PrimitiveKind, value: Value) -> bool {
        matches!(coerce(&kind, &value), Coercion::Failed(_))
    }

    #[test]
    fn test_string_to_integer() {
        assert_eq!(coerced(PrimitiveKind::Integer, json!("123")), json!(123));
        assert_eq!(coerced(PrimitiveKind::Integer, json!("-7")), json!(-7));
        assert_eq!(
            coerced(PrimitiveKind::Integer, json!("18446744073709551615")),
            json!(u64::MAX)
        );
    }

    #[test]
    fn test_string_to_integer_rejects_partial_and_padded() {
        for input in ["12.5", " 12", "12 ", "1,000", "12abc", "", "0x10", "1e3"] {
            assert!(failed(PrimitiveKind::Integer, json!(input)), "{:?}", input);
        }
        assert!(failed(PrimitiveKind::Integer, json!("99999999999999999999999")));
    }

    #[test]
    fn test_string_to_float() {
        assert_eq!(coerced(PrimitiveKind::Float, json!("1.5")), json!(1.5));
        assert_eq!(coerced(PrimitiveKind::Float, json!("1e3")), json!(1000.0));
        assert_eq!(coerced(PrimitiveKind::Float, json!(".5")), json!(0.5));
        assert_eq!(coerced(PrimitiveKind::Float, json!("2")), json!(2.0));
        for input in ["inf", "NaN", "1.5x", " 1.5", "1e999"] {
            assert!(failed(PrimitiveKind::Float, json!(input)), "{:?}", input);
        }
    }

    #[test]
    fn test_integer_to_float() {
        let value = coerced(PrimitiveKind::Float, json!(3));
        assert!(value.is_f64());
        assert_eq!(value.as_f64(), Some(3.0));
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(coerced(PrimitiveKind::String, json!(42)), json!("42"));
        assert_eq!(coerced(PrimitiveKind::String, json!(2.5)), json!("2.5"));
    }

    #[test]
    fn test_string_to_boolean() {
        assert_eq!(coerced(PrimitiveKind::Boolean, json!("true")), json!(true));
        assert_eq!(coerced(PrimitiveKind::Boolean, json!("false")), json!(false));
        assert!(failed(PrimitiveKind::Boolean, json!("yes")));
        assert!(failed(PrimitiveKind::Boolean, json!("TRUE")));
    }

    #[test]
    fn test_string_to_atom() {
        assert_eq!(coerced(PrimitiveKind::Atom, json!(":active")), json!("active"));
        assert!(failed(PrimitiveKind::Atom, json!("two words")));
        assert!(failed(PrimitiveKind::Atom, json!(":")));
    }

    #[test]
    fn test_unsupported_pairs_fail() {
        assert!(failed(PrimitiveKind::Integer, json!({"a": 1})));
        assert!(failed(PrimitiveKind::Integer, json!([1])));
        assert!(failed(PrimitiveKind::String, json!(true)));
        assert!(failed(PrimitiveKind::Integer, json!(true)));
        assert!(failed(PrimitiveKind::Integer, json!(1.5)));
        assert!(failed(PrimitiveKind::String, json!(null)));
        assert!(failed(PrimitiveKind::Custom("uuid".into()), json!("x")));
    }

    #[test]
    fn test_matching_value_is_unchanged() {
        assert_eq!(coerce(&PrimitiveKind::Integer, &json!(5)), Coercion::Unchanged);
        assert_eq!(coerce(&PrimitiveKind::Any, &json!([1, 2])), Coercion::Unchanged);
    }
}
