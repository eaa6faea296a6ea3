//! Constraint definitions.
//!
//! A [`Constraint`] is a named, parameterized refinement applied after a base
//! type check succeeds. Constraints are collected in a [`ConstraintSet`],
//! which keeps declaration order and allows the same kind to appear twice.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{json, Number, Value};

use crate::error::SpecError;

/// A numeric bound used by `gt`, `lt`, `gteq` and `lteq`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// An integer bound, compared exactly against integer subjects.
    Int(i64),
    /// A floating point bound.
    Float(f64),
}

impl Bound {
    /// Returns the bound as an `f64`.
    pub fn as_f64(&self) -> f64 {
        match self {
            Bound::Int(i) => *i as f64,
            Bound::Float(f) => *f,
        }
    }

    /// Orders `subject` relative to this bound.
    ///
    /// Returns `None` when the comparison is undefined (a NaN bound).
    pub(crate) fn order(&self, subject: &Number) -> Option<Ordering> {
        match (self, subject.as_i64()) {
            (Bound::Int(bound), Some(n)) => Some(n.cmp(bound)),
            (Bound::Int(_), None) if subject.is_u64() => Some(Ordering::Greater),
            _ => subject.as_f64()?.partial_cmp(&self.as_f64()),
        }
    }

    /// Returns the bound as a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Bound::Int(i) => json!(i),
            Bound::Float(f) => json!(f),
        }
    }

    fn from_value(kind: &str, value: &Value) -> Result<Self, SpecError> {
        if let Some(i) = value.as_i64() {
            return Ok(Bound::Int(i));
        }
        value
            .as_f64()
            .map(Bound::Float)
            .ok_or_else(|| SpecError::constraint(kind, format!("expected a number, got {}", value)))
    }
}

impl From<i64> for Bound {
    fn from(value: i64) -> Self {
        Bound::Int(value)
    }
}

impl From<i32> for Bound {
    fn from(value: i32) -> Self {
        Bound::Int(value.into())
    }
}

impl From<u32> for Bound {
    fn from(value: u32) -> Self {
        Bound::Int(value.into())
    }
}

impl From<f64> for Bound {
    fn from(value: f64) -> Self {
        Bound::Float(value)
    }
}

impl Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Int(i) => write!(f, "{}", i),
            Bound::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A single constraint.
///
/// Each variant's kind name doubles as the error code reported when the
/// constraint is violated.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Minimum length: codepoints for strings, elements for arrays, keys for maps.
    MinLength(usize),
    /// Maximum length, measured like `MinLength`.
    MaxLength(usize),
    /// The string must contain a match of the regex. Anchoring is up to the pattern.
    Format(Regex),
    /// The value must equal one of the listed literals.
    Choices(Vec<Value>),
    /// Strictly greater than.
    Gt(Bound),
    /// Strictly less than.
    Lt(Bound),
    /// Greater than or equal.
    Gteq(Bound),
    /// Less than or equal.
    Lteq(Bound),
    /// Minimum number of array elements.
    MinItems(usize),
    /// Maximum number of array elements.
    MaxItems(usize),
    /// Exact number of map keys.
    Size(usize),
    /// An unrecognised kind, carried along and never evaluated.
    Custom {
        /// The kind tag as written.
        kind: String,
        /// The raw constraint value.
        value: Value,
    },
}

impl Constraint {
    /// Builds a `format` constraint, compiling the pattern.
    pub fn format(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Constraint::Format)
    }

    /// Builds a `choices` constraint from anything convertible to JSON values.
    pub fn choices<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Constraint::Choices(choices.into_iter().map(Into::into).collect())
    }

    /// Returns the kind tag, which is also the error code.
    pub fn kind(&self) -> &str {
        match self {
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Format(_) => "format",
            Constraint::Choices(_) => "choices",
            Constraint::Gt(_) => "gt",
            Constraint::Lt(_) => "lt",
            Constraint::Gteq(_) => "gteq",
            Constraint::Lteq(_) => "lteq",
            Constraint::MinItems(_) => "min_items",
            Constraint::MaxItems(_) => "max_items",
            Constraint::Size(_) => "size",
            Constraint::Custom { kind, .. } => kind,
        }
    }

    /// Returns the constraint's parameter as a JSON value.
    pub fn value(&self) -> Value {
        match self {
            Constraint::MinLength(n)
            | Constraint::MaxLength(n)
            | Constraint::MinItems(n)
            | Constraint::MaxItems(n)
            | Constraint::Size(n) => json!(n),
            Constraint::Format(regex) => json!(regex.as_str()),
            Constraint::Choices(choices) => Value::Array(choices.clone()),
            Constraint::Gt(b) | Constraint::Lt(b) | Constraint::Gteq(b) | Constraint::Lteq(b) => {
                b.to_value()
            }
            Constraint::Custom { value, .. } => value.clone(),
        }
    }

    /// Parses a `(kind, value)` pair as found in descriptors.
    ///
    /// Unknown kinds become [`Constraint::Custom`]. Known kinds with a value
    /// of the wrong shape are a [`SpecError`].
    pub fn from_pair(kind: &str, value: &Value) -> Result<Self, SpecError> {
        let count = || {
            value
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    SpecError::constraint(kind, format!("expected a non-negative integer, got {}", value))
                })
        };

        match kind {
            "min_length" => count().map(Constraint::MinLength),
            "max_length" => count().map(Constraint::MaxLength),
            "min_items" => count().map(Constraint::MinItems),
            "max_items" => count().map(Constraint::MaxItems),
            "size" | "size?" => count().map(Constraint::Size),
            "format" => {
                let pattern = value.as_str().ok_or_else(|| {
                    SpecError::constraint(kind, format!("expected a pattern string, got {}", value))
                })?;
                Constraint::format(pattern).map_err(|source| SpecError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            }
            "choices" => value
                .as_array()
                .map(|choices| Constraint::Choices(choices.clone()))
                .ok_or_else(|| {
                    SpecError::constraint(kind, format!("expected a list, got {}", value))
                }),
            "gt" => Bound::from_value(kind, value).map(Constraint::Gt),
            "lt" => Bound::from_value(kind, value).map(Constraint::Lt),
            "gteq" => Bound::from_value(kind, value).map(Constraint::Gteq),
            "lteq" => Bound::from_value(kind, value).map(Constraint::Lteq),
            _ => Ok(Constraint::Custom {
                kind: kind.to_string(),
                value: value.clone(),
            }),
        }
    }
}

/// Whether `value` equals the `choice` literal. Numbers compare by value, so
/// `1` and `1.0` are the same choice.
pub(crate) fn same_choice(value: &Value, choice: &Value) -> bool {
    match (value, choice) {
        (Value::Number(a), Value::Number(b)) if a.is_f64() || b.is_f64() => {
            a.as_f64() == b.as_f64()
        }
        _ => value == choice,
    }
}

/// An ordered list of constraints plus per-kind message overrides.
///
/// Order is declaration order and duplicates are kept, so two `min_length`
/// entries from a merge are both evaluated.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    entries: Vec<Constraint>,
    messages: IndexMap<String, String>,
}

impl ConstraintSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a constraint.
    pub fn push(&mut self, constraint: Constraint) {
        self.entries.push(constraint);
    }

    /// Sets the message reported when a constraint of `kind` fails.
    pub fn set_message(&mut self, kind: impl Into<String>, message: impl Into<String>) {
        self.messages.insert(kind.into(), message.into());
    }

    /// Returns the override message for `kind`, if any.
    pub fn message_for(&self, kind: &str) -> Option<&str> {
        self.messages.get(kind).map(String::as_str)
    }

    /// Returns the override table.
    pub fn messages(&self) -> &IndexMap<String, String> {
        &self.messages
    }

    /// Iterates over the constraints in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<Constraint> for ConstraintSet {
    fn extend<T: IntoIterator<Item = Constraint>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<T: IntoIterator<Item = Constraint>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            messages: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_orders_integers_exactly() {
        let bound = Bound::Int(i64::MAX - 1);
        assert_eq!(bound.order(&Number::from(i64::MAX)), Some(Ordering::Greater));
        assert_eq!(bound.order(&Number::from(i64::MAX - 1)), Some(Ordering::Equal));
    }

    #[test]
    fn test_bound_mixed_int_and_float() {
        let bound = Bound::Int(10);
        let subject = Number::from_f64(9.5).unwrap();
        assert_eq!(bound.order(&subject), Some(Ordering::Less));

        let bound = Bound::Float(0.5);
        assert_eq!(bound.order(&Number::from(1)), Some(Ordering::Greater));
    }

    #[test]
    fn test_bound_large_unsigned_is_greater() {
        let bound = Bound::Int(i64::MAX);
        assert_eq!(bound.order(&Number::from(u64::MAX)), Some(Ordering::Greater));
    }

    #[test]
    fn test_nan_bound_is_unordered() {
        assert_eq!(Bound::Float(f64::NAN).order(&Number::from(1)), None);
    }

    #[test]
    fn test_from_pair_known_kinds() {
        assert!(matches!(
            Constraint::from_pair("min_length", &json!(3)).unwrap(),
            Constraint::MinLength(3)
        ));
        assert!(matches!(
            Constraint::from_pair("size?", &json!(2)).unwrap(),
            Constraint::Size(2)
        ));
        assert!(matches!(
            Constraint::from_pair("gteq", &json!(0.5)).unwrap(),
            Constraint::Gteq(Bound::Float(_))
        ));
    }

    #[test]
    fn test_from_pair_unknown_kind_is_custom() {
        let constraint = Constraint::from_pair("unique_by_ssn", &json!(true)).unwrap();
        assert_eq!(constraint.kind(), "unique_by_ssn");
        assert_eq!(constraint.value(), json!(true));
    }

    #[test]
    fn test_from_pair_rejects_wrong_shape() {
        let err = Constraint::from_pair("min_length", &json!("three")).unwrap_err();
        assert!(matches!(err, SpecError::InvalidConstraint { .. }));

        let err = Constraint::from_pair("format", &json!("[unclosed")).unwrap_err();
        assert!(matches!(err, SpecError::InvalidPattern { .. }));
    }

    #[test]
    fn test_constraint_set_keeps_duplicates_in_order() {
        let set: ConstraintSet = [Constraint::MinLength(2), Constraint::MinLength(5)]
            .into_iter()
            .collect();
        let kinds: Vec<_> = set.iter().map(Constraint::kind).collect();
        assert_eq!(kinds, vec!["min_length", "min_length"]);
    }
}
