//! Constraint evaluators.
//!
//! Each evaluator is a pure check of one [`Constraint`] against a subject
//! that already passed its base type check. A constraint that does not apply
//! to the subject's runtime shape (for example `gt` on a string) passes.

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::SchemaError;
use crate::path::JsonPath;
use crate::spec::{same_choice, Bound, Constraint, ConstraintSet};

/// A failed constraint, before it is placed at a path.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Violation {
    pub code: String,
    pub message: String,
    pub expected: Option<String>,
    pub got: Option<String>,
}

impl Violation {
    fn new(constraint: &Constraint, message: impl Into<String>) -> Self {
        Self {
            code: constraint.kind().to_string(),
            message: message.into(),
            expected: None,
            got: None,
        }
    }

    fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    fn got(mut self, got: impl Into<String>) -> Self {
        self.got = Some(got.into());
        self
    }

    fn at(self, path: &JsonPath) -> SchemaError {
        let mut error = SchemaError::new(path.clone(), self.message).with_code(self.code);
        error.expected = self.expected;
        error.got = self.got;
        error
    }
}

/// Length of a string (codepoints), array (elements) or map (keys), with the
/// unit used in messages.
fn measure(subject: &Value) -> Option<(usize, &'static str)> {
    match subject {
        Value::String(s) => Some((s.chars().count(), "characters")),
        Value::Array(items) => Some((items.len(), "items")),
        Value::Object(map) => Some((map.len(), "keys")),
        _ => None,
    }
}

fn compare(
    constraint: &Constraint,
    bound: &Bound,
    subject: &Value,
    accept: fn(Ordering) -> bool,
    relation: &str,
) -> Result<(), Violation> {
    let Value::Number(n) = subject else {
        return Ok(());
    };
    match bound.order(n) {
        Some(ordering) if accept(ordering) => Ok(()),
        _ => Err(Violation::new(
            constraint,
            format!("must be {} {}, got {}", relation, bound, n),
        )
        .expected(format!("{} {}", relation, bound))
        .got(n.to_string())),
    }
}

/// Evaluates one constraint against a subject.
pub(crate) fn evaluate(constraint: &Constraint, subject: &Value) -> Result<(), Violation> {
    match constraint {
        Constraint::MinLength(min) => match measure(subject) {
            Some((len, unit)) if len < *min => Err(Violation::new(
                constraint,
                format!("length must be at least {}, got {}", min, len),
            )
            .expected(format!("at least {} {}", min, unit))
            .got(format!("{} {}", len, unit))),
            _ => Ok(()),
        },
        Constraint::MaxLength(max) => match measure(subject) {
            Some((len, unit)) if len > *max => Err(Violation::new(
                constraint,
                format!("length must be at most {}, got {}", max, len),
            )
            .expected(format!("at most {} {}", max, unit))
            .got(format!("{} {}", len, unit))),
            _ => Ok(()),
        },
        Constraint::Format(regex) => match subject {
            Value::String(s) if !regex.is_match(s) => Err(Violation::new(
                constraint,
                format!("must match format '{}'", regex.as_str()),
            )
            .expected(format!("string matching '{}'", regex.as_str()))
            .got(format!("\"{}\"", s))),
            _ => Ok(()),
        },
        Constraint::Choices(choices) if choices.is_empty() => Err(Violation::new(
            constraint,
            "no value is allowed (choices is empty)",
        )
        .expected("one of []")
        .got(subject.to_string())),
        Constraint::Choices(choices) => {
            if choices.iter().any(|choice| same_choice(subject, choice)) {
                Ok(())
            } else {
                let listed = choices
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(Violation::new(constraint, format!("must be one of [{}]", listed))
                    .expected(format!("one of [{}]", listed))
                    .got(subject.to_string()))
            }
        }
        Constraint::Gt(bound) => compare(constraint, bound, subject, Ordering::is_gt, "greater than"),
        Constraint::Lt(bound) => compare(constraint, bound, subject, Ordering::is_lt, "less than"),
        Constraint::Gteq(bound) => compare(constraint, bound, subject, Ordering::is_ge, "at least"),
        Constraint::Lteq(bound) => compare(constraint, bound, subject, Ordering::is_le, "at most"),
        Constraint::MinItems(min) => match subject {
            Value::Array(items) if items.len() < *min => Err(Violation::new(
                constraint,
                format!("must have at least {} items, got {}", min, items.len()),
            )
            .expected(format!("at least {} items", min))
            .got(format!("{} items", items.len()))),
            _ => Ok(()),
        },
        Constraint::MaxItems(max) => match subject {
            Value::Array(items) if items.len() > *max => Err(Violation::new(
                constraint,
                format!("must have at most {} items, got {}", max, items.len()),
            )
            .expected(format!("at most {} items", max))
            .got(format!("{} items", items.len()))),
            _ => Ok(()),
        },
        Constraint::Size(size) => match subject {
            Value::Object(map) if map.len() != *size => Err(Violation::new(
                constraint,
                format!("must have exactly {} keys, got {}", size, map.len()),
            )
            .expected(format!("{} keys", size))
            .got(format!("{} keys", map.len()))),
            _ => Ok(()),
        },
        Constraint::Custom { .. } => Ok(()),
    }
}

/// Evaluates every constraint in the set, in order, and returns all
/// violations as errors at `path`. Override messages replace the default
/// message; the code always stays the constraint kind.
pub(crate) fn apply(set: &ConstraintSet, subject: &Value, path: &JsonPath) -> Vec<SchemaError> {
    set.iter()
        .filter_map(|constraint| evaluate(constraint, subject).err())
        .map(|mut violation| {
            if let Some(message) = set.message_for(&violation.code) {
                violation.message = message.to_string();
            }
            violation.at(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn code(constraint: Constraint, subject: Value) -> Option<String> {
        evaluate(&constraint, &subject).err().map(|v| v.code)
    }

    #[test]
    fn test_length_counts_codepoints() {
        assert_eq!(code(Constraint::MaxLength(3), json!("héé")), None);
        assert_eq!(
            code(Constraint::MaxLength(2), json!("héé")),
            Some("max_length".to_string())
        );
    }

    #[test]
    fn test_length_applies_to_arrays_and_maps() {
        assert!(code(Constraint::MinLength(2), json!([1])).is_some());
        assert!(code(Constraint::MinLength(2), json!({"a": 1})).is_some());
        assert!(code(Constraint::MaxLength(1), json!({"a": 1})).is_none());
    }

    #[test]
    fn test_inapplicable_constraints_pass() {
        assert!(code(Constraint::MinLength(5), json!(3)).is_none());
        assert!(code(Constraint::Gt(Bound::Int(10)), json!("abc")).is_none());
        assert!(code(Constraint::format("^x$").unwrap(), json!(12)).is_none());
        assert!(code(Constraint::Size(1), json!([1, 2])).is_none());
        assert!(code(Constraint::MinItems(3), json!("ab")).is_none());
    }

    #[test]
    fn test_format_is_a_search() {
        let unanchored = Constraint::format("[0-9]").unwrap();
        assert!(code(unanchored, json!("abc1")).is_none());

        let anchored = Constraint::format("^[0-9]+$").unwrap();
        assert_eq!(code(anchored, json!("abc1")), Some("format".to_string()));
    }

    #[test]
    fn test_choices() {
        let choices = Constraint::choices(["a", "b"]);
        assert!(code(choices.clone(), json!("a")).is_none());
        assert_eq!(code(choices, json!("c")), Some("choices".to_string()));
    }

    #[test]
    fn test_choices_compare_numbers_by_value() {
        let choices = Constraint::choices([1, 2]);
        assert!(code(choices.clone(), json!(1.0)).is_none());
        assert!(code(choices.clone(), json!(2)).is_none());
        assert_eq!(code(choices.clone(), json!(1.5)), Some("choices".to_string()));
        assert_eq!(code(choices, json!("1")), Some("choices".to_string()));
    }

    #[test]
    fn test_empty_choices_always_fails() {
        let empty = Constraint::Choices(Vec::new());
        for subject in [json!(null), json!(1), json!("x"), json!([])] {
            assert!(code(empty.clone(), subject).is_some());
        }
    }

    #[test]
    fn test_numeric_boundaries() {
        assert!(code(Constraint::Gteq(Bound::Int(5)), json!(5)).is_none());
        assert!(code(Constraint::Lteq(Bound::Int(5)), json!(5)).is_none());
        assert!(code(Constraint::Gt(Bound::Int(5)), json!(5)).is_some());
        assert!(code(Constraint::Lt(Bound::Int(5)), json!(5)).is_some());
        assert!(code(Constraint::Gt(Bound::Float(0.5)), json!(1)).is_none());
        assert!(code(Constraint::Lt(Bound::Int(1)), json!(0.5)).is_none());
    }

    #[test]
    fn test_custom_constraint_ignored() {
        let custom = Constraint::Custom {
            kind: "luhn".into(),
            value: json!(true),
        };
        assert!(code(custom, json!("4111")).is_none());
    }

    #[test]
    fn test_apply_keeps_order_and_overrides_message() {
        let mut set: ConstraintSet = [
            Constraint::format("^[0-9]+$").unwrap(),
            Constraint::MinLength(5),
        ]
        .into_iter()
        .collect();
        set.set_message("min_length", "too short");

        let errors = apply(&set, &json!("ab"), &JsonPath::root().push_field("pin"));
        let codes: Vec<_> = errors.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["format", "min_length"]);
        assert_eq!(errors[1].message, "too short");
        assert_eq!(errors[1].path.to_string(), "pin");
    }

    #[test]
    fn test_contradictory_bounds_are_legal() {
        let set: ConstraintSet = [Constraint::Gt(Bound::Int(10)), Constraint::Lt(Bound::Int(5))]
            .into_iter()
            .collect();
        assert_eq!(apply(&set, &json!(7), &JsonPath::root()).len(), 2);
    }
}
