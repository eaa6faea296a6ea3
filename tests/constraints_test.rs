//! Integration tests for constraint evaluation.

use schemata::{validate, Constraint, Policy, SchemaErrors, TypeSpec};
use serde_json::{json, Value};
use stillwater::Validation;

fn check(spec: &TypeSpec, value: Value) -> Validation<Value, SchemaErrors> {
    validate(spec, &value, &Policy::default())
}

fn codes(spec: &TypeSpec, value: Value) -> Vec<String> {
    match check(spec, value) {
        Validation::Success(_) => Vec::new(),
        Validation::Failure(errors) => errors.iter().map(|e| e.code.clone()).collect(),
    }
}

#[test]
fn test_string_length_counts_codepoints() {
    let spec = TypeSpec::string().min_length(2).max_length(3);
    assert!(codes(&spec, json!("日本")).is_empty());
    assert!(codes(&spec, json!("ab")).is_empty());
    assert_eq!(codes(&spec, json!("a")), vec!["min_length"]);
    assert_eq!(codes(&spec, json!("abcd")), vec!["max_length"]);
}

#[test]
fn test_length_boundaries_are_inclusive() {
    let spec = TypeSpec::array(TypeSpec::any()).min_length(1).max_length(2);
    assert!(codes(&spec, json!([1])).is_empty());
    assert!(codes(&spec, json!([1, 2])).is_empty());
    assert_eq!(codes(&spec, json!([])), vec!["min_length"]);
}

#[test]
fn test_numeric_boundaries() {
    assert!(check(&TypeSpec::integer().gteq(5), json!(5)).is_success());
    assert!(check(&TypeSpec::integer().lteq(5), json!(5)).is_success());
    assert!(check(&TypeSpec::integer().gt(5), json!(5)).is_failure());
    assert!(check(&TypeSpec::integer().lt(5), json!(5)).is_failure());

    assert!(check(&TypeSpec::float().gteq(0.5), json!(0.5)).is_success());
    assert!(check(&TypeSpec::float().gt(0.5), json!(0.5)).is_failure());
}

#[test]
fn test_mixed_integer_and_float_bounds() {
    assert!(check(&TypeSpec::float().gt(1), json!(1.5)).is_success());
    assert!(check(&TypeSpec::integer().lt(2.5), json!(2)).is_success());
    assert!(check(&TypeSpec::integer().lt(2.5), json!(3)).is_failure());
}

#[test]
fn test_all_constraints_reported_in_declaration_order() {
    let spec = TypeSpec::integer().lt(0).gt(10).lteq(-5);
    assert_eq!(codes(&spec, json!(3)), vec!["lt", "gt", "lteq"]);

    let spec = TypeSpec::integer().lteq(-5).gt(10).lt(0);
    assert_eq!(codes(&spec, json!(3)), vec!["lteq", "gt", "lt"]);
}

#[test]
fn test_contradictory_constraints_always_fail() {
    let spec = TypeSpec::integer().gt(10).lt(5);
    for n in [0, 7, 12] {
        assert!(check(&spec, json!(n)).is_failure());
    }
}

#[test]
fn test_format_search_and_anchoring() {
    let unanchored = TypeSpec::string().format("[0-9]{3}").unwrap();
    assert!(check(&unanchored, json!("abc123def")).is_success());

    let anchored = TypeSpec::string().format("^[0-9]{3}$").unwrap();
    assert_eq!(codes(&anchored, json!("abc123def")), vec!["format"]);
}

#[test]
fn test_choices() {
    let spec = TypeSpec::integer().choices([1, 2, 3]);
    assert!(check(&spec, json!(2)).is_success());
    assert_eq!(codes(&spec, json!(4)), vec!["choices"]);
}

#[test]
fn test_float_choices_match_integer_literals() {
    let spec = TypeSpec::float().choices([1, 2]);
    assert!(check(&spec, json!(1.0)).is_success());
    assert!(check(&spec, json!(2.0)).is_success());
    assert_eq!(codes(&spec, json!(1.5)), vec!["choices"]);
}

#[test]
fn test_empty_choices_reject_everything() {
    let spec = TypeSpec::any().constraint(Constraint::Choices(Vec::new()));
    for value in [json!(null), json!(0), json!(""), json!([]), json!({})] {
        assert_eq!(codes(&spec, value), vec!["choices"]);
    }
}

#[test]
fn test_enumeration() {
    let spec = TypeSpec::enumeration(["draft", "published"]);
    assert!(check(&spec, json!("draft")).is_success());
    assert_eq!(codes(&spec, json!("archived")), vec!["choices"]);
    assert_eq!(codes(&spec, json!("not a symbol")), vec!["type"]);
}

#[test]
fn test_size_applies_to_maps_only() {
    let spec = TypeSpec::map(TypeSpec::string(), TypeSpec::integer()).size(2);
    assert!(check(&spec, json!({"a": 1, "b": 2})).is_success());
    assert_eq!(codes(&spec, json!({"a": 1})), vec!["size"]);
}

#[test]
fn test_inapplicable_constraints_pass() {
    let spec = TypeSpec::any().gt(10).min_items(3).size(4);
    assert!(check(&spec, json!("text")).is_success());
    assert!(check(&spec, json!(true)).is_success());
}

#[test]
fn test_custom_message_keeps_code() {
    let spec = TypeSpec::string()
        .format("@")
        .unwrap()
        .message("format", "must be an email address");
    let errors = check(&spec, json!("nobody")).into_result().unwrap_err();
    assert_eq!(errors.first().code, "format");
    assert_eq!(errors.first().message, "must be an email address");
}

#[test]
fn test_unknown_constraint_kind_is_ignored() {
    let spec = TypeSpec::string().constraint(Constraint::Custom {
        kind: "checksum".to_string(),
        value: json!("luhn"),
    });
    assert!(check(&spec, json!("1234")).is_success());
}

#[test]
fn test_nested_constraints_accumulate() {
    let spec = TypeSpec::string().min_length(3).with_constraints([Constraint::MinLength(5)]);
    assert_eq!(codes(&spec, json!("ab")), vec!["min_length", "min_length"]);
}
