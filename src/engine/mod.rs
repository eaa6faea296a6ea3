//! The core validator.
//!
//! [`validate`] walks a [`TypeSpec`] alongside a value and returns either the
//! validated (possibly coerced) value or every error found. Independent
//! branches (array elements, map entries, tuple slots) are always all
//! visited; within a single node the base type check runs before any
//! constraint, and a failed base check suppresses the constraints.
//!
//! # Example
//!
//! ```rust
//! use schemata::{validate, Policy, TypeSpec};
//! use serde_json::json;
//!
//! let spec = TypeSpec::array(TypeSpec::map(TypeSpec::string(), TypeSpec::integer()));
//!
//! let errors = validate(&spec, &json!([{"a": 1}, {"b": "x"}]), &Policy::default())
//!     .into_result()
//!     .unwrap_err();
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors.first().code, "type");
//! assert_eq!(errors.first().path.to_string(), "[1].b");
//! ```

mod coerce;
mod constraints;

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::{Map, Value};
use stillwater::Validation;

use crate::error::{SchemaError, SchemaErrors};
use crate::path::JsonPath;
use crate::policy::Policy;
use crate::spec::{ConstraintSet, PrimitiveKind, TypeSpec};
use crate::validation::{Definition, ReferenceResolver, ValidationContext};
use crate::ValidationResult;

use coerce::{coerce, Coercion};

/// Validates `value` against `spec` under `policy`.
///
/// References fail with a `reference` error because no resolver is
/// attached; use a [`Validator`] with a resolver (or a
/// [`SchemaRegistry`](crate::SchemaRegistry)) for specs that contain them.
pub fn validate(spec: &TypeSpec, value: &Value, policy: &Policy) -> ValidationResult<Value> {
    Validator::new(*policy).validate(spec, value)
}

/// Checks `value` against `spec` without coercion and returns its canonical
/// form. This is the output direction: a value produced by the application
/// must already have the right types.
pub fn dump(spec: &TypeSpec, value: &Value) -> ValidationResult<Value> {
    Validator::new(Policy::default()).dump(spec, value)
}

/// A reusable validator: a policy plus an optional reference resolver.
///
/// # Example
///
/// ```rust
/// use schemata::{Policy, TypeSpec, Validator};
/// use serde_json::json;
///
/// let validator = Validator::new(Policy::default().with_coerce(true));
/// let spec = TypeSpec::integer().gteq(0);
///
/// let results = validator.validate_batch(&spec, &[json!("1"), json!(-1), json!(2)]);
/// assert!(results[0].is_success());
/// assert!(results[1].is_failure());
/// assert!(results[2].is_success());
/// ```
#[derive(Clone)]
pub struct Validator {
    context: ValidationContext,
}

impl Validator {
    pub fn new(policy: Policy) -> Self {
        Self {
            context: ValidationContext::new(policy),
        }
    }

    /// Attaches the resolver used for [`TypeSpec::Reference`] nodes.
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.context = self.context.with_resolver(resolver);
        self
    }

    pub fn policy(&self) -> &Policy {
        self.context.policy()
    }

    /// Validates a value at the root path.
    pub fn validate(&self, spec: &TypeSpec, value: &Value) -> ValidationResult<Value> {
        let result = self.validate_at(spec, value, &JsonPath::root());
        match &result {
            Validation::Success(_) => tracing::trace!(shape = %spec.shape_name(), "validation succeeded"),
            Validation::Failure(errors) => tracing::debug!(
                shape = %spec.shape_name(),
                errors = errors.len(),
                "validation failed"
            ),
        }
        result
    }

    /// Validates a value that sits at `path` inside a larger document, so
    /// error paths are reported relative to the document root.
    pub fn validate_at(
        &self,
        spec: &TypeSpec,
        value: &Value,
        path: &JsonPath,
    ) -> ValidationResult<Value> {
        validate_node(spec, value, path, &self.context)
    }

    /// Validates many values in parallel. Results are in input order.
    pub fn validate_batch(&self, spec: &TypeSpec, values: &[Value]) -> Vec<ValidationResult<Value>> {
        values.par_iter().map(|value| self.validate(spec, value)).collect()
    }

    /// Like [`dump`], with this validator's resolver.
    pub fn dump(&self, spec: &TypeSpec, value: &Value) -> ValidationResult<Value> {
        let strict = self
            .context
            .with_policy(self.context.policy().with_coerce(false));
        validate_node(spec, value, &JsonPath::root(), &strict)
    }
}

/// Validates one node of the spec tree.
pub(crate) fn validate_node(
    spec: &TypeSpec,
    value: &Value,
    path: &JsonPath,
    context: &ValidationContext,
) -> ValidationResult<Value> {
    match spec {
        TypeSpec::Primitive(kind) => validate_primitive(kind, value, path, context.policy()),
        TypeSpec::Array(element) => validate_array(element, value, path, context),
        TypeSpec::Map { key, value: item } => validate_map(key, item, value, path, context),
        TypeSpec::Union(members) => validate_union(members, value, path, context),
        TypeSpec::Tuple(elements) => validate_tuple(elements, value, path, context),
        TypeSpec::Reference(id) => match context.resolver() {
            Some(resolver) => resolver.validate_reference(id, value, path, context),
            None => Validation::Failure(SchemaErrors::single(
                SchemaError::new(
                    path.clone(),
                    format!("cannot resolve reference '{}' without a resolver", id),
                )
                .with_code("reference")
                .with_expected(id.clone()),
            )),
        },
        TypeSpec::WithConstraints { base, constraints } => {
            validate_constrained(base, constraints, value, path, context)
        }
    }
}

/// Turns accumulated errors into a result.
pub(crate) fn finish<T>(value: T, errors: Vec<SchemaError>) -> ValidationResult<T> {
    match SchemaErrors::from_vec(errors) {
        None => Validation::Success(value),
        Some(errors) => Validation::Failure(errors),
    }
}

/// Returns the JSON type name for a value.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

pub(crate) fn type_error(path: &JsonPath, expected: &str, value: &Value) -> SchemaError {
    SchemaError::new(
        path.clone(),
        format!("expected {}, got {}", expected, type_name(value)),
    )
    .with_code("type")
    .with_expected(expected.to_string())
    .with_got(type_name(value))
}

fn validate_primitive(
    kind: &PrimitiveKind,
    value: &Value,
    path: &JsonPath,
    policy: &Policy,
) -> ValidationResult<Value> {
    if kind.matches(value) {
        return Validation::Success(value.clone());
    }

    if let PrimitiveKind::Custom(tag) = kind {
        return Validation::Failure(SchemaErrors::single(
            SchemaError::new(path.clone(), format!("unknown type '{}'", tag))
                .with_code("type")
                .with_expected(tag.clone())
                .with_got(type_name(value)),
        ));
    }

    if !policy.coerce {
        return Validation::Failure(SchemaErrors::single(type_error(path, kind.name(), value)));
    }

    match coerce(kind, value) {
        Coercion::Coerced(coerced) if kind.matches(&coerced) => {
            tracing::trace!(%path, kind = kind.name(), from = type_name(value), "coerced value");
            Validation::Success(coerced)
        }
        Coercion::Failed(reason) => {
            tracing::trace!(%path, kind = kind.name(), %reason, "coercion failed");
            let mut error = type_error(path, kind.name(), value);
            error.message = format!("{}: {}", error.message, reason);
            Validation::Failure(SchemaErrors::single(error))
        }
        Coercion::Coerced(_) | Coercion::Unchanged => {
            Validation::Failure(SchemaErrors::single(type_error(path, kind.name(), value)))
        }
    }
}

fn validate_constrained(
    base: &TypeSpec,
    constraints: &ConstraintSet,
    value: &Value,
    path: &JsonPath,
    context: &ValidationContext,
) -> ValidationResult<Value> {
    match validate_node(base, value, path, context) {
        Validation::Success(validated) => {
            let errors = constraints::apply(constraints, &validated, path);
            finish(validated, errors)
        }
        failure => failure,
    }
}

fn validate_array(
    element: &TypeSpec,
    value: &Value,
    path: &JsonPath,
    context: &ValidationContext,
) -> ValidationResult<Value> {
    let Some(items) = value.as_array() else {
        return Validation::Failure(SchemaErrors::single(type_error(path, "array", value)));
    };

    let mut errors = Vec::new();
    let mut validated = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match validate_node(element, item, &path.push_index(index), context) {
            Validation::Success(v) => validated.push(v),
            Validation::Failure(e) => errors.extend(e),
        }
    }

    finish(Value::Array(validated), errors)
}

fn validate_map(
    key_spec: &TypeSpec,
    value_spec: &TypeSpec,
    value: &Value,
    path: &JsonPath,
    context: &ValidationContext,
) -> ValidationResult<Value> {
    let Some(entries) = value.as_object() else {
        return Validation::Failure(SchemaErrors::single(type_error(path, "map", value)));
    };

    let mut errors = Vec::new();
    let mut validated = Map::new();
    // External key -> the input key that produced it.
    let mut emitted: HashMap<String, &String> = HashMap::new();
    for (raw_key, raw_value) in entries {
        let entry_path = path.push_key(raw_key.clone());
        let key = validate_node(key_spec, &Value::String(raw_key.clone()), &entry_path, context);
        let item = validate_node(value_spec, raw_value, &entry_path, context);

        match (key, item) {
            (Validation::Success(k), Validation::Success(v)) => {
                let external = external_key(k);
                match emitted.get(&external) {
                    Some(earlier) => errors.push(
                        SchemaError::new(
                            entry_path,
                            format!("key '{}' collides with earlier key '{}'", raw_key, earlier),
                        )
                        .with_code("duplicate_key")
                        .with_expected(format!("a key distinct from '{}'", external))
                        .with_got(raw_key.clone()),
                    ),
                    None => {
                        emitted.insert(external.clone(), raw_key);
                        validated.insert(external, v);
                    }
                }
            }
            (key, item) => {
                if let Validation::Failure(e) = key {
                    errors.extend(e);
                }
                if let Validation::Failure(e) = item {
                    errors.extend(e);
                }
            }
        }
    }

    finish(Value::Object(validated), errors)
}

/// The string form a validated key takes in the output map.
fn external_key(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn validate_union(
    members: &[TypeSpec],
    value: &Value,
    path: &JsonPath,
    context: &ValidationContext,
) -> ValidationResult<Value> {
    for (index, member) in members.iter().enumerate() {
        match validate_node(member, value, path, context) {
            Validation::Success(v) => {
                tracing::trace!(%path, member = index, "union member matched");
                return Validation::Success(v);
            }
            Validation::Failure(_) => {
                tracing::trace!(%path, member = index, "union member rejected");
            }
        }
    }

    let alternatives = members
        .iter()
        .map(TypeSpec::shape_name)
        .collect::<Vec<_>>()
        .join(" | ");
    Validation::Failure(SchemaErrors::single(
        SchemaError::new(
            path.clone(),
            format!(
                "value did not match any of the {} union members",
                members.len()
            ),
        )
        .with_code("type")
        .with_expected(format!("union of {}", alternatives))
        .with_got(type_name(value)),
    ))
}

fn validate_tuple(
    elements: &[TypeSpec],
    value: &Value,
    path: &JsonPath,
    context: &ValidationContext,
) -> ValidationResult<Value> {
    let expected = format!("tuple of {}", elements.len());
    let Some(items) = value.as_array() else {
        return Validation::Failure(SchemaErrors::single(type_error(path, &expected, value)));
    };

    if items.len() != elements.len() {
        return Validation::Failure(SchemaErrors::single(
            SchemaError::new(
                path.clone(),
                format!(
                    "expected {} elements, got {}",
                    elements.len(),
                    items.len()
                ),
            )
            .with_code("type")
            .with_expected(expected)
            .with_got(format!("array of {}", items.len())),
        ));
    }

    let mut errors = Vec::new();
    let mut validated = Vec::with_capacity(items.len());
    for (index, (element, item)) in elements.iter().zip(items).enumerate() {
        match validate_node(element, item, &path.push_index(index), context) {
            Validation::Success(v) => validated.push(v),
            Validation::Failure(e) => errors.extend(e),
        }
    }

    finish(Value::Array(validated), errors)
}

impl Definition for TypeSpec {
    fn validate_with_context(
        &self,
        value: &Value,
        path: &JsonPath,
        context: &ValidationContext,
    ) -> ValidationResult<Value> {
        validate_node(self, value, path, context)
    }

    fn collect_refs(&self, refs: &mut Vec<String>) {
        TypeSpec::collect_refs(self, refs)
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<Validator>();
    assert_sync::<Validator>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Constraint;
    use serde_json::json;

    fn unwrap_success<T, E: std::fmt::Debug>(v: Validation<T, E>) -> T {
        v.into_result().unwrap()
    }

    fn unwrap_failure<T: std::fmt::Debug, E>(v: Validation<T, E>) -> E {
        v.into_result().unwrap_err()
    }

    fn strict() -> Policy {
        Policy::default()
    }

    fn coercing() -> Policy {
        Policy::default().with_coerce(true)
    }

    #[test]
    fn test_primitive_strict_failure_is_single_type_error() {
        let errors = unwrap_failure(validate(&TypeSpec::integer(), &json!("123"), &strict()));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().code, "type");
        assert_eq!(errors.first().expected.as_deref(), Some("integer"));
        assert_eq!(errors.first().got.as_deref(), Some("string"));
    }

    #[test]
    fn test_primitive_coercion_gated_by_policy() {
        assert_eq!(
            unwrap_success(validate(&TypeSpec::integer(), &json!("123"), &coercing())),
            json!(123)
        );
        let errors = unwrap_failure(validate(&TypeSpec::integer(), &json!("12.5"), &coercing()));
        assert_eq!(errors.first().code, "type");
        assert!(errors.first().message.contains("not an integer literal"));
    }

    #[test]
    fn test_custom_primitive_always_fails() {
        let spec = TypeSpec::primitive("uuid");
        let errors = unwrap_failure(validate(&spec, &json!("x"), &coercing()));
        assert_eq!(errors.first().code, "type");
        assert!(errors.first().message.contains("uuid"));
    }

    #[test]
    fn test_any_accepts_everything() {
        for value in [json!(null), json!([1]), json!({"a": {}}), json!(1.5)] {
            assert_eq!(unwrap_success(validate(&TypeSpec::any(), &value, &strict())), value);
        }
    }

    #[test]
    fn test_base_failure_suppresses_constraints() {
        let spec = TypeSpec::string().min_length(3).format("^a").unwrap();
        let errors = unwrap_failure(validate(&spec, &json!(5), &strict()));
        assert_eq!(errors.codes(), vec!["type"]);
    }

    #[test]
    fn test_constraints_accumulate_in_order() {
        let spec = TypeSpec::string().min_length(5).format("^[0-9]+$").unwrap();
        let errors = unwrap_failure(validate(&spec, &json!("ab"), &strict()));
        assert_eq!(errors.codes(), vec!["min_length", "format"]);
    }

    #[test]
    fn test_constraints_see_coerced_value() {
        let spec = TypeSpec::integer().gt(100);
        let errors = unwrap_failure(validate(&spec, &json!("5"), &coercing()));
        assert_eq!(errors.codes(), vec!["gt"]);
    }

    #[test]
    fn test_array_collects_every_element_error() {
        let spec = TypeSpec::array(TypeSpec::integer());
        let errors = unwrap_failure(validate(&spec, &json!([1, "a", 2, "b"]), &strict()));
        let paths: Vec<_> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["[1]", "[3]"]);
    }

    #[test]
    fn test_array_length_skipped_when_elements_fail() {
        let spec = TypeSpec::array(TypeSpec::integer()).min_items(5);
        let errors = unwrap_failure(validate(&spec, &json!([1, "a"]), &strict()));
        assert_eq!(errors.codes(), vec!["type"]);
    }

    #[test]
    fn test_array_non_array_input() {
        let errors = unwrap_failure(validate(
            &TypeSpec::array(TypeSpec::any()),
            &json!({"a": 1}),
            &strict(),
        ));
        assert_eq!(errors.len(), 1);
        assert!(errors.first().path.is_root());
    }

    #[test]
    fn test_map_key_and_value_errors_share_key_path() {
        let spec = TypeSpec::map(TypeSpec::string().min_length(2), TypeSpec::integer());
        let errors = unwrap_failure(validate(&spec, &json!({"a": "x", "bb": 1}), &strict()));
        assert_eq!(errors.codes(), vec!["min_length", "type"]);
        assert!(errors.iter().all(|e| e.path.to_string() == "a"));
    }

    #[test]
    fn test_map_output_uses_external_key_form() {
        let spec = TypeSpec::map(TypeSpec::integer(), TypeSpec::boolean());
        let out = unwrap_success(validate(&spec, &json!({"1": "true"}), &coercing()));
        assert_eq!(out, json!({"1": true}));
    }

    #[test]
    fn test_union_first_success_wins() {
        let spec = TypeSpec::union([TypeSpec::integer(), TypeSpec::string()]);
        assert_eq!(unwrap_success(validate(&spec, &json!("7"), &coercing())), json!(7));

        let spec = TypeSpec::union([TypeSpec::string(), TypeSpec::integer()]);
        assert_eq!(unwrap_success(validate(&spec, &json!("7"), &coercing())), json!("7"));
    }

    #[test]
    fn test_union_failure_is_single_error() {
        let spec = TypeSpec::union([TypeSpec::integer(), TypeSpec::boolean()]);
        let errors = unwrap_failure(validate(&spec, &json!("x"), &strict()));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().code, "type");
        assert!(errors.first().message.contains("union"));
    }

    #[test]
    fn test_empty_union_rejects() {
        assert!(validate(&TypeSpec::union([]), &json!(1), &strict()).is_failure());
    }

    #[test]
    fn test_tuple_arity_and_slots() {
        let spec = TypeSpec::tuple([TypeSpec::string(), TypeSpec::integer()]);
        let errors = unwrap_failure(validate(&spec, &json!(["a", "b"]), &strict()));
        assert_eq!(errors.first().path.to_string(), "[1]");

        let errors = unwrap_failure(validate(&spec, &json!(["a"]), &strict()));
        assert_eq!(errors.len(), 1);
        assert!(errors.first().path.is_root());
    }

    #[test]
    fn test_reference_without_resolver() {
        let errors = unwrap_failure(validate(&TypeSpec::reference("Node"), &json!({}), &strict()));
        assert_eq!(errors.first().code, "reference");
    }

    #[test]
    fn test_dump_never_coerces() {
        let spec = TypeSpec::integer();
        assert!(dump(&spec, &json!("1")).is_failure());
        assert_eq!(unwrap_success(dump(&spec, &json!(1))), json!(1));

        let validator = Validator::new(coercing());
        assert!(validator.dump(&spec, &json!("1")).is_failure());
    }

    #[test]
    fn test_validate_at_prefixes_paths() {
        let validator = Validator::new(strict());
        let base = JsonPath::root().push_field("payload");
        let errors = unwrap_failure(validator.validate_at(&TypeSpec::integer(), &json!("x"), &base));
        assert_eq!(errors.first().path.to_string(), "payload");
    }

    #[test]
    fn test_custom_constraint_does_not_fail() {
        let spec = TypeSpec::string().constraint(Constraint::Custom {
            kind: "luhn".into(),
            value: json!(true),
        });
        assert!(validate(&spec, &json!("4111"), &strict()).is_success());
    }
}
