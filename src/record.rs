//! Field-list validation.
//!
//! A [`RecordSchema`] describes a map with named fields. Each field carries a
//! [`TypeSpec`] that the core validator checks; the record adds required
//! and optional fields, defaults, the extra-field policy, case-insensitive key
//! matching, model validators and computed fields on top.
//!
//! Validation proceeds in three stages:
//!
//! 1. Every declared field is validated and every extra key handled. All
//!    errors from this stage are accumulated.
//! 2. If stage 1 succeeded, model validators run in order on the validated
//!    map. The first rejection stops the pipeline.
//! 3. Computed fields are derived from the map and validated against their
//!    own spec.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use stillwater::Validation;

use crate::engine::{finish, type_error, validate_node};
use crate::error::{SchemaError, SchemaErrors};
use crate::interop::ToJsonSchema;
use crate::path::JsonPath;
use crate::policy::{ExtraFields, Policy};
use crate::spec::TypeSpec;
use crate::validation::{Definition, ValidationContext};
use crate::ValidationResult;

type ModelValidatorFn =
    Box<dyn Fn(Map<String, Value>) -> Result<Map<String, Value>, String> + Send + Sync>;
type ComputeFn = Box<dyn Fn(&Map<String, Value>) -> Result<Value, String> + Send + Sync>;

struct FieldDef {
    spec: TypeSpec,
    required: bool,
    default: Option<Value>,
}

struct ComputedField {
    spec: TypeSpec,
    compute: ComputeFn,
}

/// A schema for maps with named fields.
///
/// # Example
///
/// ```rust
/// use schemata::{Policy, RecordSchema, TypeSpec};
/// use serde_json::json;
///
/// let schema = RecordSchema::new()
///     .field("name", TypeSpec::string().min_length(1))
///     .field("age", TypeSpec::integer().gteq(0))
///     .default("role", TypeSpec::atom(), json!("member"));
///
/// let result = schema.validate(&json!({"name": "Ada", "age": 36}), &Policy::default());
/// assert_eq!(
///     result.into_result().unwrap(),
///     json!({"name": "Ada", "age": 36, "role": "member"})
/// );
/// ```
pub struct RecordSchema {
    fields: IndexMap<String, FieldDef>,
    extra_fields: Option<ExtraFields>,
    model_validators: Vec<ModelValidatorFn>,
    computed: IndexMap<String, ComputedField>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
            extra_fields: None,
            model_validators: Vec::new(),
            computed: IndexMap::new(),
        }
    }

    /// Adds a required field.
    pub fn field(mut self, name: impl Into<String>, spec: TypeSpec) -> Self {
        self.fields.insert(
            name.into(),
            FieldDef {
                spec,
                required: true,
                default: None,
            },
        );
        self
    }

    /// Adds an optional field. When absent it is also absent from the output.
    pub fn optional(mut self, name: impl Into<String>, spec: TypeSpec) -> Self {
        self.fields.insert(
            name.into(),
            FieldDef {
                spec,
                required: false,
                default: None,
            },
        );
        self
    }

    /// Adds an optional field that takes `default` when absent.
    ///
    /// The default is inserted as given; it is not validated.
    pub fn default(mut self, name: impl Into<String>, spec: TypeSpec, default: Value) -> Self {
        self.fields.insert(
            name.into(),
            FieldDef {
                spec,
                required: false,
                default: Some(default),
            },
        );
        self
    }

    /// Fixes the extra-field handling for this record, overriding the
    /// policy passed at validation time.
    pub fn extra_fields(mut self, mode: ExtraFields) -> Self {
        self.extra_fields = Some(mode);
        self
    }

    /// Appends a model validator.
    ///
    /// Model validators run after every field validated successfully. Each
    /// receives the map produced by the previous one and may return a
    /// modified map; an `Err` stops the pipeline with a `model_validator`
    /// error at the record's path.
    ///
    /// ```rust
    /// use schemata::{Policy, RecordSchema, TypeSpec};
    /// use serde_json::json;
    ///
    /// let schema = RecordSchema::new()
    ///     .field("start", TypeSpec::integer())
    ///     .field("end", TypeSpec::integer())
    ///     .model_validator(|record| {
    ///         if record["start"].as_i64() <= record["end"].as_i64() {
    ///             Ok(record)
    ///         } else {
    ///             Err("start must not be after end".to_string())
    ///         }
    ///     });
    ///
    /// let errors = schema
    ///     .validate(&json!({"start": 5, "end": 1}), &Policy::default())
    ///     .into_result()
    ///     .unwrap_err();
    /// assert_eq!(errors.first().code, "model_validator");
    /// ```
    pub fn model_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Result<Map<String, Value>, String> + Send + Sync + 'static,
    {
        self.model_validators.push(Box::new(validator));
        self
    }

    /// Adds a field derived from the validated record.
    ///
    /// The function sees the record after model validators and any earlier
    /// computed fields. Its result is validated against `spec`; an `Err` is
    /// reported as a `computed_field` error at the field's path.
    pub fn computed<F>(mut self, name: impl Into<String>, spec: TypeSpec, compute: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.computed.insert(
            name.into(),
            ComputedField {
                spec,
                compute: Box::new(compute),
            },
        );
        self
    }

    /// Declared field names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Validates a value under `policy`. References inside field specs fail
    /// with a `reference` error; register the record in a
    /// [`SchemaRegistry`](crate::SchemaRegistry) to resolve them.
    pub fn validate(&self, value: &Value, policy: &Policy) -> ValidationResult<Value> {
        self.validate_record(value, &JsonPath::root(), &ValidationContext::new(*policy))
            .map(Value::Object)
    }

    /// Validates a value and returns the record as a map.
    pub fn validate_record(
        &self,
        value: &Value,
        path: &JsonPath,
        context: &ValidationContext,
    ) -> ValidationResult<Map<String, Value>> {
        let Some(obj) = value.as_object() else {
            return Validation::Failure(SchemaErrors::single(type_error(path, "map", value)));
        };

        let policy = context.policy();
        let mode = self.extra_fields.unwrap_or(policy.extra_fields);
        let mut errors = Vec::new();
        let mut validated = Map::new();
        let mut consumed = HashSet::new();

        for (name, field) in &self.fields {
            let field_path = path.push_field(name.clone());

            match lookup(obj, name, policy.case_sensitive_keys) {
                Some((key, field_value)) => {
                    consumed.insert(key);
                    match validate_node(&field.spec, field_value, &field_path, context) {
                        Validation::Success(v) => {
                            validated.insert(name.clone(), v);
                        }
                        Validation::Failure(e) => errors.extend(e),
                    }
                }
                None if field.required => {
                    errors.push(
                        SchemaError::new(field_path, format!("required field '{}' is missing", name))
                            .with_code("required")
                            .with_expected(field.spec.shape_name()),
                    );
                }
                None => {
                    if let Some(default) = &field.default {
                        validated.insert(name.clone(), default.clone());
                    }
                }
            }
        }

        // Computed keys in the input are recomputed below, never extras.
        let extras = obj.iter().filter(|(key, _)| {
            !consumed.contains(key.as_str()) && !self.computed.contains_key(key.as_str())
        });
        for (key, extra) in extras {
            match mode {
                ExtraFields::Allow => {
                    if !validated.contains_key(key) {
                        validated.insert(key.clone(), extra.clone());
                    }
                }
                ExtraFields::Ignore => {}
                ExtraFields::Forbid => errors.push(
                    SchemaError::new(path.push_field(key.clone()), format!("unknown field '{}'", key))
                        .with_code("additional_properties"),
                ),
            }
        }

        if let Some(errors) = SchemaErrors::from_vec(errors) {
            return Validation::Failure(errors);
        }

        let mut record = validated;
        for (index, validator) in self.model_validators.iter().enumerate() {
            match validator(record) {
                Ok(next) => record = next,
                Err(message) => {
                    tracing::debug!(%path, validator = index, %message, "model validator rejected record");
                    return Validation::Failure(SchemaErrors::single(
                        SchemaError::new(path.clone(), message).with_code("model_validator"),
                    ));
                }
            }
        }

        let mut errors = Vec::new();
        for (name, computed) in &self.computed {
            let field_path = path.push_field(name.clone());
            match (computed.compute)(&record) {
                Ok(raw) => match validate_node(&computed.spec, &raw, &field_path, context) {
                    Validation::Success(v) => {
                        record.insert(name.clone(), v);
                    }
                    Validation::Failure(e) => errors.extend(e),
                },
                Err(message) => errors.push(
                    SchemaError::new(field_path, message)
                        .with_code("computed_field")
                        .with_expected(computed.spec.shape_name()),
                ),
            }
        }

        finish(record, errors)
    }
}

/// Finds the input entry for a declared field. An exact match wins over a
/// case-insensitive one.
fn lookup<'a>(
    obj: &'a Map<String, Value>,
    name: &str,
    case_sensitive: bool,
) -> Option<(&'a str, &'a Value)> {
    if let Some((key, value)) = obj.get_key_value(name) {
        return Some((key.as_str(), value));
    }
    if case_sensitive {
        return None;
    }
    let folded = name.to_lowercase();
    obj.iter()
        .find(|(key, _)| key.to_lowercase() == folded)
        .map(|(key, value)| (key.as_str(), value))
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl Definition for RecordSchema {
    fn validate_with_context(
        &self,
        value: &Value,
        path: &JsonPath,
        context: &ValidationContext,
    ) -> ValidationResult<Value> {
        self.validate_record(value, path, context).map(Value::Object)
    }

    fn collect_refs(&self, refs: &mut Vec<String>) {
        for field in self.fields.values() {
            field.spec.collect_refs(refs);
        }
        for computed in self.computed.values() {
            computed.spec.collect_refs(refs);
        }
    }
}

impl ToJsonSchema for RecordSchema {
    fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, field) in &self.fields {
            let mut schema = field.spec.to_json_schema();
            if let (Some(default), Value::Object(obj)) = (&field.default, &mut schema) {
                obj.insert("default".to_string(), default.clone());
            }
            properties.insert(name.clone(), schema);
            if field.required {
                required.push(Value::String(name.clone()));
            }
        }

        for (name, computed) in &self.computed {
            let mut schema = computed.spec.to_json_schema();
            if let Value::Object(obj) = &mut schema {
                obj.insert("readOnly".to_string(), Value::Bool(true));
            }
            properties.insert(name.clone(), schema);
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        if self.extra_fields == Some(ExtraFields::Forbid) {
            schema["additionalProperties"] = Value::Bool(false);
        }
        schema
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<RecordSchema>();
    assert_sync::<RecordSchema>();
};
