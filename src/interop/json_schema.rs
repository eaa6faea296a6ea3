//! JSON Schema export.
//!
//! Specs and records convert to JSON Schema draft 2020-12 fragments.
//! References become `$ref` pointers into `#/$defs/`; the registry assembles
//! the `$defs` table when it exports a full document.

use serde_json::{json, Map, Value};

use crate::spec::{same_choice, Constraint, ConstraintSet, PrimitiveKind, TypeSpec};

/// The `$schema` URI placed on exported documents.
pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// Trait for converting schema types to JSON Schema format.
///
/// Implementers of this trait can be exported as JSON Schema documents
/// compatible with draft 2020-12.
pub trait ToJsonSchema {
    /// Converts this schema to a JSON Schema representation.
    fn to_json_schema(&self) -> Value;
}

/// Returns the `$ref` pointer for a definition id.
pub fn definition_pointer(id: &str) -> String {
    format!("#/$defs/{}", id)
}

impl ToJsonSchema for PrimitiveKind {
    fn to_json_schema(&self) -> Value {
        match self {
            PrimitiveKind::String | PrimitiveKind::Atom => json!({ "type": "string" }),
            PrimitiveKind::Integer => json!({ "type": "integer" }),
            PrimitiveKind::Float => json!({ "type": "number" }),
            PrimitiveKind::Boolean => json!({ "type": "boolean" }),
            PrimitiveKind::Any => json!({}),
            PrimitiveKind::Map => json!({ "type": "object" }),
            PrimitiveKind::Custom(tag) => json!({ "format": tag }),
        }
    }
}

impl ToJsonSchema for TypeSpec {
    fn to_json_schema(&self) -> Value {
        match self {
            TypeSpec::Primitive(kind) => kind.to_json_schema(),
            TypeSpec::Array(element) => json!({
                "type": "array",
                "items": element.to_json_schema()
            }),
            TypeSpec::Map { key, value } => {
                let mut schema = json!({
                    "type": "object",
                    "additionalProperties": value.to_json_schema()
                });
                if !matches!(**key, TypeSpec::Primitive(PrimitiveKind::String)) {
                    schema["propertyNames"] = key.to_json_schema();
                }
                schema
            }
            TypeSpec::Union(members) => json!({
                "anyOf": members.iter().map(ToJsonSchema::to_json_schema).collect::<Vec<_>>()
            }),
            TypeSpec::Tuple(elements) => json!({
                "type": "array",
                "prefixItems": elements.iter().map(ToJsonSchema::to_json_schema).collect::<Vec<_>>(),
                "items": false,
                "minItems": elements.len(),
                "maxItems": elements.len()
            }),
            TypeSpec::Reference(id) => json!({ "$ref": definition_pointer(id) }),
            TypeSpec::WithConstraints { base, constraints } => {
                let mut schema = base.to_json_schema();
                if let Value::Object(obj) = &mut schema {
                    apply_constraints(obj, base.base(), constraints);
                }
                schema
            }
        }
    }
}

/// What a length constraint measures, decided by the base shape.
enum Measured {
    Characters,
    Items,
    Properties,
}

fn measured(base: &TypeSpec) -> Measured {
    match base {
        TypeSpec::Array(_) | TypeSpec::Tuple(_) => Measured::Items,
        TypeSpec::Map { .. } | TypeSpec::Primitive(PrimitiveKind::Map) => Measured::Properties,
        _ => Measured::Characters,
    }
}

/// Writes each constraint as its keyword. A keyword that is already present
/// keeps the tighter of the two values, so repeated kinds export the bound
/// the validator actually enforces.
fn apply_constraints(schema: &mut Map<String, Value>, base: &TypeSpec, constraints: &ConstraintSet) {
    let mut patterns = Vec::new();

    for constraint in constraints.iter() {
        match constraint {
            Constraint::MinLength(n) => match measured(base) {
                Measured::Characters => raise(schema, "minLength", json!(n)),
                Measured::Items => raise(schema, "minItems", json!(n)),
                Measured::Properties => raise(schema, "minProperties", json!(n)),
            },
            Constraint::MaxLength(n) => match measured(base) {
                Measured::Characters => lower(schema, "maxLength", json!(n)),
                Measured::Items => lower(schema, "maxItems", json!(n)),
                Measured::Properties => lower(schema, "maxProperties", json!(n)),
            },
            Constraint::Format(regex) => patterns.push(regex.as_str().to_string()),
            Constraint::Choices(choices) => intersect(schema, choices),
            Constraint::Gt(bound) => raise(schema, "exclusiveMinimum", bound.to_value()),
            Constraint::Lt(bound) => lower(schema, "exclusiveMaximum", bound.to_value()),
            Constraint::Gteq(bound) => raise(schema, "minimum", bound.to_value()),
            Constraint::Lteq(bound) => lower(schema, "maximum", bound.to_value()),
            Constraint::MinItems(n) => raise(schema, "minItems", json!(n)),
            Constraint::MaxItems(n) => lower(schema, "maxItems", json!(n)),
            Constraint::Size(n) => {
                raise(schema, "minProperties", json!(n));
                lower(schema, "maxProperties", json!(n));
            }
            Constraint::Custom { .. } => {}
        }
    }

    // One `pattern` per schema; every further pattern goes into `allOf`.
    let mut patterns = patterns.into_iter();
    if let Some(first) = patterns.next() {
        schema.insert("pattern".to_string(), json!(first));
    }
    let rest: Vec<Value> = patterns.map(|p| json!({ "pattern": p })).collect();
    if !rest.is_empty() {
        schema.insert("allOf".to_string(), Value::Array(rest));
    }
}

/// Keeps the larger of the existing and new lower bound.
fn raise(schema: &mut Map<String, Value>, keyword: &str, value: Value) {
    tighten(schema, keyword, value, |new, old| new > old);
}

/// Keeps the smaller of the existing and new upper bound.
fn lower(schema: &mut Map<String, Value>, keyword: &str, value: Value) {
    tighten(schema, keyword, value, |new, old| new < old);
}

fn tighten(schema: &mut Map<String, Value>, keyword: &str, value: Value, wins: fn(f64, f64) -> bool) {
    let replace = match (schema.get(keyword).and_then(Value::as_f64), value.as_f64()) {
        (Some(old), Some(new)) => wins(new, old),
        _ => true,
    };
    if replace {
        schema.insert(keyword.to_string(), value);
    }
}

/// A second `enum` narrows the first to the values both allow.
fn intersect(schema: &mut Map<String, Value>, choices: &[Value]) {
    let narrowed = match schema.get("enum").and_then(Value::as_array) {
        Some(existing) => existing
            .iter()
            .filter(|v| choices.iter().any(|c| same_choice(v, c)))
            .cloned()
            .collect(),
        None => choices.to_vec(),
    };
    schema.insert("enum".to_string(), Value::Array(narrowed));
}
