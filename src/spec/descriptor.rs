//! Building a [`TypeSpec`] from a JSON descriptor.
//!
//! Descriptors are the data form schema front-ends emit:
//!
//! | Descriptor | Spec |
//! |---|---|
//! | `"string"` | `Primitive(String)` (unknown tags kept as `Custom`) |
//! | `{"array": T}` | `Array(T)` |
//! | `{"map": [K, V]}` | `Map(K, V)` |
//! | `{"union": [A, B]}` | `Union([A, B])` |
//! | `{"tuple": [A, B]}` | `Tuple([A, B])` |
//! | `{"ref": "Node"}` | `Reference("Node")` |
//! | `{"type": T, "constraints": [...], "messages": {...}}` | `WithConstraints` |
//!
//! `constraints` is either a list of single-entry objects (which allows a
//! kind to repeat) or one object.

use serde_json::{Map, Value};

use super::{Constraint, TypeSpec};
use crate::error::SpecError;

impl TypeSpec {
    /// Parses a descriptor into a spec.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when the descriptor cannot be interpreted: an
    /// unknown variant key, a payload of the wrong shape, or a constraint
    /// value that does not fit its kind. Unknown primitive tags and unknown
    /// constraint kinds are not errors.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schemata::TypeSpec;
    /// use serde_json::json;
    ///
    /// let spec = TypeSpec::from_descriptor(&json!({
    ///     "array": {"type": "string", "constraints": [{"min_length": 2}]}
    /// }))
    /// .unwrap();
    /// assert_eq!(spec.shape_name(), "array");
    ///
    /// assert!(TypeSpec::from_descriptor(&json!({"set": "string"})).is_err());
    /// ```
    pub fn from_descriptor(descriptor: &Value) -> Result<Self, SpecError> {
        match descriptor {
            Value::String(tag) => Ok(TypeSpec::primitive(tag)),
            Value::Object(obj) if obj.contains_key("type") => parse_constrained(obj),
            Value::Object(obj) => parse_composite(obj),
            other => Err(SpecError::UnknownVariant(other.to_string())),
        }
    }
}

fn parse_composite(obj: &Map<String, Value>) -> Result<TypeSpec, SpecError> {
    let mut entries = obj.iter();
    let (variant, payload) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        (None, _) => return Err(SpecError::UnknownVariant("{}".to_string())),
        (Some((variant, _)), Some((extra, _))) => {
            return Err(SpecError::malformed(
                variant,
                format!("unexpected extra key '{}'", extra),
            ))
        }
    };

    match variant.as_str() {
        "array" => Ok(TypeSpec::array(TypeSpec::from_descriptor(payload)?)),
        "map" => match payload.as_array().map(Vec::as_slice) {
            Some([key, value]) => Ok(TypeSpec::map(
                TypeSpec::from_descriptor(key)?,
                TypeSpec::from_descriptor(value)?,
            )),
            _ => Err(SpecError::malformed("map", "expected [key, value]")),
        },
        "union" => Ok(TypeSpec::Union(parse_list("union", payload)?)),
        "tuple" => Ok(TypeSpec::Tuple(parse_list("tuple", payload)?)),
        "ref" => payload
            .as_str()
            .map(TypeSpec::reference)
            .ok_or_else(|| SpecError::malformed("ref", "expected a schema id string")),
        other => Err(SpecError::UnknownVariant(other.to_string())),
    }
}

fn parse_list(variant: &str, payload: &Value) -> Result<Vec<TypeSpec>, SpecError> {
    payload
        .as_array()
        .ok_or_else(|| SpecError::malformed(variant, "expected a list of descriptors"))?
        .iter()
        .map(TypeSpec::from_descriptor)
        .collect()
}

fn parse_constrained(obj: &Map<String, Value>) -> Result<TypeSpec, SpecError> {
    if let Some(extra) = obj
        .keys()
        .find(|k| !matches!(k.as_str(), "type" | "constraints" | "messages"))
    {
        return Err(SpecError::malformed(
            "type",
            format!("unexpected key '{}'", extra),
        ));
    }

    let base = match obj.get("type") {
        Some(base) => TypeSpec::from_descriptor(base)?,
        None => return Err(SpecError::malformed("type", "missing base type")),
    };

    let constraints = match obj.get("constraints") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item.as_object() {
                Some(pairs) => pairs
                    .iter()
                    .map(|(kind, value)| Constraint::from_pair(kind, value))
                    .collect::<Result<Vec<_>, _>>(),
                None => Err(SpecError::malformed(
                    "type",
                    format!("constraint entries must be objects, got {}", item),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect(),
        Some(Value::Object(pairs)) => pairs
            .iter()
            .map(|(kind, value)| Constraint::from_pair(kind, value))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(SpecError::malformed(
                "type",
                format!("constraints must be a list or object, got {}", other),
            ))
        }
    };

    let mut spec = base.with_constraints(constraints);
    match obj.get("messages") {
        None => {}
        Some(Value::Object(messages)) => {
            for (kind, message) in messages {
                let text = message.as_str().ok_or_else(|| {
                    SpecError::malformed("type", format!("message for '{}' must be a string", kind))
                })?;
                spec = spec.message(kind.clone(), text);
            }
        }
        Some(_) => return Err(SpecError::malformed("type", "messages must be an object")),
    }
    Ok(spec)
}
