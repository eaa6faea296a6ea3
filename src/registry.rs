//! Schema registry for named definitions and reference resolution.
//!
//! A [`SchemaRegistry`] is the arena in which recursive and mutually
//! recursive schemas live: definitions refer to each other by name through
//! [`TypeSpec::Reference`], and the registry resolves those names during
//! validation with a depth cap.

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::Validator;
use crate::error::SpecError;
use crate::interop::{ReferenceGraph, DRAFT_2020_12};
use crate::path::JsonPath;
use crate::policy::Policy;
use crate::spec::TypeSpec;
use crate::validation::{Definition, ReferenceResolver, ValidationContext, DEFAULT_MAX_DEPTH};
use crate::ValidationResult;

/// Type alias for the definition storage map.
type DefinitionMap = Arc<RwLock<HashMap<String, Arc<dyn Definition>>>>;

/// A thread-safe registry of named definitions.
///
/// # Thread Safety
///
/// The registry uses `Arc<RwLock<...>>` for thread-safe access:
/// - Multiple threads can validate concurrently (read-only access)
/// - Registration operations are serialized (write access)
///
/// The lock is held only to look a definition up, never while validating.
///
/// # Example
///
/// ```rust
/// use schemata::{RecordSchema, SchemaRegistry, TypeSpec};
/// use serde_json::json;
///
/// let registry = SchemaRegistry::new();
/// registry
///     .register(
///         "Node",
///         RecordSchema::new()
///             .field("value", TypeSpec::integer())
///             .optional("children", TypeSpec::array(TypeSpec::reference("Node"))),
///     )
///     .unwrap();
///
/// let tree = json!({"value": 1, "children": [{"value": 2}, {"value": "x"}]});
/// let errors = registry.validate("Node", &tree).unwrap().into_result().unwrap_err();
/// assert_eq!(errors.first().path.to_string(), "children[1].value");
/// ```
pub struct SchemaRegistry {
    definitions: DefinitionMap,
    max_depth: usize,
}

impl SchemaRegistry {
    /// Creates a new empty registry with the default max depth (100).
    pub fn new() -> Self {
        Self {
            definitions: Arc::new(RwLock::new(HashMap::new())),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the maximum reference depth.
    ///
    /// When a chain of references grows past this depth, validation fails
    /// with a `max_depth_exceeded` error instead of recursing further.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Registers a definition under `name`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateName` if the name is already registered.
    pub fn register<D>(&self, name: impl Into<String>, definition: D) -> Result<(), RegistryError>
    where
        D: Definition + 'static,
    {
        let name = name.into();
        let mut definitions = self.definitions.write();

        if definitions.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        tracing::debug!(name = %name, "registered definition");
        definitions.insert(name, Arc::new(definition));
        Ok(())
    }

    /// Parses a descriptor with [`TypeSpec::from_descriptor`] and registers
    /// the result.
    ///
    /// ```rust
    /// use schemata::SchemaRegistry;
    /// use serde_json::json;
    ///
    /// let registry = SchemaRegistry::new();
    /// registry
    ///     .register_descriptor("Tags", &json!({"array": {"type": "string", "constraints": {"min_length": 1}}}))
    ///     .unwrap();
    /// assert!(registry.validate("Tags", &json!(["a", ""])).unwrap().is_failure());
    /// ```
    pub fn register_descriptor(
        &self,
        name: impl Into<String>,
        descriptor: &Value,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let spec = TypeSpec::from_descriptor(descriptor).map_err(|source| {
            RegistryError::InvalidDescriptor {
                name: name.clone(),
                source,
            }
        })?;
        self.register(name, spec)
    }

    /// Retrieves a definition by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Definition>> {
        self.definitions.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }

    /// Builds the reference graph of every registered definition.
    pub fn reference_graph(&self) -> ReferenceGraph {
        let definitions = self.definitions.read();
        let mut names: Vec<&String> = definitions.keys().collect();
        names.sort();

        let mut graph = ReferenceGraph::new();
        for name in names {
            let mut refs = Vec::new();
            definitions[name].collect_refs(&mut refs);
            graph.add_definition(name.clone(), refs);
        }
        graph
    }

    /// Returns every referenced name that is not registered, sorted.
    ///
    /// Call this after all definitions are registered to catch dangling
    /// references before validating anything.
    pub fn validate_refs(&self) -> Vec<String> {
        self.reference_graph().unresolved()
    }

    /// Validates a value against a named definition under the default
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::SchemaNotFound` if the name doesn't exist.
    pub fn validate(&self, name: &str, value: &Value) -> Result<ValidationResult<Value>, RegistryError> {
        self.validate_with(name, value, &Policy::default())
    }

    /// Validates a value against a named definition under `policy`.
    pub fn validate_with(
        &self,
        name: &str,
        value: &Value,
        policy: &Policy,
    ) -> Result<ValidationResult<Value>, RegistryError> {
        let definition = self
            .get(name)
            .ok_or_else(|| RegistryError::SchemaNotFound(name.to_string()))?;

        let context = ValidationContext::new(*policy).with_resolver(Arc::new(self.clone()));
        Ok(definition.validate_with_context(value, &JsonPath::root(), &context))
    }

    /// Returns a [`Validator`] that resolves references through this
    /// registry, for validating ad-hoc specs that point at registered
    /// definitions.
    pub fn validator(&self, policy: Policy) -> Validator {
        Validator::new(policy).with_resolver(Arc::new(self.clone()))
    }

    /// Exports every registered definition as a JSON Schema document with
    /// `$defs`.
    pub fn to_json_schema(&self) -> Value {
        let definitions = self.definitions.read();
        let mut names: Vec<&String> = definitions.keys().collect();
        names.sort();

        let mut defs = Map::new();
        for name in names {
            defs.insert(name.clone(), definitions[name].to_json_schema());
        }

        json!({
            "$schema": DRAFT_2020_12,
            "$defs": defs
        })
    }

    /// Exports one definition as a standalone JSON Schema document.
    ///
    /// Only the definitions the root can reach are placed under `$defs`.
    /// Recursive definitions are emitted once and referenced by `$ref`.
    /// Returns `None` if the name doesn't exist.
    ///
    /// ```rust
    /// use schemata::{SchemaRegistry, TypeSpec};
    ///
    /// let registry = SchemaRegistry::new();
    /// registry.register("UserId", TypeSpec::integer().gt(0)).unwrap();
    /// registry.register("Unrelated", TypeSpec::boolean()).unwrap();
    /// registry.register("Ids", TypeSpec::array(TypeSpec::reference("UserId"))).unwrap();
    ///
    /// let schema = registry.export_schema("Ids").unwrap();
    /// assert_eq!(schema["items"]["$ref"], "#/$defs/UserId");
    /// assert!(schema["$defs"].get("UserId").is_some());
    /// assert!(schema["$defs"].get("Unrelated").is_none());
    /// ```
    pub fn export_schema(&self, name: &str) -> Option<Value> {
        let root = self.get(name)?;
        let reachable = self.reference_graph().reachable_from(name);

        let mut defs = Map::new();
        for id in reachable {
            if let Some(definition) = self.get(&id) {
                defs.insert(id, definition.to_json_schema());
            }
        }

        let mut result = root.to_json_schema();
        if let Value::Object(obj) = &mut result {
            obj.insert("$schema".to_string(), json!(DRAFT_2020_12));
            if !defs.is_empty() {
                obj.insert("$defs".to_string(), Value::Object(defs));
            }
        }
        Some(result)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SchemaRegistry {
    fn clone(&self) -> Self {
        Self {
            definitions: Arc::clone(&self.definitions),
            max_depth: self.max_depth,
        }
    }
}

impl ReferenceResolver for SchemaRegistry {
    fn definition(&self, id: &str) -> Option<Arc<dyn Definition>> {
        self.get(id)
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }
}

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Attempted to register a definition with a name that already exists.
    #[error("schema '{0}' already registered")]
    DuplicateName(String),

    /// Attempted to validate with a name that doesn't exist.
    #[error("schema '{0}' not found")]
    SchemaNotFound(String),

    /// A descriptor passed to `register_descriptor` could not be parsed.
    #[error("invalid descriptor for schema '{name}'")]
    InvalidDescriptor {
        name: String,
        #[source]
        source: SpecError,
    },
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<SchemaRegistry>();
    assert_sync::<SchemaRegistry>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSchema;
    use serde_json::json;
    use stillwater::Validation;

    fn unwrap_failure<T: std::fmt::Debug, E>(v: Validation<T, E>) -> E {
        v.into_result().unwrap_err()
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = SchemaRegistry::new();
        registry.register("A", TypeSpec::string()).unwrap();
        let err = registry.register("A", TypeSpec::integer()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(ref n) if n == "A"));
    }

    #[test]
    fn test_unknown_schema() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.validate("Nope", &json!(1)),
            Err(RegistryError::SchemaNotFound(_))
        ));
    }

    #[test]
    fn test_missing_reference_at_validation() {
        let registry = SchemaRegistry::new();
        registry
            .register("Box", TypeSpec::array(TypeSpec::reference("Item")))
            .unwrap();
        let errors = unwrap_failure(registry.validate("Box", &json!([1])).unwrap());
        assert_eq!(errors.first().code, "missing_reference");
        assert_eq!(errors.first().path.to_string(), "[0]");
        assert_eq!(registry.validate_refs(), vec!["Item"]);
    }

    #[test]
    fn test_self_alias_hits_depth_cap() {
        let registry = SchemaRegistry::new().with_max_depth(5);
        registry.register("Loop", TypeSpec::reference("Loop")).unwrap();
        let errors = unwrap_failure(registry.validate("Loop", &json!(1)).unwrap());
        assert_eq!(errors.codes(), vec!["max_depth_exceeded"]);
    }

    #[test]
    fn test_policy_flows_through_references() {
        let registry = SchemaRegistry::new();
        registry.register("Count", TypeSpec::integer()).unwrap();
        registry
            .register("Counts", TypeSpec::array(TypeSpec::reference("Count")))
            .unwrap();

        assert!(registry.validate("Counts", &json!(["1"])).unwrap().is_failure());
        let coerced = registry
            .validate_with("Counts", &json!(["1"]), &Policy::default().with_coerce(true))
            .unwrap();
        assert_eq!(coerced.into_result().unwrap(), json!([1]));
    }

    #[test]
    fn test_invalid_descriptor() {
        let registry = SchemaRegistry::new();
        let err = registry
            .register_descriptor("Bad", &json!({"set": "string"}))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDescriptor { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_to_json_schema_lists_all_definitions() {
        let registry = SchemaRegistry::new();
        registry.register("B", TypeSpec::boolean()).unwrap();
        registry
            .register("A", RecordSchema::new().field("b", TypeSpec::reference("B")))
            .unwrap();

        let doc = registry.to_json_schema();
        assert_eq!(doc["$schema"], DRAFT_2020_12);
        let keys: Vec<_> = doc["$defs"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn test_export_recursive_definition() {
        let registry = SchemaRegistry::new();
        registry
            .register(
                "Node",
                RecordSchema::new().optional("next", TypeSpec::reference("Node")),
            )
            .unwrap();

        let doc = registry.export_schema("Node").unwrap();
        assert_eq!(doc["properties"]["next"]["$ref"], "#/$defs/Node");
        assert_eq!(doc["$defs"]["Node"]["type"], "object");
        assert_eq!(registry.reference_graph().recursive_definitions(), vec!["Node"]);
    }
}
