//! Validation context and reference resolution.
//!
//! The core validator never expands a [`TypeSpec::Reference`] itself. It
//! hands the reference to the [`ReferenceResolver`] carried by the
//! [`ValidationContext`], which looks the definition up and validates
//! against it. Recursion safety belongs to the resolver: the default
//! implementation caps the depth of the reference chain.
//!
//! [`TypeSpec::Reference`]: crate::TypeSpec::Reference

use std::sync::Arc;

use serde_json::Value;
use stillwater::Validation;

use crate::error::{SchemaError, SchemaErrors};
use crate::interop::ToJsonSchema;
use crate::path::JsonPath;
use crate::policy::Policy;
use crate::ValidationResult;

/// Reference chains deeper than this fail with `max_depth_exceeded`.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Something a reference can point at: a bare [`TypeSpec`](crate::TypeSpec)
/// or a [`RecordSchema`](crate::RecordSchema).
pub trait Definition: ToJsonSchema + Send + Sync {
    /// Validates a value, resolving nested references through `context`.
    fn validate_with_context(
        &self,
        value: &Value,
        path: &JsonPath,
        context: &ValidationContext,
    ) -> ValidationResult<Value>;

    /// Appends the ids of every definition this one references.
    fn collect_refs(&self, refs: &mut Vec<String>);
}

/// Resolves schema ids during validation.
pub trait ReferenceResolver: Send + Sync {
    /// Looks up a definition by id.
    fn definition(&self, id: &str) -> Option<Arc<dyn Definition>>;

    /// The maximum length of a reference chain.
    fn max_depth(&self) -> usize {
        DEFAULT_MAX_DEPTH
    }

    /// Validates `value` against the definition named `id`.
    ///
    /// The default implementation fails with `max_depth_exceeded` once the
    /// chain reaches [`max_depth`](Self::max_depth), and with
    /// `missing_reference` if the id is unknown.
    fn validate_reference(
        &self,
        id: &str,
        value: &Value,
        path: &JsonPath,
        context: &ValidationContext,
    ) -> ValidationResult<Value> {
        if context.depth() >= self.max_depth() {
            tracing::debug!(reference = id, depth = context.depth(), %path, "reference depth cap reached");
            return Validation::Failure(SchemaErrors::single(
                SchemaError::new(
                    path.clone(),
                    format!(
                        "maximum reference depth {} exceeded at path '{}'",
                        self.max_depth(),
                        path
                    ),
                )
                .with_code("max_depth_exceeded"),
            ));
        }

        match self.definition(id) {
            Some(definition) => {
                tracing::trace!(reference = id, depth = context.depth(), "resolving reference");
                definition.validate_with_context(value, path, &context.descend())
            }
            None => {
                tracing::debug!(reference = id, %path, "reference not resolved");
                Validation::Failure(SchemaErrors::single(
                SchemaError::new(path.clone(), format!("schema '{}' not found", id))
                    .with_code("missing_reference")
                    .with_expected(id.to_string()),
                ))
            }
        }
    }
}

/// State threaded through one validation call.
///
/// Carries the caller's [`Policy`], the optional reference resolver and the
/// current reference depth. Cloning is cheap: the resolver sits behind an
/// `Arc`.
#[derive(Clone)]
pub struct ValidationContext {
    policy: Policy,
    resolver: Option<Arc<dyn ReferenceResolver>>,
    depth: usize,
}

impl ValidationContext {
    /// Creates a context with no resolver. References fail with a
    /// `reference` error under such a context.
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            resolver: None,
            depth: 0,
        }
    }

    /// Attaches a reference resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Returns a context one reference deeper.
    pub fn descend(&self) -> Self {
        Self {
            policy: self.policy,
            resolver: self.resolver.clone(),
            depth: self.depth + 1,
        }
    }

    /// Returns the same context with a different policy.
    pub fn with_policy(&self, policy: Policy) -> Self {
        Self {
            policy,
            resolver: self.resolver.clone(),
            depth: self.depth,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn resolver(&self) -> Option<&dyn ReferenceResolver> {
        self.resolver.as_deref()
    }

    /// Returns the current depth of reference traversal.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
