//! # Schemata
//!
//! A runtime schema validation engine that accumulates ALL validation
//! errors instead of stopping at the first one.
//!
//! ## Overview
//!
//! A [`TypeSpec`] describes a type declaratively: primitives, arrays, maps,
//! unions, tuples, named references, and any of these refined by
//! constraints. [`validate`] checks a `serde_json::Value` against a spec,
//! optionally coercing loose input (`"123"` to `123`), and returns either
//! the validated value or every error found, each tagged with the path
//! where it occurred. Results are stillwater `Validation` values, so errors
//! from independent branches accumulate.
//!
//! ## Core Types
//!
//! - [`TypeSpec`]: the recursive type model
//! - [`Policy`]: per-call switches (coercion, extra fields, key matching)
//! - [`SchemaError`] / [`SchemaErrors`]: structured, path-aware failures
//! - [`RecordSchema`]: field lists with defaults, model validators and
//!   computed fields
//! - [`SchemaRegistry`]: named definitions, reference resolution and
//!   JSON Schema export
//!
//! ## Example
//!
//! ```rust
//! use schemata::{validate, Policy, TypeSpec};
//! use serde_json::json;
//!
//! let spec = TypeSpec::tuple([TypeSpec::string(), TypeSpec::integer().gteq(0)]);
//!
//! let result = validate(&spec, &json!(["widget", "3"]), &Policy::default().with_coerce(true));
//! assert_eq!(result.into_result().unwrap(), json!(["widget", 3]));
//!
//! let errors = validate(&spec, &json!(["widget", "x"]), &Policy::default())
//!     .into_result()
//!     .unwrap_err();
//! assert_eq!(errors.first().path.to_string(), "[1]");
//! ```

pub mod engine;
pub mod error;
pub mod interop;
pub mod path;
pub mod policy;
pub mod record;
pub mod registry;
pub mod spec;
pub mod validation;

pub use engine::{dump, validate, Validator};
pub use error::{SchemaError, SchemaErrors, SpecError};
pub use interop::{ReferenceGraph, ToJsonSchema};
pub use path::{JsonPath, PathSegment};
pub use policy::{ExtraFields, Policy};
pub use record::RecordSchema;
pub use registry::{RegistryError, SchemaRegistry};
pub use spec::{Bound, Constraint, ConstraintSet, PrimitiveKind, TypeSpec};
pub use validation::{Definition, ReferenceResolver, ValidationContext};

/// Type alias for validation results using SchemaErrors
pub type ValidationResult<T> = stillwater::Validation<T, SchemaErrors>;
