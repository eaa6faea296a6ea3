//! The type specification model.
//!
//! A [`TypeSpec`] is a normalized, recursive description of a type:
//! primitives, arrays, maps, unions, tuples, named references, and any of
//! these refined by constraints. Specs are plain immutable data; they can be
//! cloned, shared across threads, and handed to the validator as often as
//! needed.
//!
//! # Example
//!
//! ```rust
//! use schemata::TypeSpec;
//!
//! // A list of tags, each 1..=32 characters, at most 10 tags
//! let tags = TypeSpec::array(TypeSpec::string().min_length(1).max_length(32))
//!     .max_items(10);
//!
//! // A self-referencing tree node, resolved by name at validation time
//! let children = TypeSpec::array(TypeSpec::reference("Node"));
//! ```

mod constraint;
mod descriptor;

use std::fmt::{self, Display};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub use constraint::{Bound, Constraint, ConstraintSet};
pub(crate) use constraint::same_choice;

static SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s:][^\s]*$").expect("symbol grammar"));

/// Returns true if `s` is a valid atom symbol: non-empty, no whitespace,
/// no leading `:`.
pub(crate) fn is_symbol(s: &str) -> bool {
    SYMBOL.is_match(s)
}

/// The primitive kinds understood by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Any JSON string.
    String,
    /// A JSON number without a fractional representation.
    Integer,
    /// A JSON number with a floating point representation.
    Float,
    /// `true` or `false`.
    Boolean,
    /// A symbol: a string with no whitespace and no leading `:`.
    Atom,
    /// Any value at all.
    Any,
    /// Any JSON object, keys and values unchecked.
    Map,
    /// A tag the model does not know. Kept as written; every value fails
    /// validation against it with a `type` error naming the tag.
    Custom(String),
}

impl PrimitiveKind {
    /// Normalizes a bare tag. Unknown tags become [`PrimitiveKind::Custom`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "string" => PrimitiveKind::String,
            "integer" | "int" => PrimitiveKind::Integer,
            "float" | "number" => PrimitiveKind::Float,
            "boolean" | "bool" => PrimitiveKind::Boolean,
            "atom" => PrimitiveKind::Atom,
            "any" => PrimitiveKind::Any,
            "map" => PrimitiveKind::Map,
            other => PrimitiveKind::Custom(other.to_string()),
        }
    }

    /// Returns the canonical tag.
    pub fn name(&self) -> &str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Atom => "atom",
            PrimitiveKind::Any => "any",
            PrimitiveKind::Map => "map",
            PrimitiveKind::Custom(tag) => tag,
        }
    }

    /// The strict type check. No conversion is attempted here.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            PrimitiveKind::String => value.is_string(),
            PrimitiveKind::Integer => value.is_i64() || value.is_u64(),
            PrimitiveKind::Float => value.is_f64(),
            PrimitiveKind::Boolean => value.is_boolean(),
            PrimitiveKind::Atom => value.as_str().is_some_and(is_symbol),
            PrimitiveKind::Any => true,
            PrimitiveKind::Map => value.is_object(),
            PrimitiveKind::Custom(_) => false,
        }
    }
}

impl Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A normalized, recursive type description.
///
/// Cycles are only expressible through [`TypeSpec::Reference`], which names
/// another definition instead of embedding it, so a spec tree itself is
/// always finite.
#[derive(Debug, Clone)]
pub enum TypeSpec {
    /// A primitive kind.
    Primitive(PrimitiveKind),
    /// A homogeneous array.
    Array(Box<TypeSpec>),
    /// A map with typed keys and values.
    Map {
        /// Spec every key must satisfy.
        key: Box<TypeSpec>,
        /// Spec every value must satisfy.
        value: Box<TypeSpec>,
    },
    /// Ordered alternatives; the first member that fully succeeds wins.
    Union(Vec<TypeSpec>),
    /// A fixed-arity, positionally typed array.
    Tuple(Vec<TypeSpec>),
    /// A named pointer to another definition.
    Reference(String),
    /// A base spec refined by constraints.
    WithConstraints {
        /// The spec checked before any constraint runs.
        base: Box<TypeSpec>,
        /// Constraints in declaration order.
        constraints: ConstraintSet,
    },
}

impl TypeSpec {
    pub fn string() -> Self {
        TypeSpec::Primitive(PrimitiveKind::String)
    }

    pub fn integer() -> Self {
        TypeSpec::Primitive(PrimitiveKind::Integer)
    }

    pub fn float() -> Self {
        TypeSpec::Primitive(PrimitiveKind::Float)
    }

    pub fn boolean() -> Self {
        TypeSpec::Primitive(PrimitiveKind::Boolean)
    }

    pub fn atom() -> Self {
        TypeSpec::Primitive(PrimitiveKind::Atom)
    }

    pub fn any() -> Self {
        TypeSpec::Primitive(PrimitiveKind::Any)
    }

    /// A map whose keys and values are not checked.
    pub fn untyped_map() -> Self {
        TypeSpec::Primitive(PrimitiveKind::Map)
    }

    /// Normalizes a bare primitive tag such as `"string"`.
    ///
    /// Unknown tags are preserved rather than rejected, so a schema may name
    /// a custom type before it exists.
    ///
    /// ```rust
    /// use schemata::{PrimitiveKind, TypeSpec};
    ///
    /// assert!(matches!(TypeSpec::primitive("integer"), TypeSpec::Primitive(PrimitiveKind::Integer)));
    /// assert!(matches!(TypeSpec::primitive("uuid"), TypeSpec::Primitive(PrimitiveKind::Custom(_))));
    /// ```
    pub fn primitive(tag: &str) -> Self {
        TypeSpec::Primitive(PrimitiveKind::from_tag(tag))
    }

    pub fn array(element: TypeSpec) -> Self {
        TypeSpec::Array(Box::new(element))
    }

    pub fn map(key: TypeSpec, value: TypeSpec) -> Self {
        TypeSpec::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn union(members: impl IntoIterator<Item = TypeSpec>) -> Self {
        TypeSpec::Union(members.into_iter().collect())
    }

    pub fn tuple(elements: impl IntoIterator<Item = TypeSpec>) -> Self {
        TypeSpec::Tuple(elements.into_iter().collect())
    }

    pub fn reference(id: impl Into<String>) -> Self {
        TypeSpec::Reference(id.into())
    }

    /// A closed set of symbols: an atom restricted by `choices`.
    pub fn enumeration<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeSpec::atom().constraint(Constraint::choices(
            symbols.into_iter().map(|s| Value::String(s.into())),
        ))
    }

    /// Appends constraints, keeping any already attached.
    pub fn with_constraints(self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        match self {
            TypeSpec::WithConstraints {
                base,
                constraints: mut existing,
            } => {
                existing.extend(constraints);
                TypeSpec::WithConstraints {
                    base,
                    constraints: existing,
                }
            }
            base => TypeSpec::WithConstraints {
                base: Box::new(base),
                constraints: constraints.into_iter().collect(),
            },
        }
    }

    /// Appends a single constraint.
    pub fn constraint(self, constraint: Constraint) -> Self {
        self.with_constraints([constraint])
    }

    pub fn min_length(self, min: usize) -> Self {
        self.constraint(Constraint::MinLength(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.constraint(Constraint::MaxLength(max))
    }

    /// Adds a regex `format` constraint.
    ///
    /// The pattern is searched, not implicitly anchored; use `^...$` for a
    /// full match. Returns an error if the pattern does not compile.
    pub fn format(self, pattern: &str) -> Result<Self, regex::Error> {
        Ok(self.constraint(Constraint::format(pattern)?))
    }

    pub fn choices<I, V>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.constraint(Constraint::choices(choices))
    }

    pub fn gt(self, bound: impl Into<Bound>) -> Self {
        self.constraint(Constraint::Gt(bound.into()))
    }

    pub fn lt(self, bound: impl Into<Bound>) -> Self {
        self.constraint(Constraint::Lt(bound.into()))
    }

    pub fn gteq(self, bound: impl Into<Bound>) -> Self {
        self.constraint(Constraint::Gteq(bound.into()))
    }

    pub fn lteq(self, bound: impl Into<Bound>) -> Self {
        self.constraint(Constraint::Lteq(bound.into()))
    }

    pub fn min_items(self, min: usize) -> Self {
        self.constraint(Constraint::MinItems(min))
    }

    pub fn max_items(self, max: usize) -> Self {
        self.constraint(Constraint::MaxItems(max))
    }

    /// Requires a map to have exactly `size` keys.
    pub fn size(self, size: usize) -> Self {
        self.constraint(Constraint::Size(size))
    }

    /// Replaces the default message for failures of `kind`. The error code
    /// stays the constraint kind.
    ///
    /// ```rust
    /// use schemata::{validate, Policy, TypeSpec};
    /// use serde_json::json;
    ///
    /// let spec = TypeSpec::string()
    ///     .min_length(8)
    ///     .message("min_length", "password is too short");
    ///
    /// let errors = validate(&spec, &json!("hunter2"), &Policy::default())
    ///     .into_result()
    ///     .unwrap_err();
    /// assert_eq!(errors.first().code, "min_length");
    /// assert_eq!(errors.first().message, "password is too short");
    /// ```
    pub fn message(self, kind: impl Into<String>, message: impl Into<String>) -> Self {
        match self.with_constraints(std::iter::empty()) {
            TypeSpec::WithConstraints {
                base,
                mut constraints,
            } => {
                constraints.set_message(kind, message);
                TypeSpec::WithConstraints { base, constraints }
            }
            other => other,
        }
    }

    /// Returns the spec with any outer constraints stripped.
    pub fn base(&self) -> &TypeSpec {
        match self {
            TypeSpec::WithConstraints { base, .. } => base.base(),
            other => other,
        }
    }

    /// Returns the outermost constraint set, if any.
    pub fn constraints(&self) -> Option<&ConstraintSet> {
        match self {
            TypeSpec::WithConstraints { constraints, .. } => Some(constraints),
            _ => None,
        }
    }

    /// A short human name for the shape, used in error messages.
    pub fn shape_name(&self) -> String {
        match self {
            TypeSpec::Primitive(kind) => kind.name().to_string(),
            TypeSpec::Array(_) => "array".to_string(),
            TypeSpec::Map { .. } => "map".to_string(),
            TypeSpec::Union(_) => "union".to_string(),
            TypeSpec::Tuple(elements) => format!("tuple of {}", elements.len()),
            TypeSpec::Reference(id) => format!("reference to '{}'", id),
            TypeSpec::WithConstraints { base, .. } => base.shape_name(),
        }
    }

    /// Collects the ids of every referenced definition, in encounter order.
    pub fn collect_refs(&self, refs: &mut Vec<String>) {
        match self {
            TypeSpec::Primitive(_) => {}
            TypeSpec::Array(element) => element.collect_refs(refs),
            TypeSpec::Map { key, value } => {
                key.collect_refs(refs);
                value.collect_refs(refs);
            }
            TypeSpec::Union(members) | TypeSpec::Tuple(members) => {
                for member in members {
                    member.collect_refs(refs);
                }
            }
            TypeSpec::Reference(id) => refs.push(id.clone()),
            TypeSpec::WithConstraints { base, .. } => base.collect_refs(refs),
        }
    }
}

impl From<PrimitiveKind> for TypeSpec {
    fn from(kind: PrimitiveKind) -> Self {
        TypeSpec::Primitive(kind)
    }
}

impl From<&str> for TypeSpec {
    fn from(tag: &str) -> Self {
        TypeSpec::primitive(tag)
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<TypeSpec>();
    assert_sync::<TypeSpec>();
};
