//! Paths locating values inside nested data.
//!
//! This module provides [`JsonPath`] and [`PathSegment`]. Every
//! [`SchemaError`](crate::SchemaError) carries a path so callers can point at
//! the exact offending field, index or map key.

use std::fmt::{self, Display};

/// A segment of a path.
///
/// Fields come from record layers, indices from arrays and tuples, and keys
/// from map validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A record field access (e.g., `user`, `email`)
    Field(String),
    /// An array or tuple position (e.g., `[0]`, `[42]`)
    Index(usize),
    /// A map key, in its external (string) representation
    Key(String),
}

impl PathSegment {
    /// Creates a new field segment.
    pub fn field(name: impl Into<String>) -> Self {
        PathSegment::Field(name.into())
    }

    /// Creates a new index segment.
    pub fn index(idx: usize) -> Self {
        PathSegment::Index(idx)
    }

    /// Creates a new map key segment.
    pub fn key(key: impl Into<String>) -> Self {
        PathSegment::Key(key.into())
    }
}

/// A path to a value in a nested structure.
///
/// `JsonPath` represents locations like `users[0].email` and is built
/// incrementally while the validator descends. Paths are immutable: every
/// `push_*` returns a new path.
///
/// # Example
///
/// ```rust
/// use schemata::JsonPath;
///
/// let path = JsonPath::root()
///     .push_field("users")
///     .push_index(0)
///     .push_key("email");
///
/// assert_eq!(path.to_string(), "users[0].email");
/// assert_eq!(path.to_pointer(), "/users/0/email");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Creates an empty path representing the root value.
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a path from a single field segment.
    pub fn from_field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Field(name.into())],
        }
    }

    /// Creates a path from a single index segment.
    pub fn from_index(idx: usize) -> Self {
        Self {
            segments: vec![PathSegment::Index(idx)],
        }
    }

    /// Creates a path from an ordered list of segments.
    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    /// Returns a new path with a field segment appended.
    pub fn push_field(&self, name: impl Into<String>) -> Self {
        self.push(PathSegment::Field(name.into()))
    }

    /// Returns a new path with an index segment appended.
    pub fn push_index(&self, index: usize) -> Self {
        self.push(PathSegment::Index(index))
    }

    /// Returns a new path with a map key segment appended.
    pub fn push_key(&self, key: impl Into<String>) -> Self {
        self.push(PathSegment::Key(key.into()))
    }

    /// Returns true if this is the root path (no segments).
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments in this path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns an iterator over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// Returns the parent path (all segments except the last), or None if this is root.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    /// Returns the last segment, or None if this is root.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Renders the path as an RFC 6901 JSON pointer (`/items/1/name`).
    ///
    /// The root path renders as the empty string.
    pub fn to_pointer(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                PathSegment::Field(name) | PathSegment::Key(name) => {
                    out.push_str(&name.replace('~', "~0").replace('/', "~1"));
                }
                PathSegment::Index(idx) => out.push_str(&idx.to_string()),
            }
        }
        out
    }
}

impl Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) | PathSegment::Key(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}
