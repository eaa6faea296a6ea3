//! Validation error types.
//!
//! This module provides [`SchemaError`] for single validation failures and
//! [`SchemaErrors`] for accumulating multiple errors.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use stillwater::prelude::*;

use crate::path::JsonPath;

/// A single validation error with full context.
///
/// `SchemaError` captures everything a caller needs to report a failure:
/// - **path**: where in the data structure the error occurred
/// - **code**: machine-readable tag (`type`, `min_length`, `required`, ...)
/// - **message**: human-readable description of the failure
/// - **got** / **expected**: optional detail about the mismatch
///
/// # Example
///
/// ```rust
/// use schemata::{JsonPath, SchemaError};
///
/// let error = SchemaError::new(JsonPath::root().push_field("age"), "expected integer")
///     .with_code("type")
///     .with_got("string")
///     .with_expected("integer");
///
/// assert_eq!(error.code, "type");
/// assert_eq!(error.to_string(), "age: expected integer (expected: integer) (got: string)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    /// The path to the value that failed validation.
    pub path: JsonPath,
    /// Human-readable error message.
    pub message: String,
    /// The actual value that was received (formatted as string).
    pub got: Option<String>,
    /// Description of what was expected.
    pub expected: Option<String>,
    /// Machine-readable error code.
    pub code: String,
}

impl SchemaError {
    /// Creates a new error with the given path and message.
    ///
    /// The error code defaults to "validation_error". Use `with_code` to set
    /// a more specific code.
    pub fn new(path: JsonPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            got: None,
            expected: None,
            code: "validation_error".to_string(),
        }
    }

    /// Sets the error code and returns self for chaining.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Sets the "got" (actual value) field and returns self for chaining.
    pub fn with_got(mut self, got: impl Into<String>) -> Self {
        self.got = Some(got.into());
        self
    }

    /// Sets the "expected" field and returns self for chaining.
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path_str = if self.path.is_root() {
            "(root)".to_string()
        } else {
            self.path.to_string()
        };

        write!(f, "{}: {}", path_str, self.message)?;

        if let Some(ref expected) = self.expected {
            write!(f, " (expected: {})", expected)?;
        }
        if let Some(ref got) = self.got {
            write!(f, " (got: {})", got)?;
        }

        Ok(())
    }
}

impl std::error::Error for SchemaError {}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<SchemaError>();
    assert_sync::<SchemaError>();
};

/// A non-empty collection of validation errors.
///
/// `SchemaErrors` wraps a `NonEmptyVec<SchemaError>` so a failure always
/// carries at least one error. Errors from independent branches are joined
/// with [`Semigroup::combine`], which keeps their order.
///
/// ```rust
/// use schemata::{JsonPath, SchemaError, SchemaErrors};
/// use stillwater::prelude::*;
///
/// let errors1 = SchemaErrors::single(
///     SchemaError::new(JsonPath::root().push_index(0), "expected integer").with_code("type")
/// );
/// let errors2 = SchemaErrors::single(
///     SchemaError::new(JsonPath::root().push_index(3), "expected integer").with_code("type")
/// );
///
/// let combined = errors1.combine(errors2);
/// assert_eq!(combined.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaErrors(NonEmptyVec<SchemaError>);

impl SchemaErrors {
    /// Creates a `SchemaErrors` containing a single error.
    pub fn single(error: SchemaError) -> Self {
        Self(NonEmptyVec::singleton(error))
    }

    /// Creates a `SchemaErrors` from a `NonEmptyVec` of errors.
    pub fn from_non_empty(errors: NonEmptyVec<SchemaError>) -> Self {
        Self(errors)
    }

    /// Creates a `SchemaErrors` from a `Vec<SchemaError>`.
    ///
    /// Returns `None` when the vec is empty, which callers treat as success.
    pub fn from_vec(errors: Vec<SchemaError>) -> Option<Self> {
        NonEmptyVec::from_vec(errors).map(Self)
    }

    /// Returns the number of errors in this collection.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the collection is non-empty by construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over the contained errors.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaError> {
        self.0.iter()
    }

    /// Returns all errors at the specified path.
    pub fn at_path(&self, path: &JsonPath) -> Vec<&SchemaError> {
        self.0.iter().filter(|e| &e.path == path).collect()
    }

    /// Returns all errors with the specified error code.
    pub fn with_code(&self, code: &str) -> Vec<&SchemaError> {
        self.0.iter().filter(|e| e.code == code).collect()
    }

    /// Returns the error codes in order.
    pub fn codes(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.code.as_str()).collect()
    }

    /// Returns the first error in the collection.
    pub fn first(&self) -> &SchemaError {
        self.0.head()
    }

    /// Groups messages by JSON pointer, in first-seen order.
    ///
    /// This is the shape most HTTP APIs return to clients.
    pub fn by_pointer(&self) -> IndexMap<String, Vec<String>> {
        let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
        for error in self.0.iter() {
            grouped
                .entry(error.path.to_pointer())
                .or_default()
                .push(error.message.clone());
        }
        grouped
    }

    /// Converts this collection into a `Vec<SchemaError>`.
    pub fn into_vec(self) -> Vec<SchemaError> {
        self.0.into_vec()
    }

    /// Returns a reference to the underlying `NonEmptyVec`.
    pub fn as_non_empty_vec(&self) -> &NonEmptyVec<SchemaError> {
        &self.0
    }
}

impl Semigroup for SchemaErrors {
    fn combine(self, other: Self) -> Self {
        SchemaErrors(self.0.combine(other.0))
    }
}

impl Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation failed with {} error(s):", self.len())?;
        for (i, error) in self.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

impl IntoIterator for SchemaErrors {
    type Item = SchemaError;
    type IntoIter = std::vec::IntoIter<SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_vec().into_iter()
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<SchemaErrors>();
    assert_sync::<SchemaErrors>();
};
