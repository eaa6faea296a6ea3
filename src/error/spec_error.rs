//! Errors raised while building a type specification.
//!
//! These are programmer errors: a schema that is structurally impossible to
//! interpret. Bad input data never produces a [`SpecError`]; it produces
//! [`SchemaErrors`](super::SchemaErrors).

use thiserror::Error;

/// A type specification could not be constructed.
#[derive(Debug, Error)]
pub enum SpecError {
    /// A descriptor used a variant key the model does not know.
    #[error("unknown type specification variant '{0}'")]
    UnknownVariant(String),

    /// A descriptor had the right variant but the wrong payload shape.
    #[error("malformed '{variant}' descriptor: {reason}")]
    MalformedDescriptor {
        /// The variant being parsed.
        variant: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A `format` constraint carried an invalid regular expression.
    #[error("invalid format pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern source text.
        pattern: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// A known constraint kind carried a value of the wrong shape.
    #[error("invalid value for constraint '{kind}': {reason}")]
    InvalidConstraint {
        /// The constraint kind.
        kind: String,
        /// What was wrong with the value.
        reason: String,
    },
}

impl SpecError {
    pub(crate) fn malformed(variant: impl Into<String>, reason: impl Into<String>) -> Self {
        SpecError::MalformedDescriptor {
            variant: variant.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn constraint(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        SpecError::InvalidConstraint {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}
