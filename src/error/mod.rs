//! Error types.
//!
//! [`SchemaError`] and [`SchemaErrors`] describe data that failed validation;
//! [`SpecError`] describes a type specification that could not be built.

mod schema_error;
mod spec_error;

pub use schema_error::{SchemaError, SchemaErrors};
pub use spec_error::SpecError;
