//! Interoperability with JSON Schema.
//!
//! [`ToJsonSchema`] converts specs and records to draft 2020-12 fragments;
//! [`ReferenceGraph`] decides which named definitions an exported document
//! needs under `$defs`.

pub mod graph;
pub mod json_schema;

pub use graph::ReferenceGraph;
pub use json_schema::{definition_pointer, ToJsonSchema, DRAFT_2020_12};
