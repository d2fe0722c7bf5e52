//! Cypher source AST consumed by the translator.
//!
//! Trees are produced by an external parser and handed to [`crate::translate`]
//! read-only. All node types derive `serde` so a parsed tree can be supplied as
//! JSON or YAML.

pub mod ast;
pub mod walk;

pub use ast::*;
