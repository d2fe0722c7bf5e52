//! PostgreSQL SQL AST produced by the translator, with its type system and renderer.

pub mod format;
pub mod identifiers;
pub mod model;
pub mod operators;
pub mod types;

pub use format::{format_expression, format_statement, FormatError, OutputBuilder, ToSql};
pub use identifiers::{names, CompoundIdentifier, Identifier, IdentifierSet};
pub use model::*;
pub use operators::Operator;
pub use types::{value_data_type, DataType};
