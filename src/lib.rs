//! pgcypher - cypher to PostgreSQL translation
//!
//! This crate compiles cypher syntax trees into PostgreSQL statements over a property
//! graph stored in `node` and `edge` tables:
//! - Source AST and visitor walk (`cypher`)
//! - SQL AST, type system and renderer (`pgsql`)
//! - Pattern, expansion, projection and mutation compilation (`translate`)

pub mod config;
pub mod cypher;
pub mod pgsql;
pub mod translate;
