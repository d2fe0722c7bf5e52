//! Unit tests - public API checks that need no full translation
//!
//! Covers syntax tree deserialization and rendering of hand-built SQL trees.

mod ast_deserialization_tests;
mod sql_rendering_tests;
