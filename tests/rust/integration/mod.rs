//! Integration tests - full translations of cypher syntax trees into PostgreSQL
//!
//! Trees are built in their JSON form, the same shape the command line accepts.

mod common;
mod error_tests;
mod expansion_tests;
mod match_tests;
mod mutation_tests;
mod parameter_tests;
mod projection_tests;
