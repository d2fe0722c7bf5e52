//! Cypher to PostgreSQL translation.
//!
//! [`translate`] walks a cypher AST once and produces a SQL statement built from a chain
//! of step CTEs, one per compiled pattern step, projection or mutation, together with the
//! parameters the statement binds.

pub mod constraints;
pub mod errors;
pub mod expansion;
pub mod expression;
pub mod functions;
pub mod hinting;
pub mod kinds;
pub mod model;
pub mod mutation;
pub mod parameters;
pub mod predicates;
pub mod projection;
pub mod query;
pub mod scope;
pub mod selectivity;
pub mod translator;
pub mod traversal;

use log::debug;
use serde_json::{Map, Value};

use crate::config::TranslatorConfig;
use crate::cypher::RegularQuery;
use crate::pgsql::{format_statement, OutputBuilder, Statement};

pub use errors::{TranslationError, TranslationResult};
pub use kinds::{InMemoryKindMapper, KindMapper, KindMapperError};
pub use parameters::{JsonParameterNegotiator, ParameterNegotiator};
pub use translator::Translator;

/// A compiled statement and the values of every parameter it references
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub statement: Statement,
    pub parameters: Map<String, Value>,
}

impl Translation {
    /// Renders the statement. With `materialize` set, parameter placeholders are replaced
    /// by their bound values.
    pub fn to_sql(&self, materialize: bool) -> TranslationResult<String> {
        let builder = if materialize {
            OutputBuilder::materialized()
        } else {
            OutputBuilder::new()
        };

        Ok(format_statement(&self.statement, builder)?)
    }
}

/// Translates `query` using the default JSON parameter negotiation
pub fn translate(
    query: &RegularQuery,
    kind_mapper: &dyn KindMapper,
    parameters: &Map<String, Value>,
    config: &TranslatorConfig,
) -> TranslationResult<Translation> {
    translate_with_negotiator(query, kind_mapper, &JsonParameterNegotiator, parameters, config)
}

pub fn translate_with_negotiator(
    query: &RegularQuery,
    kind_mapper: &dyn KindMapper,
    negotiator: &dyn ParameterNegotiator,
    parameters: &Map<String, Value>,
    config: &TranslatorConfig,
) -> TranslationResult<Translation> {
    let (statement, parameters) =
        Translator::new(config, kind_mapper, negotiator, parameters).translate(query)?;

    debug!("translated query binding {} parameter(s)", parameters.len());

    Ok(Translation {
        statement,
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::kinds::MockKindMapper;
    use super::*;

    fn match_users() -> RegularQuery {
        serde_json::from_value(json!({
            "single_query": {
                "single_part": {
                    "reading_clauses": [{
                        "match": {
                            "pattern": [{
                                "elements": [{ "node": { "variable": { "symbol": "a" }, "kinds": ["User"] } }]
                            }]
                        }
                    }],
                    "return_clause": {
                        "projection": { "items": [{ "expression": { "variable": { "symbol": "a" } } }] }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_kind_mapper_failure_is_wrapped() {
        let mut mapper = MockKindMapper::new();
        mapper
            .expect_map_kinds()
            .returning(|_| Err(KindMapperError::Unavailable("catalog offline".to_string())));

        let result = translate(&match_users(), &mapper, &Map::new(), &TranslatorConfig::default());

        assert_eq!(
            result,
            Err(TranslationError::KindMapping(KindMapperError::Unavailable(
                "catalog offline".to_string()
            )))
        );
    }

    #[test]
    fn test_kind_ids_come_from_mapper() {
        let mut mapper = MockKindMapper::new();
        mapper
            .expect_map_kinds()
            .withf(|kinds| kinds.len() == 1 && kinds[0] == "User")
            .returning(|_| Ok(vec![42]));

        let sql = translate(&match_users(), &mapper, &Map::new(), &TranslatorConfig::default())
            .unwrap()
            .to_sql(false)
            .unwrap();

        assert!(sql.contains("n0.kind_ids operator (pg_catalog.&&) array [42]::int2[]"));
    }
}
