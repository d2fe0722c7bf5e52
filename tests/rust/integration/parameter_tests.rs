use mockall::mock;
use pgcypher::config::TranslatorConfig;
use pgcypher::translate::{
    translate_with_negotiator, ParameterNegotiator, TranslationError, TranslationResult,
};
use serde_json::{json, Map, Value};

use super::common::*;

mock! {
    pub Negotiator {}

    impl ParameterNegotiator for Negotiator {
        fn negotiate(&self, symbol: &str, value: &Value) -> TranslationResult<Value>;
    }
}

fn name_query(where_clause: Value) -> pgcypher::cypher::RegularQuery {
    query(single_part(
        vec![match_clause(vec![pattern(vec![node(Some("a"), &[])])], Some(where_clause))],
        vec![],
        Some(projection(vec![item(var("a"), None)])),
    ))
}

fn supplied() -> Map<String, Value> {
    let mut parameters = Map::new();
    parameters.insert("name".to_string(), json!("bob"));
    parameters
}

#[test]
fn test_supplied_parameter_is_bound() {
    let query = name_query(equals(prop("a", "name"), param("name")));
    let translation = translate_with(&query, &supplied(), &TranslatorConfig::default()).unwrap();

    assert!(translation
        .to_sql(false)
        .unwrap()
        .contains("from node n0 where n0.properties ->> 'name' = @pi0::text)"));
    assert_eq!(translation.parameters.get("pi0"), Some(&json!("bob")));
}

#[test]
fn test_materialized_parameters_are_inlined() {
    let query = name_query(equals(prop("a", "name"), param("name")));
    let translation = translate_with(&query, &supplied(), &TranslatorConfig::default()).unwrap();

    let sql = translation.to_sql(true).unwrap();
    assert!(sql.contains("n0.properties ->> 'name' = 'bob'::text"));
    assert!(!sql.contains("@pi0"));
}

#[test]
fn test_repeated_parameter_is_negotiated_once() {
    let mut negotiator = MockNegotiator::new();
    negotiator
        .expect_negotiate()
        .withf(|symbol, _| symbol.to_string() == "name")
        .times(1)
        .returning(|_, value| Ok(Value::clone(value)));

    let disjunction = json!({
        "disjunction": [
            equals(prop("a", "name"), param("name")),
            equals(prop("a", "title"), param("name"))
        ]
    });

    let translation = translate_with_negotiator(
        &name_query(disjunction),
        &kinds(),
        &negotiator,
        &supplied(),
        &TranslatorConfig::default(),
    )
    .unwrap();

    let sql = translation.to_sql(false).unwrap();

    assert_eq!(translation.parameters.len(), 1);
    assert_eq!(sql.matches("@pi0::text").count(), 2);
    assert!(!sql.contains("@pi1"));
}

#[test]
fn test_negotiation_failure_aborts_translation() {
    let mut negotiator = MockNegotiator::new();
    negotiator
        .expect_negotiate()
        .returning(|symbol, _| Err(TranslationError::incompatible(format!("{symbol} is not bindable"))));

    let result = translate_with_negotiator(
        &name_query(equals(prop("a", "name"), param("name"))),
        &kinds(),
        &negotiator,
        &supplied(),
        &TranslatorConfig::default(),
    );

    assert!(matches!(result, Err(TranslationError::TypeIncompatibility(_))));
}

#[test]
fn test_unsigned_overflow_is_rejected() {
    let mut parameters = Map::new();
    parameters.insert("name".to_string(), json!(u64::MAX));

    let query = name_query(equals(prop("a", "name"), param("name")));
    let result = translate_with(&query, &parameters, &TranslatorConfig::default());

    assert!(matches!(result, Err(TranslationError::TypeIncompatibility(_))));
}
