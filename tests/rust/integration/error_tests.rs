use pgcypher::translate::{KindMapperError, TranslationError};
use serde_json::{json, Value};
use test_case::test_case;

use super::common::*;

fn return_a() -> Option<Value> {
    Some(projection(vec![item(var("a"), None)]))
}

#[test]
fn test_unknown_kind() {
    let query = query(single_part(
        vec![match_clause(vec![pattern(vec![node(Some("a"), &["Computer"])])], None)],
        vec![],
        return_a(),
    ));

    assert!(matches!(
        try_translate(&query),
        Err(TranslationError::KindMapping(KindMapperError::UnknownKind(kind))) if kind == "Computer"
    ));
}

#[test]
fn test_unresolved_identifier() {
    let query = query(single_part(
        vec![match_clause(vec![pattern(vec![node(Some("a"), &[])])], None)],
        vec![],
        Some(projection(vec![item(var("b"), None)])),
    ));

    assert!(matches!(
        try_translate(&query),
        Err(TranslationError::UnresolvedIdentifier(_))
    ));
}

#[test_case(json!({ "match": { "optional": true, "pattern": [pattern(vec![node(Some("a"), &[])])] } }); "optional match")]
#[test_case(json!({ "unwind": { "expression": { "list": [int(1)] }, "variable": { "symbol": "a" } } }); "unwind")]
fn test_unsupported_reading_clause(clause: Value) {
    let query = query(single_part(vec![clause], vec![], return_a()));

    assert!(matches!(
        try_translate(&query),
        Err(TranslationError::UnsupportedConstruct(_))
    ));
}

#[test]
fn test_create_is_unsupported() {
    let create = json!({ "create": { "pattern": [pattern(vec![node(Some("a"), &["User"])])] } });
    let query = query(single_part(vec![], vec![create], None));

    assert!(matches!(
        try_translate(&query),
        Err(TranslationError::UnsupportedConstruct(_))
    ));
}

#[test]
fn test_with_requires_alias_for_expressions() {
    let query = multi_part_query(
        vec![with_part(
            vec![match_clause(vec![pattern(vec![node(Some("a"), &[])])], None)],
            projection(vec![item(prop("a", "name"), None)]),
            None,
        )],
        single_part(vec![], vec![], Some(projection(vec![item(int(1), None)]))),
    );

    assert!(matches!(
        try_translate(&query),
        Err(TranslationError::UnsupportedConstruct(message)) if message.contains("aliased")
    ));
}

#[test]
fn test_relationship_variable_rebinding() {
    let query = query(single_part(
        vec![match_clause(
            vec![
                pattern(vec![node(None, &[]), rel(Some("r"), &[], "outbound"), node(None, &[])]),
                pattern(vec![node(None, &[]), rel(Some("r"), &[], "outbound"), node(None, &[])]),
            ],
            None,
        )],
        vec![],
        Some(projection(vec![item(var("r"), None)])),
    ));

    assert!(matches!(
        try_translate(&query),
        Err(TranslationError::UnsupportedConstruct(_))
    ));
}

#[test]
fn test_mixed_list_types() {
    let list = json!({ "list": [int(1), { "literal": { "bool": true } }] });
    let query = query(single_part(
        vec![match_clause(vec![pattern(vec![node(Some("a"), &[])])], None)],
        vec![],
        Some(projection(vec![item(list, Some("values"))])),
    ));

    assert!(matches!(
        try_translate(&query),
        Err(TranslationError::TypeIncompatibility(_))
    ));
}
