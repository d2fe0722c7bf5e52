use pgcypher::config::TranslatorConfig;
use pgcypher::translate::TranslationError;
use serde_json::{json, Map};

use super::common::*;

fn expansion_query(start: Option<i64>, end: Option<i64>) -> pgcypher::cypher::RegularQuery {
    query(single_part(
        vec![match_clause(
            vec![pattern(vec![
                node(Some("a"), &["User"]),
                rel_range(&["MemberOf"], start, end),
                node(Some("b"), &[]),
            ])],
            None,
        )],
        vec![],
        Some(projection(vec![item(var("b"), None)])),
    ))
}

fn shortest_query(all: bool) -> pgcypher::cypher::RegularQuery {
    let part = json!({
        "shortest_path": !all,
        "all_shortest_paths": all,
        "elements": [
            node(Some("a"), &["User"]),
            rel_range(&["MemberOf"], None, None),
            node(Some("b"), &["Group"])
        ]
    });

    query(single_part(
        vec![match_clause(vec![part], None)],
        vec![],
        Some(projection(vec![item(var("b"), None)])),
    ))
}

#[test]
fn test_bounded_expansion_is_recursive() {
    let sql = sql(&expansion_query(Some(1), Some(3)));

    assert!(sql.contains(
        "with recursive ex0(root_id, next_id, depth, satisfied, is_cycle, path) as (select e0.start_id, e0.end_id, 1, "
    ));
    assert!(sql.contains(" union all select ex0.root_id, e0.end_id, ex0.depth + 1, "));
    assert!(sql.contains("join edge e0 on e0.start_id = ex0.next_id"));
    assert!(sql.contains("ex0.depth < 3"));
    assert!(sql.contains("not ex0.is_cycle"));
    assert!(sql.contains("join node n0 on n0.id = ex0.root_id join node n1 on n1.id = ex0.next_id"));
    assert!(sql.ends_with("select s0.n1 as b from s0;"));
}

#[test]
fn test_minimum_depth_filters_expansion_rows() {
    let sql = sql(&expansion_query(Some(2), Some(4)));

    assert!(sql.contains("ex0.depth >= 2"));
    assert!(sql.contains("ex0.depth < 4"));
}

#[test]
fn test_unbounded_expansion_uses_configured_depth() {
    assert!(sql(&expansion_query(None, None)).contains("ex0.depth < 5"));

    let config = TranslatorConfig::default()
        .with_max_traversal_depth(Some(7))
        .unwrap();
    let rendered = translate_with(&expansion_query(None, None), &Map::new(), &config)
        .unwrap()
        .to_sql(false)
        .unwrap();

    assert!(rendered.contains("ex0.depth < 7"));
}

#[test]
fn test_empty_range_is_rejected() {
    let result = try_translate(&expansion_query(Some(3), Some(2)));
    assert!(matches!(result, Err(TranslationError::UnsupportedConstruct(_))));

    let result = try_translate(&expansion_query(Some(0), Some(2)));
    assert!(matches!(result, Err(TranslationError::UnsupportedConstruct(_))));
}

#[test]
fn test_shortest_path_binds_harness_parameters() {
    let translation = try_translate(&shortest_query(false)).unwrap();
    let sql = translation.to_sql(false).unwrap();

    assert!(sql.starts_with("with s0 as (with ex0(root_id, next_id, depth, satisfied, is_cycle, path) as (select * from unidirectional_sp_harness(@pi0::text, @pi1::text, 5))"));
    assert!(!sql.contains("with recursive"));

    assert_eq!(translation.parameters.len(), 2);
    for key in ["pi0", "pi1"] {
        let front = translation.parameters[key].as_str().unwrap();
        assert!(front.starts_with(
            "insert into next_front (root_id, next_id, depth, satisfied, is_cycle, path) select "
        ));
    }
}

#[test]
fn test_all_shortest_paths_harness_is_configurable() {
    let sql = sql(&shortest_query(true));
    assert!(sql.contains("from unidirectional_asp_harness(@pi0::text, @pi1::text, 5)"));

    let config = TranslatorConfig {
        all_shortest_paths_harness: "bidirectional_asp_harness".to_string(),
        ..Default::default()
    };
    let rendered = translate_with(&shortest_query(true), &Map::new(), &config)
        .unwrap()
        .to_sql(false)
        .unwrap();

    assert!(rendered.contains("from bidirectional_asp_harness(@pi0::text, @pi1::text, 5)"));
}

#[test]
fn test_shortest_path_from_bound_node_is_unsupported() {
    let part = json!({
        "shortest_path": true,
        "elements": [node(Some("a"), &[]), rel_range(&[], None, None), node(Some("b"), &[])]
    });

    let query = query(single_part(
        vec![
            match_clause(vec![pattern(vec![node(Some("a"), &["User"])])], None),
            match_clause(vec![part], None),
        ],
        vec![],
        Some(projection(vec![item(var("b"), None)])),
    ));

    assert!(matches!(
        try_translate(&query),
        Err(TranslationError::UnsupportedConstruct(_))
    ));
}
