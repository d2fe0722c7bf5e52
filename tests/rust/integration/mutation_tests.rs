use pgcypher::translate::TranslationError;
use serde_json::json;

use super::common::*;

fn match_a() -> serde_json::Value {
    match_clause(vec![pattern(vec![node(Some("a"), &[])])], None)
}

fn set_property(variable: &str, key: &str, value: serde_json::Value) -> serde_json::Value {
    json!({ "set": { "items": [{ "property": { "target": { "atom": var(variable), "symbol": key }, "value": value } }] } })
}

#[test]
fn test_set_property_updates_and_reprojects() {
    let query = query(single_part(
        vec![match_a()],
        vec![set_property("a", "x", int(1))],
        Some(projection(vec![item(var("a"), None)])),
    ));

    assert_eq!(
        sql(&query),
        "with s0 as (select (n0.id, n0.kind_ids, n0.properties)::nodecomposite as n0 from node n0), \
         s1 as (update node n1 set properties = n1.properties || jsonb_build_object('x', 1)::jsonb \
         from s0 where (s0.n0).id = n1.id returning (n1.id, n1.kind_ids, n1.properties)::nodecomposite as n1) \
         select s1.n1 as a from s1;"
    );
}

#[test]
fn test_remove_kind() {
    let remove = json!({ "remove": { "items": [{ "kinds": { "variable": { "symbol": "a" }, "kinds": ["Admin"] } }] } });
    let query = query(single_part(
        vec![match_a()],
        vec![remove],
        Some(projection(vec![item(var("a"), None)])),
    ));

    assert!(sql(&query).contains("update node n1 set kind_ids = n1.kind_ids - array [3]::int2[] from s0"));
}

#[test]
fn test_set_kind_on_edge_is_rejected() {
    let set = json!({ "set": { "items": [{ "kinds": { "variable": { "symbol": "r" }, "kinds": ["Admin"] } }] } });
    let query = query(single_part(
        vec![match_clause(
            vec![pattern(vec![node(None, &[]), rel(Some("r"), &[], "outbound"), node(None, &[])])],
            None,
        )],
        vec![set],
        None,
    ));

    assert!(try_translate(&query).is_err());
}

#[test]
fn test_delete_node() {
    let delete = json!({ "delete": { "expressions": [var("a")] } });
    let query = query(single_part(vec![match_a()], vec![delete], None));

    let sql = sql(&query);

    assert!(sql.contains(
        "s1 as (delete from node n1 using s0 where (s0.n0).id = n1.id \
         returning (n1.id, n1.kind_ids, n1.properties)::nodecomposite as n1)"
    ));
    assert!(sql.ends_with("select 1 from s1;"));
}

#[test]
fn test_delete_then_count_reads_delete_frame() {
    let delete = json!({ "delete": { "expressions": [var("a")] } });
    let query = query(single_part(
        vec![match_a()],
        vec![delete],
        Some(projection(vec![item(function("count", vec![]), Some("total"))])),
    ));

    assert_eq!(
        sql(&query),
        "with s0 as (select (n0.id, n0.kind_ids, n0.properties)::nodecomposite as n0 from node n0), \
         s1 as (delete from node n1 using s0 where (s0.n0).id = n1.id \
         returning (n1.id, n1.kind_ids, n1.properties)::nodecomposite as n1) \
         select count(*)::int8 as total from s1;"
    );
}

#[test]
fn test_part_after_delete_reads_delete_frame() {
    let delete = json!({ "delete": { "expressions": [var("a")] } });
    let part = json!({
        "reading_clauses": [match_a()],
        "updating_clauses": [delete],
        "with": { "projection": projection(vec![item(function("count", vec![]), Some("c"))]) }
    });

    let query = multi_part_query(
        vec![part],
        single_part(vec![], vec![], Some(projection(vec![item(var("c"), None)]))),
    );

    let sql = sql(&query);

    assert!(sql.contains("s2 as (select count(*)::int8 as i0 from s1)"));
    assert!(sql.ends_with("select s2.i0 as c from s2;"));
}

#[test]
fn test_detach_delete_edge() {
    let delete = json!({ "delete": { "detach": true, "expressions": [var("r")] } });
    let query = query(single_part(
        vec![match_clause(
            vec![pattern(vec![node(None, &[]), rel(Some("r"), &["MemberOf"], "outbound"), node(None, &[])])],
            None,
        )],
        vec![delete],
        None,
    ));

    let sql = sql(&query);

    assert!(sql.contains("delete from edge e1 using s0 where (s0.e0).id = e1.id returning "));
    assert!(sql.contains("(e1.id, e1.start_id, e1.end_id, e1.kind_id, e1.properties)::edgecomposite as e1)"));
}

#[test]
fn test_delete_requires_variable() {
    let delete = json!({ "delete": { "expressions": [prop("a", "name")] } });
    let query = query(single_part(vec![match_a()], vec![delete], None));

    assert!(matches!(
        try_translate(&query),
        Err(TranslationError::UnsupportedConstruct(_))
    ));
}
