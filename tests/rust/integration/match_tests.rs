use super::common::*;

/// The CTE containing `marker` and the frame it selects from
fn frame_reading(sql: &str, marker: &str) -> (String, String) {
    let head = &sql[..sql.find(marker).expect("marker should be rendered")];
    let source = head[head.rfind("from ").expect("cte should select from a frame") + 5..].to_string();

    let header = &head[..head.rfind(" as (select").expect("cte header should precede marker")];
    let frame = header[header.rfind(' ').map_or(0, |at| at + 1)..].to_string();

    (frame, source)
}

#[test]
fn test_single_node_match() {
    let query = query(single_part(
        vec![match_clause(vec![pattern(vec![node(Some("a"), &[])])], None)],
        vec![],
        Some(projection(vec![item(var("a"), None)])),
    ));

    assert_eq!(
        sql(&query),
        "with s0 as (select (n0.id, n0.kind_ids, n0.properties)::nodecomposite as n0 from node n0) select s0.n0 as a from s0;"
    );
}

#[test]
fn test_fixed_length_traversal() {
    let query = query(single_part(
        vec![match_clause(
            vec![pattern(vec![
                node_with_properties(Some("a"), &["User"], &[("name", string("x"))]),
                rel(None, &["MemberOf"], "outbound"),
                node(Some("b"), &[]),
            ])],
            None,
        )],
        vec![],
        Some(projection(vec![item(var("b"), None)])),
    ));

    let sql = sql(&query);

    assert!(sql.starts_with(
        "with s0 as (select (n0.id, n0.kind_ids, n0.properties)::nodecomposite as n0, \
         (e0.id, e0.start_id, e0.end_id, e0.kind_id, e0.properties)::edgecomposite as e0, \
         (n1.id, n1.kind_ids, n1.properties)::nodecomposite as n1 \
         from edge e0 join node n0 on n0.id = e0.start_id join node n1 on n1.id = e0.end_id where "
    ));
    assert!(sql.contains("e0.kind_id = any (array [2]::int2[])"));
    assert!(sql.contains("n0.kind_ids operator (pg_catalog.&&) array [1]::int2[]"));
    assert!(sql.contains("n0.properties ->> 'name' = 'x'"));
    assert!(sql.ends_with(") select s0.n1 as b from s0;"));
}

#[test]
fn test_inbound_traversal_joins() {
    let query = query(single_part(
        vec![match_clause(
            vec![pattern(vec![
                node(Some("a"), &[]),
                rel(Some("r"), &[], "inbound"),
                node(Some("b"), &[]),
            ])],
            None,
        )],
        vec![],
        Some(projection(vec![item(var("r"), None)])),
    ));

    let sql = sql(&query);

    assert!(sql.contains("from edge e0 join node n0 on n0.id = e0.end_id join node n1 on n1.id = e0.start_id"));
    assert!(sql.ends_with("select s0.e0 as r from s0;"));
}

#[test]
fn test_where_kind_matcher() {
    let matcher = serde_json::json!({ "kind_matcher": { "reference": var("a"), "kinds": ["Admin"] } });
    let query = query(single_part(
        vec![match_clause(vec![pattern(vec![node(Some("a"), &[])])], Some(matcher))],
        vec![],
        Some(projection(vec![item(var("a"), None)])),
    ));

    assert!(sql(&query).contains("from node n0 where n0.kind_ids operator (pg_catalog.&&) array [3]::int2[])"));
}

#[test]
fn test_second_match_selects_from_previous_frame() {
    let query = query(single_part(
        vec![
            match_clause(vec![pattern(vec![node(Some("a"), &["User"])])], None),
            match_clause(vec![pattern(vec![node(Some("g"), &["Group"])])], None),
        ],
        vec![],
        Some(projection(vec![item(var("a"), None), item(var("g"), None)])),
    ));

    let sql = sql(&query);

    assert!(sql.contains("s1 as (select s0.n0 as n0, (n1.id, n1.kind_ids, n1.properties)::nodecomposite as n1 from s0, node n1 where n1.kind_ids operator (pg_catalog.&&) array [4]::int2[])"));
    assert!(sql.ends_with("select s1.n0 as a, s1.n1 as g from s1;"));
}

#[test]
fn test_pattern_predicate_becomes_exists() {
    let predicate = serde_json::json!({
        "pattern_predicate": {
            "elements": [node(Some("a"), &[]), rel(None, &["MemberOf"], "outbound"), node(None, &[])]
        }
    });

    let query = query(single_part(
        vec![match_clause(vec![pattern(vec![node(Some("a"), &[])])], Some(predicate))],
        vec![],
        Some(projection(vec![item(var("a"), None)])),
    ));

    let sql = sql(&query);

    assert!(sql.contains("from node n0 where exists (select 1 from edge e0 where n0.id = e0.start_id"));
    assert!(sql.contains("e0.kind_id = any (array [2]::int2[])"));
}

#[test]
fn test_second_hop_joins_from_first_hop_frame() {
    let query = query(single_part(
        vec![match_clause(
            vec![pattern(vec![
                node(Some("a"), &[]),
                rel(None, &[], "outbound"),
                node(Some("b"), &[]),
                rel(None, &[], "outbound"),
                node(Some("c"), &["User"]),
            ])],
            None,
        )],
        vec![],
        Some(projection(vec![item(var("c"), None)])),
    ));

    let sql = sql(&query);

    assert!(sql.contains(
        "s1 as (select s0.n0 as n0, s0.e0 as e0, s0.n1 as n1, \
         (e1.id, e1.start_id, e1.end_id, e1.kind_id, e1.properties)::edgecomposite as e1, \
         (n2.id, n2.kind_ids, n2.properties)::nodecomposite as n2 \
         from s0 join edge e1 on (s0.n1).id = e1.start_id join node n2 on n2.id = e1.end_id \
         where n2.kind_ids operator (pg_catalog.&&) array [1]::int2[])"
    ));
    assert!(!sql.contains("from s1 join"));
    assert!(sql.ends_with("select s1.n2 as c from s1;"));
}

#[test]
fn test_step_after_expansion_joins_from_expansion_frame() {
    let query = query(single_part(
        vec![match_clause(
            vec![pattern(vec![
                node(Some("a"), &[]),
                rel_range(&[], None, Some(3)),
                node(Some("b"), &[]),
                rel(None, &[], "outbound"),
                node(Some("c"), &[]),
            ])],
            None,
        )],
        vec![],
        Some(projection(vec![item(var("c"), None)])),
    ));

    let sql = sql(&query);

    assert!(sql.contains("from s0 join edge e1 on (s0.n1).id = e1.start_id join node n2 on n2.id = e1.end_id"));
    assert!(!sql.contains("from s1 join"));
    assert!(sql.ends_with("select s1.n2 as c from s1;"));
}

#[test]
fn test_match_after_with_joins_from_with_frame() {
    let query = multi_part_query(
        vec![with_part(
            vec![match_clause(vec![pattern(vec![node(Some("a"), &[])])], None)],
            projection(vec![item(var("a"), None)]),
            None,
        )],
        single_part(
            vec![match_clause(
                vec![pattern(vec![node(Some("a"), &[]), rel(None, &[], "outbound"), node(Some("b"), &[])])],
                None,
            )],
            vec![],
            Some(projection(vec![item(var("b"), None)])),
        ),
    );

    let sql = sql(&query);
    let (frame, source) = frame_reading(&sql, " join edge e0 on ");

    assert_ne!(frame, source);
    assert!(sql.contains(&format!("from {source} join edge e0 on ({source}.n0).id = e0.start_id")));
    assert!(sql.ends_with(&format!("select {frame}.n1 as b from {frame};")));
}

#[test]
fn test_contains_against_property_of_other_node() {
    let contains = serde_json::json!({
        "comparison": {
            "left": prop("a", "name"),
            "partials": [{ "operator": "contains", "right": prop("b", "name") }]
        }
    });

    let query = query(single_part(
        vec![match_clause(
            vec![pattern(vec![node(Some("a"), &[]), rel(None, &[], "outbound"), node(Some("b"), &[])])],
            Some(contains),
        )],
        vec![],
        Some(projection(vec![item(var("b"), None)])),
    ));

    assert!(sql(&query).contains("n0.properties ->> 'name' like '%' || (n1.properties ->> 'name') || '%'"));
}
