use serde_json::json;

use super::common::*;

fn match_a(kinds: &[&str]) -> serde_json::Value {
    match_clause(vec![pattern(vec![node(Some("a"), kinds)])], None)
}

#[test]
fn test_return_property_keeps_jsonb() {
    let query = query(single_part(
        vec![match_a(&[])],
        vec![],
        Some(projection(vec![item(prop("a", "name"), Some("name"))])),
    ));

    assert!(sql(&query).ends_with("select (s0.n0).properties -> 'name' as name from s0;"));
}

#[test]
fn test_return_modifiers() {
    let mut projection = projection(vec![item(prop("a", "name"), Some("name"))]);
    projection["distinct"] = json!(true);
    projection["order"] = json!({ "items": [{ "ascending": false, "expression": var("name") }] });
    projection["skip"] = json!({ "value": int(5) });
    projection["limit"] = json!({ "value": int(10) });

    let query = query(single_part(vec![match_a(&[])], vec![], Some(projection)));

    assert!(sql(&query).ends_with(
        "select distinct (s0.n0).properties -> 'name' as name from s0 order by name desc offset 5 limit 10;"
    ));
}

#[test]
fn test_return_aggregate_groups_by_other_items() {
    let query = query(single_part(
        vec![match_a(&[])],
        vec![],
        Some(projection(vec![
            item(prop("a", "dept"), Some("dept")),
            item(function("count", vec![]), Some("total")),
        ])),
    ));

    assert!(sql(&query).ends_with(
        "select (s0.n0).properties -> 'dept' as dept, count(*)::int8 as total from s0 group by (s0.n0).properties -> 'dept';"
    ));
}

#[test]
fn test_with_projects_and_narrows_scope() {
    let query = multi_part_query(
        vec![with_part(
            vec![match_a(&["User"])],
            projection(vec![
                item(prop("a", "dept"), Some("dept")),
                item(function("count", vec![var("a")]), Some("total")),
            ]),
            None,
        )],
        single_part(
            vec![],
            vec![],
            Some(projection(vec![item(var("dept"), None), item(var("total"), None)])),
        ),
    );

    let sql = sql(&query);

    assert!(sql.contains(
        "s1 as (select (s0.n0).properties -> 'dept' as i0, count(s0.n0)::int8 as i1 from s0 group by (s0.n0).properties -> 'dept')"
    ));
    assert!(sql.ends_with("select s1.i0 as dept, s1.i1 as total from s1;"));
}

#[test]
fn test_with_where_filters_projection() {
    let query = multi_part_query(
        vec![with_part(
            vec![match_a(&[])],
            projection(vec![item(var("a"), None)]),
            Some(equals(prop("a", "name"), string("x"))),
        )],
        single_part(vec![], vec![], Some(projection(vec![item(var("a"), None)]))),
    );

    let sql = sql(&query);

    assert!(sql.contains("s1 as (select s0.n0 as n0 from s0)"));
    assert!(sql.contains("s2 as (select s1.n0 as n0 from s1 where (s1.n0).properties ->> 'name' = 'x')"));
    assert!(sql.ends_with("select s2.n0 as a from s2;"));
}

#[test]
fn test_with_drops_unprojected_bindings() {
    let query = multi_part_query(
        vec![with_part(
            vec![match_clause(
                vec![pattern(vec![node(Some("a"), &[]), rel(None, &[], "outbound"), node(Some("b"), &[])])],
                None,
            )],
            projection(vec![item(var("b"), None)]),
            None,
        )],
        single_part(vec![], vec![], Some(projection(vec![item(var("a"), None)]))),
    );

    assert!(matches!(
        try_translate(&query),
        Err(pgcypher::translate::TranslationError::UnresolvedIdentifier(_))
    ));
}

#[test]
fn test_aliased_property_compared_after_with() {
    let query = multi_part_query(
        vec![with_part(
            vec![match_a(&[])],
            projection(vec![item(prop("a", "name"), Some("n"))]),
            Some(equals(var("n"), string("z"))),
        )],
        single_part(vec![], vec![], Some(projection(vec![item(var("n"), None)]))),
    );

    let sql = sql(&query);

    assert!(sql.contains("s1 as (select (s0.n0).properties -> 'name' as i0 from s0)"));
    assert!(sql.contains("s2 as (select s1.i0 as i0 from s1 where s1.i0 #>> '{}' = 'z')"));
    assert!(sql.ends_with("select s2.i0 as n from s2;"));
}

#[test]
fn test_aliased_property_cast_for_numeric_comparison() {
    let older = json!({
        "comparison": { "left": var("age"), "partials": [{ "operator": "greater_than", "right": int(30) }] }
    });

    let query = multi_part_query(
        vec![with_part(
            vec![match_a(&[])],
            projection(vec![item(prop("a", "age"), Some("age"))]),
            Some(older),
        )],
        single_part(vec![], vec![], Some(projection(vec![item(var("age"), None)]))),
    );

    assert!(sql(&query).contains("where (s1.i0 #>> '{}')::int8 > 30)"));
}

#[test]
fn test_string_concatenation_groups_lookup() {
    let greeting = json!({
        "arithmetic": { "left": string("x"), "partials": [{ "operator": "add", "right": prop("a", "name") }] }
    });

    let query = query(single_part(
        vec![match_a(&[])],
        vec![],
        Some(projection(vec![item(greeting, Some("greeting"))])),
    ));

    assert!(sql(&query).ends_with("select 'x' || ((s0.n0).properties ->> 'name') as greeting from s0;"));
}
