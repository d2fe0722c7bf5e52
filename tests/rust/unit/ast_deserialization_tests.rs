//! Unit tests for the JSON form of cypher syntax trees

#[cfg(test)]
mod ast_deserialization_tests {
    use pgcypher::cypher::*;
    use serde_json::json;

    #[test]
    fn test_variable_length_pattern() {
        let parsed: RegularQuery = serde_json::from_value(json!({
            "single_query": {
                "single_part": {
                    "reading_clauses": [{
                        "match": {
                            "pattern": [{
                                "elements": [
                                    { "node": { "variable": { "symbol": "a" }, "kinds": ["User"] } },
                                    { "relationship": { "kinds": ["MemberOf"], "range": { "start": 1, "end": 3 } } },
                                    { "node": { "variable": { "symbol": "b" } } }
                                ]
                            }]
                        }
                    }],
                    "return_clause": {
                        "projection": { "items": [{ "expression": { "variable": { "symbol": "b" } } }] }
                    }
                }
            }
        }))
        .unwrap();

        let expected = RegularQuery {
            single_query: SingleQuery::SinglePart(SinglePartQuery {
                reading_clauses: vec![ReadingClause::Match(Match {
                    optional: false,
                    pattern: vec![PatternPart {
                        elements: vec![
                            PatternElement::Node(NodePattern::new(Some("a"), &["User"])),
                            PatternElement::Relationship(
                                RelationshipPattern::new(None, &["MemberOf"], Direction::Outbound)
                                    .with_range(Some(1), Some(3)),
                            ),
                            PatternElement::Node(NodePattern::new(Some("b"), &[])),
                        ],
                        ..Default::default()
                    }],
                    where_clause: None,
                })],
                updating_clauses: vec![],
                return_clause: Some(Return {
                    projection: Projection::of(vec![ProjectionItem::new(Expression::variable("b"))]),
                }),
            }),
        };

        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_sort_items_default_to_ascending() {
        let order: Order = serde_json::from_value(json!({
            "items": [
                { "expression": { "variable": { "symbol": "a" } } },
                { "ascending": false, "expression": { "variable": { "symbol": "b" } } }
            ]
        }))
        .unwrap();

        assert!(order.items[0].ascending);
        assert!(!order.items[1].ascending);
    }

    #[test]
    fn test_where_expressions() {
        let parsed: Where = serde_json::from_value(json!({
            "expressions": [{
                "comparison": {
                    "left": { "property_lookup": { "atom": { "variable": { "symbol": "a" } }, "symbol": "age" } },
                    "partials": [{ "operator": "greater_than", "right": { "literal": { "int": 30 } } }]
                }
            }]
        }))
        .unwrap();

        assert_eq!(
            parsed,
            Where::new(Expression::compare(
                Expression::property("a", "age"),
                ComparisonOperator::GreaterThan,
                Expression::int(30),
            ))
        );
    }

    #[test]
    fn test_set_and_delete_clauses() {
        let clauses: Vec<UpdatingClause> = serde_json::from_value(json!([
            { "set": { "items": [{ "kinds": { "variable": { "symbol": "a" }, "kinds": ["Admin"] } }] } },
            { "delete": { "detach": true, "expressions": [{ "variable": { "symbol": "a" } }] } }
        ]))
        .unwrap();

        assert!(matches!(
            &clauses[0],
            UpdatingClause::Set(set) if matches!(&set.items[0], SetItem::Kinds { kinds, .. } if kinds == &["Admin"])
        ));
        assert!(matches!(&clauses[1], UpdatingClause::Delete(delete) if delete.detach));
    }

    #[test]
    fn test_unknown_expression_is_rejected() {
        let result: Result<Expression, _> =
            serde_json::from_value(json!({ "list_comprehension": {} }));
        assert!(result.is_err());
    }
}
