//! Unit tests for rendering hand-built SQL trees

#[cfg(test)]
mod sql_rendering_tests {
    use pgcypher::pgsql::*;
    use pgcypher::translate::{kinds::node_kind_constraint, Translation};
    use serde_json::{json, Map};
    use test_case::test_case;

    fn ident(value: &str) -> Identifier {
        Identifier::from(value)
    }

    fn name_parameter() -> Expression {
        Expression::Parameter(Parameter {
            identifier: ident("pi0"),
            cast_type: DataType::Text,
            value: json!("alice"),
        })
    }

    fn select_by_name() -> Statement {
        Statement::Query(Query::new(Select {
            projection: vec![SelectItem::new(Expression::column(&ident("n0"), names::COLUMN_ID))],
            from: vec![FromClause::new(TableReference::table(names::TABLE_NODE, Some(&ident("n0"))))],
            where_clause: Some(Expression::equals(
                Expression::binary(
                    Operator::JsonTextField,
                    Expression::column(&ident("n0"), names::COLUMN_PROPERTIES),
                    Expression::text("name"),
                ),
                name_parameter(),
            )),
            ..Default::default()
        }))
    }

    #[test]
    fn test_translation_renders_placeholders() {
        let mut parameters = Map::new();
        parameters.insert("pi0".to_string(), json!("alice"));

        let translation = Translation {
            statement: select_by_name(),
            parameters,
        };

        assert_eq!(
            translation.to_sql(false).unwrap(),
            "select n0.id from node n0 where n0.properties ->> 'name' = @pi0::text;"
        );
        assert_eq!(
            translation.to_sql(true).unwrap(),
            "select n0.id from node n0 where n0.properties ->> 'name' = 'alice'::text;"
        );
    }

    #[test]
    fn test_update_statement() {
        let statement = Statement::Update(Update {
            table: TableReference::table(names::TABLE_NODE, Some(&ident("n0"))),
            assignments: vec![Expression::binary(
                Operator::Assignment,
                Expression::identifier(&ident(names::COLUMN_PROPERTIES)),
                Expression::binary(
                    Operator::Concatenate,
                    Expression::column(&ident("n0"), names::COLUMN_PROPERTIES),
                    Expression::text("{}"),
                ),
            )],
            from: vec![],
            where_clause: Some(node_kind_constraint(&ident("n0"), &[1])),
            returning: vec![SelectItem::new(Expression::column(&ident("n0"), names::COLUMN_ID))],
        });

        assert_eq!(
            format_statement(&statement, OutputBuilder::new()).unwrap(),
            "update node n0 set properties = n0.properties || '{}' \
             where n0.kind_ids operator (pg_catalog.&&) array [1]::int2[] returning n0.id;"
        );
    }

    #[test_case(Operator::Multiply, Operator::Add, "(a + b) * c"; "add inside multiply")]
    #[test_case(Operator::Add, Operator::Multiply, "a * b + c"; "multiply inside add")]
    #[test_case(Operator::Concatenate, Operator::Or, "(a or b) || c"; "or inside concatenate")]
    fn test_precedence_parentheses(outer: Operator, inner: Operator, expected: &str) {
        let id = |name: &str| Expression::identifier(&ident(name));
        let expression = Expression::binary(outer, Expression::binary(inner, id("a"), id("b")), id("c"));

        assert_eq!(format_expression(&expression).unwrap(), expected);
    }

    #[test]
    fn test_unresolved_future_cannot_render() {
        let expression = Expression::Future(FutureExpression {
            id: 3,
            dependencies: IdentifierSet::new(),
            data_type: DataType::Boolean,
        });

        assert_eq!(
            format_expression(&expression),
            Err(FormatError::UnresolvedFuture(3))
        );
    }
}
