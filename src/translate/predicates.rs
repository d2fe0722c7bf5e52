//! Pattern predicates such as `WHERE (n)-[:R]->()`, compiled into `exists (select 1 ...)`
//! subqueries correlated to the enclosing step through the nodes they share with it.

use log::debug;

use crate::cypher::Direction;
use crate::pgsql::{
    conjoin, names, Expression, ExistsExpression, FromClause, Identifier, IdentifierSet, Query,
    Select, SelectItem, TableReference,
};

use super::errors::{TranslationError, TranslationResult};
use super::model::PatternPart;
use super::scope::BindingId;
use super::translator::Translator;
use super::traversal::node_edge_join;

/// Endpoint matching for an undirected predicate edge
fn undirected_condition(
    left: Option<&Identifier>,
    edge: &Identifier,
    right: Option<&Identifier>,
) -> Option<Expression> {
    let either_end = |node: &Identifier| {
        Expression::or(
            node_edge_join(node, edge, names::COLUMN_START_ID),
            node_edge_join(node, edge, names::COLUMN_END_ID),
        )
    };

    match (left, right) {
        (Some(left), Some(right)) => Some(Expression::or(
            Expression::parenthetical(Expression::and(
                node_edge_join(left, edge, names::COLUMN_START_ID),
                node_edge_join(right, edge, names::COLUMN_END_ID),
            )),
            Expression::parenthetical(Expression::and(
                node_edge_join(left, edge, names::COLUMN_END_ID),
                node_edge_join(right, edge, names::COLUMN_START_ID),
            )),
        )),
        (Some(node), None) | (None, Some(node)) => Some(either_end(node)),
        (None, None) => None,
    }
}

/// Columns an edge leaves from and arrives at when walked in `direction`
fn directed_columns(direction: Direction) -> (&'static str, &'static str) {
    match direction {
        Direction::Inbound => (names::COLUMN_END_ID, names::COLUMN_START_ID),
        _ => (names::COLUMN_START_ID, names::COLUMN_END_ID),
    }
}

impl Translator<'_> {
    /// Identifier a predicate step can join `node` through. Outer nodes are referenced
    /// directly; local nodes are only joined when they carry constraints.
    fn predicate_node_reference(
        &self,
        part: &PatternPart,
        node: BindingId,
        from: &mut Vec<FromClause>,
        joined: &mut IdentifierSet,
    ) -> Option<Identifier> {
        let identifier = self.identifier(node);

        if part.external.contains(&node) {
            return Some(identifier);
        }

        if !part
            .constraints
            .has_constraints(&IdentifierSet::of(&[&identifier]))
        {
            return None;
        }

        if !joined.contains(&identifier) {
            from.push(FromClause::new(TableReference::table(
                names::TABLE_NODE,
                Some(&identifier),
            )));
            joined.add(identifier.clone());
        }

        Some(identifier)
    }

    pub(crate) fn compile_pattern_predicate(
        &mut self,
        mut part: PatternPart,
    ) -> TranslationResult<Expression> {
        let steps = part.traversal_steps()?;

        if steps.is_empty() {
            return Err(TranslationError::unsupported(
                "pattern predicates must contain at least one relationship",
            ));
        }

        if steps.len() > 1 && steps.iter().any(|step| step.direction == Direction::Both) {
            return Err(TranslationError::unsupported(
                "undirected relationships in multi-hop pattern predicates are not supported",
            ));
        }

        let mut from = Vec::new();
        let mut conditions = Vec::new();
        let mut joined = IdentifierSet::new();
        let mut previous_edge: Option<(Identifier, &'static str)> = None;

        for step in &steps {
            let edge = self.identifier(step.edge);
            from.push(FromClause::new(TableReference::table(
                names::TABLE_EDGE,
                Some(&edge),
            )));

            let left = self.predicate_node_reference(&part, step.left_node, &mut from, &mut joined);
            let right =
                self.predicate_node_reference(&part, step.right_node, &mut from, &mut joined);

            if step.direction == Direction::Both {
                conditions.extend(undirected_condition(left.as_ref(), &edge, right.as_ref()));
                continue;
            }

            let (start, end) = directed_columns(step.direction);

            match (&left, &previous_edge) {
                (Some(left), _) => conditions.push(node_edge_join(left, &edge, start)),
                (None, Some((previous, previous_end))) => conditions.push(Expression::equals(
                    Expression::column(&edge, start),
                    Expression::column(previous, previous_end),
                )),
                (None, None) => {}
            }

            if let Some(right) = &right {
                conditions.push(node_edge_join(right, &edge, end));
            }

            previous_edge = Some((edge, end));
        }

        if let Some(constraint) = part.constraints.consume_all() {
            conditions.push(constraint.expression);
        }

        debug!(
            "compiled pattern predicate over {} step(s) with {} outer reference(s)",
            steps.len(),
            part.external.len()
        );

        let subquery = Query::new(Select {
            projection: vec![SelectItem::new(Expression::int8(1))],
            from,
            where_clause: conjoin(conditions),
            ..Default::default()
        });

        Ok(Expression::Exists(Box::new(ExistsExpression {
            subquery,
            negated: false,
        })))
    }
}
