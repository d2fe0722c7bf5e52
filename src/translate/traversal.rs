//! Node selects and fixed length traversal steps.
//!
//! Every compiled step becomes one CTE in the chain. A step selects from the previous
//! frame when there is one, joins the edge and node tables it introduces and applies the
//! constraints that became satisfiable with its bindings.

use log::debug;

use crate::cypher::Direction;
use crate::pgsql::{
    names, optional_and, Expression, FromClause, Identifier, IdentifierSet, Join, Query, Select,
    TableReference,
};

use super::errors::{TranslationError, TranslationResult};
use super::model::{PatternPart, TraversalStep};
use super::projection::{
    build_visible_projections, materialize_frame, rewrite_frame_bindings,
    rewrite_optional_frame_bindings,
};
use super::scope::BindingId;
use super::translator::Translator;

/// `node.id = edge.column`
pub(crate) fn node_edge_join(node: &Identifier, edge: &Identifier, column: &str) -> Expression {
    Expression::equals(
        Expression::column(node, names::COLUMN_ID),
        Expression::column(edge, column),
    )
}

/// Join conditions tying the left and right nodes of a step to its edge
fn step_join_conditions(
    direction: Direction,
    left: &Identifier,
    edge: &Identifier,
    right: &Identifier,
) -> (Expression, Expression) {
    match direction {
        Direction::Outbound => (
            node_edge_join(left, edge, names::COLUMN_START_ID),
            node_edge_join(right, edge, names::COLUMN_END_ID),
        ),

        Direction::Inbound => (
            node_edge_join(left, edge, names::COLUMN_END_ID),
            node_edge_join(right, edge, names::COLUMN_START_ID),
        ),

        Direction::Both => (
            Expression::or(
                node_edge_join(left, edge, names::COLUMN_START_ID),
                node_edge_join(left, edge, names::COLUMN_END_ID),
            ),
            Expression::or(
                Expression::parenthetical(Expression::and(
                    node_edge_join(left, edge, names::COLUMN_START_ID),
                    node_edge_join(right, edge, names::COLUMN_END_ID),
                )),
                Expression::parenthetical(Expression::and(
                    node_edge_join(left, edge, names::COLUMN_END_ID),
                    node_edge_join(right, edge, names::COLUMN_START_ID),
                )),
            ),
        ),
    }
}

impl Translator<'_> {
    pub(crate) fn compile_pattern_part(&mut self, part: PatternPart) -> TranslationResult<()> {
        if part.is_traversal() {
            for step in part.traversal_steps()? {
                if step.expansion.is_some() {
                    self.compile_expansion_step(step)?;
                } else {
                    self.compile_traversal_step(step)?;
                }
            }
        } else if let Some(node) = part.nodes().next() {
            self.compile_node_select(node)?;
        }

        if let Some(path) = part.path_binding {
            let identifier = self.identifier(path);
            self.scope.declare(&identifier)?;
        }

        Ok(())
    }

    /// `select .. from [sPrev,] node n where ..` for a pattern part without relationships
    fn compile_node_select(&mut self, node: BindingId) -> TranslationResult<()> {
        // Constraints on an already bound node are applied by a later step or projection
        if self.is_bound(node) {
            return Ok(());
        }

        let previous = self.scope.current_frame_id();
        let frame = self.scope.push_frame()?;
        let identifier = self.identifier(node);

        self.scope.export(&identifier)?;

        let known = self.scope.frame(frame).known();
        let constraints = self.tree.consume_set(&known).map(|constraint| constraint.expression);

        let mut from = Vec::new();
        if let Some(previous) = previous {
            from.push(FromClause::new(TableReference::named(
                self.scope.frame_identifier(previous),
            )));
        }
        from.push(FromClause::new(TableReference::table(
            names::TABLE_NODE,
            Some(&identifier),
        )));

        let select = Select {
            projection: build_visible_projections(&self.scope, frame)?,
            from,
            where_clause: rewrite_optional_frame_bindings(&self.scope, constraints),
            ..Default::default()
        };

        materialize_frame(&mut self.scope, frame)?;
        self.emit_frame(frame, Query::new(select));

        Ok(())
    }

    fn compile_traversal_step(&mut self, step: TraversalStep) -> TranslationResult<()> {
        let left = self.identifier(step.left_node);
        let edge = self.identifier(step.edge);
        let right = self.identifier(step.right_node);

        let left_bound = self.is_bound(step.left_node);
        // A self loop joins its single node once
        let right_joined = !self.is_bound(step.right_node) && step.right_node != step.left_node;

        debug!(
            "compiling traversal step {left} -[{edge}]- {right}, left bound: {left_bound}, right joined: {right_joined}"
        );

        let previous = self.scope.current_frame_id();
        let frame = self.scope.push_frame()?;

        let mut known: IdentifierSet = self.scope.frame(frame).known();
        for identifier in [&left, &edge, &right] {
            self.scope.export(identifier)?;
        }

        known.add(left.clone());
        let left_constraints = self.tree.consume_set(&known);
        known.add(edge.clone());
        let edge_constraints = self.tree.consume_set(&known);
        known.add(right.clone());
        let right_constraints = self.tree.consume_set(&known);

        let (left_join, right_join) = step_join_conditions(step.direction, &left, &edge, &right);

        let edge_table = TableReference::table(names::TABLE_EDGE, Some(&edge));
        let right_table = TableReference::table(names::TABLE_NODE, Some(&right));

        let mut from = Vec::new();
        let mut moved_join = None;

        // The step's own frame is already pushed: sources come from the frame before it
        let mut source = match (left_bound, previous) {
            (true, Some(previous)) => {
                let mut source = FromClause::new(TableReference::named(
                    self.scope.frame_identifier(previous),
                ));

                let mut left_join = left_join;
                rewrite_frame_bindings(&self.scope, &mut left_join);
                source.joins.push(Join::inner(edge_table, left_join));
                source
            }

            (true, None) => {
                return Err(TranslationError::malformed(
                    "a bound traversal step requires a preceding frame",
                ));
            }

            (false, previous) => {
                if let Some(previous) = previous {
                    from.push(FromClause::new(TableReference::named(
                        self.scope.frame_identifier(previous),
                    )));
                }

                let mut source = FromClause::new(edge_table);
                source.joins.push(Join::inner(
                    TableReference::table(names::TABLE_NODE, Some(&left)),
                    left_join,
                ));
                source
            }
        };

        let mut right_join = right_join;
        rewrite_frame_bindings(&self.scope, &mut right_join);

        if right_joined {
            source.joins.push(Join::inner(right_table, right_join));
        } else {
            moved_join = Some(right_join);
        }

        from.push(source);

        let constraints = optional_and(
            right_constraints.map(|constraint| constraint.expression),
            optional_and(
                edge_constraints.map(|constraint| constraint.expression),
                left_constraints.map(|constraint| constraint.expression),
            ),
        );

        let select = Select {
            projection: build_visible_projections(&self.scope, frame)?,
            from,
            where_clause: optional_and(
                moved_join,
                rewrite_optional_frame_bindings(&self.scope, constraints),
            ),
            ..Default::default()
        };

        materialize_frame(&mut self.scope, frame)?;
        self.emit_frame(frame, Query::new(select));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgsql::ToSql;

    fn ident(value: &str) -> Identifier {
        Identifier::from(value)
    }

    #[test]
    fn test_step_join_conditions() {
        let (left, right) =
            step_join_conditions(Direction::Outbound, &ident("n0"), &ident("e0"), &ident("n1"));
        assert_eq!(left.to_sql().unwrap(), "n0.id = e0.start_id");
        assert_eq!(right.to_sql().unwrap(), "n1.id = e0.end_id");

        let (left, right) =
            step_join_conditions(Direction::Inbound, &ident("n0"), &ident("e0"), &ident("n1"));
        assert_eq!(left.to_sql().unwrap(), "n0.id = e0.end_id");
        assert_eq!(right.to_sql().unwrap(), "n1.id = e0.start_id");

        let (left, right) =
            step_join_conditions(Direction::Both, &ident("n0"), &ident("e0"), &ident("n1"));
        assert_eq!(
            left.to_sql().unwrap(),
            "n0.id = e0.start_id or n0.id = e0.end_id"
        );
        assert_eq!(
            right.to_sql().unwrap(),
            "(n0.id = e0.start_id and n1.id = e0.end_id) or (n0.id = e0.end_id and n1.id = e0.start_id)"
        );
    }
}
