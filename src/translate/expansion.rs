//! Variable length traversal steps.
//!
//! An expansion compiles into a recursive CTE `exN(root_id, next_id, depth, satisfied,
//! is_cycle, path)` nested inside the step CTE:
//!
//! - the primer arm selects the first hop from the root side
//! - the recursive arm extends each row by one edge while `depth < max` and the row did
//!   not revisit an edge
//! - the step select joins the expansion back to the node table and keeps the rows whose
//!   depth is in range and whose terminal node satisfied its constraints
//!
//! Shortest path searches render both arms as `insert into next_front ...` statements and
//! hand them to a database side harness function instead of a recursive CTE.

use log::debug;

use crate::cypher::Direction;
use crate::pgsql::{
    conjoin, names, optional_and, ArrayLiteral, CommonTableExpression, DataType, Expression,
    FromClause, FunctionCall, Identifier, IdentifierSet, Insert, Join, Literal, Operator,
    OutputBuilder, Query, Select, SelectItem, SetExpression, SetOperation, SetOperator,
    TableAlias, TableReference, ToSql, With,
};

use super::errors::{TranslationError, TranslationResult};
use super::model::{PathSearch, TraversalStep};
use super::projection::{
    build_visible_projections, materialize_frame, rewrite_frame_bindings,
    rewrite_optional_frame_bindings,
};
use super::scope::FrameId;
use super::selectivity::{optimize_pattern_constraint_balance, EndpointConstraints};
use super::translator::Translator;
use super::traversal::node_edge_join;

/// Columns of every expansion CTE, in projection order
const EXPANSION_COLUMNS: [&str; 6] = [
    names::EXPANSION_ROOT_ID,
    names::EXPANSION_NEXT_ID,
    names::EXPANSION_DEPTH,
    names::EXPANSION_SATISFIED,
    names::EXPANSION_IS_CYCLE,
    names::EXPANSION_PATH,
];

fn expansion_shape() -> Vec<Identifier> {
    EXPANSION_COLUMNS
        .iter()
        .map(|column| Identifier::from(*column))
        .collect()
}

/// Edge columns holding the root side and the next hop of each expanded row
fn expansion_columns(direction: Direction) -> TranslationResult<(&'static str, &'static str)> {
    match direction {
        Direction::Outbound => Ok((names::COLUMN_START_ID, names::COLUMN_END_ID)),
        Direction::Inbound => Ok((names::COLUMN_END_ID, names::COLUMN_START_ID)),
        Direction::Both => Err(TranslationError::unsupported(
            "unsupported expansion direction: variable length relationships must be directed",
        )),
    }
}

/// `ex.depth < max and not ex.is_cycle`
pub(crate) fn recursion_guard(expansion: &Identifier, max_depth: i64) -> Expression {
    Expression::and(
        Expression::binary(
            Operator::LessThan,
            Expression::column(expansion, names::EXPANSION_DEPTH),
            Expression::int8(max_depth),
        ),
        Expression::not(Expression::column(expansion, names::EXPANSION_IS_CYCLE)),
    )
}

/// Everything needed to render the two arms of one expansion
struct ExpansionArms<'a> {
    expansion: &'a Identifier,
    left: &'a Identifier,
    edge: &'a Identifier,
    right: &'a Identifier,
    root_column: &'static str,
    next_column: &'static str,
    /// Previous frame when the root side is already bound
    bound_source: Option<&'a Identifier>,
    left_constraints: Option<Expression>,
    edge_constraints: Option<Expression>,
    terminal_constraints: Option<Expression>,
    max_depth: i64,
}

impl ExpansionArms<'_> {
    fn satisfied(&self) -> Expression {
        self.terminal_constraints
            .clone()
            .unwrap_or_else(|| Literal::boolean(true).into())
    }

    fn terminal_join(&self) -> Option<Join> {
        self.terminal_constraints.as_ref().map(|_| {
            Join::inner(
                TableReference::table(names::TABLE_NODE, Some(self.right)),
                node_edge_join(self.right, self.edge, self.next_column),
            )
        })
    }

    fn primer(&self) -> Select {
        let edge_table = TableReference::table(names::TABLE_EDGE, Some(self.edge));

        let mut source = match self.bound_source {
            Some(previous) => {
                let mut source = FromClause::new(TableReference::named(previous));
                source.joins.push(Join::inner(
                    edge_table,
                    Expression::equals(
                        Expression::column(self.edge, self.root_column),
                        Expression::column(self.left, names::COLUMN_ID),
                    ),
                ));
                source
            }

            None => {
                let mut source = FromClause::new(edge_table);

                if self.left_constraints.is_some() {
                    source.joins.push(Join::inner(
                        TableReference::table(names::TABLE_NODE, Some(self.left)),
                        node_edge_join(self.left, self.edge, self.root_column),
                    ));
                }

                source
            }
        };

        source.joins.extend(self.terminal_join());

        Select {
            projection: vec![
                SelectItem::new(Expression::column(self.edge, self.root_column)),
                SelectItem::new(Expression::column(self.edge, self.next_column)),
                SelectItem::new(Expression::int8(1)),
                SelectItem::new(self.satisfied()),
                SelectItem::new(Expression::equals(
                    Expression::column(self.edge, names::COLUMN_START_ID),
                    Expression::column(self.edge, names::COLUMN_END_ID),
                )),
                SelectItem::new(Expression::ArrayLiteral(ArrayLiteral {
                    values: vec![Expression::column(self.edge, names::COLUMN_ID)],
                    cast_type: DataType::Int8Array,
                })),
            ],
            from: vec![source],
            where_clause: optional_and(
                self.left_constraints.clone(),
                self.edge_constraints.clone(),
            ),
            ..Default::default()
        }
    }

    fn recursive(&self, working_table: TableReference) -> Select {
        let mut source = FromClause::new(working_table);

        source.joins.push(Join::inner(
            TableReference::table(names::TABLE_EDGE, Some(self.edge)),
            Expression::equals(
                Expression::column(self.edge, self.root_column),
                Expression::column(self.expansion, names::EXPANSION_NEXT_ID),
            ),
        ));
        source.joins.extend(self.terminal_join());

        Select {
            projection: vec![
                SelectItem::new(Expression::column(self.expansion, names::EXPANSION_ROOT_ID)),
                SelectItem::new(Expression::column(self.edge, self.next_column)),
                SelectItem::new(Expression::binary(
                    Operator::Add,
                    Expression::column(self.expansion, names::EXPANSION_DEPTH),
                    Expression::int8(1),
                )),
                SelectItem::new(self.satisfied()),
                SelectItem::new(Expression::equals(
                    Expression::column(self.edge, names::COLUMN_ID),
                    Expression::any(
                        Expression::column(self.expansion, names::EXPANSION_PATH),
                        DataType::Int8Array,
                    ),
                )),
                SelectItem::new(Expression::binary(
                    Operator::Concatenate,
                    Expression::column(self.expansion, names::EXPANSION_PATH),
                    Expression::column(self.edge, names::COLUMN_ID),
                )),
            ],
            from: vec![source],
            where_clause: optional_and(
                self.edge_constraints.clone(),
                Some(recursion_guard(self.expansion, self.max_depth)),
            ),
            ..Default::default()
        }
    }
}

/// Renders `select` as a standalone `insert into next_front ...` with parameters inlined
fn render_front_insert(select: Select) -> TranslationResult<String> {
    let insert = Insert {
        table: TableReference::table(names::EXPANSION_NEXT_FRONT, None),
        shape: expansion_shape(),
        source: Query::new(select),
        returning: vec![],
    };

    let mut builder = OutputBuilder::materialized();
    insert.write_sql(&mut builder)?;

    Ok(builder.build())
}

impl Translator<'_> {
    pub(crate) fn compile_expansion_step(
        &mut self,
        mut step: TraversalStep,
    ) -> TranslationResult<()> {
        let Some(expansion) = step.expansion.clone() else {
            return Err(TranslationError::malformed(
                "expected the traversal step to carry an expansion",
            ));
        };

        expansion_columns(step.direction)?;

        let previous = self.scope.current_frame_id();

        let mut endpoints = EndpointConstraints {
            left: self
                .tree
                .consume_set(&IdentifierSet::of(&[self.scope.identifier(step.left_node)])),
            right: self
                .tree
                .consume_set(&IdentifierSet::of(&[self.scope.identifier(step.right_node)])),
        };

        optimize_pattern_constraint_balance(&self.scope, &mut step, &mut endpoints)?;

        let (root_column, next_column) = expansion_columns(step.direction)?;
        let left_bound = self.is_bound(step.left_node);
        let right_bound = self.is_bound(step.right_node);

        if expansion.search != PathSearch::Exhaustive && left_bound {
            return Err(TranslationError::unsupported(
                "shortest path searches from an already bound node are not supported",
            ));
        }

        if !left_bound {
            self.scope.binding_mut(step.left_node).data_type = DataType::ExpansionRootNode;
        }
        if !right_bound {
            self.scope.binding_mut(step.right_node).data_type = DataType::ExpansionTerminalNode;
        }

        let expansion_identifier = self.identifier(expansion.binding);
        let left = self.identifier(step.left_node);
        let edge = self.identifier(step.edge);
        let right = self.identifier(step.right_node);
        let path = self.identifier(expansion.path_binding);

        let max_depth = expansion
            .max_depth
            .unwrap_or(i64::from(self.config.max_traversal_depth));

        debug!(
            "compiling expansion {expansion_identifier}: {left} -[{edge}*{}..{max_depth}]- {right}",
            expansion.min_depth
        );

        let frame = self.scope.push_frame()?;
        for identifier in [&left, &edge, &path, &right] {
            self.scope.export(identifier)?;
        }

        let edge_constraints = self
            .tree
            .consume_set(&IdentifierSet::of(&[&edge]))
            .map(|constraint| constraint.expression);

        // A bound terminal is matched by id in the step select rather than inside the arms
        let (terminal_constraints, deferred_terminal) = match endpoints.right {
            Some(constraint) if right_bound => (None, Some(constraint.expression)),
            constraint => (constraint.map(|constraint| constraint.expression), None),
        };

        let previous_identifier =
            previous.map(|previous| self.scope.frame_identifier(previous).clone());

        let arms = ExpansionArms {
            expansion: &expansion_identifier,
            left: &left,
            edge: &edge,
            right: &right,
            root_column,
            next_column,
            bound_source: if left_bound {
                previous_identifier.as_ref()
            } else {
                None
            },
            left_constraints: rewrite_optional_frame_bindings(
                &self.scope,
                endpoints.left.map(|constraint| constraint.expression),
            ),
            edge_constraints,
            terminal_constraints,
            max_depth,
        };

        let mut primer = arms.primer();
        for item in &mut primer.projection {
            rewrite_frame_bindings(&self.scope, &mut item.expression);
        }
        for source in &mut primer.from {
            for join in &mut source.joins {
                rewrite_frame_bindings(&self.scope, &mut join.constraint);
            }
        }

        let expansion_cte = match expansion.search {
            PathSearch::Exhaustive => {
                let recursive = arms.recursive(TableReference::named(&expansion_identifier));

                CommonTableExpression {
                    alias: TableAlias {
                        name: expansion_identifier.clone(),
                        shape: Some(expansion_shape()),
                    },
                    materialized: false,
                    query: Query::new(SetExpression::SetOperation(Box::new(SetOperation {
                        operator: SetOperator::Union,
                        all: true,
                        left: primer.into(),
                        right: SetExpression::Select(Box::new(recursive)),
                    }))),
                }
            }

            PathSearch::Shortest | PathSearch::AllShortest => {
                let recursive = arms.recursive(TableReference::table(
                    names::EXPANSION_FORWARD_FRONT,
                    Some(&expansion_identifier),
                ));

                let primer_parameter =
                    self.bind_parameter(render_front_insert(primer)?.into())?;
                let recursive_parameter =
                    self.bind_parameter(render_front_insert(recursive)?.into())?;

                let harness = if expansion.search == PathSearch::Shortest {
                    &self.config.shortest_path_harness
                } else {
                    &self.config.all_shortest_paths_harness
                };

                let call = FunctionCall::new(
                    harness,
                    vec![
                        Expression::Parameter(primer_parameter),
                        Expression::Parameter(recursive_parameter),
                        Expression::int8(max_depth),
                    ],
                    DataType::Unset,
                );

                CommonTableExpression {
                    alias: TableAlias {
                        name: expansion_identifier.clone(),
                        shape: Some(expansion_shape()),
                    },
                    materialized: false,
                    query: Query::new(Select {
                        projection: vec![SelectItem::new(Expression::Wildcard)],
                        from: vec![FromClause::new(TableReference {
                            name: call.into(),
                            binding: None,
                        })],
                        ..Default::default()
                    }),
                }
            }
        };

        let has_terminal_constraints = arms.terminal_constraints.is_some();
        let select = self.expansion_projection(
            frame,
            previous_identifier.as_ref(),
            &expansion_identifier,
            (&left, left_bound),
            (&right, right_bound),
            expansion.min_depth,
            has_terminal_constraints,
            deferred_terminal,
        )?;

        let mut query = Query::new(select);
        query.ctes = Some(With {
            recursive: expansion.search == PathSearch::Exhaustive,
            expressions: vec![expansion_cte],
        });

        materialize_frame(&mut self.scope, frame)?;
        self.emit_frame(frame, query);

        Ok(())
    }

    /// The step select joining expanded rows back to their endpoint nodes
    #[allow(clippy::too_many_arguments)]
    fn expansion_projection(
        &mut self,
        frame: FrameId,
        previous: Option<&Identifier>,
        expansion: &Identifier,
        (left, left_bound): (&Identifier, bool),
        (right, right_bound): (&Identifier, bool),
        min_depth: i64,
        has_terminal_constraints: bool,
        deferred_terminal: Option<Expression>,
    ) -> TranslationResult<Select> {
        let expansion_table = TableReference::named(expansion);
        let right_join = Join::inner(
            TableReference::table(names::TABLE_NODE, Some(right)),
            node_edge_join(right, expansion, names::EXPANSION_NEXT_ID),
        );

        let mut from = Vec::new();

        let mut source = match (left_bound, previous) {
            (true, Some(previous)) => {
                let mut source = FromClause::new(TableReference::named(previous));
                let mut root_join = Expression::equals(
                    Expression::column(expansion, names::EXPANSION_ROOT_ID),
                    Expression::column(left, names::COLUMN_ID),
                );

                rewrite_frame_bindings(&self.scope, &mut root_join);
                source.joins.push(Join::inner(expansion_table, root_join));
                source
            }

            (true, None) => {
                return Err(TranslationError::malformed(format!(
                    "bound expansion root {left} has no preceding frame"
                )))
            }

            (false, previous) => {
                if let Some(previous) = previous {
                    from.push(FromClause::new(TableReference::named(previous)));
                }

                let mut source = FromClause::new(expansion_table);
                source.joins.push(Join::inner(
                    TableReference::table(names::TABLE_NODE, Some(left)),
                    node_edge_join(left, expansion, names::EXPANSION_ROOT_ID),
                ));
                source
            }
        };

        let mut conditions = vec![Expression::not(Expression::column(
            expansion,
            names::EXPANSION_IS_CYCLE,
        ))];

        if right_bound {
            let mut terminal_match = Expression::equals(
                Expression::column(expansion, names::EXPANSION_NEXT_ID),
                Expression::column(right, names::COLUMN_ID),
            );

            rewrite_frame_bindings(&self.scope, &mut terminal_match);
            conditions.push(terminal_match);
        } else {
            source.joins.push(right_join);
        }

        from.push(source);

        if min_depth > 1 {
            conditions.push(Expression::binary(
                Operator::GreaterThanOrEqualTo,
                Expression::column(expansion, names::EXPANSION_DEPTH),
                Expression::int8(min_depth),
            ));
        }

        if has_terminal_constraints {
            conditions.push(Expression::column(expansion, names::EXPANSION_SATISFIED));
        }

        let known = self.scope.frame(frame).known();
        let remaining = optional_and(
            deferred_terminal,
            self.tree
                .consume_set(&known)
                .map(|constraint| constraint.expression),
        );

        if let Some(remaining) = rewrite_optional_frame_bindings(&self.scope, remaining) {
            conditions.push(remaining);
        }

        Ok(Select {
            projection: build_visible_projections(&self.scope, frame)?,
            from,
            where_clause: conjoin(conditions),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursion_guard() {
        let guard = recursion_guard(&Identifier::from("ex0"), 5);
        assert_eq!(guard.to_sql().unwrap(), "ex0.depth < 5 and not ex0.is_cycle");
    }

    #[test]
    fn test_expansion_columns() {
        assert_eq!(
            expansion_columns(Direction::Inbound).unwrap(),
            (names::COLUMN_END_ID, names::COLUMN_START_ID)
        );
        assert!(matches!(
            expansion_columns(Direction::Both),
            Err(TranslationError::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn test_front_insert_rendering() {
        let select = Select {
            projection: vec![SelectItem::new(Expression::int8(1))],
            ..Default::default()
        };

        assert_eq!(
            render_front_insert(select).unwrap(),
            "insert into next_front (root_id, next_id, depth, satisfied, is_cycle, path) select 1"
        );
    }
}
