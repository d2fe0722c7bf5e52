//! Query part boundaries: WITH projections and the final RETURN.

use std::collections::HashMap;

use log::debug;

use crate::pgsql::{
    optional_and, Expression, FromClause, Identifier, IdentifierSet, Literal, OrderBy, Query,
    Select, SelectItem, Statement, TableReference, With,
};

use super::errors::{TranslationError, TranslationResult};
use super::functions::has_aggregate;
use super::model::{ProjectionItem, QueryPart};
use super::projection::{
    build_projection, build_visible_projections, materialize_frame, rewrite_frame_bindings,
    rewrite_optional_frame_bindings,
};
use super::scope::Scope;
use super::translator::Translator;

fn projected_expression(scope: &Scope, mut expression: Expression) -> Expression {
    rewrite_frame_bindings(scope, &mut expression);
    expression
}

/// True when the item is a bare reference to the binding it projects
fn is_bare_reference(scope: &Scope, item: &ProjectionItem) -> bool {
    match (&item.expression, item.binding) {
        (Expression::Identifier(identifier), Some(binding)) => {
            scope.lookup(identifier) == Some(binding)
        }
        _ => false,
    }
}

fn source_of(scope: &Scope) -> Vec<FromClause> {
    scope
        .current_frame_id()
        .map(|frame| vec![FromClause::new(TableReference::named(scope.frame_identifier(frame)))])
        .unwrap_or_default()
}

/// Select items and grouping keys for a projection. When any item aggregates, every
/// other item becomes a grouping key.
fn group_keys(items: &[SelectItem]) -> Vec<Expression> {
    if !items.iter().any(|item| has_aggregate(&item.expression)) {
        return Vec::new();
    }

    items
        .iter()
        .filter(|item| !has_aggregate(&item.expression))
        .map(|item| item.expression.clone())
        .collect()
}

impl Translator<'_> {
    fn take_query_part(&mut self) -> TranslationResult<QueryPart> {
        self.query_parts
            .pop()
            .ok_or_else(|| TranslationError::malformed("no query part is being translated"))
    }

    /// Compiles a WITH into an inline projection CTE and narrows scope to what it projects
    pub(crate) fn build_with(&mut self, has_where: bool) -> TranslationResult<()> {
        self.resolve_pending_predicates()?;

        let part = self.take_query_part()?;
        let from = source_of(&self.scope);

        let mut projection = Vec::with_capacity(part.projection.items.len());
        let mut keep = IdentifierSet::new();
        let mut keep_aliases = IdentifierSet::new();

        for item in &part.projection.items {
            let Some(binding) = item.binding else {
                return Err(TranslationError::unsupported(
                    "WITH expressions must be aliased",
                ));
            };

            let identifier = self.identifier(binding);

            if is_bare_reference(&self.scope, item) {
                projection.push(build_projection(&self.scope, binding, &identifier)?);
            } else {
                projection.push(SelectItem::aliased(
                    projected_expression(&self.scope, item.expression.clone()),
                    &identifier,
                ));
            }

            if let Some(alias) = &self.scope.binding(binding).alias {
                keep_aliases.add(alias.clone());
            }
            keep.add(identifier);
        }

        let where_clause = rewrite_optional_frame_bindings(&self.scope, part.carried_constraints);
        let order_by = part
            .projection
            .order_by
            .into_iter()
            .map(|order| OrderBy {
                expression: projected_expression(&self.scope, order.expression),
                ascending: order.ascending,
            })
            .collect();

        let frame = self.scope.push_frame()?;
        {
            let frame = self.scope.frame_mut(frame);
            frame.visible = keep.clone();
            frame.exported = keep.clone();
        }

        debug!(
            "projecting {} binding(s) through {}",
            keep.len(),
            self.scope.frame_identifier(frame)
        );

        let group_by = group_keys(&projection);
        let mut query = Query::new(Select {
            distinct: part.projection.distinct,
            projection,
            from,
            where_clause,
            group_by,
            having: None,
        });
        query.order_by = order_by;
        query.offset = part.projection.skip;
        query.limit = part.projection.limit;

        materialize_frame(&mut self.scope, frame)?;
        self.scope.prune_definitions(&keep);
        self.scope.prune_aliases(&keep_aliases);
        self.emit_frame(frame, query);

        if has_where {
            self.build_with_filter()?;
        }

        Ok(())
    }

    /// `select .. from sN where ..` applying a WITH's own WHERE to its projection
    fn build_with_filter(&mut self) -> TranslationResult<()> {
        let from = source_of(&self.scope);
        let constraints = self.tree.consume_all().map(|constraint| constraint.expression);
        let where_clause = rewrite_optional_frame_bindings(&self.scope, constraints);

        let frame = self.scope.push_frame()?;
        let select = Select {
            projection: build_visible_projections(&self.scope, frame)?,
            from,
            where_clause,
            ..Default::default()
        };

        materialize_frame(&mut self.scope, frame)?;
        self.emit_frame(frame, Query::new(select));

        Ok(())
    }

    /// Compiles the final projection and assembles the statement from the CTE chain
    pub(crate) fn build_tail(&mut self, has_return: bool) -> TranslationResult<()> {
        self.resolve_pending_predicates()?;

        let part = self.take_query_part()?;
        let from = source_of(&self.scope);

        let remaining = self.tree.consume_all().map(|constraint| constraint.expression);
        let where_clause = rewrite_optional_frame_bindings(
            &self.scope,
            optional_and(part.carried_constraints, remaining),
        );

        let mut projection = Vec::with_capacity(part.projection.items.len());
        let mut output_names: HashMap<Identifier, Identifier> = HashMap::new();

        if !has_return {
            projection.push(SelectItem::new(Literal::int8(1).into()));
        }

        for item in &part.projection.items {
            match item.binding {
                Some(binding) if is_bare_reference(&self.scope, item) => {
                    let alias = item
                        .alias
                        .clone()
                        .unwrap_or_else(|| self.scope.binding(binding).aliased().clone());

                    projection.push(build_projection(&self.scope, binding, &alias)?);
                }

                binding => {
                    let expression = projected_expression(&self.scope, item.expression.clone());

                    if let (Some(binding), Some(alias)) = (binding, &item.alias) {
                        output_names.insert(self.identifier(binding), alias.clone());
                    }

                    projection.push(SelectItem {
                        expression,
                        alias: item.alias.clone(),
                    });
                }
            }
        }

        let order_by = part
            .projection
            .order_by
            .into_iter()
            .map(|order| {
                let mut expression = projected_expression(&self.scope, order.expression);

                // Computed items are ordered by their output name
                expression.visit_mut(&mut |node| {
                    if let Expression::Identifier(identifier) = node {
                        if let Some(alias) = output_names.get(identifier) {
                            *node = Expression::identifier(alias);
                        }
                    }
                });

                OrderBy {
                    expression,
                    ascending: order.ascending,
                }
            })
            .collect();

        let group_by = group_keys(&projection);
        let ctes = std::mem::take(&mut self.ctes);

        debug!("assembling statement from {} cte(s)", ctes.len());

        let statement = Query {
            ctes: (!ctes.is_empty()).then(|| With {
                recursive: false,
                expressions: ctes,
            }),
            body: Select {
                distinct: part.projection.distinct,
                projection,
                from,
                where_clause,
                group_by,
                having: None,
            }
            .into(),
            order_by,
            offset: part.projection.skip,
            limit: part.projection.limit,
        };

        self.statement = Some(Statement::Query(statement));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgsql::{DataType, FunctionCall};

    #[test]
    fn test_group_keys() {
        let n0 = SelectItem::new(Expression::identifier(&Identifier::from("n0")));
        let count = SelectItem::new(
            FunctionCall::new("count", vec![Expression::Wildcard], DataType::Int8).into(),
        );

        assert!(group_keys(&[n0.clone()]).is_empty());
        assert_eq!(group_keys(&[n0.clone(), count]), vec![n0.expression]);
    }
}
