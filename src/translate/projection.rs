//! Projection building and frame-binding rewrites.
//!
//! Once a binding has been projected by a step CTE every later reference must go through
//! that CTE: `n0` becomes `s1.n0` and `n0.properties` becomes `(s1.n0).properties`.

use crate::pgsql::{
    names, ArrayLiteral, CompositeValue, CompoundIdentifier, DataType, Expression, FunctionCall,
    Identifier, Operator, Query, Select, SelectItem, SetExpression, TableReference,
};

use super::errors::{TranslationError, TranslationResult};
use super::scope::{BindingId, FrameId, Scope};

fn projecting_frame<'a>(scope: &'a Scope, identifier: &Identifier) -> Option<&'a Identifier> {
    if names::is_reserved(identifier) {
        return None;
    }

    let binding = scope.lookup(identifier)?;
    let frame = scope.binding(binding).last_projection?;

    Some(scope.frame_identifier(frame))
}

/// Qualifies every reference to a projected binding with the frame that last projected it.
/// Pattern predicate subqueries are rewritten as well.
pub fn rewrite_frame_bindings(scope: &Scope, expression: &mut Expression) {
    expression.visit_mut(&mut |node| {
        let rewritten = match node {
            Expression::Identifier(identifier) => {
                projecting_frame(scope, identifier).map(|frame| {
                    Expression::CompoundIdentifier(frame.column(identifier))
                })
            }

            Expression::CompoundIdentifier(CompoundIdentifier(parts)) if parts.len() == 2 => {
                projecting_frame(scope, &parts[0]).map(|frame| {
                    Expression::row_column(
                        Expression::CompoundIdentifier(frame.column(&parts[0])),
                        parts[1].as_str(),
                    )
                })
            }

            Expression::Exists(exists) => {
                rewrite_query_frame_bindings(scope, &mut exists.subquery);
                None
            }

            _ => None,
        };

        if let Some(rewritten) = rewritten {
            *node = rewritten;
        }
    });
}

pub fn rewrite_optional_frame_bindings(scope: &Scope, expression: Option<Expression>) -> Option<Expression> {
    expression.map(|mut expression| {
        rewrite_frame_bindings(scope, &mut expression);
        expression
    })
}

fn rewrite_query_frame_bindings(scope: &Scope, query: &mut Query) {
    if let SetExpression::Select(select) = &mut query.body {
        for item in &mut select.projection {
            rewrite_frame_bindings(scope, &mut item.expression);
        }

        for from in &mut select.from {
            for join in &mut from.joins {
                rewrite_frame_bindings(scope, &mut join.constraint);
            }
        }

        if let Some(where_clause) = &mut select.where_clause {
            rewrite_frame_bindings(scope, where_clause);
        }
    }
}

/// `(n.id, n.kind_ids, n.properties)::nodecomposite`
pub fn node_composite(identifier: &Identifier) -> Expression {
    Expression::CompositeValue(CompositeValue {
        values: vec![
            Expression::column(identifier, names::COLUMN_ID),
            Expression::column(identifier, names::COLUMN_KIND_IDS),
            Expression::column(identifier, names::COLUMN_PROPERTIES),
        ],
        data_type: DataType::NodeComposite,
    })
}

/// `(e.id, e.start_id, e.end_id, e.kind_id, e.properties)::edgecomposite`
pub fn edge_composite(identifier: &Identifier) -> Expression {
    Expression::CompositeValue(CompositeValue {
        values: vec![
            Expression::column(identifier, names::COLUMN_ID),
            Expression::column(identifier, names::COLUMN_START_ID),
            Expression::column(identifier, names::COLUMN_END_ID),
            Expression::column(identifier, names::COLUMN_KIND_ID),
            Expression::column(identifier, names::COLUMN_PROPERTIES),
        ],
        data_type: DataType::EdgeComposite,
    })
}

fn expansion_of(scope: &Scope, binding: BindingId) -> TranslationResult<&Identifier> {
    scope
        .first_dependency_by_type(binding, DataType::ExpansionPattern)
        .map(|expansion| scope.identifier(expansion))
        .ok_or_else(|| {
            TranslationError::malformed(format!(
                "expansion binding {} has no expansion dependency",
                scope.identifier(binding)
            ))
        })
}

/// Edge composites of every edge along an expanded path
fn expansion_edge_array(scope: &Scope, binding: BindingId) -> TranslationResult<Expression> {
    let edge = scope.identifier(binding);
    let expansion = expansion_of(scope, binding)?;

    let select = Select {
        projection: vec![SelectItem::new(
            FunctionCall::new(
                "array_agg",
                vec![edge_composite(edge)],
                DataType::EdgeCompositeArray,
            )
            .into(),
        )],
        from: vec![crate::pgsql::FromClause::new(TableReference::table(
            names::TABLE_EDGE,
            Some(edge),
        ))],
        where_clause: Some(Expression::equals(
            Expression::column(edge, names::COLUMN_ID),
            Expression::any(
                Expression::column(expansion, names::EXPANSION_PATH),
                DataType::Int8Array,
            ),
        )),
        ..Default::default()
    };

    Ok(Expression::Subquery(Box::new(Query::new(select))))
}

fn id_array(ids: Vec<Expression>) -> Expression {
    Expression::ArrayLiteral(ArrayLiteral {
        values: ids,
        cast_type: DataType::Int8Array,
    })
}

/// `edges_to_path(variadic ..)::pathcomposite` over the path's edges, or `nodes_to_path`
/// for a path of a single node
pub fn build_path_composite(scope: &Scope, binding: BindingId) -> TranslationResult<Expression> {
    let mut segments: Vec<Expression> = Vec::new();
    let mut edge_ids: Vec<Expression> = Vec::new();
    let mut node_ids: Vec<Expression> = Vec::new();

    for dependency in &scope.binding(binding).dependencies {
        let dependency = scope.binding(*dependency);

        match dependency.data_type {
            DataType::EdgeComposite => {
                edge_ids.push(Expression::column(&dependency.identifier, names::COLUMN_ID))
            }

            DataType::ExpansionPath | DataType::Int8Array => {
                if !edge_ids.is_empty() {
                    segments.push(id_array(std::mem::take(&mut edge_ids)));
                }

                segments.push(Expression::identifier(&dependency.identifier));
            }

            DataType::NodeComposite
            | DataType::ExpansionRootNode
            | DataType::ExpansionTerminalNode => {
                node_ids.push(Expression::column(&dependency.identifier, names::COLUMN_ID))
            }

            other => {
                return Err(TranslationError::malformed(format!(
                    "path {} can not depend on {} of type {other}",
                    scope.identifier(binding),
                    dependency.identifier
                )))
            }
        }
    }

    if !edge_ids.is_empty() {
        segments.push(id_array(edge_ids));
    }

    let (function, arguments) = match segments.len() {
        0 if node_ids.is_empty() => {
            return Err(TranslationError::malformed(format!(
                "path {} has no components",
                scope.identifier(binding)
            )))
        }
        0 => ("nodes_to_path", id_array(node_ids)),
        _ => {
            let mut segments = segments.into_iter();
            let first = segments.next().unwrap_or(Expression::Wildcard);

            let concatenated = segments.fold(first, |path, segment| {
                Expression::binary(Operator::Concatenate, path, segment)
            });

            ("edges_to_path", concatenated)
        }
    };

    Ok(FunctionCall::new(
        function,
        vec![Expression::Variadic(Box::new(arguments))],
        DataType::PathComposite,
    )
    .into())
}

/// Renders `binding` as one select item named `alias`. Bindings already projected by a
/// frame are referenced through it.
pub fn build_projection(
    scope: &Scope,
    binding: BindingId,
    alias: &Identifier,
) -> TranslationResult<SelectItem> {
    let bound = scope.binding(binding);

    if let Some(frame) = bound.last_projection {
        let reference = scope.frame_identifier(frame).column(&bound.identifier);
        return Ok(SelectItem::aliased(reference.into(), alias));
    }

    let mut expression = match bound.data_type {
        DataType::NodeComposite
        | DataType::ExpansionRootNode
        | DataType::ExpansionTerminalNode => node_composite(&bound.identifier),

        DataType::EdgeComposite => edge_composite(&bound.identifier),

        DataType::ExpansionEdge => expansion_edge_array(scope, binding)?,

        DataType::ExpansionPath => {
            Expression::column(expansion_of(scope, binding)?, names::EXPANSION_PATH)
        }

        DataType::PathComposite => build_path_composite(scope, binding)?,

        other => {
            return Err(TranslationError::malformed(format!(
                "unable to project {} of type {other}: it was never materialized",
                bound.identifier
            )))
        }
    };

    rewrite_frame_bindings(scope, &mut expression);
    Ok(SelectItem::aliased(expression, alias))
}

/// One select item for each binding the frame exports, in definition order
pub fn build_visible_projections(
    scope: &Scope,
    frame: FrameId,
) -> TranslationResult<Vec<SelectItem>> {
    scope
        .lookup_bindings(scope.frame(frame).exported.iter())?
        .into_iter()
        .map(|binding| build_projection(scope, binding, scope.identifier(binding)))
        .collect()
}

/// Records `frame` as the projector of everything it exports. Expansion components take
/// on the type of the values the frame holds for them.
pub fn materialize_frame(scope: &mut Scope, frame: FrameId) -> TranslationResult<()> {
    let exported = scope.frame(frame).exported.clone();

    for binding in scope.lookup_bindings(exported.iter())? {
        scope.materialized_by(binding, frame);

        let bound = scope.binding_mut(binding);
        bound.data_type = match bound.data_type {
            DataType::ExpansionRootNode | DataType::ExpansionTerminalNode => {
                DataType::NodeComposite
            }
            DataType::ExpansionEdge => DataType::EdgeCompositeArray,
            DataType::ExpansionPath => DataType::Int8Array,
            unchanged => unchanged,
        };
    }

    Ok(())
}
