//! Compile-time selectivity heuristic.
//!
//! Scores how narrowing a constraint expression is likely to be. The score only decides
//! from which end a traversal step starts; it is not a cost model.

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::debug;

use crate::pgsql::{names, BinaryExpression, DataType, Expression, Operator};

use super::constraints::Constraint;
use super::errors::{TranslationError, TranslationResult};
use super::model::TraversalStep;
use super::scope::Scope;

/// A side materialized by an earlier frame is a fixed set of rows
pub const SELECTIVITY_WEIGHT_BOUND_IDENTIFIER: i32 = 1000;
pub const SELECTIVITY_WEIGHT_ENTITY_ID_REFERENCE: i32 = 125;
pub const SELECTIVITY_WEIGHT_UNIQUE_NODE_PROPERTY: i32 = 100;
pub const SELECTIVITY_WEIGHT_NARROW_SEARCH: i32 = 30;
pub const SELECTIVITY_WEIGHT_STRING_SEARCH: i32 = 20;
pub const SELECTIVITY_WEIGHT_RANGE_COMPARISON: i32 = 10;
pub const SELECTIVITY_WEIGHT_CONJUNCTION: i32 = 5;
pub const SELECTIVITY_WEIGHT_NOT_EQUALS: i32 = 1;
pub const SELECTIVITY_WEIGHT_DISJUNCTION: i32 = -100;

lazy_static! {
    static ref KNOWN_NODE_PROPERTY_SELECTIVITY: HashMap<&'static str, i32> = HashMap::from([
        ("objectid", SELECTIVITY_WEIGHT_UNIQUE_NODE_PROPERTY),
        ("name", SELECTIVITY_WEIGHT_UNIQUE_NODE_PROPERTY),
        ("system_tags", SELECTIVITY_WEIGHT_NARROW_SEARCH),
    ]);
}

fn operator_weight(operator: Operator) -> i32 {
    match operator {
        Operator::And => SELECTIVITY_WEIGHT_CONJUNCTION,
        Operator::Or => SELECTIVITY_WEIGHT_DISJUNCTION,
        Operator::NotEquals => SELECTIVITY_WEIGHT_NOT_EQUALS,

        Operator::Equals
        | Operator::In
        | Operator::Is
        | Operator::IsNot
        | Operator::JsonbFieldExists
        | Operator::PgArrayOverlap
        | Operator::PgArrayOverlapKeyword => SELECTIVITY_WEIGHT_NARROW_SEARCH,

        Operator::Like
        | Operator::ILike
        | Operator::SimilarTo
        | Operator::RegexMatch
        | Operator::CypherStartsWith
        | Operator::CypherEndsWith
        | Operator::CypherContains
        | Operator::CypherRegexMatch => SELECTIVITY_WEIGHT_STRING_SEARCH,

        Operator::GreaterThan
        | Operator::GreaterThanOrEqualTo
        | Operator::LessThan
        | Operator::LessThanOrEqualTo => SELECTIVITY_WEIGHT_RANGE_COMPARISON,

        _ => 0,
    }
}

fn is_entity_id_reference(expression: &Expression) -> bool {
    match expression {
        Expression::CompoundIdentifier(identifier) => identifier
            .column()
            .map(|column| column.as_str() == names::COLUMN_ID)
            .unwrap_or(false),
        Expression::RowColumnReference(reference) => reference.column.as_str() == names::COLUMN_ID,
        _ => false,
    }
}

struct SelectivityVisitor<'a> {
    scope: &'a Scope,
}

impl SelectivityVisitor<'_> {
    fn measure(&self, expression: &Expression) -> TranslationResult<i32> {
        match expression {
            // Negation inverts whatever its operand narrowed
            Expression::Unary(unary) if unary.operator == Operator::Not => {
                Ok(-self.measure(&unary.operand)?)
            }
            Expression::Unary(unary) => self.measure(&unary.operand),
            Expression::Binary(binary) => self.measure_binary(binary),
            Expression::Parenthetical(inner) | Expression::Variadic(inner) => self.measure(inner),
            Expression::TypeCast(cast) => self.measure(&cast.expression),
            Expression::Any(any) => self.measure(&any.expression),
            Expression::FunctionCall(call) => call
                .parameters
                .iter()
                .try_fold(0, |total, parameter| Ok(total + self.measure(parameter)?)),
            _ => Ok(0),
        }
    }

    fn measure_binary(&self, binary: &BinaryExpression) -> TranslationResult<i32> {
        if binary.operator.is_property_lookup() {
            return self.measure_property_lookup(binary);
        }

        let mut selectivity = operator_weight(binary.operator);

        if is_entity_id_reference(&binary.left) || is_entity_id_reference(&binary.right) {
            selectivity += SELECTIVITY_WEIGHT_ENTITY_ID_REFERENCE;
        }

        Ok(selectivity + self.measure(&binary.left)? + self.measure(&binary.right)?)
    }

    fn measure_property_lookup(&self, lookup: &BinaryExpression) -> TranslationResult<i32> {
        let Expression::CompoundIdentifier(reference) = &lookup.left else {
            return Ok(0);
        };

        let Some(root) = reference.root() else {
            return Ok(0);
        };

        let binding = self.scope.lookup(root).ok_or_else(|| {
            TranslationError::unresolved(format!("unable to lookup identifier {root}"))
        })?;

        let node_typed = self.scope.binding(binding).data_type.matches_one_of(&[
            DataType::NodeComposite,
            DataType::ExpansionRootNode,
            DataType::ExpansionTerminalNode,
        ]);

        match (&lookup.right, node_typed) {
            (Expression::Literal(key), true) => Ok(match &key.value {
                crate::pgsql::LiteralValue::String(key) => KNOWN_NODE_PROPERTY_SELECTIVITY
                    .get(key.as_str())
                    .copied()
                    .unwrap_or(0),
                _ => 0,
            }),
            _ => Ok(0),
        }
    }
}

/// Heuristic score of `expression`; higher narrows more. `owning_identifier_bound` marks a
/// constraint owner that an earlier frame already materialized.
pub fn measure_selectivity(
    scope: &Scope,
    owning_identifier_bound: bool,
    expression: Option<&Expression>,
) -> TranslationResult<i32> {
    let mut selectivity = if owning_identifier_bound {
        SELECTIVITY_WEIGHT_BOUND_IDENTIFIER
    } else {
        0
    };

    if let Some(expression) = expression {
        selectivity += SelectivityVisitor { scope }.measure(expression)?;
    }

    Ok(selectivity)
}

/// Constraints consumed for the endpoints of one traversal step
#[derive(Debug, Default)]
pub struct EndpointConstraints {
    pub left: Option<Constraint>,
    pub right: Option<Constraint>,
}

/// Flips `step` when its right endpoint is strictly more selective than its left one so
/// that expansion starts from the narrower side. Returns true when the step was flipped.
pub fn optimize_pattern_constraint_balance(
    scope: &Scope,
    step: &mut TraversalStep,
    constraints: &mut EndpointConstraints,
) -> TranslationResult<bool> {
    let is_bound = |binding| scope.binding(binding).last_projection.is_some();

    let left = measure_selectivity(
        scope,
        is_bound(step.left_node),
        constraints.left.as_ref().map(|constraint| &constraint.expression),
    )?;
    let right = measure_selectivity(
        scope,
        is_bound(step.right_node),
        constraints.right.as_ref().map(|constraint| &constraint.expression),
    )?;

    if right <= left {
        return Ok(false);
    }

    debug!(
        "flipping traversal step {} -> {}: right selectivity {right} exceeds left {left}",
        scope.identifier(step.left_node),
        scope.identifier(step.right_node)
    );

    step.flip_nodes();
    std::mem::swap(&mut constraints.left, &mut constraints.right);

    Ok(true)
}
