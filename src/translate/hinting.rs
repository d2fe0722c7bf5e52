//! Type inference and property lookup concretization.
//!
//! A cypher property access `n.name` is first emitted as a binary expression using the
//! untyped [`Operator::PropertyLookup`] placeholder. Once the surrounding expression
//! supplies an expected type (the other side of a comparison, an `IN` list, a string
//! operator) the placeholder is rewritten into `->>` with an optional cast, `->` for
//! JSONB values, or `jsonb_to_text_array(..)` for array values.

use crate::pgsql::{
    names, AnyExpression, BinaryExpression, DataType, Expression, FunctionCall, Operator,
};

use super::errors::{TranslationError, TranslationResult};

/// True for `x.properties <lookup> 'key'` in any of its concretized forms
pub fn is_property_lookup(expression: &Expression) -> bool {
    expression
        .as_binary()
        .map(|binary| binary.operator.is_property_lookup())
        .unwrap_or(false)
}

/// Structural type inference. Property lookups are unknown until concretized.
pub fn infer_expression_type(expression: &Expression) -> TranslationResult<DataType> {
    match expression {
        Expression::Identifier(_) | Expression::RowColumnReference(_) => Ok(DataType::Unknown),

        Expression::CompoundIdentifier(identifier) => {
            if identifier.0.len() != 2 {
                return Err(TranslationError::malformed(format!(
                    "expected a compound identifier to have only 2 components but found: {identifier}"
                )));
            }

            Ok(match identifier.0[1].as_str() {
                names::COLUMN_ID
                | names::COLUMN_START_ID
                | names::COLUMN_END_ID
                | names::COLUMN_GRAPH_ID => DataType::Int8,
                names::COLUMN_KIND_ID => DataType::Int2,
                names::COLUMN_KIND_IDS => DataType::Int2Array,
                names::COLUMN_PROPERTIES => DataType::Jsonb,
                _ => DataType::Unknown,
            })
        }

        Expression::Parenthetical(inner) => infer_expression_type(inner),

        Expression::Unary(unary) => match unary.operator {
            Operator::Not => Ok(DataType::Boolean),
            _ => infer_expression_type(&unary.operand),
        },

        Expression::Binary(binary) => match binary.operator {
            operator if operator.is_property_lookup() => Ok(DataType::Unknown),
            Operator::JsonTextPath => Ok(DataType::Text),
            operator if operator.is_comparator() || operator.is_logical() => Ok(DataType::Boolean),
            _ => infer_binary_expression_type(binary),
        },

        Expression::Exists(_) => Ok(DataType::Boolean),

        other => Ok(other.type_hint().unwrap_or(DataType::Unknown)),
    }
}

fn infer_binary_expression_type(binary: &BinaryExpression) -> TranslationResult<DataType> {
    let left = match binary.left.type_hint() {
        Some(hint) => hint,
        None => infer_expression_type(&binary.left)?,
    };

    let right = match binary.right.type_hint() {
        Some(hint) => hint,
        None => infer_expression_type(&binary.right)?,
    };

    if !left.is_known() && !right.is_known() {
        return Ok(DataType::Unknown);
    }

    left.operator_result_type(right, binary.operator)
        .ok_or_else(|| {
            TranslationError::incompatible(format!(
                "left and right operands for binary expression \"{}\" are not compatible: {left} != {right}",
                binary.operator
            ))
        })
}

/// `expression::data_type`, concretizing property lookups instead of wrapping them
pub fn type_cast_expression(expression: Expression, data_type: DataType) -> Expression {
    if is_property_lookup(&expression) {
        rewrite_property_lookup_operator(expression, data_type)
    } else {
        Expression::type_cast(expression, data_type)
    }
}

/// Concretizes a property lookup for the expected `data_type`
pub fn rewrite_property_lookup_operator(lookup: Expression, data_type: DataType) -> Expression {
    let Expression::Binary(mut binary) = lookup else {
        return lookup;
    };

    if data_type.is_array() {
        binary.operator = Operator::JsonField;

        return FunctionCall::new(
            "jsonb_to_text_array",
            vec![Expression::Binary(binary)],
            data_type,
        )
        .into();
    }

    match data_type {
        DataType::Unset | DataType::Unknown | DataType::Text => {
            binary.operator = Operator::JsonTextField;
            Expression::Binary(binary)
        }

        DataType::Jsonb => {
            binary.operator = Operator::JsonField;
            Expression::Binary(binary)
        }

        _ => {
            binary.operator = Operator::JsonTextField;
            Expression::type_cast(Expression::Binary(binary), data_type)
        }
    }
}

fn is_text_operator(operator: Operator) -> bool {
    matches!(
        operator,
        Operator::CypherStartsWith
            | Operator::CypherEndsWith
            | Operator::CypherContains
            | Operator::CypherRegexMatch
            | Operator::Like
            | Operator::ILike
            | Operator::RegexMatch
            | Operator::SimilarTo
    )
}

fn lookup_hint_from_right(binary: &BinaryExpression) -> TranslationResult<DataType> {
    if is_text_operator(binary.operator) {
        return Ok(DataType::Text);
    }

    if binary.operator == Operator::In {
        let right = infer_expression_type(&binary.right)?;
        return Ok(right.array_base_type().unwrap_or(DataType::Unknown));
    }

    match &binary.right {
        Expression::Any(any) => Ok(any.cast_type.array_base_type().unwrap_or(any.cast_type)),
        other => infer_expression_type(other),
    }
}

fn lookup_hint_from_left(binary: &BinaryExpression) -> TranslationResult<DataType> {
    if is_text_operator(binary.operator) {
        return Ok(DataType::Text);
    }

    let left = infer_expression_type(&binary.left)?;

    if binary.operator == Operator::In {
        Ok(left.to_array_type().unwrap_or(DataType::Unknown))
    } else {
        Ok(left)
    }
}

fn take(expression: &mut Expression) -> Expression {
    std::mem::replace(expression, Expression::Wildcard)
}

/// Concretizes property lookup operands of `binary` from the opposing operand's type
pub fn rewrite_property_lookup_operands(binary: &mut BinaryExpression) -> TranslationResult<()> {
    // Null checks are rewritten into key existence tests afterwards
    if matches!(binary.operator, Operator::Is | Operator::IsNot) {
        return Ok(());
    }

    let left_lookup = is_property_lookup(&binary.left);
    let right_lookup = is_property_lookup(&binary.right);

    // Lookup to lookup comparisons stay JSONB; text operators need both sides as text
    if left_lookup && right_lookup && !is_text_operator(binary.operator) {
        for operand in [&mut binary.left, &mut binary.right] {
            if let Some(lookup) = operand.as_binary_mut() {
                lookup.operator = Operator::JsonField;
            }
        }

        return Ok(());
    }

    if left_lookup {
        let hint = lookup_hint_from_right(binary)?;
        binary.left = rewrite_property_lookup_operator(take(&mut binary.left), hint);
    }

    if right_lookup {
        let hint = lookup_hint_from_left(binary)?;
        binary.right = rewrite_property_lookup_operator(take(&mut binary.right), hint);
    }

    Ok(())
}

/// Extracts a JSONB scalar as `data_type`: `v #>> '{}'` with an optional cast
pub fn rewrite_jsonb_value(value: Expression, data_type: DataType) -> Expression {
    if data_type.is_array() {
        return FunctionCall::new("jsonb_to_text_array", vec![value], data_type).into();
    }

    let text = Expression::binary(Operator::JsonTextPath, value, Expression::text("{}"));

    match data_type {
        DataType::Unset | DataType::Unknown | DataType::Text => text,
        other => Expression::type_cast(text, other),
    }
}

/// Concretizes an operand holding a projected JSONB value from the opposing operand's
/// type. JSONB against JSONB, or against a property lookup, is left as JSONB.
pub fn rewrite_jsonb_value_operands(
    binary: &mut BinaryExpression,
    left_jsonb: bool,
    right_jsonb: bool,
) -> TranslationResult<()> {
    if left_jsonb == right_jsonb
        || binary.operator.is_logical()
        || matches!(binary.operator, Operator::Is | Operator::IsNot)
    {
        return Ok(());
    }

    let text_operator = is_text_operator(binary.operator);
    let other = if left_jsonb { &mut binary.right } else { &mut binary.left };

    // Grouped so later lookup hinting leaves the JSONB form alone
    if !text_operator && is_property_lookup(other) {
        let lookup = rewrite_property_lookup_operator(take(other), DataType::Jsonb);
        *other = Expression::parenthetical(lookup);

        return Ok(());
    }

    let hint = if left_jsonb {
        lookup_hint_from_right(binary)?
    } else {
        lookup_hint_from_left(binary)?
    };

    if !text_operator && matches!(hint, DataType::Jsonb | DataType::Unknown | DataType::Unset) {
        return Ok(());
    }

    let value = if left_jsonb { &mut binary.left } else { &mut binary.right };
    *value = rewrite_jsonb_value(take(value), hint);

    Ok(())
}

/// Fills in the cast of an untyped `any (..)` from the opposing operand
pub fn apply_type_function_like_type_hints(
    binary: &mut BinaryExpression,
) -> TranslationResult<()> {
    if let Expression::Any(any) = &binary.right {
        if !any.cast_type.is_known() {
            let left = infer_expression_type(&binary.left)?;
            let cast_type = left.to_array_type().unwrap_or(DataType::AnyArray);

            binary.right = Expression::Any(Box::new(AnyExpression {
                expression: any.expression.clone(),
                cast_type,
            }));
        }
    }

    Ok(())
}

/// Applied every time a binary expression is assembled or popped from the stack
pub fn apply_binary_expression_type_hints(expression: &mut Expression) -> TranslationResult<()> {
    let Some(binary) = expression.as_binary_mut() else {
        return Ok(());
    };

    if binary.operator == Operator::PropertyLookup {
        binary.operator = Operator::JsonTextField;
        return Ok(());
    }

    rewrite_property_lookup_operands(binary)?;
    apply_type_function_like_type_hints(binary)
}

/// `not n.flag` treats the lookup as a boolean
pub fn apply_unary_expression_type_hints(expression: &mut Expression) {
    if let Expression::Unary(unary) = expression {
        if unary.operator == Operator::Not && is_property_lookup(&unary.operand) {
            unary.operand = rewrite_property_lookup_operator(take(&mut unary.operand), DataType::Boolean);
        }
    }
}
