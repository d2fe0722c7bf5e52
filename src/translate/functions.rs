//! Cypher function invocations.

use crate::cypher::FunctionInvocation;
use crate::pgsql::{names, DataType, Expression, FunctionCall, Operator};

use super::errors::{TranslationError, TranslationResult};
use super::hinting::{infer_expression_type, is_property_lookup, type_cast_expression};
use super::scope::Scope;

const AGGREGATE_FUNCTIONS: &[&str] = &["count", "array_agg", "sum", "avg", "min", "max"];

/// True when `expression` contains a call to an aggregate function
pub fn has_aggregate(expression: &Expression) -> bool {
    let mut found = false;

    expression.visit(&mut |node| {
        if let Expression::FunctionCall(call) = node {
            if AGGREGATE_FUNCTIONS.contains(&call.function.as_str()) {
                found = true;
            }
        }
    });

    found
}

fn expect_arguments(
    name: &str,
    arguments: &[Expression],
    expected: usize,
) -> TranslationResult<()> {
    if arguments.len() != expected {
        return Err(TranslationError::malformed(format!(
            "function {name} expects {expected} argument(s) but received {}",
            arguments.len()
        )));
    }

    Ok(())
}

fn single_argument(name: &str, arguments: Vec<Expression>) -> TranslationResult<Expression> {
    expect_arguments(name, &arguments, 1)?;
    arguments
        .into_iter()
        .next()
        .ok_or_else(|| TranslationError::malformed(format!("function {name} has no argument")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Any,
    Node,
    Edge,
}

/// `n.column` for an argument that names a node or edge binding
fn entity_column(
    scope: &Scope,
    name: &str,
    argument: Expression,
    column: &str,
    accepted: Entity,
) -> TranslationResult<Expression> {
    let Expression::Identifier(identifier) = argument else {
        return Err(TranslationError::unsupported(format!(
            "function {name} expects a node or relationship variable"
        )));
    };

    let binding = scope
        .lookup(&identifier)
        .ok_or_else(|| TranslationError::unresolved(format!("unable to find identifier {identifier}")))?;

    let data_type = scope.binding(binding).data_type;
    let entity = match data_type {
        DataType::NodeComposite | DataType::ExpansionRootNode | DataType::ExpansionTerminalNode => {
            Some(Entity::Node)
        }
        DataType::EdgeComposite => Some(Entity::Edge),
        _ => None,
    };

    match entity {
        Some(entity) if accepted == Entity::Any || accepted == entity => {
            Ok(Expression::column(&identifier, column))
        }
        _ => Err(TranslationError::incompatible(format!(
            "function {name} does not accept {identifier} of type {data_type}"
        ))),
    }
}

/// Concretizes a property lookup argument; other arguments pass through
fn lookup_argument(argument: Expression, data_type: DataType) -> Expression {
    if is_property_lookup(&argument) {
        type_cast_expression(argument, data_type)
    } else {
        argument
    }
}

/// Type of an argument once property lookups default to `default`
fn argument_type(argument: &Expression, default: DataType) -> TranslationResult<DataType> {
    if is_property_lookup(argument) {
        return Ok(default);
    }

    let inferred = infer_expression_type(argument)?;

    Ok(if inferred.is_known() { inferred } else { default })
}

fn call(function: &str, arguments: Vec<Expression>, cast_type: DataType) -> Expression {
    FunctionCall::new(function, arguments, cast_type).into()
}

fn aggregate(
    function: &str,
    invocation: &FunctionInvocation,
    argument: Expression,
    cast_type: DataType,
) -> Expression {
    let mut aggregate = FunctionCall::new(function, vec![argument], cast_type);
    aggregate.distinct = invocation.distinct;
    aggregate.into()
}

/// `temporal()` reads the clock, `temporal(x)` converts `x`
fn temporal(
    name: &str,
    arguments: Vec<Expression>,
    current: &str,
    data_type: DataType,
) -> TranslationResult<Expression> {
    match arguments.len() {
        0 => Ok(if current.ends_with("()") {
            call(current.trim_end_matches("()"), vec![], data_type)
        } else {
            FunctionCall::bare(current, data_type).into()
        }),
        _ => Ok(type_cast_expression(single_argument(name, arguments)?, data_type)),
    }
}

/// Translates a cypher function call whose arguments have already been translated
pub fn translate_function(
    scope: &Scope,
    invocation: &FunctionInvocation,
    arguments: Vec<Expression>,
) -> TranslationResult<Expression> {
    let name = invocation.name.to_lowercase();

    match name.as_str() {
        "id" => entity_column(
            scope,
            &name,
            single_argument(&name, arguments)?,
            names::COLUMN_ID,
            Entity::Any,
        ),

        "type" => entity_column(
            scope,
            &name,
            single_argument(&name, arguments)?,
            names::COLUMN_KIND_ID,
            Entity::Edge,
        ),

        "labels" => entity_column(
            scope,
            &name,
            single_argument(&name, arguments)?,
            names::COLUMN_KIND_IDS,
            Entity::Node,
        ),

        "count" => {
            let argument = match arguments.len() {
                0 => Expression::Wildcard,
                _ => single_argument(&name, arguments)?,
            };

            Ok(aggregate("count", invocation, argument, DataType::Int8))
        }

        "collect" => {
            let argument = lookup_argument(single_argument(&name, arguments)?, DataType::Text);

            let element_type = match &argument {
                Expression::Identifier(identifier) => scope
                    .lookup(identifier)
                    .map(|binding| scope.binding(binding).data_type)
                    .unwrap_or(DataType::Unknown),
                other => infer_expression_type(other)?,
            };

            let cast_type = match element_type {
                DataType::ExpansionRootNode | DataType::ExpansionTerminalNode => {
                    DataType::NodeCompositeArray
                }
                other => other.to_array_type().unwrap_or(DataType::Unset),
            };

            Ok(aggregate("array_agg", invocation, argument, cast_type))
        }

        "sum" | "avg" | "min" | "max" => {
            let argument = single_argument(&name, arguments)?;
            let data_type = argument_type(&argument, DataType::Float8)?;

            let cast_type = if name == "avg" {
                DataType::Float8
            } else {
                data_type
            };

            Ok(aggregate(
                &name,
                invocation,
                lookup_argument(argument, data_type),
                cast_type,
            ))
        }

        "size" => {
            let mut argument = single_argument(&name, arguments)?;

            if is_property_lookup(&argument) {
                if let Some(lookup) = argument.as_binary_mut() {
                    lookup.operator = Operator::JsonField;
                }

                return Ok(call("jsonb_array_length", vec![argument], DataType::Int));
            }

            if argument_type(&argument, DataType::Unknown)? == DataType::Text {
                Ok(call("length", vec![argument], DataType::Int))
            } else {
                Ok(call("array_length", vec![argument, Expression::int8(1)], DataType::Int))
            }
        }

        "split" => {
            expect_arguments(&name, &arguments, 2)?;

            let arguments = arguments
                .into_iter()
                .map(|argument| lookup_argument(argument, DataType::Text))
                .collect();

            Ok(call("string_to_array", arguments, DataType::TextArray))
        }

        "tolower" | "toupper" => {
            let argument = lookup_argument(single_argument(&name, arguments)?, DataType::Text);
            let function = if name == "tolower" { "lower" } else { "upper" };

            Ok(call(function, vec![argument], DataType::Text))
        }

        "tostring" => Ok(type_cast_expression(single_argument(&name, arguments)?, DataType::Text)),
        "tointeger" => Ok(type_cast_expression(single_argument(&name, arguments)?, DataType::Int8)),
        "tofloat" => Ok(type_cast_expression(single_argument(&name, arguments)?, DataType::Float8)),

        "coalesce" => {
            if arguments.is_empty() {
                return Err(TranslationError::malformed("coalesce expects at least one argument"));
            }

            let mut common = DataType::Unknown;

            for argument in arguments.iter().filter(|argument| !is_property_lookup(argument)) {
                let inferred = infer_expression_type(argument)?;

                if inferred.is_known() && inferred != DataType::Null {
                    common = common.convert(inferred).ok_or_else(|| {
                        TranslationError::incompatible(format!(
                            "coalesce arguments are not compatible: {common} != {inferred}"
                        ))
                    })?;
                }
            }

            let common = if common.is_known() { common } else { DataType::Text };
            let arguments = arguments
                .into_iter()
                .map(|argument| lookup_argument(argument, common))
                .collect();

            Ok(call("coalesce", arguments, common))
        }

        "duration" => Ok(type_cast_expression(
            single_argument(&name, arguments)?,
            DataType::Interval,
        )),

        "date" => temporal(&name, arguments, "current_date", DataType::Date),
        "localtime" => temporal(&name, arguments, "localtime", DataType::TimeWithoutTimeZone),
        "localdatetime" => temporal(
            &name,
            arguments,
            "localtimestamp",
            DataType::TimestampWithoutTimeZone,
        ),
        "datetime" => temporal(&name, arguments, "now()", DataType::TimestampWithTimeZone),

        _ => Err(TranslationError::unsupported(format!(
            "unknown function: {}",
            invocation.name
        ))),
    }
}
