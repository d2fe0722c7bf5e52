//! PostgreSQL text rendering of the SQL AST.
//!
//! Rendering is deterministic: the same tree always produces the same text. Parameters
//! render as `@name` placeholders unless the builder is asked to materialize them, in
//! which case their bound values are inlined as literals.

use thiserror::Error;

use super::model::*;
use super::operators::Operator;
use super::types::DataType;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormatError {
    #[error("unable to format unresolved future expression {0}")]
    UnresolvedFuture(usize),

    #[error("unable to materialize parameter {name}: {reason}")]
    ParameterMaterialization { name: String, reason: String },
}

/// Accumulates rendered SQL text
#[derive(Debug, Default)]
pub struct OutputBuilder {
    buffer: String,
    materialize_parameters: bool,
}

impl OutputBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn materialized() -> Self {
        Self {
            buffer: String::new(),
            materialize_parameters: true,
        }
    }

    pub fn write(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn build(self) -> String {
        self.buffer
    }
}

pub trait ToSql {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError>;

    fn to_sql(&self) -> Result<String, FormatError> {
        let mut builder = OutputBuilder::new();
        self.write_sql(&mut builder)?;
        Ok(builder.build())
    }
}

/// Renders a full statement terminated with `;`
pub fn format_statement(
    statement: &Statement,
    mut builder: OutputBuilder,
) -> Result<String, FormatError> {
    statement.write_sql(&mut builder)?;
    builder.write(";");
    Ok(builder.build())
}

pub fn format_expression(expression: &Expression) -> Result<String, FormatError> {
    expression.to_sql()
}

fn write_list<T: ToSql>(
    builder: &mut OutputBuilder,
    items: &[T],
    separator: &str,
) -> Result<(), FormatError> {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            builder.write(separator);
        }

        item.write_sql(builder)?;
    }

    Ok(())
}

fn write_cast(builder: &mut OutputBuilder, cast_type: DataType) {
    if cast_type.is_known() && cast_type != DataType::Null {
        builder.write("::");
        builder.write(cast_type.as_str());
    }
}

fn quote_text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

impl ToSql for LiteralValue {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        match self {
            LiteralValue::Null => builder.write("null"),
            LiteralValue::Bool(value) => builder.write(if *value { "true" } else { "false" }),
            LiteralValue::Int(value) => builder.write(&value.to_string()),
            LiteralValue::Float(value) => builder.write(&format_float(*value)),
            LiteralValue::String(value) => builder.write(&quote_text(value)),
        }

        Ok(())
    }
}

fn write_json_value(
    builder: &mut OutputBuilder,
    name: &str,
    value: &serde_json::Value,
) -> Result<(), FormatError> {
    match value {
        serde_json::Value::Null => builder.write("null"),
        serde_json::Value::Bool(value) => builder.write(if *value { "true" } else { "false" }),
        serde_json::Value::Number(number) => builder.write(&number.to_string()),
        serde_json::Value::String(value) => builder.write(&quote_text(value)),
        serde_json::Value::Array(values) => {
            builder.write("array [");

            for (index, value) in values.iter().enumerate() {
                if index > 0 {
                    builder.write(", ");
                }

                write_json_value(builder, name, value)?;
            }

            builder.write("]");
        }
        serde_json::Value::Object(_) => {
            let encoded = serde_json::to_string(value).map_err(|err| {
                FormatError::ParameterMaterialization {
                    name: name.to_string(),
                    reason: err.to_string(),
                }
            })?;

            builder.write(&quote_text(&encoded));
            builder.write("::jsonb");
        }
    }

    Ok(())
}

fn is_associative(operator: Operator) -> bool {
    matches!(
        operator,
        Operator::And | Operator::Or | Operator::Add | Operator::Multiply | Operator::Concatenate
    )
}

/// Writes a binary or unary operand, wrapping it in parentheses when `needs_parentheses`
/// holds for its operator
fn write_operand<F: Fn(Operator) -> bool>(
    builder: &mut OutputBuilder,
    operand: &Expression,
    needs_parentheses: F,
) -> Result<(), FormatError> {
    let operand_operator = match operand {
        Expression::Binary(binary) => Some(binary.operator),
        Expression::Unary(unary) if unary.operator == Operator::Not => Some(unary.operator),
        _ => None,
    };

    match operand_operator {
        Some(operator) if needs_parentheses(operator) => {
            builder.write("(");
            operand.write_sql(builder)?;
            builder.write(")");
            Ok(())
        }
        _ => operand.write_sql(builder),
    }
}

impl ToSql for Expression {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        match self {
            Expression::Identifier(identifier) => builder.write(identifier.as_str()),

            Expression::CompoundIdentifier(identifier) => builder.write(&identifier.to_string()),

            Expression::RowColumnReference(reference) => {
                builder.write("(");
                reference.identifier.write_sql(builder)?;
                builder.write(").");
                builder.write(reference.column.as_str());
            }

            Expression::Literal(literal) => literal.value.write_sql(builder)?,

            Expression::Parameter(parameter) => {
                if builder.materialize_parameters {
                    write_json_value(builder, parameter.identifier.as_str(), &parameter.value)?;
                } else {
                    builder.write("@");
                    builder.write(parameter.identifier.as_str());
                }

                if parameter.cast_type != DataType::Parameter {
                    write_cast(builder, parameter.cast_type);
                }
            }

            Expression::Binary(binary) => {
                let precedence = binary.operator.precedence();

                write_operand(builder, &binary.left, |operand| operand.precedence() < precedence)?;
                builder.write(" ");
                builder.write(binary.operator.as_str());
                builder.write(" ");
                // Equal precedence on the right only regroups safely for the same associative operator
                write_operand(builder, &binary.right, |operand| {
                    operand.precedence() < precedence
                        || (operand.precedence() == precedence
                            && !(operand == binary.operator && is_associative(operand)))
                })?;
            }

            Expression::Unary(unary) => {
                let precedence = unary.operator.precedence();

                builder.write(unary.operator.as_str());
                builder.write(" ");
                write_operand(builder, &unary.operand, |operand| operand.precedence() < precedence)?;
            }

            Expression::Parenthetical(inner) => {
                builder.write("(");
                inner.write_sql(builder)?;
                builder.write(")");
            }

            Expression::TypeCast(cast) => match &cast.expression {
                Expression::Binary(binary)
                    if binary.operator == Operator::JsonTextField
                        && cast.cast_type == DataType::Text =>
                {
                    // ->> already yields text
                    cast.expression.write_sql(builder)?;
                }

                Expression::Parenthetical(_) => {
                    cast.expression.write_sql(builder)?;
                    write_cast(builder, cast.cast_type);
                }

                inner => {
                    builder.write("(");
                    inner.write_sql(builder)?;
                    builder.write(")");
                    write_cast(builder, cast.cast_type);
                }
            },

            Expression::FunctionCall(call) => {
                builder.write(call.function.as_str());

                if !call.bare {
                    builder.write("(");

                    if call.distinct {
                        builder.write("distinct ");
                    }

                    write_list(builder, &call.parameters, ", ")?;
                    builder.write(")");
                    write_cast(builder, call.cast_type);
                }
            }

            Expression::Any(any) => {
                builder.write("any (");
                any.expression.write_sql(builder)?;
                builder.write(")");
            }

            Expression::ArrayLiteral(array) => {
                builder.write("array [");
                write_list(builder, &array.values, ", ")?;
                builder.write("]");
                write_cast(builder, array.cast_type);
            }

            Expression::ArrayExpression(query) => {
                builder.write("array (");
                query.write_sql(builder)?;
                builder.write(")");
            }

            Expression::CompositeValue(composite) => {
                builder.write("(");
                write_list(builder, &composite.values, ", ")?;
                builder.write(")");
                write_cast(builder, composite.data_type);
            }

            Expression::Variadic(inner) => {
                builder.write("variadic ");
                inner.write_sql(builder)?;
            }

            Expression::Exists(exists) => {
                if exists.negated {
                    builder.write("not ");
                }

                builder.write("exists (");
                exists.subquery.write_sql(builder)?;
                builder.write(")");
            }

            Expression::Subquery(query) => {
                builder.write("(");
                query.write_sql(builder)?;
                builder.write(")");
            }

            Expression::Wildcard => builder.write("*"),

            Expression::Future(future) => return Err(FormatError::UnresolvedFuture(future.id)),
        }

        Ok(())
    }
}

impl ToSql for SelectItem {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        self.expression.write_sql(builder)?;

        if let Some(alias) = &self.alias {
            builder.write(" as ");
            builder.write(alias.as_str());
        }

        Ok(())
    }
}

impl ToSql for TableReference {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        self.name.write_sql(builder)?;

        if let Some(binding) = &self.binding {
            builder.write(" ");
            builder.write(binding.as_str());
        }

        Ok(())
    }
}

impl ToSql for Join {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        builder.write(match self.join_type {
            JoinType::Inner => "join ",
            JoinType::LeftOuter => "left outer join ",
            JoinType::RightOuter => "right outer join ",
            JoinType::FullOuter => "full outer join ",
        });

        self.table.write_sql(builder)?;
        builder.write(" on ");
        self.constraint.write_sql(builder)
    }
}

impl ToSql for FromClause {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        self.source.write_sql(builder)?;

        for join in &self.joins {
            builder.write(" ");
            join.write_sql(builder)?;
        }

        Ok(())
    }
}

impl ToSql for Select {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        builder.write("select ");

        if self.distinct {
            builder.write("distinct ");
        }

        write_list(builder, &self.projection, ", ")?;

        if !self.from.is_empty() {
            builder.write(" from ");
            write_list(builder, &self.from, ", ")?;
        }

        if let Some(where_clause) = &self.where_clause {
            builder.write(" where ");
            where_clause.write_sql(builder)?;
        }

        if !self.group_by.is_empty() {
            builder.write(" group by ");
            write_list(builder, &self.group_by, ", ")?;
        }

        if let Some(having) = &self.having {
            builder.write(" having ");
            having.write_sql(builder)?;
        }

        Ok(())
    }
}

impl ToSql for OrderBy {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        self.expression.write_sql(builder)?;

        if !self.ascending {
            builder.write(" desc");
        }

        Ok(())
    }
}

impl ToSql for CommonTableExpression {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        builder.write(self.alias.name.as_str());

        if let Some(shape) = &self.alias.shape {
            let columns: Vec<&str> = shape.iter().map(|column| column.as_str()).collect();
            builder.write("(");
            builder.write(&columns.join(", "));
            builder.write(")");
        }

        builder.write(" as ");

        if self.materialized {
            builder.write("materialized ");
        }

        builder.write("(");
        self.query.write_sql(builder)?;
        builder.write(")");

        Ok(())
    }
}

impl ToSql for With {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        if self.expressions.is_empty() {
            return Ok(());
        }

        builder.write("with ");

        if self.recursive {
            builder.write("recursive ");
        }

        write_list(builder, &self.expressions, ", ")?;
        builder.write(" ");

        Ok(())
    }
}

impl ToSql for SetOperation {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        self.left.write_sql(builder)?;

        builder.write(match self.operator {
            SetOperator::Union => " union ",
            SetOperator::Intersect => " intersect ",
            SetOperator::Except => " except ",
        });

        if self.all {
            builder.write("all ");
        }

        self.right.write_sql(builder)
    }
}

impl ToSql for SetExpression {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        match self {
            SetExpression::Select(select) => select.write_sql(builder),
            SetExpression::SetOperation(operation) => operation.write_sql(builder),
            SetExpression::Update(update) => update.write_sql(builder),
            SetExpression::Delete(delete) => delete.write_sql(builder),
            SetExpression::Insert(insert) => insert.write_sql(builder),
        }
    }
}

impl ToSql for Query {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        if let Some(ctes) = &self.ctes {
            ctes.write_sql(builder)?;
        }

        self.body.write_sql(builder)?;

        if !self.order_by.is_empty() {
            builder.write(" order by ");
            write_list(builder, &self.order_by, ", ")?;
        }

        if let Some(offset) = &self.offset {
            builder.write(" offset ");
            offset.write_sql(builder)?;
        }

        if let Some(limit) = &self.limit {
            builder.write(" limit ");
            limit.write_sql(builder)?;
        }

        Ok(())
    }
}

fn write_returning(builder: &mut OutputBuilder, returning: &[SelectItem]) -> Result<(), FormatError> {
    if !returning.is_empty() {
        builder.write(" returning ");
        write_list(builder, returning, ", ")?;
    }

    Ok(())
}

impl ToSql for Update {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        builder.write("update ");
        self.table.write_sql(builder)?;
        builder.write(" set ");
        write_list(builder, &self.assignments, ", ")?;

        if !self.from.is_empty() {
            builder.write(" from ");
            write_list(builder, &self.from, ", ")?;
        }

        if let Some(where_clause) = &self.where_clause {
            builder.write(" where ");
            where_clause.write_sql(builder)?;
        }

        write_returning(builder, &self.returning)
    }
}

impl ToSql for Delete {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        builder.write("delete from ");
        self.from.write_sql(builder)?;

        if !self.using.is_empty() {
            builder.write(" using ");
            write_list(builder, &self.using, ", ")?;
        }

        if let Some(where_clause) = &self.where_clause {
            builder.write(" where ");
            where_clause.write_sql(builder)?;
        }

        write_returning(builder, &self.returning)
    }
}

impl ToSql for Insert {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        builder.write("insert into ");
        self.table.write_sql(builder)?;

        if !self.shape.is_empty() {
            let columns: Vec<&str> = self.shape.iter().map(|column| column.as_str()).collect();
            builder.write(" (");
            builder.write(&columns.join(", "));
            builder.write(")");
        }

        builder.write(" ");
        self.source.write_sql(builder)?;

        write_returning(builder, &self.returning)
    }
}

impl ToSql for Statement {
    fn write_sql(&self, builder: &mut OutputBuilder) -> Result<(), FormatError> {
        match self {
            Statement::Query(query) => query.write_sql(builder),
            Statement::Insert(insert) => insert.write_sql(builder),
            Statement::Update(update) => update.write_sql(builder),
            Statement::Delete(delete) => delete.write_sql(builder),
        }
    }
}
