use super::identifiers::{CompoundIdentifier, Identifier, IdentifierSet};
use super::operators::Operator;
use super::types::DataType;

#[derive(Debug, PartialEq, Clone)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Literal {
    pub value: LiteralValue,
    pub cast_type: DataType,
}

impl Literal {
    pub fn new(value: LiteralValue, cast_type: DataType) -> Self {
        Self { value, cast_type }
    }

    pub fn null() -> Self {
        Self::new(LiteralValue::Null, DataType::Null)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(LiteralValue::String(value.into()), DataType::Text)
    }

    pub fn int8(value: i64) -> Self {
        Self::new(LiteralValue::Int(value), DataType::Int8)
    }

    pub fn int(value: i64) -> Self {
        Self::new(LiteralValue::Int(value), DataType::Int)
    }

    pub fn int2(value: i16) -> Self {
        Self::new(LiteralValue::Int(value.into()), DataType::Int2)
    }

    pub fn float8(value: f64) -> Self {
        Self::new(LiteralValue::Float(value), DataType::Float8)
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(LiteralValue::Bool(value), DataType::Boolean)
    }

    pub fn is_null(&self) -> bool {
        self.value == LiteralValue::Null
    }
}

/// Bound query parameter, rendered as `@identifier`
#[derive(Debug, PartialEq, Clone)]
pub struct Parameter {
    pub identifier: Identifier,
    pub cast_type: DataType,
    pub value: serde_json::Value,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionCall {
    pub function: Identifier,
    /// Rendered without parentheses, e.g. `current_date`
    pub bare: bool,
    pub distinct: bool,
    pub parameters: Vec<Expression>,
    pub cast_type: DataType,
}

impl FunctionCall {
    pub fn new(function: &str, parameters: Vec<Expression>, cast_type: DataType) -> Self {
        Self {
            function: Identifier::from(function),
            bare: false,
            distinct: false,
            parameters,
            cast_type,
        }
    }

    pub fn bare(function: &str, cast_type: DataType) -> Self {
        Self {
            bare: true,
            ..Self::new(function, vec![], cast_type)
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct BinaryExpression {
    pub operator: Operator,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Debug, PartialEq, Clone)]
pub struct UnaryExpression {
    pub operator: Operator,
    pub operand: Expression,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TypeCast {
    pub expression: Expression,
    pub cast_type: DataType,
}

/// `any (expression)`
#[derive(Debug, PartialEq, Clone)]
pub struct AnyExpression {
    pub expression: Expression,
    pub cast_type: DataType,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ArrayLiteral {
    pub values: Vec<Expression>,
    pub cast_type: DataType,
}

/// Row constructor such as `(n0.id, n0.kind_ids, n0.properties)::nodecomposite`
#[derive(Debug, PartialEq, Clone)]
pub struct CompositeValue {
    pub values: Vec<Expression>,
    pub data_type: DataType,
}

/// `(expression).column`
#[derive(Debug, PartialEq, Clone)]
pub struct RowColumnReference {
    pub identifier: Expression,
    pub column: Identifier,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ExistsExpression {
    pub subquery: Query,
    pub negated: bool,
}

/// Placeholder for an expression that is compiled later. Any constraint containing an
/// unresolved future is withheld by the constraint tracker.
#[derive(Debug, PartialEq, Clone)]
pub struct FutureExpression {
    pub id: usize,
    pub dependencies: IdentifierSet,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Identifier(Identifier),
    CompoundIdentifier(CompoundIdentifier),
    RowColumnReference(Box<RowColumnReference>),
    Literal(Literal),
    Parameter(Parameter),
    Binary(Box<BinaryExpression>),
    Unary(Box<UnaryExpression>),
    Parenthetical(Box<Expression>),
    TypeCast(Box<TypeCast>),
    FunctionCall(FunctionCall),
    Any(Box<AnyExpression>),
    ArrayLiteral(ArrayLiteral),
    /// `array (subquery)`
    ArrayExpression(Box<Query>),
    CompositeValue(CompositeValue),
    Variadic(Box<Expression>),
    Exists(Box<ExistsExpression>),
    Subquery(Box<Query>),
    Wildcard,
    Future(FutureExpression),
}

impl Expression {
    pub fn identifier(identifier: &Identifier) -> Self {
        Expression::Identifier(identifier.clone())
    }

    /// `root.column`
    pub fn column(root: &Identifier, column: &str) -> Self {
        Expression::CompoundIdentifier(root.column(&Identifier::from(column)))
    }

    pub fn binary(operator: Operator, left: Expression, right: Expression) -> Self {
        Expression::Binary(Box::new(BinaryExpression {
            operator,
            left,
            right,
        }))
    }

    pub fn unary(operator: Operator, operand: Expression) -> Self {
        Expression::Unary(Box::new(UnaryExpression { operator, operand }))
    }

    pub fn equals(left: Expression, right: Expression) -> Self {
        Self::binary(Operator::Equals, left, right)
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Self::binary(Operator::And, left, right)
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Self::binary(Operator::Or, left, right)
    }

    pub fn not(operand: Expression) -> Self {
        Self::unary(Operator::Not, operand)
    }

    pub fn parenthetical(inner: Expression) -> Self {
        Expression::Parenthetical(Box::new(inner))
    }

    pub fn type_cast(expression: Expression, cast_type: DataType) -> Self {
        Expression::TypeCast(Box::new(TypeCast {
            expression,
            cast_type,
        }))
    }

    pub fn any(expression: Expression, cast_type: DataType) -> Self {
        Expression::Any(Box::new(AnyExpression {
            expression,
            cast_type,
        }))
    }

    pub fn literal(literal: Literal) -> Self {
        Expression::Literal(literal)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::text(value))
    }

    pub fn int8(value: i64) -> Self {
        Expression::Literal(Literal::int8(value))
    }

    pub fn function(function: FunctionCall) -> Self {
        Expression::FunctionCall(function)
    }

    pub fn row_column(identifier: Expression, column: &str) -> Self {
        Expression::RowColumnReference(Box::new(RowColumnReference {
            identifier,
            column: Identifier::from(column),
        }))
    }

    /// Explicit type carried by this node, if any
    pub fn type_hint(&self) -> Option<DataType> {
        let hint = match self {
            Expression::Literal(literal) => literal.cast_type,
            Expression::Parameter(parameter) => parameter.cast_type,
            Expression::TypeCast(cast) => cast.cast_type,
            Expression::FunctionCall(call) => call.cast_type,
            Expression::Any(any) => any.cast_type,
            Expression::ArrayLiteral(array) => array.cast_type,
            Expression::CompositeValue(composite) => composite.data_type,
            Expression::Future(future) => future.data_type,
            _ => return None,
        };

        if hint == DataType::Unset {
            None
        } else {
            Some(hint)
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryExpression> {
        match self {
            Expression::Binary(binary) => Some(binary),
            _ => None,
        }
    }

    pub fn as_binary_mut(&mut self) -> Option<&mut BinaryExpression> {
        match self {
            Expression::Binary(binary) => Some(binary),
            _ => None,
        }
    }

    /// True when this expression or any sub-expression is an unresolved future
    pub fn has_unresolved_future(&self) -> bool {
        let mut found = false;

        self.visit(&mut |expression| {
            if matches!(expression, Expression::Future(_)) {
                found = true;
            }
        });

        found
    }

    /// Replaces the future `id` with `replacement`. Returns true when a replacement occurred.
    pub fn resolve_future(&mut self, id: usize, replacement: &Expression) -> bool {
        let mut resolved = false;

        self.visit_mut(&mut |expression| {
            if let Expression::Future(future) = expression {
                if future.id == id {
                    *expression = replacement.clone();
                    resolved = true;
                }
            }
        });

        resolved
    }

    /// Pre-order traversal over this expression tree. Subqueries are not entered.
    pub fn visit<F: FnMut(&Expression)>(&self, visitor: &mut F) {
        visitor(self);

        match self {
            Expression::RowColumnReference(reference) => reference.identifier.visit(visitor),
            Expression::Binary(binary) => {
                binary.left.visit(visitor);
                binary.right.visit(visitor);
            }
            Expression::Unary(unary) => unary.operand.visit(visitor),
            Expression::Parenthetical(inner) | Expression::Variadic(inner) => {
                inner.visit(visitor)
            }
            Expression::TypeCast(cast) => cast.expression.visit(visitor),
            Expression::FunctionCall(call) => {
                call.parameters.iter().for_each(|parameter| parameter.visit(visitor))
            }
            Expression::Any(any) => any.expression.visit(visitor),
            Expression::ArrayLiteral(array) => {
                array.values.iter().for_each(|value| value.visit(visitor))
            }
            Expression::CompositeValue(composite) => {
                composite.values.iter().for_each(|value| value.visit(visitor))
            }
            Expression::Identifier(_)
            | Expression::CompoundIdentifier(_)
            | Expression::Literal(_)
            | Expression::Parameter(_)
            | Expression::ArrayExpression(_)
            | Expression::Exists(_)
            | Expression::Subquery(_)
            | Expression::Wildcard
            | Expression::Future(_) => {}
        }
    }

    /// Post-order mutable traversal; children are rewritten before their parent
    pub fn visit_mut<F: FnMut(&mut Expression)>(&mut self, visitor: &mut F) {
        match self {
            Expression::RowColumnReference(reference) => reference.identifier.visit_mut(visitor),
            Expression::Binary(binary) => {
                binary.left.visit_mut(visitor);
                binary.right.visit_mut(visitor);
            }
            Expression::Unary(unary) => unary.operand.visit_mut(visitor),
            Expression::Parenthetical(inner) | Expression::Variadic(inner) => {
                inner.visit_mut(visitor)
            }
            Expression::TypeCast(cast) => cast.expression.visit_mut(visitor),
            Expression::FunctionCall(call) => call
                .parameters
                .iter_mut()
                .for_each(|parameter| parameter.visit_mut(visitor)),
            Expression::Any(any) => any.expression.visit_mut(visitor),
            Expression::ArrayLiteral(array) => {
                array.values.iter_mut().for_each(|value| value.visit_mut(visitor))
            }
            Expression::CompositeValue(composite) => composite
                .values
                .iter_mut()
                .for_each(|value| value.visit_mut(visitor)),
            Expression::Identifier(_)
            | Expression::CompoundIdentifier(_)
            | Expression::Literal(_)
            | Expression::Parameter(_)
            | Expression::ArrayExpression(_)
            | Expression::Exists(_)
            | Expression::Subquery(_)
            | Expression::Wildcard
            | Expression::Future(_) => {}
        }

        visitor(self);
    }
}

impl From<Identifier> for Expression {
    fn from(identifier: Identifier) -> Self {
        Expression::Identifier(identifier)
    }
}

impl From<CompoundIdentifier> for Expression {
    fn from(identifier: CompoundIdentifier) -> Self {
        Expression::CompoundIdentifier(identifier)
    }
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Literal(literal)
    }
}

impl From<FunctionCall> for Expression {
    fn from(call: FunctionCall) -> Self {
        Expression::FunctionCall(call)
    }
}

/// `left AND right` where either side may be absent
pub fn optional_and(left: Option<Expression>, right: Option<Expression>) -> Option<Expression> {
    match (left, right) {
        (Some(left), Some(right)) => Some(Expression::and(left, right)),
        (Some(left), None) => Some(left),
        (None, right) => right,
    }
}

/// Joins expressions left to right with AND
pub fn conjoin(expressions: Vec<Expression>) -> Option<Expression> {
    expressions
        .into_iter()
        .fold(None, |conjoined, next| optional_and(conjoined, Some(next)))
}

#[derive(Debug, PartialEq, Clone)]
pub struct SelectItem {
    pub expression: Expression,
    pub alias: Option<Identifier>,
}

impl SelectItem {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            alias: None,
        }
    }

    pub fn aliased(expression: Expression, alias: &Identifier) -> Self {
        Self {
            expression,
            alias: Some(alias.clone()),
        }
    }
}

/// Relation in a FROM clause. `name` is a table identifier or a set-returning function call.
#[derive(Debug, PartialEq, Clone)]
pub struct TableReference {
    pub name: Expression,
    pub binding: Option<Identifier>,
}

impl TableReference {
    pub fn table(name: &str, binding: Option<&Identifier>) -> Self {
        Self {
            name: Expression::CompoundIdentifier(CompoundIdentifier::new(&[name])),
            binding: binding.cloned(),
        }
    }

    /// Reference to a CTE or other relation by identifier
    pub fn named(name: &Identifier) -> Self {
        Self {
            name: Expression::CompoundIdentifier(CompoundIdentifier(vec![name.clone()])),
            binding: None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Join {
    pub table: TableReference,
    pub join_type: JoinType,
    pub constraint: Expression,
}

impl Join {
    pub fn inner(table: TableReference, constraint: Expression) -> Self {
        Self {
            table,
            join_type: JoinType::Inner,
            constraint,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct FromClause {
    pub source: TableReference,
    pub joins: Vec<Join>,
}

impl FromClause {
    pub fn new(source: TableReference) -> Self {
        Self {
            source,
            joins: vec![],
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Vec<FromClause>,
    pub where_clause: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct OrderBy {
    pub expression: Expression,
    pub ascending: bool,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TableAlias {
    pub name: Identifier,
    pub shape: Option<Vec<Identifier>>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CommonTableExpression {
    pub alias: TableAlias,
    pub materialized: bool,
    pub query: Query,
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct With {
    pub recursive: bool,
    pub expressions: Vec<CommonTableExpression>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SetOperation {
    pub operator: SetOperator,
    pub all: bool,
    pub left: SetExpression,
    pub right: SetExpression,
}

#[derive(Debug, PartialEq, Clone)]
pub enum SetExpression {
    Select(Box<Select>),
    SetOperation(Box<SetOperation>),
    Update(Box<Update>),
    Delete(Box<Delete>),
    Insert(Box<Insert>),
}

impl From<Select> for SetExpression {
    fn from(select: Select) -> Self {
        SetExpression::Select(Box::new(select))
    }
}

impl Default for SetExpression {
    fn default() -> Self {
        SetExpression::Select(Box::default())
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Query {
    pub ctes: Option<With>,
    pub body: SetExpression,
    pub order_by: Vec<OrderBy>,
    pub offset: Option<Expression>,
    pub limit: Option<Expression>,
}

impl Query {
    pub fn new(body: impl Into<SetExpression>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Update {
    pub table: TableReference,
    pub assignments: Vec<Expression>,
    pub from: Vec<FromClause>,
    pub where_clause: Option<Expression>,
    pub returning: Vec<SelectItem>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Delete {
    pub from: TableReference,
    pub using: Vec<FromClause>,
    pub where_clause: Option<Expression>,
    pub returning: Vec<SelectItem>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Insert {
    pub table: TableReference,
    pub shape: Vec<Identifier>,
    pub source: Query,
    pub returning: Vec<SelectItem>,
}

/// Root of a translated statement
#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Query(Query),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_and() {
        let a = Expression::identifier(&Identifier::from("a"));
        let b = Expression::identifier(&Identifier::from("b"));

        assert_eq!(optional_and(None, None), None);
        assert_eq!(optional_and(Some(a.clone()), None), Some(a.clone()));
        assert_eq!(optional_and(None, Some(b.clone())), Some(b.clone()));
        assert_eq!(
            optional_and(Some(a.clone()), Some(b.clone())),
            Some(Expression::and(a, b))
        );
    }

    #[test]
    fn test_resolve_future() {
        let mut expression = Expression::and(
            Expression::int8(1),
            Expression::Future(FutureExpression {
                id: 7,
                dependencies: IdentifierSet::new(),
                data_type: DataType::Boolean,
            }),
        );

        assert!(expression.has_unresolved_future());
        assert!(!expression.resolve_future(8, &Expression::int8(2)));
        assert!(expression.resolve_future(7, &Expression::int8(2)));
        assert!(!expression.has_unresolved_future());
        assert_eq!(
            expression,
            Expression::and(Expression::int8(1), Expression::int8(2))
        );
    }
}
