use serde::{Deserialize, Serialize};

/// Top-level cypher query
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RegularQuery {
    pub single_query: SingleQuery,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleQuery {
    SinglePart(SinglePartQuery),
    MultiPart(MultiPartQuery),
}

/// A query made of one or more WITH-delimited parts followed by a final single part
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MultiPartQuery {
    pub parts: Vec<MultiPartQueryPart>,
    pub single_part_query: SinglePartQuery,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MultiPartQueryPart {
    #[serde(default)]
    pub reading_clauses: Vec<ReadingClause>,
    #[serde(default)]
    pub updating_clauses: Vec<UpdatingClause>,
    pub with: With,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct With {
    pub projection: Projection,
    #[serde(default)]
    pub where_clause: Option<Where>,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct SinglePartQuery {
    #[serde(default)]
    pub reading_clauses: Vec<ReadingClause>,
    #[serde(default)]
    pub updating_clauses: Vec<UpdatingClause>,
    #[serde(default)]
    pub return_clause: Option<Return>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingClause {
    Match(Match),
    Unwind(Unwind),
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Match {
    /// OPTIONAL MATCH
    #[serde(default)]
    pub optional: bool,
    pub pattern: Vec<PatternPart>,
    #[serde(default)]
    pub where_clause: Option<Where>,
}

/// UNWIND expression AS variable
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Unwind {
    pub expression: Expression,
    pub variable: Variable,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatingClause {
    Set(Set),
    Remove(Remove),
    Delete(Delete),
    Create(Create),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Create {
    pub pattern: Vec<PatternPart>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Set {
    pub items: Vec<SetItem>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetItem {
    /// SET n.prop = value
    Property {
        target: PropertyLookup,
        value: Expression,
    },
    /// SET n:Kind1:Kind2
    Kinds { variable: Variable, kinds: Vec<String> },
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Remove {
    pub items: Vec<RemoveItem>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveItem {
    /// REMOVE n:Kind
    Kinds { variable: Variable, kinds: Vec<String> },
    /// REMOVE n.prop
    Property(PropertyLookup),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Delete {
    #[serde(default)]
    pub detach: bool,
    pub expressions: Vec<Expression>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Return {
    pub projection: Projection,
}

/// Shared body of RETURN and WITH
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Projection {
    #[serde(default)]
    pub distinct: bool,
    pub items: Vec<ProjectionItem>,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub skip: Option<Skip>,
    #[serde(default)]
    pub limit: Option<Limit>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ProjectionItem {
    pub expression: Expression,
    /// AS alias
    #[serde(default)]
    pub binding: Option<Variable>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Order {
    pub items: Vec<SortItem>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SortItem {
    #[serde(default = "default_ascending")]
    pub ascending: bool,
    pub expression: Expression,
}

fn default_ascending() -> bool {
    true
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Skip {
    pub value: Expression,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Limit {
    pub value: Expression,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Where {
    pub expressions: Vec<Expression>,
}

/// One comma-separated pattern of a MATCH, optionally bound to a path variable
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct PatternPart {
    #[serde(default)]
    pub variable: Option<Variable>,
    #[serde(default)]
    pub shortest_path: bool,
    #[serde(default)]
    pub all_shortest_paths: bool,
    pub elements: Vec<PatternElement>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternElement {
    Node(NodePattern),
    Relationship(RelationshipPattern),
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct NodePattern {
    #[serde(default)]
    pub variable: Option<Variable>,
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipPattern {
    #[serde(default)]
    pub variable: Option<Variable>,
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub direction: Direction,
    /// Variable length range, `*min..max`
    #[serde(default)]
    pub range: Option<PatternRange>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// (a)-[]->(b)
    #[default]
    Outbound,
    /// (a)<-[]-(b)
    Inbound,
    /// (a)-[]-(b)
    Both,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Outbound => Direction::Inbound,
            Direction::Inbound => Direction::Outbound,
            Direction::Both => Direction::Both,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PatternRange {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Properties {
    Map(Vec<MapItem>),
    Parameter(Parameter),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MapItem {
    pub key: String,
    pub value: Expression,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub symbol: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub symbol: String,
    /// Value supplied alongside the query; looked up from the caller's parameter map when null
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Literal values. String literals carry their content without surrounding quotes.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PropertyLookup {
    pub atom: Box<Expression>,
    pub symbol: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FunctionInvocation {
    pub name: String,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub arguments: Vec<Expression>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub left: Box<Expression>,
    pub partials: Vec<PartialComparison>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PartialComparison {
    pub operator: ComparisonOperator,
    pub right: Expression,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    StartsWith,
    EndsWith,
    Contains,
    RegexMatch,
    Is,
    IsNot,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Arithmetic {
    pub left: Box<Expression>,
    pub partials: Vec<PartialArithmetic>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PartialArithmetic {
    pub operator: ArithmeticOperator,
    pub right: Expression,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnaryAddOrSubtract {
    pub operator: ArithmeticOperator,
    pub operand: Box<Expression>,
}

/// `n:Kind` used as a predicate
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct KindMatcher {
    pub reference: Box<Expression>,
    pub kinds: Vec<String>,
}

/// A relationship pattern used as a boolean predicate, e.g. `WHERE (a)-[:T]->()`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PatternPredicate {
    pub elements: Vec<PatternElement>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Variable(Variable),
    Parameter(Parameter),
    Literal(Literal),
    List(Vec<Expression>),
    PropertyLookup(PropertyLookup),
    FunctionInvocation(FunctionInvocation),
    Parenthetical(Box<Expression>),
    Negation(Box<Expression>),
    Conjunction(Vec<Expression>),
    Disjunction(Vec<Expression>),
    Comparison(Comparison),
    Arithmetic(Arithmetic),
    UnaryAddOrSubtract(UnaryAddOrSubtract),
    KindMatcher(KindMatcher),
    PatternPredicate(PatternPredicate),
}

// Shorthand constructors used when building trees by hand.

impl Variable {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

impl Expression {
    pub fn variable(symbol: &str) -> Self {
        Expression::Variable(Variable::new(symbol))
    }

    pub fn string(value: &str) -> Self {
        Expression::Literal(Literal::String(value.to_string()))
    }

    pub fn int(value: i64) -> Self {
        Expression::Literal(Literal::Int(value))
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::Null)
    }

    pub fn parameter(symbol: &str, value: serde_json::Value) -> Self {
        Expression::Parameter(Parameter {
            symbol: symbol.to_string(),
            value,
        })
    }

    pub fn property(variable: &str, symbol: &str) -> Self {
        Expression::PropertyLookup(PropertyLookup::new(variable, symbol))
    }

    pub fn function(name: &str, arguments: Vec<Expression>) -> Self {
        Expression::FunctionInvocation(FunctionInvocation {
            name: name.to_string(),
            distinct: false,
            arguments,
        })
    }

    pub fn compare(left: Expression, operator: ComparisonOperator, right: Expression) -> Self {
        Expression::Comparison(Comparison {
            left: Box::new(left),
            partials: vec![PartialComparison { operator, right }],
        })
    }

    pub fn arithmetic(left: Expression, operator: ArithmeticOperator, right: Expression) -> Self {
        Expression::Arithmetic(Arithmetic {
            left: Box::new(left),
            partials: vec![PartialArithmetic { operator, right }],
        })
    }

    pub fn and(operands: Vec<Expression>) -> Self {
        Expression::Conjunction(operands)
    }

    pub fn or(operands: Vec<Expression>) -> Self {
        Expression::Disjunction(operands)
    }

    pub fn not(operand: Expression) -> Self {
        Expression::Negation(Box::new(operand))
    }
}

impl PropertyLookup {
    pub fn new(variable: &str, symbol: &str) -> Self {
        Self {
            atom: Box::new(Expression::variable(variable)),
            symbol: symbol.to_string(),
        }
    }
}

impl NodePattern {
    pub fn new(variable: Option<&str>, kinds: &[&str]) -> Self {
        Self {
            variable: variable.map(Variable::new),
            kinds: kinds.iter().map(|kind| kind.to_string()).collect(),
            properties: None,
        }
    }
}

impl RelationshipPattern {
    pub fn new(variable: Option<&str>, kinds: &[&str], direction: Direction) -> Self {
        Self {
            variable: variable.map(Variable::new),
            kinds: kinds.iter().map(|kind| kind.to_string()).collect(),
            direction,
            range: None,
            properties: None,
        }
    }

    pub fn with_range(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.range = Some(PatternRange { start, end });
        self
    }
}

impl ProjectionItem {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            binding: None,
        }
    }

    pub fn aliased(expression: Expression, alias: &str) -> Self {
        Self {
            expression,
            binding: Some(Variable::new(alias)),
        }
    }
}

impl Projection {
    pub fn of(items: Vec<ProjectionItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }
}

impl Where {
    pub fn new(expression: Expression) -> Self {
        Self {
            expressions: vec![expression],
        }
    }
}
