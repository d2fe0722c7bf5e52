use std::fmt;

use crate::cypher::{ArithmeticOperator, ComparisonOperator};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Like,
    ILike,
    SimilarTo,
    /// POSIX regular expression match `~`
    RegexMatch,
    And,
    Or,
    Not,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Concatenate,
    Is,
    IsNot,
    In,
    /// `->`
    JsonField,
    /// `->>`
    JsonTextField,
    /// `#>>`
    JsonTextPath,
    /// `?`
    JsonbFieldExists,
    /// `operator (pg_catalog.&&)`
    PgArrayOverlap,
    /// `&&`
    PgArrayOverlapKeyword,
    Union,

    /// `=` inside an UPDATE SET list
    Assignment,
    /// Kind assignment placeholder, compiled to a `kind_ids` rewrite
    KindAssignment,
    /// Untyped property access; concretized to `->` or `->>` by type hinting
    PropertyLookup,

    CypherStartsWith,
    CypherEndsWith,
    CypherContains,
    CypherRegexMatch,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::SimilarTo => "similar to",
            Operator::RegexMatch => "~",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::Power => "^",
            Operator::Concatenate => "||",
            Operator::Is => "is",
            Operator::IsNot => "is not",
            Operator::In => "in",
            Operator::JsonField => "->",
            Operator::JsonTextField => "->>",
            Operator::JsonTextPath => "#>>",
            Operator::JsonbFieldExists => "?",
            Operator::PgArrayOverlap => "operator (pg_catalog.&&)",
            Operator::PgArrayOverlapKeyword => "&&",
            Operator::Union => "union",
            Operator::Assignment => "=",
            Operator::KindAssignment => "kind_assignment",
            // Placeholders that escape hinting extract text
            Operator::PropertyLookup => "->>",
            Operator::CypherStartsWith => "starts with",
            Operator::CypherEndsWith => "ends with",
            Operator::CypherContains => "contains",
            Operator::CypherRegexMatch => "=~",
        }
    }

    /// Operators that produce a boolean from comparing their operands
    pub fn is_comparator(&self) -> bool {
        matches!(
            self,
            Operator::Equals
                | Operator::NotEquals
                | Operator::GreaterThan
                | Operator::GreaterThanOrEqualTo
                | Operator::LessThan
                | Operator::LessThanOrEqualTo
                | Operator::Like
                | Operator::ILike
                | Operator::SimilarTo
                | Operator::RegexMatch
                | Operator::Is
                | Operator::IsNot
                | Operator::In
                | Operator::JsonbFieldExists
                | Operator::PgArrayOverlap
                | Operator::PgArrayOverlapKeyword
                | Operator::CypherStartsWith
                | Operator::CypherEndsWith
                | Operator::CypherContains
                | Operator::CypherRegexMatch
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Not)
    }

    /// Binding strength when rendered infix; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Not => 3,
            Operator::Is | Operator::IsNot => 4,
            Operator::Equals
            | Operator::NotEquals
            | Operator::GreaterThan
            | Operator::GreaterThanOrEqualTo
            | Operator::LessThan
            | Operator::LessThanOrEqualTo
            | Operator::Assignment
            | Operator::KindAssignment => 5,
            Operator::Like
            | Operator::ILike
            | Operator::SimilarTo
            | Operator::In
            | Operator::CypherStartsWith
            | Operator::CypherEndsWith
            | Operator::CypherContains
            | Operator::CypherRegexMatch => 6,
            Operator::RegexMatch
            | Operator::Concatenate
            | Operator::JsonField
            | Operator::JsonTextField
            | Operator::JsonTextPath
            | Operator::PropertyLookup
            | Operator::JsonbFieldExists
            | Operator::PgArrayOverlap
            | Operator::PgArrayOverlapKeyword
            | Operator::Union => 7,
            Operator::Add | Operator::Subtract => 8,
            Operator::Multiply | Operator::Divide | Operator::Modulo => 9,
            Operator::Power => 10,
        }
    }

    /// Any form of JSONB property access, concretized or not
    pub fn is_property_lookup(&self) -> bool {
        matches!(
            self,
            Operator::PropertyLookup | Operator::JsonField | Operator::JsonTextField
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ComparisonOperator> for Operator {
    fn from(operator: ComparisonOperator) -> Self {
        match operator {
            ComparisonOperator::Equals => Operator::Equals,
            ComparisonOperator::NotEquals => Operator::NotEquals,
            ComparisonOperator::LessThan => Operator::LessThan,
            ComparisonOperator::LessThanOrEqual => Operator::LessThanOrEqualTo,
            ComparisonOperator::GreaterThan => Operator::GreaterThan,
            ComparisonOperator::GreaterThanOrEqual => Operator::GreaterThanOrEqualTo,
            ComparisonOperator::In => Operator::In,
            ComparisonOperator::StartsWith => Operator::CypherStartsWith,
            ComparisonOperator::EndsWith => Operator::CypherEndsWith,
            ComparisonOperator::Contains => Operator::CypherContains,
            ComparisonOperator::RegexMatch => Operator::CypherRegexMatch,
            ComparisonOperator::Is => Operator::Is,
            ComparisonOperator::IsNot => Operator::IsNot,
        }
    }
}

impl From<ArithmeticOperator> for Operator {
    fn from(operator: ArithmeticOperator) -> Self {
        match operator {
            ArithmeticOperator::Add => Operator::Add,
            ArithmeticOperator::Subtract => Operator::Subtract,
            ArithmeticOperator::Multiply => Operator::Multiply,
            ArithmeticOperator::Divide => Operator::Divide,
            ArithmeticOperator::Modulo => Operator::Modulo,
            ArithmeticOperator::Power => Operator::Power,
        }
    }
}
