use std::fmt;

use super::operators::Operator;

/// SQL data types known to the translator. Besides the PostgreSQL scalar and array
/// types this includes the graph composite types and the compiler-only binding types
/// (scope frames, parameters, expansion components).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum DataType {
    /// No type information has been assigned
    #[default]
    Unset,
    /// Type information is not known but may be resolved by later inference
    Unknown,
    Null,
    AnyArray,
    NodeComposite,
    NodeCompositeArray,
    EdgeComposite,
    EdgeCompositeArray,
    PathComposite,
    Int,
    Int2,
    Int2Array,
    Int4,
    Int4Array,
    Int8,
    Int8Array,
    Float4,
    Float4Array,
    Float8,
    Float8Array,
    Boolean,
    Text,
    TextArray,
    Jsonb,
    Date,
    TimeWithTimeZone,
    TimeWithoutTimeZone,
    Interval,
    TimestampWithTimeZone,
    TimestampWithoutTimeZone,

    Scope,
    Parameter,
    ExpansionPattern,
    ExpansionPath,
    ExpansionRootNode,
    ExpansionEdge,
    ExpansionTerminalNode,
    PathEdge,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Unset => "",
            DataType::Unknown => "unknown",
            DataType::Null => "null",
            DataType::AnyArray => "anyarray",
            DataType::NodeComposite => "nodecomposite",
            DataType::NodeCompositeArray => "nodecomposite[]",
            DataType::EdgeComposite => "edgecomposite",
            DataType::EdgeCompositeArray => "edgecomposite[]",
            DataType::PathComposite => "pathcomposite",
            DataType::Int => "int",
            DataType::Int2 => "int2",
            DataType::Int2Array => "int2[]",
            DataType::Int4 => "int4",
            DataType::Int4Array => "int4[]",
            DataType::Int8 => "int8",
            DataType::Int8Array => "int8[]",
            DataType::Float4 => "float4",
            DataType::Float4Array => "float4[]",
            DataType::Float8 => "float8",
            DataType::Float8Array => "float8[]",
            DataType::Boolean => "bool",
            DataType::Text => "text",
            DataType::TextArray => "text[]",
            DataType::Jsonb => "jsonb",
            DataType::Date => "date",
            DataType::TimeWithTimeZone => "time with time zone",
            DataType::TimeWithoutTimeZone => "time without time zone",
            DataType::Interval => "interval",
            DataType::TimestampWithTimeZone => "timestamp with time zone",
            DataType::TimestampWithoutTimeZone => "timestamp without time zone",
            DataType::Scope => "scope",
            DataType::Parameter => "parameter_identifier",
            DataType::ExpansionPattern => "expansion_pattern",
            DataType::ExpansionPath => "expansion_path",
            DataType::ExpansionRootNode => "expansion_root_node",
            DataType::ExpansionEdge => "expansion_edge",
            DataType::ExpansionTerminalNode => "expansion_terminal_node",
            DataType::PathEdge => "path_edge",
        }
    }

    /// Set and not [`DataType::Unknown`]
    pub fn is_known(&self) -> bool {
        !matches!(self, DataType::Unset | DataType::Unknown)
    }

    pub fn matches_one_of(&self, others: &[DataType]) -> bool {
        others.contains(self)
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            DataType::Int2Array
                | DataType::Int4Array
                | DataType::Int8Array
                | DataType::Float4Array
                | DataType::Float8Array
                | DataType::TextArray
                | DataType::AnyArray
                | DataType::NodeCompositeArray
                | DataType::EdgeCompositeArray
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int
                | DataType::Int2
                | DataType::Int4
                | DataType::Int8
                | DataType::Float4
                | DataType::Float8
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date
                | DataType::TimeWithTimeZone
                | DataType::TimeWithoutTimeZone
                | DataType::TimestampWithTimeZone
                | DataType::TimestampWithoutTimeZone
        )
    }

    /// Types that render in a composite-value projection
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            DataType::NodeComposite
                | DataType::NodeCompositeArray
                | DataType::EdgeComposite
                | DataType::EdgeCompositeArray
                | DataType::PathComposite
        )
    }

    pub fn text_convertable(&self) -> bool {
        self.is_temporal() || *self == DataType::Text
    }

    pub fn to_array_type(&self) -> Option<DataType> {
        match self {
            DataType::Int2 | DataType::Int2Array => Some(DataType::Int2Array),
            DataType::Int4 | DataType::Int4Array => Some(DataType::Int4Array),
            DataType::Int | DataType::Int8 | DataType::Int8Array => Some(DataType::Int8Array),
            DataType::Float4 | DataType::Float4Array => Some(DataType::Float4Array),
            DataType::Float8 | DataType::Float8Array => Some(DataType::Float8Array),
            DataType::Text | DataType::TextArray => Some(DataType::TextArray),
            DataType::NodeComposite | DataType::NodeCompositeArray => {
                Some(DataType::NodeCompositeArray)
            }
            DataType::EdgeComposite | DataType::EdgeCompositeArray => {
                Some(DataType::EdgeCompositeArray)
            }
            _ => None,
        }
    }

    pub fn array_base_type(&self) -> Option<DataType> {
        match self {
            DataType::Int2Array => Some(DataType::Int2),
            DataType::Int4Array => Some(DataType::Int4),
            DataType::Int8Array => Some(DataType::Int8),
            DataType::Float4Array => Some(DataType::Float4),
            DataType::Float8Array => Some(DataType::Float8),
            DataType::TextArray => Some(DataType::Text),
            DataType::NodeCompositeArray => Some(DataType::NodeComposite),
            DataType::EdgeCompositeArray => Some(DataType::EdgeComposite),
            _ => None,
        }
    }

    /// Type both operands can be converted to, widening numerics where needed
    pub fn convert(&self, other: DataType) -> Option<DataType> {
        use DataType::*;

        if *self == other || other == Unknown {
            return Some(*self);
        }

        match (*self, other) {
            (Unknown, _) => Some(other),
            (Text, _) => Some(Text),
            (Float4, Float8) | (Float8, Float4) => Some(Float8),
            (Float4 | Float8, Text) => Some(Text),
            (Float4, Int2 | Int4) => Some(Float4),
            (Float4 | Float8, Int | Int8) | (Float8, Int2 | Int4) => Some(Float8),
            (Int2, Int4) => Some(Int4),
            (Int2 | Int4, Int | Int8) => Some(Int8),
            (Int4, Int2) => Some(Int4),
            (Int | Int8, Int2 | Int4 | Int | Int8) => Some(Int8),
            (Int2 | Int4 | Int | Int8, Float4) => Some(Float4),
            (Int2 | Int4 | Int | Int8, Float8) => Some(Float8),
            (Int2 | Int4 | Int | Int8, Text) => Some(Text),
            _ => None,
        }
    }

    /// Result type of `self <operator> other`
    pub fn operator_result_type(&self, other: DataType, operator: Operator) -> Option<DataType> {
        use DataType::*;

        if operator.is_comparator() || operator.is_logical() {
            return if self.is_comparable(other, operator) {
                Some(Boolean)
            } else {
                None
            };
        }

        match operator {
            Operator::Concatenate => {
                if self.is_array() {
                    let base = self.array_base_type();

                    if other == *self || other == Unknown || Some(other) == base {
                        Some(*self)
                    } else if let (Some(base), Some(other_base)) = (base, other.array_base_type()) {
                        base.convert(other_base).and_then(|upcast| upcast.to_array_type())
                    } else {
                        None
                    }
                } else if other.is_array() {
                    if Some(*self) == other.array_base_type() || *self == Unknown {
                        Some(other)
                    } else {
                        None
                    }
                } else if self.text_convertable() || other.text_convertable() {
                    Some(Text)
                } else {
                    self.convert(other)
                }
            }

            Operator::Add | Operator::Subtract => match (*self, other) {
                (Date, Interval) | (Interval, Date) => Some(TimestampWithoutTimeZone),
                (TimestampWithTimeZone | TimestampWithoutTimeZone, Interval) => Some(*self),
                (Interval, TimestampWithTimeZone | TimestampWithoutTimeZone) => Some(other),
                (Interval, Interval) => Some(Interval),
                _ => self.numeric_result_type(other),
            },

            Operator::Multiply | Operator::Divide | Operator::Modulo | Operator::Power => {
                self.numeric_result_type(other)
            }

            _ => self.convert(other),
        }
    }

    fn numeric_result_type(&self, other: DataType) -> Option<DataType> {
        if *self == DataType::Unknown {
            return Some(other);
        }

        if other == DataType::Unknown {
            return Some(*self);
        }

        if self.is_numeric() && other.is_numeric() {
            self.convert(other)
        } else {
            None
        }
    }

    /// Whether values of the two types can be compared with `operator`
    pub fn is_comparable(&self, other: DataType, operator: Operator) -> bool {
        if !self.is_known() || !other.is_known() || *self == other {
            return true;
        }

        match operator {
            Operator::In | Operator::PgArrayOverlap | Operator::PgArrayOverlapKeyword => {
                let left = self.array_base_type().unwrap_or(*self);
                let right = other.array_base_type().unwrap_or(other);

                left == right || left.convert(right).is_some()
            }

            Operator::Like
            | Operator::ILike
            | Operator::SimilarTo
            | Operator::RegexMatch
            | Operator::CypherStartsWith
            | Operator::CypherEndsWith
            | Operator::CypherContains
            | Operator::CypherRegexMatch => {
                self.text_convertable() && other.text_convertable()
            }

            Operator::Is | Operator::IsNot => other == DataType::Null || *self == DataType::Null,

            _ => {
                if self.is_temporal() && other.is_temporal() {
                    true
                } else if self.is_numeric() && other.is_numeric() {
                    true
                } else {
                    match (*self, other) {
                        (DataType::Null, _) | (_, DataType::Null) => true,
                        (DataType::Text, other) | (other, DataType::Text) => {
                            other.text_convertable()
                        }
                        _ => false,
                    }
                }
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a JSON parameter value
pub fn value_data_type(value: &serde_json::Value) -> DataType {
    match value {
        serde_json::Value::Null => DataType::Null,
        serde_json::Value::Bool(_) => DataType::Boolean,
        serde_json::Value::Number(number) => {
            if number.is_f64() {
                DataType::Float8
            } else {
                DataType::Int8
            }
        }
        serde_json::Value::String(_) => DataType::Text,
        serde_json::Value::Array(values) => {
            let mut element_types = values.iter().map(value_data_type);

            match element_types.next() {
                None => DataType::Null,
                Some(first) => {
                    if element_types.all(|element_type| element_type == first) {
                        first.to_array_type().unwrap_or(DataType::Unknown)
                    } else {
                        DataType::Unknown
                    }
                }
            }
        }
        serde_json::Value::Object(_) => DataType::Jsonb,
    }
}
