//! Kind name resolution and kind predicates.
//!
//! Node rows carry an `int2[]` of kind ids and edge rows a single `int2` kind id.
//! Names used in patterns, kind matchers and SET/REMOVE clauses are resolved to ids
//! through a [`KindMapper`] supplied by the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pgsql::{names, ArrayLiteral, DataType, Expression, Identifier, Literal, Operator};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum KindMapperError {
    #[error("unknown kind: {0}")]
    UnknownKind(String),

    #[error("kind mapper unavailable: {0}")]
    Unavailable(String),
}

/// Resolves kind names to their integer ids. Implementations must be deterministic and
/// safe to share between concurrent translations.
#[cfg_attr(test, mockall::automock)]
pub trait KindMapper {
    fn map_kinds(&self, kinds: &[String]) -> Result<Vec<i16>, KindMapperError>;
}

/// Kind mapper backed by a fixed name to id table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryKindMapper {
    kinds: HashMap<String, i16>,
}

impl InMemoryKindMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kinds(kinds: &[(&str, i16)]) -> Self {
        Self {
            kinds: kinds
                .iter()
                .map(|(name, id)| (name.to_string(), *id))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, id: i16) {
        self.kinds.insert(name.into(), id);
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl KindMapper for InMemoryKindMapper {
    fn map_kinds(&self, kinds: &[String]) -> Result<Vec<i16>, KindMapperError> {
        kinds
            .iter()
            .map(|kind| {
                self.kinds
                    .get(kind)
                    .copied()
                    .ok_or_else(|| KindMapperError::UnknownKind(kind.clone()))
            })
            .collect()
    }
}

/// `array [1, 2]::int2[]`
pub fn kind_id_array(ids: &[i16]) -> Expression {
    Expression::ArrayLiteral(ArrayLiteral {
        values: ids.iter().map(|id| Literal::int2(*id).into()).collect(),
        cast_type: DataType::Int2Array,
    })
}

/// `n.kind_ids operator (pg_catalog.&&) array [..]::int2[]`
pub fn node_kind_constraint(binding: &Identifier, ids: &[i16]) -> Expression {
    Expression::binary(
        Operator::PgArrayOverlap,
        Expression::column(binding, names::COLUMN_KIND_IDS),
        kind_id_array(ids),
    )
}

/// `e.kind_id = any (array [..]::int2[])`
pub fn edge_kind_constraint(binding: &Identifier, ids: &[i16]) -> Expression {
    Expression::equals(
        Expression::column(binding, names::COLUMN_KIND_ID),
        Expression::any(kind_id_array(ids), DataType::Int2Array),
    )
}
