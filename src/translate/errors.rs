use thiserror::Error;

use crate::pgsql::FormatError;

use super::kinds::KindMapperError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error("unresolved identifier: {0}")]
    UnresolvedIdentifier(String),

    #[error("type incompatibility: {0}")]
    TypeIncompatibility(String),

    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("malformed shape: {0}")]
    MalformedShape(String),

    #[error("failed to translate kinds: {0}")]
    KindMapping(#[from] KindMapperError),

    #[error("format error: {0}")]
    Format(#[from] FormatError),
}

impl TranslationError {
    pub fn unresolved(message: impl Into<String>) -> Self {
        TranslationError::UnresolvedIdentifier(message.into())
    }

    pub fn incompatible(message: impl Into<String>) -> Self {
        TranslationError::TypeIncompatibility(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        TranslationError::UnsupportedConstruct(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        TranslationError::MalformedShape(message.into())
    }
}

pub type TranslationResult<T> = Result<T, TranslationError>;
