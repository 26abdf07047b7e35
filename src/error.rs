//! Statement-level error taxonomy.
//!
//! Every failure leaves the engine usable; only the failing statement is
//! affected. [`QueryError::kind`] folds the variants into the coarse
//! categories callers usually branch on.
use thiserror::Error;

use crate::{statement::StatementError, storage::error::StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Schema,
    NotFound,
    NotNull,
    LengthExceeded,
    DuplicateKey,
    NullKey,
    Arithmetic,
    Io,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("syntax error: {0}")]
    Syntax(#[from] StatementError),

    #[error("table '{0}' not found")]
    NotFound(String),

    #[error("column '{column}' not found in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("too many values: expected {expected}, got {actual}")]
    TooManyValues { expected: usize, actual: usize },

    #[error("column '{0}' cannot be NULL")]
    NotNull(String),

    #[error(
        "string length ({length}) exceeds maximum allowed length ({capacity}) for column '{column}'"
    )]
    LengthExceeded {
        column: String,
        length: usize,
        capacity: usize,
    },

    #[error("division by zero while updating column '{0}'")]
    DivisionByZero(String),

    #[error("cannot compute value for column '{column}': {reason}")]
    Arithmetic { column: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) | Self::TooManyValues { .. } => ErrorKind::Syntax,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::UnknownColumn { .. } => ErrorKind::Schema,
            Self::NotNull(_) => ErrorKind::NotNull,
            Self::LengthExceeded { .. } => ErrorKind::LengthExceeded,
            Self::DivisionByZero(_) | Self::Arithmetic { .. } => ErrorKind::Arithmetic,
            Self::Storage(e) => match e {
                StorageError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
                StorageError::NullKeyViolation { .. } => ErrorKind::NullKey,
                StorageError::DuplicateTable(_)
                | StorageError::UnknownPrimaryKey(_)
                | StorageError::RowArity { .. }
                | StorageError::RowOutOfRange { .. } => ErrorKind::Schema,
                StorageError::Metadata { .. } | StorageError::Io { .. } => ErrorKind::Io,
            },
        }
    }
}
