#![forbid(unsafe_code)]

use recon_core::{FilterError, IdentifierError, JoinKeyError};
use rusqlite::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification every [`DbError`] falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Session establishment or teardown failed, or the session is closed.
    Connection,
    /// A statement failed, including constraint violations and timeouts.
    Query,
    /// The caller broke an argument contract; nothing was sent to the store.
    InvalidArgument,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connect to {location}: {source}")]
    Connect {
        location: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("close: {source}")]
    Close {
        #[source]
        source: rusqlite::Error,
    },

    #[error("session is closed")]
    Closed,

    #[error("sqlite: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("statement interrupted after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("unexpected row count (expected={expected}, actual={actual})")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. } | Self::Close { .. } | Self::Closed => ErrorKind::Connection,
            Self::Query(_) | Self::Timeout { .. } | Self::UnexpectedRowCount { .. } => {
                ErrorKind::Query
            }
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Query(rusqlite::Error::SqliteFailure(code, _))
                if code.code == ErrorCode::ConstraintViolation
        )
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<IdentifierError> for DbError {
    fn from(value: IdentifierError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}

impl From<JoinKeyError> for DbError {
    fn from(value: JoinKeyError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}

impl From<FilterError> for DbError {
    fn from(value: FilterError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}

pub(crate) fn is_interrupted(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _) if code.code == ErrorCode::OperationInterrupted
    )
}
