//! Engine error type: a domain failure or a storage failure.

use serde::Serialize;
use tally_core::{CoreError, ValidationError};
use thiserror::Error;

use crate::error::DbError;

/// How a caller should treat a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or unknown reference; nothing was changed.
    Validation,
    /// Business rule refused the operation (already reversed, short on points).
    Precondition,
    /// The addressed transaction, customer or reward doesn't exist.
    NotFound,
    /// The unit of work could not commit.
    Fatal,
}

/// Error returned by [`crate::SettlementEngine`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Storage(DbError::from(err))
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(e) if e.is_validation() => ErrorKind::Validation,
            EngineError::Core(e) if e.is_not_found() => ErrorKind::NotFound,
            EngineError::Core(_) => ErrorKind::Precondition,
            EngineError::Storage(DbError::Validation(_) | DbError::UniqueViolation { .. }) => {
                ErrorKind::Validation
            }
            EngineError::Storage(DbError::NotFound { .. }) => ErrorKind::NotFound,
            EngineError::Storage(_) => ErrorKind::Fatal,
        }
    }

    /// Whether running the same operation again may succeed (lock contention).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Storage(e) if e.is_retryable())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::TransactionStatus;

    #[test]
    fn test_kinds() {
        let validation: EngineError = ValidationError::Required {
            field: "lines".into(),
        }
        .into();
        assert_eq!(validation.kind(), ErrorKind::Validation);

        let too_big: EngineError = CoreError::CartTooLarge { max: 100 }.into();
        assert_eq!(too_big.kind(), ErrorKind::Validation);

        let reversed: EngineError = CoreError::InvalidTransactionStatus {
            id: "T1".into(),
            current: TransactionStatus::Refunded,
        }
        .into();
        assert_eq!(reversed.kind(), ErrorKind::Precondition);

        let missing: EngineError = CoreError::TransactionNotFound("T1".into()).into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let busy: EngineError = DbError::Busy("database is locked".into()).into();
        assert_eq!(busy.kind(), ErrorKind::Fatal);
        assert!(busy.is_retryable());
        assert!(!reversed.is_retryable());
    }
}
