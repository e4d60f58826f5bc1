//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule / precondition failures          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - CoreError | DbError, classified by kind()      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ID, field, balance)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::types::TransactionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer cannot be found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Discount cannot be found.
    #[error("Discount not found: {0}")]
    DiscountNotFound(String),

    /// Reward definition cannot be found.
    #[error("Reward not found: {0}")]
    RewardNotFound(String),

    /// Transaction cannot be found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Transaction is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Refunding a transaction that was already refunded
    /// - Canceling a refunded transaction (or the other way round)
    /// - Losing the race against a concurrent reversal
    ///
    /// ```text
    /// refund(T1) ──► Completed → Refunded   ✅
    ///      │
    ///      ▼
    /// cancel(T1) ──► InvalidTransactionStatus { id: "T1", current: Refunded }
    /// ```
    #[error("Transaction {id} is {current:?}, only completed transactions can be reversed")]
    InvalidTransactionStatus {
        id: String,
        current: TransactionStatus,
    },

    /// Customer balance does not cover the reward's cost.
    #[error("Insufficient points: balance {available}, reward costs {required}")]
    InsufficientPoints { available: i64, required: i64 },

    /// Reward exists but cannot be redeemed right now.
    #[error("Reward {0} is not available for redemption")]
    RewardUnavailable(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for the "entity does not exist" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::CustomerNotFound(_)
                | CoreError::DiscountNotFound(_)
                | CoreError::RewardNotFound(_)
                | CoreError::TransactionNotFound(_)
        )
    }

    /// True for malformed input that was rejected before any mutation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::CartTooLarge { .. } | CoreError::QuantityTooLarge { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any store mutation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, reference on a cash sale).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A referenced entity does not exist.
    #[error("{field} refers to unknown id '{id}'")]
    UnknownReference { field: String, id: String },

    /// Duplicate value (e.g., duplicate contact number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientPoints {
            available: 50,
            required: 100,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient points: balance 50, reward costs 100"
        );

        let err = CoreError::InvalidTransactionStatus {
            id: "T1".to_string(),
            current: TransactionStatus::Refunded,
        };
        assert_eq!(
            err.to_string(),
            "Transaction T1 is Refunded, only completed transactions can be reversed"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "reference_number".to_string(),
        };
        assert_eq!(err.to_string(), "reference_number is required");

        let err = ValidationError::UnknownReference {
            field: "cart[0].product_id".to_string(),
            id: "nope".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cart[0].product_id refers to unknown id 'nope'"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "reason".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(core_err.is_validation());
        assert!(!core_err.is_not_found());
    }

    #[test]
    fn test_not_found_family() {
        assert!(CoreError::TransactionNotFound("x".into()).is_not_found());
        assert!(CoreError::RewardNotFound("x".into()).is_not_found());
        assert!(!CoreError::RewardUnavailable("x".into()).is_not_found());
    }
}
