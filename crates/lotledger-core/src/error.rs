//! # Error Types
//!
//! Domain-specific error types for lotledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                  │
//! │                                                                     │
//! │  lotledger-core errors (this file)                                  │
//! │  ├── StockError       - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  lotledger-db errors (separate crate)                               │
//! │  ├── DbError          - Database operation failures                 │
//! │  └── LedgerError      - StockError ∪ DbError at the boundary        │
//! │                                                                     │
//! │  Flow: ValidationError → StockError → LedgerError → Controller      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product code, batch number, quantities)
//! 3. Errors are enum variants, never String
//! 4. Business conditions (insufficient stock) are values, not panics,
//!    and are never retried by this core

use thiserror::Error;

// =============================================================================
// Stock Error
// =============================================================================

/// Business-rule errors raised by ledger, allocation, and undo operations.
///
/// All recovery happens at the controller boundary; this core never
/// retries. Lock-contention retries belong to the transaction layer.
#[derive(Debug, Error)]
pub enum StockError {
    /// No single batch can satisfy the requested quantity.
    ///
    /// ## When This Occurs
    /// - Allocation finds no candidate batch holding >= requested units
    ///   (the policy never splits a request across batches)
    /// - A direct debit/reduction exceeds the current balance
    ///
    /// `available` is the best quantity a single batch could have served
    /// for allocation failures, or the actual balance for direct debits.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Batch cannot be removed because units from it have left the
    /// main ledger (a tier holds them, or they were sold).
    ///
    /// ## When This Occurs
    /// - `remove_batch` on a batch with remaining != received
    /// - `remove_batch` on a batch referenced by any bill line
    #[error("Batch {batch_number} has issued or sold units and cannot be removed")]
    BatchInUse { batch_number: i64 },

    /// Undo could not invert the recorded operation because the ledger
    /// changed underneath it. The undo slot stays armed so the operator
    /// can diagnose and retry.
    #[error("Undo conflict: {reason}")]
    UndoConflict { reason: String },

    /// Undo was requested with no pending operation. Benign.
    #[error("No operation to undo")]
    NothingToUndo,

    /// Batch number does not exist in the main ledger.
    #[error("Batch not found: {batch_number}")]
    BatchNotFound { batch_number: i64 },

    /// Product code is not in the catalog (or is inactive).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements.
/// Used for early validation before any ledger mutation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Date lies in the future where history is required.
    #[error("{field} cannot be in the future")]
    FutureDate { field: String },

    /// Invalid format (e.g., bad product code characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with StockError.
pub type StockResult<T> = Result<T, StockError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StockError::InsufficientStock {
            product: "RICE-5KG".to_string(),
            available: 25,
            requested: 30,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for RICE-5KG: available 25, requested 30"
        );

        let err = StockError::BatchInUse { batch_number: 7 };
        assert_eq!(
            err.to_string(),
            "Batch 7 has issued or sold units and cannot be removed"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "product_code".to_string(),
        };
        assert_eq!(err.to_string(), "product_code is required");

        let err = ValidationError::FutureDate {
            field: "purchase_date".to_string(),
        };
        assert_eq!(err.to_string(), "purchase_date cannot be in the future");
    }

    #[test]
    fn test_validation_converts_to_stock_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let stock_err: StockError = validation_err.into();
        assert!(matches!(stock_err, StockError::Validation(_)));
    }
}
