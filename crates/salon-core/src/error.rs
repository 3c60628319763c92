//! # Error Types
//!
//! Domain-specific error types for salon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  salon-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  salon-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── SaleError        - Core + Db composed at the sale service         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SaleError → transport layer       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, amounts)
//! 3. Errors are enum variants, never String
//! 4. Every variant aborts the enclosing sale transaction; none are retried

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. Any of them raised
/// inside a sale operation rolls back the whole transaction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced customer/service/product/sale does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A soft-deleted catalog reference was used.
    ///
    /// ## When This Occurs
    /// - Selling a deactivated service or product
    /// - Recording a sale for a deactivated customer
    #[error("{entity} is inactive: {id}")]
    Inactive { entity: &'static str, id: String },

    /// Requested quantity exceeds available stock.
    ///
    /// ## When This Occurs
    /// The inventory ledger's guarded decrement found fewer units than
    /// requested. On update this is checked against post-release stock
    /// (prior lines are released before new lines are reserved).
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    OutOfStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The payment rows do not sum to the sale's final amount.
    #[error("Payment mismatch: payments total {paid}, final amount is {expected}")]
    PaymentMismatch { expected: i64, paid: i64 },

    /// The sale is not in a state that allows the requested operation.
    #[error("Sale {sale_id} cannot be modified: {reason}")]
    InvalidSaleState { sale_id: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an Inactive error for a given entity type and id.
    pub fn inactive(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::Inactive {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a request payload doesn't meet requirements, before any
/// business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// The sale selects no services and no products.
    #[error("a sale must include at least one service or product")]
    EmptySelection,

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
