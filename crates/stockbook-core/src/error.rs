//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbook-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockbook-db errors (separate crate)                                  │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── CheckoutError    - Commit/amendment flow failures                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → caller            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product ID, available stock, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. All of them are detected
/// BEFORE any write is issued; a caller receiving one of these can be certain
/// no persisted state changed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout was attempted on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist in the catalog
    /// - Product was removed between cart-add and commit
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Client is missing or soft-deleted; checkout rejects it.
    #[error("Client not found or deleted: {0}")]
    InvalidClient(String),

    /// Sale not found (amendment flow).
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Insufficient stock to complete the sale.
    ///
    /// ## When This Occurs
    /// - Requested quantity exceeds commit-time stock
    /// - A concurrent commit consumed stock after the cart snapshot
    ///
    /// ## User Workflow
    /// ```text
    /// Commit cart (qty: 10)
    ///      │
    ///      ▼
    /// Re-read stock inside transaction: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 5, requested: 10 }
    ///      │
    ///      ▼
    /// UI shows: "exceeds available stock (5)"
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Line quantity is zero or negative.
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    /// Line quantity exceeds the per-line maximum.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Unit price is negative or above the accepted maximum. Overridden
    /// prices are allowed; prices outside the range are not.
    #[error("Invalid unit price: {0} cents")]
    InvalidPrice(i64),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
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
