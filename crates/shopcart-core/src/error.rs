//! # Error Types
//!
//! Domain-specific error types for shopcart-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shopcart-core errors (this file)                                      │
//! │  ├── CartError        - Every failure an engine operation can return   │
//! │  └── ValidationError  - Malformed input, rejected before any I/O       │
//! │                                                                         │
//! │  shopcart-engine errors                                                │
//! │  └── StoreError       - Store/lookup failures (boxed into Persistence) │
//! │                                                                         │
//! │  shopcart-db errors                                                    │
//! │  └── DbError          - SQLite failures (converted into StoreError)    │
//! │                                                                         │
//! │  Flow: DbError → StoreError → CartError::Persistence → request layer   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (owner, product, line ids)
//! 3. Errors are enum variants, never String
//! 4. Nothing here is fatal: every error is scoped to one operation

use std::error::Error as StdError;

use thiserror::Error;

// =============================================================================
// Cart Error
// =============================================================================

/// Errors returned by cart engine operations.
///
/// The request layer maps these to transport status codes; the engine never
/// retries and never turns one of them into a silent no-op.
#[derive(Debug, Error)]
pub enum CartError {
    /// Input was malformed (non-positive quantity, missing variant field).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The product lookup has no product with this id.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The owner has no cart record.
    #[error("Cart not found for owner {0}")]
    CartNotFound(String),

    /// The cart exists but holds no line matching the request.
    ///
    /// `item` is either a line id (remove) or a variant key (update).
    #[error("Item {item} not found in cart of owner {owner_id}")]
    ItemNotFound { owner_id: String, item: String },

    /// The resulting quantity is larger than the product's stock.
    ///
    /// ## User Workflow
    /// ```text
    /// add_to_cart(qty: 5)
    ///      │
    ///      ▼
    /// product.stock = 3
    ///      │
    ///      ▼
    /// StockExceeded { requested: 5, available: 3 }
    ///      │
    ///      ▼
    /// cart unchanged (unit of work rolled back)
    /// ```
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    StockExceeded {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// The store or lookup failed; the unit of work was rolled back.
    #[error("Persistence failure: {0}")]
    Persistence(#[source] Box<dyn StdError + Send + Sync>),
}

impl CartError {
    /// Wraps any store-side error as an opaque persistence failure.
    pub fn persistence<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        CartError::Persistence(Box::new(err))
    }

    /// Creates an ItemNotFound error.
    pub fn item_not_found(owner_id: impl Into<String>, item: impl Into<String>) -> Self {
        CartError::ItemNotFound {
            owner_id: owner_id.into(),
            item: item.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Raised before any unit of work is opened.
#[derive(Debug, Error, PartialEq, Eq)]
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

    /// Duplicate value (e.g., duplicate slug).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A patch carried no field to change.
    #[error("{entity} patch contains no changes")]
    EmptyPatch { entity: String },

    /// Appending a line would grow the cart past its limit.
    #[error("Cart cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// A quantity or amount no longer fits in 64-bit cents.
    #[error("{field} is too large")]
    Overflow { field: String },
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an Overflow error for a field.
    pub fn overflow(field: impl Into<String>) -> Self {
        ValidationError::Overflow {
            field: field.into(),
        }
    }

    /// Creates a MustBePositive error for a field.
    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CartError.
pub type CartResult<T> = Result<T, CartError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_exceeded_message() {
        let err = CartError::StockExceeded {
            product_id: "p-1".to_string(),
            requested: 5,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: requested 5, available 3"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("color").to_string(), "color is required");
        assert_eq!(
            ValidationError::must_be_positive("quantity").to_string(),
            "quantity must be positive"
        );
        assert_eq!(
            ValidationError::TooManyLines { max: 100 }.to_string(),
            "Cart cannot have more than 100 lines"
        );
        assert_eq!(
            ValidationError::overflow("line_total").to_string(),
            "line_total is too large"
        );
    }

    #[test]
    fn test_validation_converts_to_cart_error() {
        let cart_err: CartError = ValidationError::required("product_id").into();
        assert!(matches!(cart_err, CartError::Validation(_)));
    }

    #[test]
    fn test_persistence_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = CartError::persistence(io);

        assert_eq!(err.to_string(), "Persistence failure: disk full");
        assert!(err.source().is_some());
    }
}
