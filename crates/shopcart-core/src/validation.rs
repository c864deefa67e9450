//! # Validation Module
//!
//! Input validation for cart requests and catalog writes.
//!
//! ## Where Validation Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Request layer ──► CartEngine ──► validate_*() (THIS MODULE)            │
//! │                                        │                                │
//! │                                        ├── Err → CartError::Validation  │
//! │                                        │         (no unit of work yet)  │
//! │                                        ▼                                │
//! │                                   product lookup, store                 │
//! │                                                                         │
//! │  SQLite still enforces NOT NULL / UNIQUE underneath.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopcart_core::validation::{validate_owner_id, validate_quantity};
//!
//! validate_owner_id("user-42").unwrap();
//! validate_quantity(2).unwrap();
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{CartAction, CartLineRequest};
use crate::MAX_DISCOUNT_BPS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted owner or product id.
pub const MAX_ID_LEN: usize = 128;

/// Longest accepted product title.
pub const MAX_TITLE_LEN: usize = 200;

// =============================================================================
// Identifier Validators
// =============================================================================

fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    if id.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    Ok(())
}

/// Validates the owner identity every cart operation is scoped to.
pub fn validate_owner_id(owner_id: &str) -> ValidationResult<()> {
    validate_id("owner_id", owner_id)
}

/// Validates a product reference.
pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    validate_id("product_id", product_id)
}

/// Validates a line id passed to remove.
pub fn validate_line_id(line_id: &str) -> ValidationResult<()> {
    validate_id("line_id", line_id)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity to add.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    Ok(())
}

/// Validates a price in cents. Zero is allowed.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a discount in basis points (0% to 100%).
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > MAX_DISCOUNT_BPS {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: MAX_DISCOUNT_BPS as i64,
        });
    }
    Ok(())
}

/// Validates a stock count.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product title.
pub fn validate_title(title: &str) -> ValidationResult<()> {
    let title = title.trim();

    if title.is_empty() {
        return Err(ValidationError::required("title"));
    }

    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max: MAX_TITLE_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates an add-to-cart request.
///
/// ## Rules
/// - product id present
/// - quantity > 0
/// - color present when `require_color` is set
pub fn validate_add_request(req: &CartLineRequest, require_color: bool) -> ValidationResult<()> {
    validate_product_id(&req.product_id)?;
    validate_quantity(req.quantity)?;
    validate_color(req, require_color)
}

/// Validates an update request.
///
/// Only `SetQuantity` reads the request quantity; zero is allowed there and
/// removes the line.
pub fn validate_update_request(
    req: &CartLineRequest,
    action: CartAction,
    require_color: bool,
) -> ValidationResult<()> {
    validate_product_id(&req.product_id)?;
    if action == CartAction::SetQuantity && req.quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    validate_color(req, require_color)
}

fn validate_color(req: &CartLineRequest, require_color: bool) -> ValidationResult<()> {
    if require_color && req.color_str().trim().is_empty() {
        return Err(ValidationError::required("color"));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
