//! # shopcart-core: Pure Business Logic for Shopcart
//!
//! This crate is the **heart** of the cart mutation engine. It contains the
//! money rules, the domain types, the variant matching rule and the in-memory
//! cart mutations as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopcart Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Request layer (not part of this workspace)         │   │
//! │  │    add_to_cart, update_cart_item, remove_cart_item, ...         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            shopcart-engine (CartEngine, unit of work)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shopcart-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ matching  │  │   │
//! │  │   │  Product  │  │   Money   │  │ mutations │  │  variant  │  │   │
//! │  │   │ Cart/Line │  │ Discount  │  │  totals   │  │   keys    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO LOCKS • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shopcart-db (SQLite adapter)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Cart, CartLine, CartAction, ...)
//! - [`money`] - Money type and discount rules (integer cents, no floats)
//! - [`matching`] - Variant identity rule (product + color + model)
//! - [`cart`] - Pure cart mutations used by the engine
//! - [`catalog`] - Product creation, sparse patches, listing pages, slugs
//! - [`comment`] - Product comments
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use shopcart_core::money::{DiscountRate, Money};
//!
//! // 100.00 with a 10% discount
//! let unit = Money::from_cents(10_000).effective_unit_price(DiscountRate::from_percent(10));
//! assert_eq!(unit.cents(), 9_000);
//!
//! let line_total = unit.line_total(3);
//! assert_eq!(line_total.to_string(), "270.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod comment;
pub mod error;
pub mod matching;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CartError, CartResult, ValidationError};
pub use money::{DiscountRate, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum number of distinct lines in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts. The engine takes its effective limit from
/// configuration; this is the value used when nothing is configured.
pub const DEFAULT_MAX_CART_LINES: usize = 100;

/// Upper bound for a discount, in basis points (100%).
pub const MAX_DISCOUNT_BPS: u32 = 10_000;
