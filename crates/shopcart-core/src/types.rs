//! # Domain Types
//!
//! Core domain types used throughout Shopcart.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Cart       │   │    CartLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  price_cents    │   │  owner_id (1:1) │   │  product_id     │       │
//! │  │  discount_bps   │   │  lines[]  ──────┼──►│  quantity ≥ 1   │       │
//! │  │  stock          │   │  total_cents    │   │  unit_price     │       │
//! │  │  title/slug/img │   │  version        │   │  color / model  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │ CartLineRequest │   │   CartAction    │                              │
//! │  │  ─────────────  │   │  ─────────────  │                              │
//! │  │  what the       │   │  Increment      │                              │
//! │  │  caller asks    │   │  Decrement      │                              │
//! │  │  for            │   │  SetQuantity    │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `CartLine` copies price and display fields from the product when it is
//! added or updated. It is never live-linked to the product afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::{DiscountRate, Money};

// =============================================================================
// Product
// =============================================================================

/// A product as the engine sees it: read-only pricing, stock and display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: String,

    /// Display title.
    pub title: String,

    /// URL slug, unique across the catalog.
    pub slug: String,

    /// Long description.
    #[serde(default)]
    pub description: String,

    /// List price in cents.
    pub price_cents: i64,

    /// Discount in basis points (1000 = 10%).
    #[serde(default)]
    pub discount_bps: u32,

    /// Units available. Read for validation only, never reserved.
    pub stock: i64,

    /// Image URLs; the first one is the cart thumbnail.
    #[serde(default)]
    pub images: Vec<String>,

    /// Whether the product is listed.
    #[serde(default = "default_true")]
    pub is_available: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Returns the list price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the discount rate.
    #[inline]
    pub fn discount(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }

    /// Returns the post-discount price a cart line snapshots.
    #[inline]
    pub fn effective_unit_price(&self) -> Money {
        self.price().effective_unit_price(self.discount())
    }

    /// Returns the first image, if any.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Checks whether `quantity` units fit in the current stock.
    #[inline]
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One purchasable variant in a cart.
///
/// ## Invariants
/// - `quantity >= 1` (a line reaching zero is removed, never stored)
/// - `line_total_cents == unit_price_cents * quantity`
///
/// Empty strings in `color`, `model` and the display fields mean "not set".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Line identity (UUID v4), stable once created.
    pub id: String,

    /// Product reference.
    pub product_id: String,

    /// Quantity, always >= 1 when persisted.
    pub quantity: i64,

    /// Post-discount unit price at time of add/update (frozen).
    pub unit_price_cents: i64,

    /// `unit_price_cents * quantity`.
    pub line_total_cents: i64,

    /// Product title (denormalized for display).
    #[serde(default)]
    pub title: String,

    /// Thumbnail URL (denormalized for display).
    #[serde(default)]
    pub image: String,

    /// Product slug (denormalized for display).
    #[serde(default)]
    pub slug: String,

    /// Variant color.
    #[serde(default)]
    pub color: String,

    /// Variant model.
    #[serde(default)]
    pub model: String,
}

impl CartLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    /// Sets the quantity and recomputes the line total from the price
    /// snapshot.
    pub fn set_quantity(&mut self, quantity: i64) -> Result<(), ValidationError> {
        let total = self
            .unit_price()
            .checked_line_total(quantity)
            .ok_or_else(|| ValidationError::overflow("line_total"))?;
        self.quantity = quantity;
        self.line_total_cents = total.cents();
        Ok(())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A per-owner cart.
///
/// ## Invariant
/// `total_cents == Σ line.line_total_cents` after every committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// The single owner of this cart.
    pub owner_id: String,

    /// Ordered lines.
    pub lines: Vec<CartLine>,

    /// Cart total in cents.
    pub total_cents: i64,

    /// When the cart was created.
    pub created_at: DateTime<Utc>,

    /// When the cart was last written.
    pub updated_at: DateTime<Utc>,

    /// Write counter used for compare-and-swap on replace.
    #[serde(default)]
    pub version: i64,
}

impl Cart {
    /// Creates an empty cart for `owner_id`.
    pub fn empty(id: impl Into<String>, owner_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Cart {
            id: id.into(),
            owner_id: owner_id.into(),
            lines: Vec::new(),
            total_cents: 0,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks if the cart has no lines.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the number of distinct lines.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity across all lines, saturating at i64::MAX.
    pub fn total_quantity(&self) -> i64 {
        self.lines
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Recomputes `total_cents` from the line totals.
    pub fn recompute_total(&mut self) -> Result<(), ValidationError> {
        let total = Money::checked_cart_total(self.lines.iter().map(CartLine::line_total))
            .ok_or_else(|| ValidationError::overflow("cart_total"))?;
        self.total_cents = total.cents();
        Ok(())
    }

    /// Checks the total invariant (used by tests and debug assertions).
    pub fn total_is_consistent(&self) -> bool {
        Money::checked_cart_total(self.lines.iter().map(CartLine::line_total)) == Some(self.total())
    }
}

// =============================================================================
// Cart Line Request
// =============================================================================

/// What a caller asks the engine to add or update.
///
/// Any price the caller might know is deliberately absent: the engine always
/// prices from the product lookup. Display fields are optional and backfilled
/// from the product when missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineRequest {
    /// Product reference.
    pub product_id: String,

    /// Quantity to add (add) or to set (update with `SetQuantity`).
    #[serde(default)]
    pub quantity: i64,

    /// Variant color.
    #[serde(default)]
    pub color: Option<String>,

    /// Variant model.
    #[serde(default)]
    pub model: Option<String>,

    /// Caller-supplied title.
    #[serde(default)]
    pub title: Option<String>,

    /// Caller-supplied image URL.
    #[serde(default)]
    pub image: Option<String>,

    /// Caller-supplied slug.
    #[serde(default)]
    pub slug: Option<String>,
}

impl CartLineRequest {
    /// Creates a request for `quantity` units of `product_id`.
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLineRequest {
            product_id: product_id.into(),
            quantity,
            ..Default::default()
        }
    }

    /// Sets the variant color.
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Sets the variant model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the display title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the display image.
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Color, or "" when unset.
    pub fn color_str(&self) -> &str {
        self.color.as_deref().unwrap_or("")
    }

    /// Model, or "" when unset.
    pub fn model_str(&self) -> &str {
        self.model.as_deref().unwrap_or("")
    }
}

// =============================================================================
// Cart Action
// =============================================================================

/// How `update_cart_item` changes the matched line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    /// Quantity + 1; creates the line (and the cart) when absent.
    Increment,
    /// Quantity − 1; the line is deleted when it reaches zero.
    Decrement,
    /// Quantity = request quantity; zero deletes the line.
    #[default]
    SetQuantity,
}

impl fmt::Display for CartAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartAction::Increment => write!(f, "increment"),
            CartAction::Decrement => write!(f, "decrement"),
            CartAction::SetQuantity => write!(f, "set_quantity"),
        }
    }
}

impl FromStr for CartAction {
    type Err = ValidationError;

    /// Parses the action names request layers send.
    ///
    /// "increament" is accepted because deployed clients still send it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "increment" | "increament" => Ok(CartAction::Increment),
            "decrement" => Ok(CartAction::Decrement),
            "" | "set" | "set_quantity" | "quantity" => Ok(CartAction::SetQuantity),
            other => Err(ValidationError::InvalidFormat {
                field: "action".to_string(),
                reason: format!("unknown cart action '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
