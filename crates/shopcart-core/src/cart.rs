//! # Cart Mutations
//!
//! Pure, in-memory cart mutations. The engine loads a cart inside a unit of
//! work, applies one of these, and persists the result. Nothing in here
//! touches a store, so a failed mutation leaves only a discarded copy behind.
//!
//! Matched lines keep the unit price they were created with; only new lines
//! are priced from the product. Quantities and amounts use checked
//! arithmetic and fail with `ValidationError::Overflow`.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   add_line(request, product)                                            │
//! │        │                                                                │
//! │        ├── stock check on requested quantity                            │
//! │        │                                                                │
//! │        ├── variant found ──► quantity += n, backfill ──────────┐        │
//! │        │                                                       │        │
//! │        └── not found ──────► line limit, append new line ──────┤        │
//! │                                                                ▼        │
//! │                                                   recompute_total()     │
//! │                                                                         │
//! │   apply_action(request, Increment | Decrement | SetQuantity)            │
//! │        │                                                                │
//! │        ├── no line + Increment ──► new line, quantity 1                 │
//! │        ├── no line + other ──────► ItemNotFound                         │
//! │        ├── resulting qty <= 0 ───► line removed                         │
//! │        └── resulting qty > stock ► StockExceeded                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CartError, CartResult, ValidationError};
use crate::matching::{find_line, find_variant};
use crate::types::{Cart, CartAction, CartLine, CartLineRequest, Product};

// =============================================================================
// Backfill Policy
// =============================================================================

/// Which display fields get filled from the product when the caller left
/// them empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillPolicy {
    pub title: bool,
    pub image: bool,
    pub slug: bool,
}

impl Default for BackfillPolicy {
    fn default() -> Self {
        BackfillPolicy {
            title: true,
            image: true,
            slug: true,
        }
    }
}

impl BackfillPolicy {
    /// Policy that never copies display fields.
    pub fn none() -> Self {
        BackfillPolicy {
            title: false,
            image: false,
            slug: false,
        }
    }
}

/// Fills `slot` when empty: caller value first, then the product value.
fn fill(slot: &mut String, requested: Option<&str>, from_product: Option<&str>, enabled: bool) {
    if !slot.is_empty() {
        return;
    }
    if let Some(value) = requested.filter(|v| !v.is_empty()) {
        *slot = value.to_string();
    } else if enabled {
        if let Some(value) = from_product {
            *slot = value.to_string();
        }
    }
}

fn backfill(line: &mut CartLine, req: &CartLineRequest, product: &Product, policy: &BackfillPolicy) {
    fill(
        &mut line.title,
        req.title.as_deref(),
        Some(product.title.as_str()),
        policy.title,
    );
    fill(
        &mut line.image,
        req.image.as_deref(),
        product.primary_image(),
        policy.image,
    );
    fill(
        &mut line.slug,
        req.slug.as_deref(),
        Some(product.slug.as_str()),
        policy.slug,
    );
}

// =============================================================================
// Line Construction
// =============================================================================

/// Generates a fresh line identity.
pub fn new_line_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds a line priced from `product` at its current effective price.
pub fn build_line(
    line_id: String,
    req: &CartLineRequest,
    quantity: i64,
    product: &Product,
    policy: &BackfillPolicy,
) -> Result<CartLine, ValidationError> {
    let unit = product.effective_unit_price();
    let line_total = unit
        .checked_line_total(quantity)
        .ok_or_else(|| ValidationError::overflow("line_total"))?;
    let mut line = CartLine {
        id: line_id,
        product_id: product.id.clone(),
        quantity,
        unit_price_cents: unit.cents(),
        line_total_cents: line_total.cents(),
        title: String::new(),
        image: String::new(),
        slug: String::new(),
        color: req.color_str().to_string(),
        model: req.model_str().to_string(),
    };
    backfill(&mut line, req, product, policy);
    Ok(line)
}

/// Fails with StockExceeded when `quantity` is more than the product has.
pub fn check_stock(product: &Product, quantity: i64) -> CartResult<()> {
    if product.has_stock_for(quantity) {
        Ok(())
    } else {
        Err(CartError::StockExceeded {
            product_id: product.id.clone(),
            requested: quantity,
            available: product.stock,
        })
    }
}

// =============================================================================
// Line Change
// =============================================================================

/// What a mutation did to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    /// A new line was appended.
    Appended { line_id: String },
    /// An existing line absorbed the requested quantity.
    Merged { line_id: String, quantity: i64 },
    /// An existing line got a new quantity.
    Updated { line_id: String, quantity: i64 },
    /// The line was removed.
    Removed { line_id: String },
}

impl LineChange {
    pub fn line_id(&self) -> &str {
        match self {
            LineChange::Appended { line_id }
            | LineChange::Merged { line_id, .. }
            | LineChange::Updated { line_id, .. }
            | LineChange::Removed { line_id } => line_id,
        }
    }
}

// =============================================================================
// Cart Mutations
// =============================================================================

impl Cart {
    /// Adds `req.quantity` units of the requested variant.
    ///
    /// The stock check covers the requested quantity only, not the merged
    /// total. A matched line keeps its price snapshot.
    pub fn add_line(
        &mut self,
        req: &CartLineRequest,
        product: &Product,
        line_id: impl FnOnce() -> String,
        policy: &BackfillPolicy,
        max_lines: usize,
    ) -> CartResult<LineChange> {
        check_stock(product, req.quantity)?;

        let change = match find_variant(&self.lines, &req.variant_key()) {
            Some(idx) => {
                let line = &mut self.lines[idx];
                let merged = line
                    .quantity
                    .checked_add(req.quantity)
                    .ok_or_else(|| ValidationError::overflow("quantity"))?;
                line.set_quantity(merged)?;
                backfill(line, req, product, policy);
                LineChange::Merged {
                    line_id: line.id.clone(),
                    quantity: line.quantity,
                }
            }
            None => {
                self.ensure_room(max_lines)?;
                let line = build_line(line_id(), req, req.quantity, product, policy)?;
                let line_id = line.id.clone();
                self.lines.push(line);
                LineChange::Appended { line_id }
            }
        };

        self.recompute_total()?;
        Ok(change)
    }

    /// Applies `action` to the line matching the request's variant.
    pub fn apply_action(
        &mut self,
        req: &CartLineRequest,
        action: CartAction,
        product: &Product,
        line_id: impl FnOnce() -> String,
        policy: &BackfillPolicy,
        max_lines: usize,
    ) -> CartResult<LineChange> {
        let key = req.variant_key();

        let Some(idx) = find_variant(&self.lines, &key) else {
            if action != CartAction::Increment {
                return Err(CartError::item_not_found(&self.owner_id, key.to_string()));
            }
            check_stock(product, 1)?;
            self.ensure_room(max_lines)?;
            let line = build_line(line_id(), req, 1, product, policy)?;
            let line_id = line.id.clone();
            self.lines.push(line);
            self.recompute_total()?;
            return Ok(LineChange::Appended { line_id });
        };

        let current = self.lines[idx].quantity;
        let next = match action {
            CartAction::Increment => current
                .checked_add(1)
                .ok_or_else(|| ValidationError::overflow("quantity"))?,
            CartAction::Decrement => current - 1,
            CartAction::SetQuantity => {
                if req.quantity < 0 {
                    return Err(ValidationError::OutOfRange {
                        field: "quantity".to_string(),
                        min: 0,
                        max: i64::MAX,
                    }
                    .into());
                }
                req.quantity
            }
        };

        if next <= 0 {
            let removed = self.lines.remove(idx);
            self.recompute_total()?;
            return Ok(LineChange::Removed { line_id: removed.id });
        }

        check_stock(product, next)?;

        let line = &mut self.lines[idx];
        line.set_quantity(next)?;
        backfill(line, req, product, policy);
        let change = LineChange::Updated {
            line_id: line.id.clone(),
            quantity: next,
        };

        self.recompute_total()?;
        Ok(change)
    }

    /// Removes the line with `line_id`, returning it when present.
    pub fn remove_line(&mut self, line_id: &str) -> Result<Option<CartLine>, ValidationError> {
        let Some(idx) = find_line(&self.lines, line_id) else {
            return Ok(None);
        };
        let removed = self.lines.remove(idx);
        self.recompute_total()?;
        Ok(Some(removed))
    }

    /// Drops every line and zeroes the total.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.total_cents = 0;
    }

    fn ensure_room(&self, max_lines: usize) -> Result<(), ValidationError> {
        if self.lines.len() >= max_lines {
            return Err(ValidationError::TooManyLines { max: max_lines });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use chrono::Utc;

    fn product(price_cents: i64, discount_bps: u32, stock: i64) -> Product {
        Product {
            id: "p-1".to_string(),
            title: "Desk Lamp".to_string(),
            slug: "desk-lamp".to_string(),
            description: String::new(),
            price_cents,
            discount_bps,
            stock,
            images: vec!["lamp.png".to_string()],
            is_available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cart() -> Cart {
        Cart::empty("c-1", "owner-1", Utc::now())
    }

    fn id(s: &str) -> impl FnOnce() -> String + '_ {
        move || s.to_string()
    }

    const POLICY: BackfillPolicy = BackfillPolicy {
        title: true,
        image: true,
        slug: true,
    };

    #[test]
    fn test_add_then_merge_same_variant() {
        let p = product(10_000, 1_000, 5);
        let mut cart = cart();

        let req = CartLineRequest::new("p-1", 2).color("red");
        let change = cart.add_line(&req, &p, id("l-1"), &POLICY, 100).unwrap();
        assert_eq!(change, LineChange::Appended { line_id: "l-1".to_string() });
        assert_eq!(cart.total_cents, 18_000);

        let req = CartLineRequest::new("p-1", 1).color("red");
        let change = cart.add_line(&req, &p, id("l-2"), &POLICY, 100).unwrap();
        assert_eq!(
            change,
            LineChange::Merged {
                line_id: "l-1".to_string(),
                quantity: 3
            }
        );
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines[0].line_total_cents, 27_000);
        assert_eq!(cart.total(), Money::from_cents(27_000));
    }

    #[test]
    fn test_add_different_color_appends() {
        let p = product(10_000, 1_000, 5);
        let mut cart = cart();
        cart.add_line(&CartLineRequest::new("p-1", 2).color("red"), &p, id("l-1"), &POLICY, 100)
            .unwrap();
        cart.add_line(&CartLineRequest::new("p-1", 1).color("blue"), &p, id("l-2"), &POLICY, 100)
            .unwrap();

        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.total_cents, 27_000);
        assert!(cart.total_is_consistent());
    }

    #[test]
    fn test_add_checks_requested_quantity_only() {
        let p = product(500, 0, 3);
        let mut cart = cart();

        let err = cart
            .add_line(&CartLineRequest::new("p-1", 5).color("red"), &p, id("l-1"), &POLICY, 100)
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::StockExceeded {
                requested: 5,
                available: 3,
                ..
            }
        ));

        cart.add_line(&CartLineRequest::new("p-1", 3).color("red"), &p, id("l-1"), &POLICY, 100)
            .unwrap();
        // Merged total 6 > stock 3 is accepted: only the request is checked.
        cart.add_line(&CartLineRequest::new("p-1", 3).color("red"), &p, id("l-2"), &POLICY, 100)
            .unwrap();
        assert_eq!(cart.lines[0].quantity, 6);
    }

    #[test]
    fn test_add_respects_line_limit() {
        let p = product(100, 0, 10);
        let mut cart = cart();
        cart.add_line(&CartLineRequest::new("p-1", 1).color("a"), &p, id("l-1"), &POLICY, 1)
            .unwrap();

        let err = cart
            .add_line(&CartLineRequest::new("p-1", 1).color("b"), &p, id("l-2"), &POLICY, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::Validation(ValidationError::TooManyLines { max: 1 })
        ));

        // Merging into an existing line does not need room.
        cart.add_line(&CartLineRequest::new("p-1", 1).color("a"), &p, id("l-3"), &POLICY, 1)
            .unwrap();
    }

    #[test]
    fn test_backfill_prefers_request_values() {
        let p = product(100, 0, 10);
        let mut cart = cart();
        let req = CartLineRequest::new("p-1", 1).color("red").title("Custom title");
        cart.add_line(&req, &p, id("l-1"), &POLICY, 100).unwrap();

        let line = &cart.lines[0];
        assert_eq!(line.title, "Custom title");
        assert_eq!(line.image, "lamp.png");
        assert_eq!(line.slug, "desk-lamp");
    }

    #[test]
    fn test_backfill_disabled() {
        let p = product(100, 0, 10);
        let mut cart = cart();
        let req = CartLineRequest::new("p-1", 1).color("red");
        cart.add_line(&req, &p, id("l-1"), &BackfillPolicy::none(), 100)
            .unwrap();

        let line = &cart.lines[0];
        assert!(line.title.is_empty());
        assert!(line.image.is_empty());
    }

    #[test]
    fn test_matched_lines_keep_price_snapshot() {
        let mut p = product(1_000, 0, 10);
        let mut cart = cart();
        let red = CartLineRequest::new("p-1", 1).color("red");
        cart.add_line(&red, &p, id("l-1"), &POLICY, 100).unwrap();

        p.price_cents = 2_000;
        cart.add_line(&red, &p, id("l-2"), &POLICY, 100).unwrap();
        assert_eq!(cart.lines[0].unit_price_cents, 1_000);
        assert_eq!(cart.total_cents, 2_000);

        cart.apply_action(&red, CartAction::Increment, &p, id("x"), &POLICY, 100)
            .unwrap();
        assert_eq!(cart.lines[0].unit_price_cents, 1_000);
        assert_eq!(cart.total_cents, 3_000);

        // A new variant is priced from the product as it is now.
        cart.add_line(&CartLineRequest::new("p-1", 1).color("blue"), &p, id("l-3"), &POLICY, 100)
            .unwrap();
        assert_eq!(cart.lines[1].unit_price_cents, 2_000);
        assert_eq!(cart.total_cents, 5_000);
    }

    #[test]
    fn test_color_match_is_case_sensitive() {
        let p = product(1_000, 0, 10);
        let mut cart = cart();
        cart.add_line(&CartLineRequest::new("p-1", 1).color("red"), &p, id("l-1"), &POLICY, 100)
            .unwrap();

        let change = cart
            .add_line(&CartLineRequest::new("p-1", 1).color("Red"), &p, id("l-2"), &POLICY, 100)
            .unwrap();
        assert_eq!(change, LineChange::Appended { line_id: "l-2".to_string() });
        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.lines[0].color, "red");
        assert_eq!(cart.lines[1].color, "Red");

        let err = cart
            .apply_action(
                &CartLineRequest::new("p-1", 1).color("RED"),
                CartAction::Decrement,
                &p,
                id("x"),
                &POLICY,
                100,
            )
            .unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound { .. }));
    }

    #[test]
    fn test_huge_quantities_fail_instead_of_overflowing() {
        let p = product(100_000, 0, i64::MAX);
        let mut cart = cart();

        let err = cart
            .add_line(
                &CartLineRequest::new("p-1", 1_000_000_000_000_000).color("red"),
                &p,
                id("l-1"),
                &POLICY,
                100,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::Validation(ValidationError::Overflow { .. })
        ));

        // Each line fits on its own; the merged quantity does not.
        let half = CartLineRequest::new("p-1", i64::MAX / 2 + 1).color("blue");
        let cheap = product(0, 0, i64::MAX);
        cart.add_line(&half, &cheap, id("l-2"), &POLICY, 100).unwrap();
        let err = cart
            .add_line(&half, &cheap, id("l-3"), &POLICY, 100)
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::Validation(ValidationError::Overflow { .. })
        ));

        // Two lines that fit alone but not together.
        let mut cart = self::cart();
        let big = product(i64::MAX / 2 + 1, 0, 10);
        cart.add_line(&CartLineRequest::new("p-1", 1).color("a"), &big, id("l-4"), &POLICY, 100)
            .unwrap();
        let err = cart
            .add_line(&CartLineRequest::new("p-1", 1).color("b"), &big, id("l-5"), &POLICY, 100)
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::Validation(ValidationError::Overflow { .. })
        ));
    }

    #[test]
    fn test_increment_and_decrement() {
        let p = product(1_000, 0, 3);
        let mut cart = cart();
        let req = CartLineRequest::new("p-1", 2).color("red");
        cart.add_line(&req, &p, id("l-1"), &POLICY, 100).unwrap();

        let change = cart
            .apply_action(&req, CartAction::Increment, &p, id("x"), &POLICY, 100)
            .unwrap();
        assert_eq!(
            change,
            LineChange::Updated {
                line_id: "l-1".to_string(),
                quantity: 3
            }
        );

        let err = cart
            .apply_action(&req, CartAction::Increment, &p, id("x"), &POLICY, 100)
            .unwrap_err();
        assert!(matches!(err, CartError::StockExceeded { requested: 4, .. }));
        assert_eq!(cart.lines[0].quantity, 3);

        cart.apply_action(&req, CartAction::Decrement, &p, id("x"), &POLICY, 100)
            .unwrap();
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.total_cents, 2_000);
    }

    #[test]
    fn test_decrement_to_zero_removes_line() {
        let p = product(1_000, 0, 3);
        let mut cart = cart();
        let req = CartLineRequest::new("p-1", 1).color("red");
        cart.add_line(&req, &p, id("l-1"), &POLICY, 100).unwrap();

        let change = cart
            .apply_action(&req, CartAction::Decrement, &p, id("x"), &POLICY, 100)
            .unwrap();
        assert_eq!(change, LineChange::Removed { line_id: "l-1".to_string() });
        assert!(cart.is_empty());
        assert_eq!(cart.total_cents, 0);
    }

    #[test]
    fn test_set_quantity() {
        let p = product(1_000, 0, 10);
        let mut cart = cart();
        cart.add_line(&CartLineRequest::new("p-1", 1).color("red"), &p, id("l-1"), &POLICY, 100)
            .unwrap();

        let req = CartLineRequest::new("p-1", 7).color("red");
        cart.apply_action(&req, CartAction::SetQuantity, &p, id("x"), &POLICY, 100)
            .unwrap();
        assert_eq!(cart.total_cents, 7_000);

        let req = CartLineRequest::new("p-1", 0).color("red");
        let change = cart
            .apply_action(&req, CartAction::SetQuantity, &p, id("x"), &POLICY, 100)
            .unwrap();
        assert!(matches!(change, LineChange::Removed { .. }));
    }

    #[test]
    fn test_missing_line_only_increment_creates() {
        let p = product(1_000, 0, 10);
        let mut cart = cart();
        let req = CartLineRequest::new("p-1", 5).color("green");

        let err = cart
            .apply_action(&req, CartAction::Decrement, &p, id("x"), &POLICY, 100)
            .unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound { .. }));

        let change = cart
            .apply_action(&req, CartAction::Increment, &p, id("l-9"), &POLICY, 100)
            .unwrap();
        assert_eq!(change, LineChange::Appended { line_id: "l-9".to_string() });
        assert_eq!(cart.lines[0].quantity, 1);
        assert_eq!(cart.total_cents, 1_000);
    }

    #[test]
    fn test_remove_line_and_clear() {
        let p = product(1_000, 0, 10);
        let mut cart = cart();
        cart.add_line(&CartLineRequest::new("p-1", 1).color("a"), &p, id("l-1"), &POLICY, 100)
            .unwrap();
        cart.add_line(&CartLineRequest::new("p-1", 2).color("b"), &p, id("l-2"), &POLICY, 100)
            .unwrap();

        assert!(cart.remove_line("missing").unwrap().is_none());
        let removed = cart.remove_line("l-1").unwrap().unwrap();
        assert_eq!(removed.quantity, 1);
        assert_eq!(cart.total_cents, 2_000);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_cents, 0);
    }
}
