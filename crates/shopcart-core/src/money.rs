//! # Money Module
//!
//! Provides the `Money` type and the money rules the cart engine applies at
//! mutation time: effective unit price, line total and cart total.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                    │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A cart total summed from float line totals drifts unless every        │
//! │  derived value is rounded to 2 decimals on the way.                    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Only the discount step can produce a fraction of a cent, and it is  │
//! │    rounded half-away-from-zero exactly once. Line totals (unit × qty)  │
//! │    and cart totals (Σ lines) are exact integer arithmetic.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopcart_core::money::{DiscountRate, Money};
//!
//! let price = Money::from_cents(10_000); // 100.00
//! let unit = price.effective_unit_price(DiscountRate::from_percent(10));
//! assert_eq!(unit, Money::from_cents(9_000)); // 90.00
//!
//! let lines = [unit.line_total(3), unit.line_total(2)];
//! assert_eq!(Money::cart_total(lines).cents(), 45_000); // 450.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::MAX_DISCOUNT_BPS;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `numerator` by `denominator`, rounding half away from zero.
///
/// ```text
///   250 / 100 →  3      -250 / 100 → -3
///   249 / 100 →  2      -249 / 100 → -2
/// ```
///
/// `denominator` must be positive.
pub fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;

    if remainder.abs() * 2 >= denominator {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// A percentage discount in basis points (1 bps = 0.01%).
///
/// ## Why Basis Points?
/// Discounts such as 12.5% stay exact: 1250 bps. Products store the value in
/// this unit; `from_percent` exists for whole-number convenience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a discount from basis points (1000 = 10%).
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a discount from a whole percentage (10 = 10%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        DiscountRate(percent * 100)
    }

    /// No discount.
    #[inline]
    pub const fn none() -> Self {
        DiscountRate(0)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Checks whether any discount applies.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Basis points clamped to 100%.
    #[inline]
    const fn capped_bps(&self) -> u32 {
        if self.0 > MAX_DISCOUNT_BPS {
            MAX_DISCOUNT_BPS
        } else {
            self.0
        }
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Product.price_cents ─► effective_unit_price(discount)                 │
/// │                              │                                          │
/// │                              ▼                                          │
/// │                  CartLine.unit_price_cents (snapshot)                  │
/// │                              │                                          │
/// │                              ▼  line_total(quantity)                    │
/// │                  CartLine.line_total_cents                             │
/// │                              │                                          │
/// │                              ▼  cart_total(lines)                       │
/// │                  Cart.total_cents                                      │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use shopcart_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies a percentage discount and returns the price a line snapshots.
    ///
    /// ## Rule
    /// ```text
    /// discount == 0  →  price (unchanged)
    /// discount  > 0  →  round2(price × (1 − discount/100))
    /// ```
    /// Rounding is half away from zero, applied once on the discounted value
    /// (not on the discount amount), so 0.05 at 50% is 0.03.
    ///
    /// ```rust
    /// use shopcart_core::money::{DiscountRate, Money};
    ///
    /// let price = Money::from_cents(1999); // 19.99
    /// let unit = price.effective_unit_price(DiscountRate::from_bps(1500)); // 15%
    /// // 19.99 × 0.85 = 16.9915 → 16.99
    /// assert_eq!(unit.cents(), 1699);
    /// ```
    pub fn effective_unit_price(&self, discount: DiscountRate) -> Money {
        if discount.is_zero() {
            return *self;
        }

        let keep_bps = i128::from(MAX_DISCOUNT_BPS - discount.capped_bps());
        let cents = div_round_half_away(i128::from(self.0) * keep_bps, i128::from(MAX_DISCOUNT_BPS));
        Money(cents as i64)
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// Both factors are already whole cents, so `round2` is the identity here.
    #[inline]
    pub const fn line_total(&self, quantity: i64) -> Money {
        Money(self.0 * quantity)
    }

    /// Multiplies a unit price by a quantity, or `None` on overflow.
    #[inline]
    pub const fn checked_line_total(&self, quantity: i64) -> Option<Money> {
        match self.0.checked_mul(quantity) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums line totals, or `None` when the sum leaves the i64 range.
    ///
    /// This is what cart mutations use; quantities and stock are otherwise
    /// unbounded.
    pub fn checked_cart_total<I>(line_totals: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        line_totals
            .into_iter()
            .try_fold(Money::zero(), |acc, line| acc.checked_add(line))
    }

    /// Sums line totals into a cart total.
    ///
    /// ```rust
    /// use shopcart_core::money::Money;
    ///
    /// let total = Money::cart_total([Money::from_cents(27_000), Money::from_cents(1_050)]);
    /// assert_eq!(total.to_string(), "280.50");
    /// ```
    pub fn cart_total<I>(line_totals: I) -> Money
    where
        I: IntoIterator<Item = Money>,
    {
        line_totals.into_iter().sum()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Two-decimal rendering, currency-agnostic.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
