//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A 20% discount on 10000 must be exactly 2000, and the sum of a         │
//! │  sale's payments must reconcile exactly against its final amount.       │
//! │  Integer arithmetic makes both checks exact instead of "within          │
//! │  epsilon".                                                              │
//! │                                                                         │
//! │  OUR SOLUTION: i64 in the smallest currency unit                        │
//! │  The salon's currency has no fractional unit, so 10000 means ₩10,000.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use salon_core::money::Money;
//!
//! let cut = Money::new(10000);
//! let discount = cut.percentage(2000); // 20% in basis points
//! assert_eq!(discount.amount(), 2000);
//! assert_eq!((cut - discount).amount(), 8000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Final amounts earn one loyalty point per this many currency units.
pub const LOYALTY_POINT_UNIT: i64 = 1000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: deltas applied to customer aggregates can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from an amount in the smallest currency unit.
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the raw amount.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Floors the value at zero.
    ///
    /// ## Usage
    /// A sale's final amount is `max(0, subtotal - discounts + increment)`;
    /// discounts may exceed the subtotal but the customer never gets paid
    /// to visit.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Computes a percentage of this amount, expressed in basis points.
    ///
    /// ## Why Basis Points?
    /// 1 basis point = 0.01% = 1/10000, so 2000 bps = 20%.
    /// Integer math with round-half-up: `(amount * bps + 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// let subtotal = Money::new(10000);
    /// assert_eq!(subtotal.percentage(2000).amount(), 2000); // 20%
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        // i128 to prevent overflow on large amounts
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money(part as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// let unit_price = Money::new(3000);
    /// assert_eq!(unit_price.multiply_quantity(3).amount(), 9000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Loyalty points earned by a final amount: one point per
    /// [`LOYALTY_POINT_UNIT`], floored.
    ///
    /// ## Example
    /// ```rust
    /// use salon_core::money::Money;
    ///
    /// assert_eq!(Money::new(8000).loyalty_points(), 8);
    /// assert_eq!(Money::new(999).loyalty_points(), 0);
    /// ```
    #[inline]
    pub const fn loyalty_points(&self) -> i64 {
        if self.0 <= 0 {
            0
        } else {
            self.0 / LOYALTY_POINT_UNIT
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and receipts. Use frontend formatting for actual UI
/// display to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.abs().to_string();

        // Group thousands: 1234567 -> 1,234,567
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        write!(f, "{}₩{}", sign, grouped)
    }
}

/// Default money is zero.
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

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_amount() {
        let money = Money::new(10000);
        assert_eq!(money.amount(), 10000);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::new(10000)), "₩10,000");
        assert_eq!(format!("{}", Money::new(1234567)), "₩1,234,567");
        assert_eq!(format!("{}", Money::new(500)), "₩500");
        assert_eq!(format!("{}", Money::new(-2000)), "-₩2,000");
        assert_eq!(format!("{}", Money::new(0)), "₩0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::new(10000);
        let b = Money::new(2000);

        assert_eq!((a + b).amount(), 12000);
        assert_eq!((a - b).amount(), 8000);
        assert_eq!((b * 3).amount(), 6000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.amount(), 14000);
    }

    #[test]
    fn test_percentage_round_half_up() {
        // 20% of 10000 = 2000 exact
        assert_eq!(Money::new(10000).percentage(2000).amount(), 2000);
        // 20% of 12345 = 2469
        assert_eq!(Money::new(12345).percentage(2000).amount(), 2469);
        // 15% of 10 = 1.5 -> rounds to 2
        assert_eq!(Money::new(10).percentage(1500).amount(), 2);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::new(-500).clamp_non_negative().amount(), 0);
        assert_eq!(Money::new(500).clamp_non_negative().amount(), 500);
        assert_eq!(Money::zero().clamp_non_negative().amount(), 0);
    }

    #[test]
    fn test_loyalty_points_floor() {
        assert_eq!(Money::new(8000).loyalty_points(), 8);
        assert_eq!(Money::new(8999).loyalty_points(), 8);
        assert_eq!(Money::new(999).loyalty_points(), 0);
        assert_eq!(Money::new(-1000).loyalty_points(), 0);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        assert!(Money::new(100).is_positive());
        assert!(Money::new(-100).is_negative());
    }

    #[test]
    fn test_multiply_quantity() {
        assert_eq!(Money::new(3000).multiply_quantity(2).amount(), 6000);
    }
}
