//! # Money Module
//!
//! `Money` (integer minor units) and `Percentage` (basis points), the two
//! numeric types every invoice amount is built from.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  An invoice total that is a float sum of float line totals can drift  │
//! │  away from the sum of its stored lines.                                │
//! │                                                                         │
//! │  OUR SOLUTION: every amount is i64 minor units, every percentage is    │
//! │  basis points, and each percentage application rounds exactly once.    │
//! │  Sum of stored lines == stored invoice total, always.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Percentage application rounds half up to the nearest minor unit:
//! `(amount × bps + 5000) / 10000`. Amounts on an invoice are never negative,
//! so half up and half away from zero coincide.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use ts_rs::TS;

use crate::error::ValidationError;

/// Basis points in 100%.
pub const BPS_PER_HUNDRED_PERCENT: u32 = 10_000;

// =============================================================================
// Money
// =============================================================================

/// A monetary value in the smallest currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::Money;
    ///
    /// let unit = Money::from_cents(299);
    /// assert_eq!(unit.checked_mul_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub fn checked_mul_quantity(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// The share of this amount represented by `pct`, rounded half up.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::{Money, Percentage};
    ///
    /// // 10.00 at 8.25% = 0.825 → 0.83
    /// let share = Money::from_cents(1000).percentage_of(Percentage::from_bps(825));
    /// assert_eq!(share.cents(), 83);
    /// ```
    pub fn percentage_of(&self, pct: Percentage) -> Money {
        // i128 keeps `amount × bps` from overflowing for any i64 amount
        let share = (self.0 as i128 * pct.bps() as i128 + 5_000) / 10_000;
        Money(share as i64)
    }

    /// This amount reduced by `pct` (a discount).
    ///
    /// The result never exceeds the original amount, so it cannot overflow.
    pub fn less_percentage(&self, pct: Percentage) -> Money {
        Money(self.0 - self.percentage_of(pct).0)
    }

    /// This amount increased by `pct` (a tax), `None` on overflow.
    pub fn plus_percentage(&self, pct: Percentage) -> Option<Money> {
        self.checked_add(self.percentage_of(pct))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points (1 bps = 0.01%), always within 0%..=100%.
///
/// Used for both line/invoice discounts and the flat GST rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points.
    ///
    /// Callers constructing from untrusted input should use
    /// [`Percentage::try_from_bps`] or [`Percentage::try_from_percent`].
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from basis points, rejecting values above 100%.
    pub fn try_from_bps(field: &str, bps: u32) -> Result<Self, ValidationError> {
        if bps > BPS_PER_HUNDRED_PERCENT {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(Percentage(bps))
    }

    /// Parses a decimal percentage (e.g. `8.25`) as sent on the wire.
    ///
    /// ## Rules
    /// - NaN and infinities are rejected
    /// - Values outside `[0, 100]` are rejected, never clamped
    /// - The value is rounded to the nearest basis point
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_core::money::Percentage;
    ///
    /// assert_eq!(Percentage::try_from_percent("gst", 8.25).unwrap().bps(), 825);
    /// assert!(Percentage::try_from_percent("gst", 100.5).is_err());
    /// assert!(Percentage::try_from_percent("gst", f64::NAN).is_err());
    /// ```
    pub fn try_from_percent(field: &str, pct: f64) -> Result<Self, ValidationError> {
        if !pct.is_finite() {
            return Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: "must be a finite number".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&pct) {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(Percentage((pct * 100.0).round() as u32))
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// The percentage as a decimal number (for display and the wire only).
    #[inline]
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whether the value lies within 0%..=100%.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= BPS_PER_HUNDRED_PERCENT
    }
}
