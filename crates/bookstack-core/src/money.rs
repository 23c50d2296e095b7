//! Integer money.
//!
//! Every amount in Bookstack - catalog price, line total, order total,
//! payment amount - is a count of the smallest currency unit, carried in
//! [`Money`]. There is deliberately no constructor from `f64`: the float
//! prices a storefront might receive from upstream systems are converted to
//! cents exactly once, at the catalog boundary, and everything downstream is
//! exact integer arithmetic. The amount handed to the payment gateway is
//! therefore already in minor units with no rounding step left to get wrong.
//!
//! Line totals go through [`Money::times`]; order totals through summation.
//! Both use checked arithmetic, since a hostile quantity times a large price
//! must not wrap into a small (or negative) charge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// An exact monetary amount in minor currency units (cents).
///
/// Signed so refunds and corrections can be expressed; all checkout-path
/// amounts are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Wraps an amount already expressed in cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// The amount in cents.
    #[inline]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Line-total multiplication: unit price × quantity.
    ///
    /// Checked: a quantity large enough to overflow i64 yields `None`
    /// instead of a wrapped amount.
    #[inline]
    pub fn times(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    /// Checked addition, for summing untrusted line totals.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

/// Debug/log formatting: `$12.99`, `-$0.50`. User-facing formatting and
/// localization belong to the outer layers.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = (self.0 / 100).abs();
        let cents = (self.0 % 100).abs();
        write!(f, "{sign}${whole}.{cents:02}")
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl Add for Money {
    type Output = Money;

    #[inline]
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    #[inline]
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip() {
        assert_eq!(Money::from_cents(1299).cents(), 1299);
        assert_eq!(Money::zero().cents(), 0);
        assert_eq!(Money::default(), Money::ZERO);
    }

    #[test]
    fn formatting() {
        assert_eq!(Money::from_cents(1299).to_string(), "$12.99");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
        assert_eq!(Money::from_cents(7).to_string(), "$0.07");
        assert_eq!(Money::from_cents(-50).to_string(), "-$0.50");
    }

    #[test]
    fn sign_predicates() {
        assert!(Money::ZERO.is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::from_cents(-1).is_positive());
    }

    #[test]
    fn addition_and_subtraction() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);

        let mut acc = Money::ZERO;
        acc += a;
        acc -= b;
        assert_eq!(acc.cents(), 750);
    }

    #[test]
    fn line_totals_are_checked() {
        assert_eq!(Money::from_cents(299).times(3), Some(Money::from_cents(897)));
        assert_eq!(Money::from_cents(i64::MAX).times(2), None);
        assert_eq!(
            Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)),
            None
        );
    }

    #[test]
    fn summation() {
        let total: Money = [100, 250, 7].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 357);
    }
}
