//! Type-safe price representation.
//!
//! The backend quotes every amount in the currency's minor unit as a plain
//! integer, and all arithmetic on this side stays in integers as well - no
//! floating point is ever involved in accumulating currency.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// An amount of money in the currency's minor unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Create a price from a minor-unit amount.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the underlying minor-unit amount.
    #[must_use]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Total for `quantity` units at this price.
    ///
    /// Saturates rather than wrapping on overflow; amounts anywhere near
    /// `i64::MAX` are malformed input, not real prices.
    #[must_use]
    pub const fn line_total(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_is_integer_multiplication() {
        assert_eq!(Price::new(2500).line_total(3), Price::new(7500));
        assert_eq!(Price::new(2500).line_total(0), Price::ZERO);
    }

    #[test]
    fn sum_accumulates_without_drift() {
        let total: Price = [Price::new(1), Price::new(2), Price::new(3)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::new(6));
    }

    #[test]
    fn overflow_saturates() {
        assert_eq!(
            Price::new(i64::MAX).line_total(2),
            Price::new(i64::MAX)
        );
        assert_eq!(
            Price::new(i64::MAX) + Price::new(1),
            Price::new(i64::MAX)
        );
    }
}
