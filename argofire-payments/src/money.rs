//! Money amounts
//!
//! Amounts are held in integer cents. The gateway takes a plain decimal
//! string with two places and no grouping separators.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Money amount in cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents
    pub cents: i64,
}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    pub fn new(cents: i64) -> Self {
        Self { cents }
    }

    /// Create from a decimal amount (e.g. `29.99`), rounding half away from
    /// zero to the cent.
    pub fn from_decimal(amount: Decimal) -> Self {
        let cents = (amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
            .mantissa();
        Self {
            cents: i64::try_from(cents).unwrap_or(if cents < 0 { i64::MIN } else { i64::MAX }),
        }
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    /// Gateway number format: `1234.50`.
    pub fn gateway_format(&self) -> String {
        format!("{:.2}", self.to_decimal())
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// True when less than one cent is outstanding, including negative
    /// balances from over-applied credits.
    pub fn is_negligible(&self) -> bool {
        self.cents < 1
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.gateway_format())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            cents: self.cents + other.cents,
        }
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            cents: self.cents - other.cents,
        }
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
