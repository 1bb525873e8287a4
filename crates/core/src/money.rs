use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).to_i64().unwrap()
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// Absolute gap between two amounts, the quantity every tolerance
    /// comparison in the matcher is made against.
    pub fn gap(self, other: Self) -> Self {
        (self - other).abs()
    }
}

/// Brazilian display convention: dot for thousands, comma for cents.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = self.to_cents();
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        let mut integer = (abs / 100).to_string();
        let mut grouped = String::new();
        while integer.len() > 3 {
            let tail = integer.split_off(integer.len() - 3);
            grouped = format!(".{tail}{grouped}");
        }
        write!(f, "{sign}{integer}{grouped},{:02}", abs % 100)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip() {
        assert_eq!(Money::from_cents(12345).to_cents(), 12345);
        assert_eq!(Money::from_cents(-1).to_cents(), -1);
    }

    #[test]
    fn from_decimal_rounds_to_two_places() {
        let m = Money::from_decimal(Decimal::new(12345, 3)); // 12.345
        assert_eq!(m.to_cents(), 1234); // banker's rounding: 12.34
    }

    #[test]
    fn gap_is_symmetric_and_absolute() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(1003);
        assert_eq!(a.gap(b), Money::from_cents(3));
        assert_eq!(b.gap(a), Money::from_cents(3));
    }

    #[test]
    fn display_brazilian_format() {
        assert_eq!(Money::from_cents(123456).to_string(), "1.234,56");
        assert_eq!(Money::from_cents(5).to_string(), "0,05");
        assert_eq!(Money::from_cents(-987654321).to_string(), "-9.876.543,21");
        assert_eq!(Money::from_cents(100000000).to_string(), "1.000.000,00");
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [10_00, 5_00, -3_00]
            .iter()
            .map(|c| Money::from_cents(*c))
            .sum();
        assert_eq!(total.to_cents(), 12_00);
    }

    #[test]
    fn negative_checks() {
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::zero().is_negative());
        assert!(!Money::from_cents(1).is_negative());
    }
}
