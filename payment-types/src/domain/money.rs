//! Non-negative monetary value held in minor units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Number of minor units in one major unit (cents per unit).
const MINOR_PER_MAJOR: i64 = 100;

/// Type-safe, non-negative money amount.
///
/// Amount is stored in the smallest unit (cents) to avoid floating-point
/// drift: `200.00 - 99.99` is exactly `100.01`. Over the wire it travels
/// as the bare minor-unit integer; negative values are rejected on
/// deserialization.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a Money value from minor units.
    pub fn from_minor(minor: i64) -> Result<Self, DomainError> {
        if minor < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self(minor))
    }

    /// Returns the amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition - returns an error on overflow.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::Validation("money amount overflow".into()))
    }

    /// Checked subtraction - returns error if the result would be negative.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        if self.0 < other.0 {
            return Err(DomainError::InsufficientFunds {
                available: *self,
                requested: other,
            });
        }
        Ok(Money(self.0 - other.0))
    }
}

impl TryFrom<i64> for Money {
    type Error = DomainError;

    fn try_from(minor: i64) -> Result<Self, Self::Error> {
        Self::from_minor(minor)
    }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_PER_MAJOR,
            self.0 % MINOR_PER_MAJOR
        )
    }
}

/// Parses a decimal string with at most two fractional digits (`"99.99"`).
impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(DomainError::NegativeAmount);
        }

        let invalid = || DomainError::Validation(format!("invalid money amount: {:?}", s));
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) || frac.len() > 2 {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        whole
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|minor| minor.checked_add(frac))
            .map(Money)
            .ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let money = Money::from_minor(1000).unwrap();
        assert_eq!(money.minor_units(), 1000);
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::from_minor(-100);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_subtraction_is_exact() {
        let balance: Money = "200.00".parse().unwrap();
        let amount: Money = "99.99".parse().unwrap();
        let rest = balance.checked_sub(amount).unwrap();
        assert_eq!(rest, "100.01".parse().unwrap());
        assert_eq!(rest.to_string(), "100.01");
    }

    #[test]
    fn test_subtraction_below_zero_fails() {
        let balance = Money::from_minor(5000).unwrap();
        let result = balance.checked_sub(Money::from_minor(9999).unwrap());
        assert!(matches!(result, Err(DomainError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!("5".parse::<Money>().unwrap().minor_units(), 500);
        assert_eq!("0.5".parse::<Money>().unwrap().minor_units(), 50);
        assert_eq!(" 12.34 ".parse::<Money>().unwrap().minor_units(), 1234);
        assert!(matches!(
            "-1.00".parse::<Money>(),
            Err(DomainError::NegativeAmount)
        ));
        assert!("1.234".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".50".parse::<Money>().is_err());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_minor(1050).unwrap().to_string(), "10.50");
        assert_eq!(Money::from_minor(7).unwrap().to_string(), "0.07");
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Money>("-1").is_err());
        assert_eq!(serde_json::from_str::<Money>("250").unwrap().minor_units(), 250);
    }
}
