//! Monetary amounts in integer cents
//!
//! Amounts are stored and summed as whole cents so that totals never drift.
//! On the wire they are rendered as decimal strings (`"5.00"`), and parsed
//! from either decimal strings or plain numbers.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;

/// Amount of money in cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(i64);

/// Largest per-attendee cost a session or the config may carry
pub const MAX_COST_PER_ATTENDEE: Cents = Cents::from_units(10_000);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole units (e.g. euros) to cents
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub const fn as_cents(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    /// Round a floating point amount to the nearest cent
    pub fn from_f64(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Cents {
    type Output = Cents;

    /// Saturates at the i64 bounds; use `checked_add` to detect overflow
    fn add(self, rhs: Cents) -> Self::Output {
        Cents(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Self {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

/// Failure to parse a decimal amount
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount '{0}': expected a decimal with at most two fractional digits")]
pub struct ParseCentsError(String);

impl FromStr for Cents {
    type Err = ParseCentsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCentsError(s.to_string());
        let trimmed = s.trim();

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if frac.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err())?
        };
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac.parse().map_err(|_| err())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(err)?;

        Ok(Cents(if negative { -cents } else { cents }))
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CentsVisitor)
    }
}

struct CentsVisitor;

impl Visitor<'_> for CentsVisitor {
    type Value = Cents;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Cents, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cents, E> {
        v.checked_mul(100)
            .map(Cents)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cents, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(100))
            .map(Cents)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Cents, E> {
        Cents::from_f64(v).ok_or_else(|| E::custom("amount out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_cents() {
        assert_eq!(Cents::new(500).to_string(), "5.00");
        assert_eq!(Cents::new(1005).to_string(), "10.05");
        assert_eq!(Cents::new(7).to_string(), "0.07");
        assert_eq!(Cents::new(-250).to_string(), "-2.50");
    }

    #[test]
    fn parse_decimal_strings() {
        assert_eq!("5".parse::<Cents>().unwrap(), Cents::new(500));
        assert_eq!("5.5".parse::<Cents>().unwrap(), Cents::new(550));
        assert_eq!("5.00".parse::<Cents>().unwrap(), Cents::new(500));
        assert_eq!(".75".parse::<Cents>().unwrap(), Cents::new(75));
        assert_eq!("-1.25".parse::<Cents>().unwrap(), Cents::new(-125));
    }

    #[test]
    fn reject_malformed_strings() {
        assert!("".parse::<Cents>().is_err());
        assert!(".".parse::<Cents>().is_err());
        assert!("5.001".parse::<Cents>().is_err());
        assert!("five".parse::<Cents>().is_err());
        assert!("5,00".parse::<Cents>().is_err());
    }

    #[test]
    fn deserialize_from_string_or_number() {
        let from_str: Cents = serde_json::from_str("\"12.34\"").unwrap();
        assert_eq!(from_str, Cents::new(1234));

        let from_int: Cents = serde_json::from_str("5").unwrap();
        assert_eq!(from_int, Cents::new(500));

        let from_float: Cents = serde_json::from_str("4.5").unwrap();
        assert_eq!(from_float, Cents::new(450));

        let json = serde_json::to_string(&Cents::new(500)).unwrap();
        assert_eq!(json, "\"5.00\"");
    }

    #[test]
    fn sum_of_amounts() {
        let total: Cents = [Cents::new(500), Cents::ZERO, Cents::new(500)]
            .into_iter()
            .sum();
        assert_eq!(total, Cents::new(1000));
    }

    #[test]
    fn addition_never_wraps() {
        let huge = Cents::new(i64::MAX - 1);
        assert_eq!(huge.checked_add(Cents::new(2)), None);
        assert_eq!(huge + Cents::new(2), Cents::new(i64::MAX));
        assert_eq!(Cents::new(1).checked_add(Cents::new(2)), Some(Cents::new(3)));
    }
}
