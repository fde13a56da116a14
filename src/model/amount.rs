//! Amount type for handling monetary values in fixed-point milli-units.
//!
//! An `Amount` stores the value multiplied by 1000 in an `i64`, so `"123.45"` is held as `123450`.
//! Arithmetic is plain integer arithmetic on that representation. The string form, which is also
//! the persisted form, has exactly two fractional digits. The third (milli) digit does not survive
//! a round-trip through a string.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// The number of milli-units in one main currency unit.
pub const SCALE: i64 = 1000;

/// Represents a signed monetary amount in milli-units of a single currency.
///
/// # Examples
///
/// ```
/// # use ledger_import::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("123.45").unwrap();
/// assert_eq!(amount.milli_units(), 123_450);
/// assert_eq!(amount.to_string(), "123.45");
/// ```
///
/// Every constructor uses the same scale:
/// ```
/// # use ledger_import::model::Amount;
/// # use std::str::FromStr;
/// assert_eq!(Amount::from(7), Amount::from_str("7").unwrap());
/// assert_eq!(Amount::from(7).milli_units(), 7_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Creates an amount directly from its scaled representation.
    pub const fn from_milli_units(milli_units: i64) -> Self {
        Self(milli_units)
    }

    /// Returns the scaled representation, i.e. the value multiplied by 1000.
    pub const fn milli_units(&self) -> i64 {
        self.0
    }

    /// Returns the value in whole cents, truncated toward zero.
    pub const fn cents(&self) -> i64 {
        self.0 / 10
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts.
    ///
    /// # Panics
    /// Panics if the result does not fit in the `i64` representation. Amounts of that size
    /// indicate a bug in the caller, so the overflow is never wrapped.
    pub fn add(self, other: Amount) -> Amount {
        match self.0.checked_add(other.0) {
            Some(v) => Amount(v),
            None => panic!("amount overflow: {self} + {other}"),
        }
    }

    /// Subtracts `other` from `self`.
    ///
    /// # Panics
    /// Panics if the result does not fit in the `i64` representation.
    pub fn sub(self, other: Amount) -> Amount {
        match self.0.checked_sub(other.0) {
            Some(v) => Amount(v),
            None => panic!("amount overflow: {self} - {other}"),
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    pub const fn checked_add(self, other: Amount) -> Option<Amount> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Amount(v)),
            None => None,
        }
    }

    /// Subtracts `other` from `self`, returning `None` on overflow.
    pub const fn checked_sub(self, other: Amount) -> Option<Amount> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Amount(v)),
            None => None,
        }
    }

    /// The magnitude of the amount.
    ///
    /// # Panics
    /// Panics for the most negative representable amount, whose magnitude does not fit.
    pub fn abs(self) -> Amount {
        match self.0.checked_abs() {
            Some(v) => Amount(v),
            None => panic!("amount overflow: |{self}|"),
        }
    }

    /// Converts a `Decimal` number of main currency units, rounding to the nearest milli-unit.
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        value
            .checked_mul(Decimal::from(SCALE))
            .map(|scaled| scaled.round())
            .and_then(|scaled| scaled.to_i64())
            .map(Amount)
            .ok_or_else(|| AmountError::OutOfRange(value.to_string()))
    }

    /// Returns the exact value as a `Decimal` number of main currency units.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 3)
    }
}

/// An error that can occur when constructing an `Amount`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AmountError {
    #[error("an empty string is not an amount")]
    Empty,
    #[error("invalid main units \"{0}\"")]
    InvalidMain(String),
    #[error("invalid cents \"{0}\"")]
    InvalidCents(String),
    #[error("amount \"{0}\" is out of range")]
    OutOfRange(String),
    #[error("{0} is not a finite amount")]
    NotFinite(f64),
}

impl From<AmountError> for crate::Error {
    fn from(e: AmountError) -> Self {
        crate::Error::new(crate::ErrorKind::Format, e)
    }
}

fn parse_digits(s: &str) -> Option<i64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses `[-]<main>[.<fraction>]`.
    ///
    /// The fraction is right-padded with zeros to three digits and added to the main units as
    /// milli-units. Digits beyond the third are taken as they are, not rounded, so `"1.2345"` is
    /// `1000 + 2345` milli-units. Surrounding spaces and tabs are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches(|c| c == ' ' || c == '\t');
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        let (sign, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, trimmed),
        };

        let (main, fraction) = match unsigned.split_once('.') {
            Some((main, fraction)) => (main, Some(fraction)),
            None => (unsigned, None),
        };

        let main_units =
            parse_digits(main).ok_or_else(|| AmountError::InvalidMain(main.to_string()))?;

        let milli = match fraction {
            None => 0,
            Some(fraction) => {
                let mut padded = fraction.to_string();
                while padded.len() < 3 {
                    padded.push('0');
                }
                parse_digits(&padded)
                    .ok_or_else(|| AmountError::InvalidCents(fraction.to_string()))?
            }
        };

        main_units
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(milli))
            .and_then(|v| v.checked_mul(sign))
            .map(Amount)
            .ok_or_else(|| AmountError::OutOfRange(trimmed.to_string()))
    }
}

impl fmt::Display for Amount {
    /// Renders `<main>.<cc>`. The sign is written once, in front, so that `-500` milli-units is
    /// `-0.50` rather than `0.50`. The milli digit is truncated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let main = abs / SCALE as u64;
        let cents = (abs % SCALE as u64) / 10;
        write!(f, "{sign}{main}.{cents:02}")
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Amount {
                /// Whole main currency units.
                fn from(value: $t) -> Self {
                    Amount::from(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, u8, i16, u16, i32, u32);

impl From<i64> for Amount {
    /// Whole main currency units.
    ///
    /// # Panics
    /// Panics if the value is too large for the milli-unit representation.
    fn from(value: i64) -> Self {
        match value.checked_mul(SCALE) {
            Some(v) => Amount(v),
            None => panic!("amount overflow: {value} units"),
        }
    }
}

impl TryFrom<u64> for Amount {
    type Error = AmountError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .ok()
            .and_then(|v| v.checked_mul(SCALE))
            .map(Amount)
            .ok_or_else(|| AmountError::OutOfRange(value.to_string()))
    }
}

impl TryFrom<f64> for Amount {
    type Error = AmountError;

    /// Main currency units, rounded to the nearest milli-unit.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite(value));
        }
        let decimal =
            Decimal::from_f64(value).ok_or_else(|| AmountError::OutOfRange(value.to_string()))?;
        Amount::from_decimal(decimal)
    }
}

impl TryFrom<f32> for Amount {
    type Error = AmountError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Amount::try_from(f64::from(value))
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::from_decimal(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.to_decimal()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount::add(self, rhs)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount::sub(self, rhs)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = Amount::add(*self, rhs);
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        *self = Amount::sub(*self, rhs);
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount::ZERO.sub(self)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Amount::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.copied().sum()
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}
