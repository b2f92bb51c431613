// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Represents an amount of money in a specified currency denomination.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use argo_core::correctness::FAILED;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{
    Currency,
    fixed::{FIXED_PRECISION, FIXED_SCALAR, f64_to_fixed_i64, fixed_i64_to_f64},
};

/// The raw fixed-point backing type for [`Money`].
pub type MoneyRaw = i64;

/// The maximum valid money amount which can be represented.
pub const MONEY_MAX: f64 = 9_223_372_036.0;

/// The minimum valid money amount which can be represented.
pub const MONEY_MIN: f64 = -9_223_372_036.0;

/// Represents an amount of money in a specified currency denomination.
///
/// The amount is a fixed-point raw value at the currency's precision.
/// Arithmetic between differing currencies is a programmer error and panics.
#[repr(C)]
#[derive(Clone, Copy, Eq)]
pub struct Money {
    /// The raw fixed-point amount.
    pub raw: MoneyRaw,
    /// The currency denomination.
    pub currency: Currency,
}

impl Money {
    /// Creates a new [`Money`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// Returns an error if `amount` is not in the range [`MONEY_MIN`, `MONEY_MAX`].
    pub fn new_checked(amount: f64, currency: Currency) -> anyhow::Result<Self> {
        if !amount.is_finite() || !(MONEY_MIN..=MONEY_MAX).contains(&amount) {
            anyhow::bail!("invalid `amount` for `Money`, was {amount}");
        }
        let raw = f64_to_fixed_i64(amount, currency.precision)?;
        Ok(Self { raw, currency })
    }

    /// Creates a new [`Money`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self::new_checked(amount, currency).expect(FAILED)
    }

    /// Creates a new [`Money`] instance from the given raw fixed-point value.
    #[must_use]
    pub const fn from_raw(raw: MoneyRaw, currency: Currency) -> Self {
        Self { raw, currency }
    }

    /// Creates a new [`Money`] instance with zero amount.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self { raw: 0, currency }
    }

    /// Returns whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Returns whether the amount is negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.raw < 0
    }

    /// Returns the amount as an `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        fixed_i64_to_f64(self.raw)
    }

    /// Returns the amount as a `Decimal`.
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        let precision = self.currency.precision;
        let rescaled = self.raw / 10_i64.pow(u32::from(FIXED_PRECISION - precision));
        Decimal::new(rescaled, u32::from(precision))
    }
}

impl From<&str> for Money {
    /// Creates a [`Money`] from a `"{amount} {currency}"` string.
    ///
    /// # Panics
    ///
    /// Panics if the `value` string is malformed or the currency is unknown.
    fn from(value: &str) -> Self {
        Self::from_str(value).expect(FAILED)
    }
}

impl FromStr for Money {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (amount_str, currency_str) = s.split_once(' ').ok_or_else(|| {
            anyhow::anyhow!(
                "Error parsing `Money` from '{s}': expected '<amount> <currency>' format"
            )
        })?;
        let amount: f64 = amount_str
            .replace('_', "")
            .parse()
            .map_err(|e| anyhow::anyhow!("Error parsing `Money` amount from '{s}': {e}"))?;
        let currency = Currency::from_str(currency_str)?;
        Self::new_checked(amount, currency)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.currency == other.currency
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Money {
    fn cmp(&self, other: &Self) -> Ordering {
        assert_eq!(
            self.currency, other.currency,
            "Cannot compare `Money` of different currencies"
        );
        self.raw.cmp(&other.raw)
    }
}

impl Hash for Money {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
        self.currency.hash(state);
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self {
            raw: -self.raw,
            currency: self.currency,
        }
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(
            self.currency, rhs.currency,
            "Cannot add `Money` of different currencies"
        );
        Self {
            raw: self
                .raw
                .checked_add(rhs.raw)
                .expect("Overflow occurred when adding `Money`"),
            currency: self.currency,
        }
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        assert_eq!(
            self.currency, rhs.currency,
            "Cannot subtract `Money` of different currencies"
        );
        Self {
            raw: self
                .raw
                .checked_sub(rhs.raw)
                .expect("Underflow occurred when subtracting `Money`"),
            currency: self.currency,
        }
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Debug for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({self})", stringify!(Money))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.*} {}",
            self.currency.precision as usize,
            self.raw as f64 / FIXED_SCALAR,
            self.currency,
        )
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let money_str = String::deserialize(deserializer)?;
        Self::from_str(&money_str).map_err(serde::de::Error::custom)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_new() {
        let money = Money::new(1000.50, Currency::USD());
        assert_eq!(money.as_f64(), 1000.50);
        assert_eq!(money.to_string(), "1000.50 USD");
    }

    #[rstest]
    fn test_from_str() {
        let money = Money::from("1_000.50 USD");
        assert_eq!(money.as_f64(), 1000.50);
        assert_eq!(money.currency, Currency::USD());
    }

    #[rstest]
    #[should_panic(expected = "Condition failed")]
    fn test_from_str_no_currency_panics() {
        let _ = Money::from("1000.50");
    }

    #[rstest]
    fn test_arithmetic() {
        let a = Money::new(100.0, Currency::USD());
        let b = Money::new(25.0, Currency::USD());
        assert_eq!((a + b).as_f64(), 125.0);
        assert_eq!((a - b).as_f64(), 75.0);
        assert_eq!((-a).as_f64(), -100.0);
    }

    #[rstest]
    #[should_panic(expected = "Cannot add `Money` of different currencies")]
    fn test_add_different_currencies_panics() {
        let _ = Money::new(100.0, Currency::USD()) + Money::new(25.0, Currency::EUR());
    }

    #[rstest]
    fn test_serde_round_trip() {
        let money = Money::new(-42.10, Currency::USD());
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "\"-42.10 USD\"");
        let deserialized: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, money);
    }
}
