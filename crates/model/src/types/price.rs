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

//! Represents a price in a market with a specified precision.

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

use crate::types::fixed::{
    FIXED_PRECISION, FIXED_SCALAR, check_fixed_precision, f64_to_fixed_i64, fixed_i64_to_f64,
    precision_from_str,
};

/// The raw fixed-point backing type for [`Price`].
pub type PriceRaw = i64;

/// The maximum valid price value which can be represented.
pub const PRICE_MAX: f64 = 9_223_372_036.0;

/// The minimum valid price value which can be represented.
pub const PRICE_MIN: f64 = -9_223_372_036.0;

/// The sentinel raw value for an undefined price.
pub const PRICE_UNDEF: PriceRaw = PriceRaw::MAX;

/// Represents a price in a market with a specified precision.
///
/// The number of decimal places may vary. For certain asset classes, prices
/// may have negative values. For example, prices for options instruments can
/// be negative under certain conditions.
///
/// Handles up to [`FIXED_PRECISION`] decimals of precision.
///
/// - An undefined price has precision zero with a raw sentinel value; any
///   other combination of "undefined" is a data-integrity error.
/// - [`PRICE_MAX`] and [`PRICE_MIN`] bound the representable range; a result
///   whose raw magnitude exceeds the range fails fast.
#[repr(C)]
#[derive(Clone, Copy, Default, Eq)]
pub struct Price {
    /// The raw fixed-point price value.
    pub raw: PriceRaw,
    /// The price precision (decimal places).
    pub precision: u8,
}

impl Price {
    /// Creates a new [`Price`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// This function returns an error:
    /// - If `value` is not in the range [`PRICE_MIN`, `PRICE_MAX`].
    /// - If `precision` exceeds [`FIXED_PRECISION`].
    pub fn new_checked(value: f64, precision: u8) -> anyhow::Result<Self> {
        if !value.is_finite() || !(PRICE_MIN..=PRICE_MAX).contains(&value) {
            anyhow::bail!("invalid `value` for `Price`, was {value}");
        }
        let raw = f64_to_fixed_i64(value, precision)?;
        Ok(Self { raw, precision })
    }

    /// Creates a new [`Price`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    pub fn new(value: f64, precision: u8) -> Self {
        Self::new_checked(value, precision).expect(FAILED)
    }

    /// Creates a new [`Price`] instance from the given raw fixed-point value.
    ///
    /// # Panics
    ///
    /// Panics if `precision` exceeds [`FIXED_PRECISION`].
    #[must_use]
    pub fn from_raw(raw: PriceRaw, precision: u8) -> Self {
        check_fixed_precision(precision).expect(FAILED);
        Self { raw, precision }
    }

    /// Creates a new [`Price`] instance with a value of zero.
    ///
    /// # Panics
    ///
    /// Panics if `precision` exceeds [`FIXED_PRECISION`].
    #[must_use]
    pub fn zero(precision: u8) -> Self {
        check_fixed_precision(precision).expect(FAILED);
        Self { raw: 0, precision }
    }

    /// Creates a new undefined [`Price`] instance (precision zero, sentinel raw value).
    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            raw: PRICE_UNDEF,
            precision: 0,
        }
    }

    /// Returns the maximum representable price for the given `precision`.
    #[must_use]
    pub fn max(precision: u8) -> Self {
        Self::new(PRICE_MAX, precision)
    }

    /// Returns the minimum representable price for the given `precision`.
    #[must_use]
    pub fn min(precision: u8) -> Self {
        Self::new(PRICE_MIN, precision)
    }

    /// Returns whether the price is undefined.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        self.raw == PRICE_UNDEF
    }

    /// Returns whether the price has a value of zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Returns whether the price has a positive value.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.raw > 0 && self.raw != PRICE_UNDEF
    }

    /// Returns the price value as an `f64`.
    ///
    /// # Panics
    ///
    /// Panics if the price is undefined (data-integrity guard).
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        assert!(!self.is_undefined(), "Cannot convert undefined `Price`");
        fixed_i64_to_f64(self.raw)
    }

    /// Returns the price value as a `Decimal`.
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        let rescaled = self.raw / 10_i64.pow(u32::from(FIXED_PRECISION - self.precision));
        Decimal::new(rescaled, u32::from(self.precision))
    }
}

impl From<&str> for Price {
    /// Creates a [`Price`] from a string, inferring precision from the decimals.
    ///
    /// # Panics
    ///
    /// Panics if the `value` string is not a valid decimal.
    fn from(value: &str) -> Self {
        Self::from_str(value).expect(FAILED)
    }
}

impl FromStr for Price {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let value: f64 = s
            .parse()
            .map_err(|e| anyhow::anyhow!("Error parsing `Price` from '{s}': {e}"))?;
        Self::new_checked(value, precision_from_str(s))
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Hash for Price {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Neg for Price {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self {
            raw: -self.raw,
            precision: self.precision,
        }
    }
}

impl Add for Price {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            raw: self
                .raw
                .checked_add(rhs.raw)
                .expect("Overflow occurred when adding `Price`"),
            precision: self.precision,
        }
    }
}

impl Sub for Price {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            raw: self
                .raw
                .checked_sub(rhs.raw)
                .expect("Underflow occurred when subtracting `Price`"),
            precision: self.precision,
        }
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Price {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Debug for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({self})", stringify!(Price))
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_undefined() {
            return write!(f, "UNDEF");
        }
        write!(
            f,
            "{:.*}",
            self.precision as usize,
            self.raw as f64 / FIXED_SCALAR
        )
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let price_str = String::deserialize(deserializer)?;
        Self::from_str(&price_str).map_err(serde::de::Error::custom)
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
        let price = Price::new(50000.50, 2);
        assert_eq!(price.raw, 50_000_500_000_000);
        assert_eq!(price.precision, 2);
        assert_eq!(price.as_f64(), 50000.50);
    }

    #[rstest]
    fn test_new_checked_out_of_range() {
        assert!(Price::new_checked(PRICE_MAX * 10.0, 0).is_err());
        assert!(Price::new_checked(f64::NAN, 0).is_err());
    }

    #[rstest]
    #[should_panic(expected = "Condition failed")]
    fn test_invalid_precision_panics() {
        let _ = Price::new(1.0, FIXED_PRECISION + 1);
    }

    #[rstest]
    fn test_undefined() {
        let price = Price::undefined();
        assert!(price.is_undefined());
        assert_eq!(price.precision, 0);
        assert_eq!(price.to_string(), "UNDEF");
    }

    #[rstest]
    #[should_panic(expected = "Cannot convert undefined `Price`")]
    fn test_undefined_as_f64_panics() {
        let _ = Price::undefined().as_f64();
    }

    #[rstest]
    #[case("0.28", 2, 0.28)]
    #[case("50000.50", 2, 50000.50)]
    #[case("-0.001", 3, -0.001)]
    fn test_from_str(#[case] s: &str, #[case] precision: u8, #[case] value: f64) {
        let price = Price::from(s);
        assert_eq!(price.precision, precision);
        assert_eq!(price.as_f64(), value);
    }

    #[rstest]
    fn test_str_round_trip() {
        let price = Price::new(1.2345, 4);
        assert_eq!(Price::from(price.to_string().as_str()), price);
    }

    #[rstest]
    fn test_arithmetic() {
        let a = Price::new(1.50, 2);
        let b = Price::new(0.25, 2);
        assert_eq!((a + b).as_f64(), 1.75);
        assert_eq!((a - b).as_f64(), 1.25);
        assert_eq!((-a).as_f64(), -1.50);
    }

    #[rstest]
    fn test_ordering() {
        assert!(Price::new(1.0, 2) < Price::new(2.0, 2));
        assert!(Price::new(2.0, 2) >= Price::new(2.0, 2));
    }

    #[rstest]
    fn test_as_decimal() {
        let price = Price::new(50000.50, 2);
        assert_eq!(price.as_decimal(), Decimal::new(5_000_050, 2));
    }

    #[rstest]
    fn test_serde_round_trip() {
        let price = Price::new(50000.50, 2);
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"50000.50\"");
        let deserialized: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, price);
        assert_eq!(deserialized.precision, 2);
    }
}
