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

//! Represents a quantity with a non-negative value and specified precision.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    ops::{Add, AddAssign, Sub, SubAssign},
    str::FromStr,
};

use argo_core::correctness::FAILED;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::fixed::{
    FIXED_PRECISION, FIXED_SCALAR, check_fixed_precision, f64_to_fixed_u64, fixed_u64_to_f64,
    precision_from_str,
};

/// The raw fixed-point backing type for [`Quantity`].
pub type QuantityRaw = u64;

/// The maximum valid quantity value which can be represented.
pub const QUANTITY_MAX: f64 = 18_446_744_073.0;

/// Represents a quantity with a non-negative value and specified precision.
///
/// Capable of storing either a whole number (no decimal places) of 'contracts'
/// or 'shares' (instruments denominated in whole units) or a decimal value
/// containing decimal places for instruments denominated in fractional units.
///
/// Handles up to [`FIXED_PRECISION`] decimals of precision. The quantity value
/// is always non-negative; sign is carried by an associated side.
#[repr(C)]
#[derive(Clone, Copy, Default, Eq)]
pub struct Quantity {
    /// The raw fixed-point quantity value.
    pub raw: QuantityRaw,
    /// The quantity precision (decimal places).
    pub precision: u8,
}

impl Quantity {
    /// Creates a new [`Quantity`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// This function returns an error:
    /// - If `value` is negative or not in the range [0, [`QUANTITY_MAX`]].
    /// - If `precision` exceeds [`FIXED_PRECISION`].
    pub fn new_checked(value: f64, precision: u8) -> anyhow::Result<Self> {
        if !value.is_finite() || !(0.0..=QUANTITY_MAX).contains(&value) {
            anyhow::bail!("invalid `value` for `Quantity`, was {value}");
        }
        let raw = f64_to_fixed_u64(value, precision)?;
        Ok(Self { raw, precision })
    }

    /// Creates a new [`Quantity`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    pub fn new(value: f64, precision: u8) -> Self {
        Self::new_checked(value, precision).expect(FAILED)
    }

    /// Creates a new [`Quantity`] instance from the given raw fixed-point value.
    ///
    /// # Panics
    ///
    /// Panics if `precision` exceeds [`FIXED_PRECISION`].
    #[must_use]
    pub fn from_raw(raw: QuantityRaw, precision: u8) -> Self {
        check_fixed_precision(precision).expect(FAILED);
        Self { raw, precision }
    }

    /// Creates a new [`Quantity`] instance with a value of zero.
    ///
    /// # Panics
    ///
    /// Panics if `precision` exceeds [`FIXED_PRECISION`].
    #[must_use]
    pub fn zero(precision: u8) -> Self {
        check_fixed_precision(precision).expect(FAILED);
        Self { raw: 0, precision }
    }

    /// Returns whether the quantity has a value of zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Returns whether the quantity has a positive value.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.raw > 0
    }

    /// Returns the quantity value as an `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        fixed_u64_to_f64(self.raw)
    }

    /// Returns the quantity value as a `Decimal`.
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        let rescaled = self.raw / 10_u64.pow(u32::from(FIXED_PRECISION - self.precision));
        Decimal::new(rescaled as i64, u32::from(self.precision))
    }

    /// Returns the quantity subtracting `other`, saturating at zero.
    #[must_use]
    pub fn saturating_sub(&self, other: Self) -> Self {
        Self {
            raw: self.raw.saturating_sub(other.raw),
            precision: self.precision,
        }
    }
}

impl From<&str> for Quantity {
    /// Creates a [`Quantity`] from a string, inferring precision from the decimals.
    ///
    /// # Panics
    ///
    /// Panics if the `value` string is not a valid decimal.
    fn from(value: &str) -> Self {
        Self::from_str(value).expect(FAILED)
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self::new(value as f64, 0)
    }
}

impl From<u32> for Quantity {
    fn from(value: u32) -> Self {
        Self::new(f64::from(value), 0)
    }
}

impl FromStr for Quantity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let value: f64 = s
            .parse()
            .map_err(|e| anyhow::anyhow!("Error parsing `Quantity` from '{s}': {e}"))?;
        Self::new_checked(value, precision_from_str(s))
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Add for Quantity {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            raw: self
                .raw
                .checked_add(rhs.raw)
                .expect("Overflow occurred when adding `Quantity`"),
            precision: self.precision,
        }
    }
}

impl Sub for Quantity {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            raw: self
                .raw
                .checked_sub(rhs.raw)
                .expect("Underflow occurred when subtracting `Quantity`"),
            precision: self.precision,
        }
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Debug for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({self})", stringify!(Quantity))
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.*}",
            self.precision as usize,
            self.raw as f64 / FIXED_SCALAR
        )
    }
}

impl Serialize for Quantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let qty_str = String::deserialize(deserializer)?;
        Self::from_str(&qty_str).map_err(serde::de::Error::custom)
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
        let qty = Quantity::new(0.500, 3);
        assert_eq!(qty.raw, 500_000_000);
        assert_eq!(qty.precision, 3);
        assert_eq!(qty.as_f64(), 0.500);
    }

    #[rstest]
    fn test_new_checked_negative() {
        assert!(Quantity::new_checked(-1.0, 0).is_err());
    }

    #[rstest]
    fn test_from_integer() {
        let qty = Quantity::from(100_u64);
        assert_eq!(qty.as_f64(), 100.0);
        assert_eq!(qty.precision, 0);
    }

    #[rstest]
    fn test_from_str() {
        let qty = Quantity::from("0.500");
        assert_eq!(qty.precision, 3);
        assert_eq!(qty.as_f64(), 0.5);
    }

    #[rstest]
    fn test_arithmetic() {
        let a = Quantity::new(1.5, 1);
        let b = Quantity::new(0.5, 1);
        assert_eq!((a + b).as_f64(), 2.0);
        assert_eq!((a - b).as_f64(), 1.0);
    }

    #[rstest]
    #[should_panic(expected = "Underflow occurred when subtracting `Quantity`")]
    fn test_sub_underflow_panics() {
        let _ = Quantity::new(0.5, 1) - Quantity::new(1.0, 1);
    }

    #[rstest]
    fn test_saturating_sub() {
        let a = Quantity::new(0.5, 1);
        let b = Quantity::new(1.0, 1);
        assert_eq!(a.saturating_sub(b), Quantity::zero(1));
    }

    #[rstest]
    fn test_serde_round_trip() {
        let qty = Quantity::new(0.500, 3);
        let json = serde_json::to_string(&qty).unwrap();
        assert_eq!(json, "\"0.500\"");
        let deserialized: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, qty);
    }
}
