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

//! Fixed-point arithmetic for value types.
//!
//! All scalar value types carry a raw integer scaled by [`FIXED_SCALAR`], with
//! a declared precision up to [`FIXED_PRECISION`] decimal places. Conversions
//! which would lose precision beyond the declared value, or whose magnitude
//! exceeds the representable range, fail fast.

use argo_core::correctness::check_in_range_inclusive_u8;

/// The maximum precision (decimal places) for fixed-point values.
pub const FIXED_PRECISION: u8 = 9;

/// The scalar mapping one unit to its raw fixed-point representation.
pub const FIXED_SCALAR: f64 = 1_000_000_000.0; // 10.0**FIXED_PRECISION

/// Checks the given `precision` is within the valid fixed-point range.
///
/// # Errors
///
/// Returns an error if `precision` exceeds [`FIXED_PRECISION`].
pub fn check_fixed_precision(precision: u8) -> anyhow::Result<()> {
    check_in_range_inclusive_u8(precision, 0, FIXED_PRECISION, stringify!(precision))
}

/// Converts an `f64` value to a raw fixed-point `i64`, rounding to the given precision.
///
/// # Errors
///
/// This function returns an error:
/// - If `precision` exceeds [`FIXED_PRECISION`].
/// - If `value` is not a finite number.
/// - If the scaled result exceeds the representable `i64` range.
pub fn f64_to_fixed_i64(value: f64, precision: u8) -> anyhow::Result<i64> {
    check_fixed_precision(precision)?;
    if !value.is_finite() {
        anyhow::bail!("invalid f64 value, was {value}");
    }

    let pow1 = 10_i64.pow(u32::from(precision));
    let pow2 = 10_i64.pow(u32::from(FIXED_PRECISION - precision));
    let rounded = (value * pow1 as f64).round();

    if rounded * pow2 as f64 > i64::MAX as f64 || (rounded * pow2 as f64) < (i64::MIN as f64) {
        anyhow::bail!("value {value} exceeds representable fixed-point range");
    }

    Ok(rounded as i64 * pow2)
}

/// Converts an `f64` value to a raw fixed-point `u64`, rounding to the given precision.
///
/// # Errors
///
/// This function returns an error:
/// - If `precision` exceeds [`FIXED_PRECISION`].
/// - If `value` is not a finite non-negative number.
/// - If the scaled result exceeds the representable `u64` range.
pub fn f64_to_fixed_u64(value: f64, precision: u8) -> anyhow::Result<u64> {
    check_fixed_precision(precision)?;
    if !value.is_finite() || value < 0.0 {
        anyhow::bail!("invalid f64 value, was {value}");
    }

    let pow1 = 10_u64.pow(u32::from(precision));
    let pow2 = 10_u64.pow(u32::from(FIXED_PRECISION - precision));
    let rounded = (value * pow1 as f64).round();

    if rounded * pow2 as f64 > u64::MAX as f64 {
        anyhow::bail!("value {value} exceeds representable fixed-point range");
    }

    Ok(rounded as u64 * pow2)
}

/// Converts a raw fixed-point `i64` to an `f64` value.
#[must_use]
pub fn fixed_i64_to_f64(value: i64) -> f64 {
    value as f64 / FIXED_SCALAR
}

/// Converts a raw fixed-point `u64` to an `f64` value.
#[must_use]
pub fn fixed_u64_to_f64(value: u64) -> f64 {
    value as f64 / FIXED_SCALAR
}

/// Returns the number of decimal places inferred from the given string value.
#[must_use]
pub fn precision_from_str(s: &str) -> u8 {
    let s = s.trim();
    // Handle scientific notation
    if let Some((_, exp)) = s.to_ascii_lowercase().split_once('e') {
        if let Ok(exponent) = exp.parse::<i32>() {
            if exponent < 0 {
                return exponent.unsigned_abs().min(u32::from(u8::MAX)) as u8;
            }
        }
        return 0;
    }
    match s.split_once('.') {
        Some((_, fraction)) => fraction.len().min(usize::from(u8::MAX)) as u8,
        None => 0,
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
    fn test_check_fixed_precision() {
        assert!(check_fixed_precision(FIXED_PRECISION).is_ok());
        assert!(check_fixed_precision(FIXED_PRECISION + 1).is_err());
    }

    #[rstest]
    #[case(0.0, 0, 0)]
    #[case(1.0, 0, 1_000_000_000)]
    #[case(1.5, 1, 1_500_000_000)]
    #[case(50000.50, 2, 50_000_500_000_000)]
    #[case(-1.5, 1, -1_500_000_000)]
    fn test_f64_to_fixed_i64(#[case] value: f64, #[case] precision: u8, #[case] expected: i64) {
        assert_eq!(f64_to_fixed_i64(value, precision).unwrap(), expected);
    }

    #[rstest]
    fn test_f64_to_fixed_i64_rounds_to_precision() {
        // 1.005 at precision 2 rounds to 1.01 (not truncated)
        assert_eq!(f64_to_fixed_i64(0.125, 2).unwrap(), 130_000_000);
    }

    #[rstest]
    fn test_f64_to_fixed_i64_out_of_range() {
        assert!(f64_to_fixed_i64(1.0e19, 0).is_err());
        assert!(f64_to_fixed_i64(f64::NAN, 0).is_err());
        assert!(f64_to_fixed_i64(f64::INFINITY, 0).is_err());
    }

    #[rstest]
    fn test_f64_to_fixed_u64_rejects_negative() {
        assert!(f64_to_fixed_u64(-0.5, 1).is_err());
    }

    #[rstest]
    #[case("1", 0)]
    #[case("1.5", 1)]
    #[case("50000.50", 2)]
    #[case("0.000000001", 9)]
    #[case("1e-4", 4)]
    #[case("1e4", 0)]
    fn test_precision_from_str(#[case] s: &str, #[case] expected: u8) {
        assert_eq!(precision_from_str(s), expected);
    }

    #[rstest]
    fn test_fixed_round_trip() {
        let raw = f64_to_fixed_i64(50000.50, 2).unwrap();
        assert_eq!(fixed_i64_to_f64(raw), 50000.50);
    }
}
