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

//! Exchange rate calculation through a graph of cached quote pairs.

use std::collections::HashMap;

use argo_model::types::Currency;
use ustr::Ustr;

/// The intermediate currencies used for one-hop triangulation.
const TRIANGULATION_CODES: [&str; 3] = ["USD", "USDT", "BTC"];

/// An error when calculating an exchange rate.
///
/// A missing conversion is a typed error, never a silent zero.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum XRateError {
    #[error("No conversion path from {from} to {to}")]
    NoConversionPath { from: Currency, to: Currency },
    #[error("Invalid rate for pair {0}/{1}")]
    InvalidRate(Currency, Currency),
}

/// Calculates the exchange rate from `from_currency` to `to_currency` using
/// the given direct pair `rates` keyed by `(base, quote)` currency codes.
///
/// Falls back to one-hop triangulation through common quote currencies when
/// no direct or inverse rate exists.
///
/// # Errors
///
/// Returns an error if no conversion path exists, or a rate is not positive.
pub fn get_exchange_rate(
    from_currency: Currency,
    to_currency: Currency,
    rates: &HashMap<(Ustr, Ustr), f64>,
) -> Result<f64, XRateError> {
    if from_currency == to_currency {
        return Ok(1.0);
    }

    let from = from_currency.code;
    let to = to_currency.code;

    let direct = |a: Ustr, b: Ustr| -> Option<Result<f64, XRateError>> {
        if let Some(&rate) = rates.get(&(a, b)) {
            if rate <= 0.0 || !rate.is_finite() {
                return Some(Err(XRateError::InvalidRate(from_currency, to_currency)));
            }
            return Some(Ok(rate));
        }
        if let Some(&rate) = rates.get(&(b, a)) {
            if rate <= 0.0 || !rate.is_finite() {
                return Some(Err(XRateError::InvalidRate(from_currency, to_currency)));
            }
            return Some(Ok(1.0 / rate));
        }
        None
    };

    if let Some(result) = direct(from, to) {
        return result;
    }

    // Triangulate through a common intermediate
    for code in TRIANGULATION_CODES {
        let mid = Ustr::from(code);
        if mid == from || mid == to {
            continue;
        }
        if let (Some(leg1), Some(leg2)) = (direct(from, mid), direct(mid, to)) {
            return Ok(leg1? * leg2?);
        }
    }

    Err(XRateError::NoConversionPath {
        from: from_currency,
        to: to_currency,
    })
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn rates() -> HashMap<(Ustr, Ustr), f64> {
        let mut rates = HashMap::new();
        rates.insert((Ustr::from("BTC"), Ustr::from("USDT")), 50_000.0);
        rates.insert((Ustr::from("ETH"), Ustr::from("USDT")), 2_500.0);
        rates.insert((Ustr::from("EUR"), Ustr::from("USD")), 1.10);
        rates
    }

    #[rstest]
    fn test_identity() {
        let rate = get_exchange_rate(Currency::USD(), Currency::USD(), &rates()).unwrap();
        assert_eq!(rate, 1.0);
    }

    #[rstest]
    fn test_direct_and_inverse() {
        let rates = rates();
        assert_eq!(
            get_exchange_rate(Currency::BTC(), Currency::USDT(), &rates).unwrap(),
            50_000.0
        );
        assert_eq!(
            get_exchange_rate(Currency::USDT(), Currency::BTC(), &rates).unwrap(),
            1.0 / 50_000.0
        );
    }

    #[rstest]
    fn test_triangulation_through_usdt() {
        // ETH -> USDT -> BTC
        let rate = get_exchange_rate(Currency::ETH(), Currency::BTC(), &rates()).unwrap();
        assert!((rate - 0.05).abs() < 1e-12);
    }

    #[rstest]
    fn test_no_path_is_typed_error() {
        let result = get_exchange_rate(Currency::JPY(), Currency::BTC(), &rates());
        assert_eq!(
            result,
            Err(XRateError::NoConversionPath {
                from: Currency::JPY(),
                to: Currency::BTC(),
            })
        );
    }

    #[rstest]
    fn test_invalid_rate_rejected() {
        let mut rates = rates();
        rates.insert((Ustr::from("XRP"), Ustr::from("USDT")), 0.0);
        let result = get_exchange_rate(Currency::from("XRP"), Currency::USDT(), &rates);
        assert!(matches!(result, Err(XRateError::InvalidRate(_, _))));
    }
}
