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

//! Represents a medium of exchange in a specified denomination with a fixed decimal precision.

use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    str::FromStr,
};

use argo_core::correctness::{FAILED, check_valid_string};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ustr::Ustr;

use crate::{currencies::CURRENCY_MAP, enums::CurrencyType, types::fixed::check_fixed_precision};

/// Represents a medium of exchange in a specified denomination with a fixed
/// decimal precision.
#[repr(C)]
#[derive(Clone, Copy, Eq)]
pub struct Currency {
    /// The currency code (ISO 4217 or crypto symbol).
    pub code: Ustr,
    /// The currency decimal precision.
    pub precision: u8,
    /// The ISO 4217 currency code number (zero for crypto assets).
    pub iso4217: u16,
    /// The full name of the currency.
    pub name: Ustr,
    /// The currency type (CRYPTO, FIAT or COMMODITY_BACKED).
    pub currency_type: CurrencyType,
}

impl Currency {
    /// Creates a new [`Currency`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// This function returns an error:
    /// - If `code` or `name` are not valid strings.
    /// - If `precision` is invalid for fixed-point arithmetic.
    pub fn new_checked<T: AsRef<str>>(
        code: T,
        precision: u8,
        iso4217: u16,
        name: T,
        currency_type: CurrencyType,
    ) -> anyhow::Result<Self> {
        let code = code.as_ref();
        let name = name.as_ref();
        check_valid_string(code, stringify!(code))?;
        check_valid_string(name, stringify!(name))?;
        check_fixed_precision(precision)?;

        Ok(Self {
            code: Ustr::from(code),
            precision,
            iso4217,
            name: Ustr::from(name),
            currency_type,
        })
    }

    /// Creates a new [`Currency`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    pub fn new<T: AsRef<str>>(
        code: T,
        precision: u8,
        iso4217: u16,
        name: T,
        currency_type: CurrencyType,
    ) -> Self {
        Self::new_checked(code, precision, iso4217, name, currency_type).expect(FAILED)
    }

    /// Registers the given `currency` in the internal currency map, enabling
    /// subsequent lookup via [`Currency::from_str`].
    ///
    /// Existing registrations are only replaced when `overwrite` is true.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal map lock is poisoned.
    pub fn register(currency: Self, overwrite: bool) -> anyhow::Result<()> {
        let mut map = CURRENCY_MAP
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire `CURRENCY_MAP` lock: {e}"))?;

        if !overwrite && map.contains_key(currency.code.as_str()) {
            return Ok(());
        }

        map.insert(currency.code.to_string(), currency);
        Ok(())
    }

    /// Returns whether this is a fiat currency.
    #[must_use]
    pub fn is_fiat(&self) -> bool {
        self.currency_type == CurrencyType::Fiat
    }

    /// Returns whether this is a crypto currency.
    #[must_use]
    pub fn is_crypto(&self) -> bool {
        self.currency_type == CurrencyType::Crypto
    }
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Hash for Currency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl Debug for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(code={}, precision={}, currency_type={})",
            stringify!(Currency),
            self.code,
            self.precision,
            self.currency_type,
        )
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let map_guard = CURRENCY_MAP
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire `CURRENCY_MAP` lock: {e}"))?;
        map_guard
            .get(s)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Unknown currency code: '{s}'"))
    }
}

impl From<&str> for Currency {
    /// Creates a [`Currency`] from a string by registry lookup.
    ///
    /// # Panics
    ///
    /// Panics if the currency code is unknown.
    fn from(value: &str) -> Self {
        Self::from_str(value).expect(FAILED)
    }
}

impl Serialize for Currency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code.as_str())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let currency_str = String::deserialize(deserializer)?;
        Self::from_str(&currency_str).map_err(serde::de::Error::custom)
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
    fn test_registry_lookup() {
        let usd = Currency::from("USD");
        assert_eq!(usd.code.as_str(), "USD");
        assert_eq!(usd.precision, 2);
        assert!(usd.is_fiat());

        let btc = Currency::from("BTC");
        assert_eq!(btc.precision, 8);
        assert!(btc.is_crypto());
    }

    #[rstest]
    fn test_unknown_code() {
        assert!(Currency::from_str("ZZZ").is_err());
    }

    #[rstest]
    fn test_register_custom() {
        let currency = Currency::new("ZRG", 4, 0, "Zorgon", CurrencyType::Crypto);
        Currency::register(currency, false).unwrap();
        assert_eq!(Currency::from("ZRG"), currency);
    }

    #[rstest]
    fn test_equality_is_by_code() {
        assert_eq!(Currency::from("USD"), Currency::from("USD"));
        assert_ne!(Currency::from("USD"), Currency::from("EUR"));
    }

    #[rstest]
    fn test_serde_round_trip() {
        let currency = Currency::from("USDT");
        let json = serde_json::to_string(&currency).unwrap();
        assert_eq!(json, "\"USDT\"");
        let deserialized: Currency = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, currency);
    }
}
