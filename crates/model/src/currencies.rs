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

//! Defines established currency constants and an internal currency map.

use std::{
    collections::HashMap,
    sync::{LazyLock, Mutex},
};

use ustr::Ustr;

use crate::{enums::CurrencyType, types::Currency};

#[must_use]
fn currency(code: &str, precision: u8, iso4217: u16, name: &str, t: CurrencyType) -> Currency {
    Currency {
        code: Ustr::from(code),
        precision,
        iso4217,
        name: Ustr::from(name),
        currency_type: t,
    }
}

/// The global currency map, seeded with established fiat and crypto currencies.
pub static CURRENCY_MAP: LazyLock<Mutex<HashMap<String, Currency>>> =
    LazyLock::new(|| Mutex::new(seed_currency_map()));

fn seed_currency_map() -> HashMap<String, Currency> {
    let mut map = HashMap::new();
    for c in [
        // Fiat currencies
        currency("AUD", 2, 36, "Australian dollar", CurrencyType::Fiat),
        currency("BRL", 2, 986, "Brazilian real", CurrencyType::Fiat),
        currency("CAD", 2, 124, "Canadian dollar", CurrencyType::Fiat),
        currency("CHF", 2, 756, "Swiss franc", CurrencyType::Fiat),
        currency("CNY", 2, 156, "Chinese yuan", CurrencyType::Fiat),
        currency("EUR", 2, 978, "Euro", CurrencyType::Fiat),
        currency("GBP", 2, 826, "British pound", CurrencyType::Fiat),
        currency("HKD", 2, 344, "Hong Kong dollar", CurrencyType::Fiat),
        currency("JPY", 0, 392, "Japanese yen", CurrencyType::Fiat),
        currency("KRW", 0, 410, "South Korean won", CurrencyType::Fiat),
        currency("MXN", 2, 484, "Mexican peso", CurrencyType::Fiat),
        currency("NOK", 2, 578, "Norwegian krone", CurrencyType::Fiat),
        currency("NZD", 2, 554, "New Zealand dollar", CurrencyType::Fiat),
        currency("SEK", 2, 752, "Swedish krona", CurrencyType::Fiat),
        currency("SGD", 2, 702, "Singapore dollar", CurrencyType::Fiat),
        currency("USD", 2, 840, "United States dollar", CurrencyType::Fiat),
        // Crypto currencies
        currency("ADA", 6, 0, "Cardano", CurrencyType::Crypto),
        currency("BNB", 8, 0, "Binance Coin", CurrencyType::Crypto),
        currency("BTC", 8, 0, "Bitcoin", CurrencyType::Crypto),
        currency("DOGE", 8, 0, "Dogecoin", CurrencyType::Crypto),
        currency("DOT", 8, 0, "Polkadot", CurrencyType::Crypto),
        currency("ETH", 8, 0, "Ethereum", CurrencyType::Crypto),
        currency("SOL", 8, 0, "Solana", CurrencyType::Crypto),
        currency("USDC", 8, 0, "USD Coin", CurrencyType::Crypto),
        currency("USDT", 8, 0, "Tether", CurrencyType::Crypto),
        currency("XRP", 6, 0, "Ripple", CurrencyType::Crypto),
    ] {
        map.insert(c.code.to_string(), c);
    }
    map
}

#[allow(non_snake_case)]
impl Currency {
    /// Returns the `AUD` (Australian dollar) currency.
    pub fn AUD() -> Self {
        Self::from("AUD")
    }

    /// Returns the `BTC` (Bitcoin) currency.
    pub fn BTC() -> Self {
        Self::from("BTC")
    }

    /// Returns the `ETH` (Ethereum) currency.
    pub fn ETH() -> Self {
        Self::from("ETH")
    }

    /// Returns the `EUR` (Euro) currency.
    pub fn EUR() -> Self {
        Self::from("EUR")
    }

    /// Returns the `GBP` (British pound) currency.
    pub fn GBP() -> Self {
        Self::from("GBP")
    }

    /// Returns the `JPY` (Japanese yen) currency.
    pub fn JPY() -> Self {
        Self::from("JPY")
    }

    /// Returns the `USD` (United States dollar) currency.
    pub fn USD() -> Self {
        Self::from("USD")
    }

    /// Returns the `USDC` (USD Coin) currency.
    pub fn USDC() -> Self {
        Self::from("USDC")
    }

    /// Returns the `USDT` (Tether) currency.
    pub fn USDT() -> Self {
        Self::from("USDT")
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
    fn test_seeded_constants() {
        assert_eq!(Currency::USD().iso4217, 840);
        assert_eq!(Currency::JPY().precision, 0);
        assert_eq!(Currency::BTC().currency_type, CurrencyType::Crypto);
    }
}
