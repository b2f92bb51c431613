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

//! Instrument stubs for testing across the workspace.

use argo_core::UnixNanos;
use rust_decimal_macros::dec;
use ustr::Ustr;

use crate::{
    identifiers::{InstrumentId, Symbol},
    instruments::{CryptoPerpetual, CurrencyPair, FuturesContract, InstrumentAny},
    types::{Currency, Price, Quantity},
};

/// Returns a `BTCUSDT-PERP.BINANCE` perpetual swap instrument (price precision 2).
#[must_use]
pub fn crypto_perpetual_btcusdt() -> InstrumentAny {
    InstrumentAny::CryptoPerpetual(CryptoPerpetual::new(
        InstrumentId::from("BTCUSDT-PERP.BINANCE"),
        Symbol::new("BTCUSDT-PERP"),
        Currency::BTC(),
        Currency::USDT(),
        Currency::USDT(),
        false,
        2,
        3,
        Price::from("0.01"),
        Quantity::from("0.001"),
        dec!(0.0002),
        dec!(0.0004),
        dec!(0.01),
        dec!(0.005),
        UnixNanos::default(),
        UnixNanos::default(),
    ))
}

/// Returns an `ETHUSDT.BINANCE` spot currency pair instrument.
#[must_use]
pub fn currency_pair_ethusdt() -> InstrumentAny {
    InstrumentAny::CurrencyPair(CurrencyPair::new(
        InstrumentId::from("ETHUSDT.BINANCE"),
        Symbol::new("ETHUSDT"),
        Currency::ETH(),
        Currency::USDT(),
        2,
        3,
        Price::from("0.01"),
        Quantity::from("0.001"),
        dec!(0.001),
        dec!(0.001),
        UnixNanos::default(),
        UnixNanos::default(),
    ))
}

/// Returns a two-decimal prediction-market style pair for narrow-spread tests.
#[must_use]
pub fn currency_pair_low_priced() -> InstrumentAny {
    InstrumentAny::CurrencyPair(CurrencyPair::new(
        InstrumentId::from("YESNO.POLY"),
        Symbol::new("YESNO"),
        Currency::USDC(),
        Currency::USD(),
        2,
        0,
        Price::from("0.01"),
        Quantity::from(1_u64),
        dec!(0),
        dec!(0),
        UnixNanos::default(),
        UnixNanos::default(),
    ))
}

/// Returns a `6E.0.XCME` EUR/USD futures contract instrument.
#[must_use]
pub fn futures_contract_6e() -> InstrumentAny {
    InstrumentAny::FuturesContract(FuturesContract::new(
        InstrumentId::from("6E.0.XCME"),
        Symbol::new("6E.0"),
        Ustr::from("6E"),
        Currency::USD(),
        5,
        Price::from("0.00005"),
        Quantity::from(125_000_u64),
        UnixNanos::default(),
        UnixNanos::from(3_000_000_000_000_000_000), // Far future expiry
        UnixNanos::default(),
        UnixNanos::default(),
    ))
}
