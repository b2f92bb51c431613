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

//! Instrument definitions for the trading domain model.
//!
//! Instruments are immutable metadata: increments, precisions, multiplier,
//! lot size, fees, min/max constraints, and lifecycle timestamps. Instruments
//! must be written to the cache before any market data referencing them is
//! ingested.

pub mod crypto_perpetual;
pub mod currency_pair;
pub mod futures_contract;
pub mod stubs;

use argo_core::UnixNanos;
pub use crypto_perpetual::CryptoPerpetual;
pub use currency_pair::CurrencyPair;
pub use futures_contract::FuturesContract;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    enums::InstrumentClass,
    identifiers::{InstrumentId, Symbol},
    types::{Currency, Money, Price, Quantity},
};

/// The instrument classes which can expire or activate.
pub const EXPIRING_INSTRUMENT_CLASSES: [InstrumentClass; 1] = [InstrumentClass::Future];

/// A tradable instrument with immutable venue metadata.
pub trait Instrument {
    /// Returns the instrument ID.
    fn id(&self) -> InstrumentId;
    /// Returns the raw venue symbol.
    fn raw_symbol(&self) -> Symbol;
    /// Returns the instrument class.
    fn instrument_class(&self) -> InstrumentClass;
    /// Returns the base currency, if applicable.
    fn base_currency(&self) -> Option<Currency>;
    /// Returns the quote currency.
    fn quote_currency(&self) -> Currency;
    /// Returns the settlement currency.
    fn settlement_currency(&self) -> Currency;
    /// Returns whether the instrument is inverse (quantity denominated in quote).
    fn is_inverse(&self) -> bool;
    /// Returns the price decimal precision.
    fn price_precision(&self) -> u8;
    /// Returns the size decimal precision.
    fn size_precision(&self) -> u8;
    /// Returns the minimum price increment (tick size).
    fn price_increment(&self) -> Price;
    /// Returns the minimum size increment.
    fn size_increment(&self) -> Quantity;
    /// Returns the contract multiplier.
    fn multiplier(&self) -> Quantity;
    /// Returns the rounded lot size, if constrained.
    fn lot_size(&self) -> Option<Quantity>;
    /// Returns the minimum order quantity, if constrained.
    fn min_quantity(&self) -> Option<Quantity>;
    /// Returns the maximum order quantity, if constrained.
    fn max_quantity(&self) -> Option<Quantity>;
    /// Returns the minimum order notional, if constrained.
    fn min_notional(&self) -> Option<Money>;
    /// Returns the maximum order notional, if constrained.
    fn max_notional(&self) -> Option<Money>;
    /// Returns the maker fee rate.
    fn maker_fee(&self) -> Decimal;
    /// Returns the taker fee rate.
    fn taker_fee(&self) -> Decimal;
    /// Returns the initial margin ratio.
    fn margin_init(&self) -> Decimal;
    /// Returns the maintenance margin ratio.
    fn margin_maint(&self) -> Decimal;
    /// Returns the activation timestamp, if the instrument activates.
    fn activation_ns(&self) -> Option<UnixNanos>;
    /// Returns the expiration timestamp, if the instrument expires.
    fn expiration_ns(&self) -> Option<UnixNanos>;
    /// UNIX timestamp (nanoseconds) when the instance was initialized.
    fn ts_init(&self) -> UnixNanos;

    /// Creates a new [`Price`] value at the instrument price precision.
    fn make_price(&self, value: f64) -> Price {
        Price::new(value, self.price_precision())
    }

    /// Creates a new [`Quantity`] value at the instrument size precision.
    fn make_qty(&self, value: f64) -> Quantity {
        Quantity::new(value, self.size_precision())
    }

    /// Calculates the notional value of the given quantity at the given price.
    ///
    /// For inverse instruments the value is returned in the base currency.
    fn calculate_notional_value(&self, quantity: Quantity, price: Price) -> Money {
        if self.is_inverse() {
            let amount =
                quantity.as_f64() * self.multiplier().as_f64() * (1.0 / price.as_f64());
            Money::new(
                amount,
                self.base_currency().unwrap_or_else(|| self.quote_currency()),
            )
        } else {
            let amount = quantity.as_f64() * self.multiplier().as_f64() * price.as_f64();
            Money::new(amount, self.quote_currency())
        }
    }
}

/// A sum type covering all instrument definitions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InstrumentAny {
    CryptoPerpetual(CryptoPerpetual),
    CurrencyPair(CurrencyPair),
    FuturesContract(FuturesContract),
}

macro_rules! delegate {
    ($self:expr, $instrument:ident, $body:expr) => {
        match $self {
            InstrumentAny::CryptoPerpetual($instrument) => $body,
            InstrumentAny::CurrencyPair($instrument) => $body,
            InstrumentAny::FuturesContract($instrument) => $body,
        }
    };
}

impl Instrument for InstrumentAny {
    fn id(&self) -> InstrumentId {
        delegate!(self, instrument, instrument.id())
    }

    fn raw_symbol(&self) -> Symbol {
        delegate!(self, instrument, instrument.raw_symbol())
    }

    fn instrument_class(&self) -> InstrumentClass {
        delegate!(self, instrument, instrument.instrument_class())
    }

    fn base_currency(&self) -> Option<Currency> {
        delegate!(self, instrument, instrument.base_currency())
    }

    fn quote_currency(&self) -> Currency {
        delegate!(self, instrument, instrument.quote_currency())
    }

    fn settlement_currency(&self) -> Currency {
        delegate!(self, instrument, instrument.settlement_currency())
    }

    fn is_inverse(&self) -> bool {
        delegate!(self, instrument, instrument.is_inverse())
    }

    fn price_precision(&self) -> u8 {
        delegate!(self, instrument, instrument.price_precision())
    }

    fn size_precision(&self) -> u8 {
        delegate!(self, instrument, instrument.size_precision())
    }

    fn price_increment(&self) -> Price {
        delegate!(self, instrument, instrument.price_increment())
    }

    fn size_increment(&self) -> Quantity {
        delegate!(self, instrument, instrument.size_increment())
    }

    fn multiplier(&self) -> Quantity {
        delegate!(self, instrument, instrument.multiplier())
    }

    fn lot_size(&self) -> Option<Quantity> {
        delegate!(self, instrument, instrument.lot_size())
    }

    fn min_quantity(&self) -> Option<Quantity> {
        delegate!(self, instrument, instrument.min_quantity())
    }

    fn max_quantity(&self) -> Option<Quantity> {
        delegate!(self, instrument, instrument.max_quantity())
    }

    fn min_notional(&self) -> Option<Money> {
        delegate!(self, instrument, instrument.min_notional())
    }

    fn max_notional(&self) -> Option<Money> {
        delegate!(self, instrument, instrument.max_notional())
    }

    fn maker_fee(&self) -> Decimal {
        delegate!(self, instrument, instrument.maker_fee())
    }

    fn taker_fee(&self) -> Decimal {
        delegate!(self, instrument, instrument.taker_fee())
    }

    fn margin_init(&self) -> Decimal {
        delegate!(self, instrument, instrument.margin_init())
    }

    fn margin_maint(&self) -> Decimal {
        delegate!(self, instrument, instrument.margin_maint())
    }

    fn activation_ns(&self) -> Option<UnixNanos> {
        delegate!(self, instrument, instrument.activation_ns())
    }

    fn expiration_ns(&self) -> Option<UnixNanos> {
        delegate!(self, instrument, instrument.expiration_ns())
    }

    fn ts_init(&self) -> UnixNanos {
        delegate!(self, instrument, instrument.ts_init())
    }
}

impl InstrumentAny {
    /// Returns the instrument ID.
    #[must_use]
    pub fn id(&self) -> InstrumentId {
        Instrument::id(self)
    }
}
