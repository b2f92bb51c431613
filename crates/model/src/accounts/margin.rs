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

//! A `MarginAccount` which facilitates trading on margin.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{
    accounts::AccountCore,
    events::AccountState,
    identifiers::InstrumentId,
    instruments::{Instrument, InstrumentAny},
    types::{MarginBalance, Money, Price, Quantity},
};

/// Represents a margin account, using account assets as collateral.
///
/// Tracks initial and maintenance margin per instrument, recomputed from
/// positions on every fill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarginAccount {
    /// The common account state.
    pub core: AccountCore,
    /// The leverages per instrument.
    pub leverages: HashMap<InstrumentId, f64>,
    /// The default account leverage.
    pub default_leverage: f64,
    /// The margin balances per instrument.
    pub margins: HashMap<InstrumentId, MarginBalance>,
}

impl MarginAccount {
    /// Creates a new [`MarginAccount`] instance from the initial state event.
    #[must_use]
    pub fn new(event: AccountState, calculate_account_state: bool) -> Self {
        let mut margins = HashMap::new();
        for margin in &event.margins {
            margins.insert(margin.instrument_id, *margin);
        }
        Self {
            core: AccountCore::new(event, calculate_account_state),
            leverages: HashMap::new(),
            default_leverage: 1.0,
            margins,
        }
    }

    /// Sets the default account leverage.
    ///
    /// # Panics
    ///
    /// Panics if `leverage` is not >= 1.0.
    pub fn set_default_leverage(&mut self, leverage: f64) {
        assert!(leverage >= 1.0, "`leverage` must be >= 1.0");
        self.default_leverage = leverage;
    }

    /// Sets the leverage for the given instrument.
    ///
    /// # Panics
    ///
    /// Panics if `leverage` is not >= 1.0.
    pub fn set_leverage(&mut self, instrument_id: InstrumentId, leverage: f64) {
        assert!(leverage >= 1.0, "`leverage` must be >= 1.0");
        self.leverages.insert(instrument_id, leverage);
    }

    /// Returns the leverage for the given instrument (or the default).
    #[must_use]
    pub fn leverage(&self, instrument_id: &InstrumentId) -> f64 {
        self.leverages
            .get(instrument_id)
            .copied()
            .unwrap_or(self.default_leverage)
    }

    /// Returns the margin balance for the given instrument, if tracked.
    #[must_use]
    pub fn margin(&self, instrument_id: &InstrumentId) -> Option<&MarginBalance> {
        self.margins.get(instrument_id)
    }

    /// Calculates the initial (order) margin for the given parameters.
    #[must_use]
    pub fn calculate_initial_margin(
        &self,
        instrument: &InstrumentAny,
        quantity: Quantity,
        price: Price,
    ) -> Money {
        let notional = instrument.calculate_notional_value(quantity, price);
        let margin_ratio = instrument.margin_init().to_f64().unwrap_or(0.0);
        let leverage = self.leverage(&instrument.id());
        Money::new(notional.as_f64() * margin_ratio / leverage, notional.currency)
    }

    /// Calculates the maintenance (position) margin for the given parameters.
    #[must_use]
    pub fn calculate_maintenance_margin(
        &self,
        instrument: &InstrumentAny,
        quantity: Quantity,
        price: Price,
    ) -> Money {
        let notional = instrument.calculate_notional_value(quantity, price);
        let margin_ratio = instrument.margin_maint().to_f64().unwrap_or(0.0);
        let leverage = self.leverage(&instrument.id());
        Money::new(notional.as_f64() * margin_ratio / leverage, notional.currency)
    }

    /// Updates the margin balance for the given instrument.
    pub fn update_margin(&mut self, margin: MarginBalance) {
        self.margins.insert(margin.instrument_id, margin);
    }

    /// Removes the margin balance for the given instrument (position closed).
    pub fn clear_margin(&mut self, instrument_id: &InstrumentId) {
        self.margins.remove(instrument_id);
    }

    /// Returns the total initial margin across all instruments, in the given currency.
    #[must_use]
    pub fn initial_margins_total(&self) -> f64 {
        self.margins.values().map(|m| m.initial.as_f64()).sum()
    }

    /// Returns the total maintenance margin across all instruments.
    #[must_use]
    pub fn maintenance_margins_total(&self) -> f64 {
        self.margins.values().map(|m| m.maintenance.as_f64()).sum()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_core::{UUID4, UnixNanos};
    use rstest::rstest;

    use super::*;
    use crate::{
        enums::AccountType,
        identifiers::AccountId,
        instruments::stubs::crypto_perpetual_btcusdt,
        types::{AccountBalance, Currency},
    };

    fn margin_account() -> MarginAccount {
        MarginAccount::new(
            AccountState::new(
                AccountId::new("BINANCE-001"),
                AccountType::Margin,
                Some(Currency::USDT()),
                vec![AccountBalance::from_total(Money::from(
                    "100000.00000000 USDT",
                ))],
                vec![],
                true,
                UUID4::new(),
                UnixNanos::default(),
                UnixNanos::default(),
            ),
            true,
        )
    }

    #[rstest]
    fn test_calculate_initial_margin() {
        let account = margin_account();
        let instrument = crypto_perpetual_btcusdt();
        // notional = 1.0 * 50000 = 50000; margin_init = 1% => 500
        let margin = account.calculate_initial_margin(
            &instrument,
            Quantity::from("1.000"),
            Price::from("50000.00"),
        );
        assert_eq!(margin, Money::new(500.0, Currency::USDT()));
    }

    #[rstest]
    fn test_leverage_scales_margin() {
        let mut account = margin_account();
        let instrument = crypto_perpetual_btcusdt();
        account.set_leverage(instrument.id(), 10.0);

        let margin = account.calculate_initial_margin(
            &instrument,
            Quantity::from("1.000"),
            Price::from("50000.00"),
        );
        assert_eq!(margin, Money::new(50.0, Currency::USDT()));
    }

    #[rstest]
    fn test_update_and_clear_margin() {
        let mut account = margin_account();
        let instrument = crypto_perpetual_btcusdt();
        let margin = MarginBalance::new(
            Money::new(500.0, Currency::USDT()),
            Money::new(250.0, Currency::USDT()),
            instrument.id(),
        );
        account.update_margin(margin);
        assert_eq!(account.initial_margins_total(), 500.0);
        assert_eq!(account.maintenance_margins_total(), 250.0);

        account.clear_margin(&instrument.id());
        assert!(account.margin(&instrument.id()).is_none());
    }
}
