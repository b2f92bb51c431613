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

//! A `CashAccount` for unleveraged cash assets.

use serde::{Deserialize, Serialize};

use crate::{
    accounts::AccountCore,
    enums::{OrderSide, OrderSideSpecified},
    events::{AccountState, OrderFilled},
    instruments::{Instrument, InstrumentAny},
    types::{Money, Price, Quantity},
};

/// Represents a cash account with unleveraged assets.
///
/// Invariant: `free = total - locked` and never negative once the account is
/// correctly initialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashAccount {
    /// The common account state.
    pub core: AccountCore,
}

impl CashAccount {
    /// Creates a new [`CashAccount`] instance from the initial state event.
    #[must_use]
    pub fn new(event: AccountState, calculate_account_state: bool) -> Self {
        Self {
            core: AccountCore::new(event, calculate_account_state),
        }
    }

    /// Calculates the balance locked for an order of the given parameters.
    ///
    /// For a BUY the quote notional is locked; for a SELL the base quantity
    /// (or quote notional when no base currency exists) is locked.
    #[must_use]
    pub fn calculate_balance_locked(
        &self,
        instrument: &InstrumentAny,
        side: OrderSideSpecified,
        quantity: Quantity,
        price: Price,
    ) -> Money {
        let notional = instrument.calculate_notional_value(quantity, price);
        match side {
            OrderSideSpecified::Buy => notional,
            OrderSideSpecified::Sell => match instrument.base_currency() {
                Some(base_currency) => Money::new(quantity.as_f64(), base_currency),
                None => notional,
            },
        }
    }

    /// Calculates the per-currency balance deltas produced by the given fill
    /// (excluding commission, which is applied separately).
    #[must_use]
    pub fn calculate_pnls(&self, instrument: &InstrumentAny, fill: &OrderFilled) -> Vec<Money> {
        let Some(base_currency) = instrument.base_currency() else {
            return Vec::new(); // Settlement handled via realized position PnL
        };

        let quantity = fill.last_qty.as_f64();
        let notional = fill.last_px.as_f64() * quantity;
        let quote_currency = instrument.quote_currency();

        match fill.order_side {
            OrderSide::Buy => vec![
                Money::new(quantity, base_currency),
                Money::new(-notional, quote_currency),
            ],
            OrderSide::Sell => vec![
                Money::new(-quantity, base_currency),
                Money::new(notional, quote_currency),
            ],
            OrderSide::NoOrderSide => panic!("Fill side was `NoOrderSide`"),
        }
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
        enums::{AccountType, LiquiditySide, OrderType},
        identifiers::{
            AccountId, ClientOrderId, PositionId, StrategyId, TradeId, TraderId, VenueOrderId,
        },
        instruments::stubs::currency_pair_ethusdt,
        types::{AccountBalance, Currency},
    };

    fn cash_account() -> CashAccount {
        CashAccount::new(
            AccountState::new(
                AccountId::new("BINANCE-001"),
                AccountType::Cash,
                None,
                vec![
                    AccountBalance::from_total(Money::from("100000.00000000 USDT")),
                    AccountBalance::from_total(Money::from("10.00000000 ETH")),
                ],
                vec![],
                true,
                UUID4::new(),
                UnixNanos::default(),
                UnixNanos::default(),
            ),
            true,
        )
    }

    fn fill(side: OrderSide, qty: &str, px: &str) -> OrderFilled {
        OrderFilled {
            trader_id: TraderId::default(),
            strategy_id: StrategyId::default(),
            instrument_id: currency_pair_ethusdt().id(),
            client_order_id: ClientOrderId::default(),
            venue_order_id: VenueOrderId::new("V-1"),
            account_id: AccountId::new("BINANCE-001"),
            trade_id: TradeId::new("T-1"),
            order_side: side,
            order_type: OrderType::Market,
            last_qty: Quantity::from(qty),
            last_px: Price::from(px),
            currency: Currency::USDT(),
            liquidity_side: LiquiditySide::Taker,
            event_id: UUID4::new(),
            ts_event: UnixNanos::default(),
            ts_init: UnixNanos::default(),
            reconciliation: false,
            position_id: Some(PositionId::new("P-1")),
            commission: None,
        }
    }

    #[rstest]
    fn test_calculate_balance_locked_buy() {
        let account = cash_account();
        let instrument = currency_pair_ethusdt();
        let locked = account.calculate_balance_locked(
            &instrument,
            OrderSideSpecified::Buy,
            Quantity::from("2.000"),
            Price::from("2500.00"),
        );
        assert_eq!(locked, Money::new(5000.0, Currency::USDT()));
    }

    #[rstest]
    fn test_calculate_balance_locked_sell() {
        let account = cash_account();
        let instrument = currency_pair_ethusdt();
        let locked = account.calculate_balance_locked(
            &instrument,
            OrderSideSpecified::Sell,
            Quantity::from("2.000"),
            Price::from("2500.00"),
        );
        assert_eq!(locked, Money::new(2.0, Currency::ETH()));
    }

    #[rstest]
    fn test_calculate_pnls_buy() {
        let account = cash_account();
        let instrument = currency_pair_ethusdt();
        let pnls = account.calculate_pnls(&instrument, &fill(OrderSide::Buy, "2.000", "2500.00"));

        assert_eq!(pnls.len(), 2);
        assert_eq!(pnls[0], Money::new(2.0, Currency::ETH()));
        assert_eq!(pnls[1], Money::new(-5000.0, Currency::USDT()));
    }

    #[rstest]
    fn test_calculate_pnls_sell() {
        let account = cash_account();
        let instrument = currency_pair_ethusdt();
        let pnls = account.calculate_pnls(&instrument, &fill(OrderSide::Sell, "2.000", "2500.00"));

        assert_eq!(pnls[0], Money::new(-2.0, Currency::ETH()));
        assert_eq!(pnls[1], Money::new(5000.0, Currency::USDT()));
    }
}
