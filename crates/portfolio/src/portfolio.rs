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

//! The `Portfolio` facade for all environments.
//!
//! On every fill the account for the client's venue is updated: CASH accounts
//! adjust currency balances directly, MARGIN accounts recompute per-instrument
//! initial/maintenance margin from open positions. Provides PnL and exposure
//! queries against cached market data, and timed position snapshots.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use argo_common::{
    cache::Cache,
    clock::Clock,
    msgbus::{self, switchboard},
    xrate::{XRateError, get_exchange_rate},
};
use argo_core::UUID4;
use argo_model::{
    accounts::AccountAny,
    enums::PriceType,
    events::{AccountState, OrderFilled},
    identifiers::{InstrumentId, Venue},
    instruments::{Instrument, InstrumentAny},
    position::Position,
    types::{AccountBalance, Currency, MarginBalance, Money, Price},
};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

/// Configuration for `Portfolio` instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// If marks use the last trade price (otherwise the quote mid).
    pub mark_from_last: bool,
    /// The interval (seconds) between position snapshot captures (`None` disables).
    pub snapshot_positions_interval_secs: Option<u64>,
}

impl Default for PortfolioConfig {
    /// Creates a new default [`PortfolioConfig`] instance.
    fn default() -> Self {
        Self {
            mark_from_last: false,
            snapshot_positions_interval_secs: None,
        }
    }
}

/// Provides a portfolio of positions and account state for all environments.
pub struct Portfolio {
    clock: Rc<RefCell<dyn Clock>>,
    cache: Rc<RefCell<Cache>>,
    config: PortfolioConfig,
}

impl Portfolio {
    /// Creates a new [`Portfolio`] instance.
    #[must_use]
    pub fn new(
        clock: Rc<RefCell<dyn Clock>>,
        cache: Rc<RefCell<Cache>>,
        config: Option<PortfolioConfig>,
    ) -> Self {
        Self {
            clock,
            cache,
            config: config.unwrap_or_default(),
        }
    }

    // -- ACCOUNT UPDATES -------------------------------------------------------------------------

    /// Updates the venue account for the given fill, publishing the new
    /// account state.
    pub fn update_account_from_fill(&mut self, fill: &OrderFilled) {
        let venue = fill.instrument_id.venue;
        let (account, instrument) = {
            let cache = self.cache.borrow();
            let Some(account) = cache.account_for_venue(&venue).cloned() else {
                log::error!("Cannot update account: no account found for venue {venue}");
                return;
            };
            let Some(instrument) = cache.instrument(&fill.instrument_id).cloned() else {
                log::error!(
                    "Cannot update account: no instrument found for {}",
                    fill.instrument_id,
                );
                return;
            };
            (account, instrument)
        };

        let updated = match account {
            AccountAny::Cash(_) => self.apply_cash_fill(account, &instrument, fill),
            AccountAny::Margin(_) => self.apply_margin_fill(account, &instrument, fill),
        };

        let Some(mut updated) = updated else {
            return;
        };

        let ts_now = self.clock.borrow().timestamp_ns();
        let (balances, margins) = match &updated {
            AccountAny::Cash(cash) => (cash.core.balances.values().copied().collect(), vec![]),
            AccountAny::Margin(margin) => (
                margin.core.balances.values().copied().collect(),
                margin.margins.values().copied().collect(),
            ),
        };

        let event = AccountState::new(
            updated.id(),
            updated.account_type(),
            updated.base_currency(),
            balances,
            margins,
            false,
            UUID4::new(),
            fill.ts_event,
            ts_now,
        );
        updated.apply(event.clone());

        if let Err(e) = self.cache.borrow_mut().update_account(updated) {
            log::error!("Error updating account in cache: {e}");
            return;
        }

        let topic = switchboard::get_account_events_topic(event.account_id);
        msgbus::publish(&topic, &event);
    }

    /// Returns the position the fill applied to, via its position ID or the
    /// order index.
    fn position_for_fill(&self, fill: &OrderFilled) -> Option<Position> {
        let cache = self.cache.borrow();
        if let Some(position_id) = &fill.position_id {
            return cache.position(position_id).cloned();
        }
        cache.position_for_order(&fill.client_order_id).cloned()
    }

    fn apply_cash_fill(
        &self,
        mut account: AccountAny,
        instrument: &InstrumentAny,
        fill: &OrderFilled,
    ) -> Option<AccountAny> {
        let mut deltas: Vec<Money> = match &account {
            AccountAny::Cash(cash) => cash.calculate_pnls(instrument, fill),
            AccountAny::Margin(_) => return None,
        };

        // Settlement-style cash instruments realize PnL through positions;
        // the gross figure excludes commissions (applied per fill below)
        if deltas.is_empty() {
            if let Some(position) = self.position_for_fill(fill) {
                if position.is_closed() {
                    if let Some(realized) = position.realized_pnl_gross() {
                        deltas.push(realized);
                    }
                }
            }
        }

        if let Some(commission) = fill.commission {
            deltas.push(-commission);
        }

        for delta in deltas {
            if !self.apply_balance_delta(&mut account, delta) {
                return None;
            }
        }
        Some(account)
    }

    fn apply_margin_fill(
        &self,
        mut account: AccountAny,
        instrument: &InstrumentAny,
        fill: &OrderFilled,
    ) -> Option<AccountAny> {
        // Gross realized PnL on close, and commission per fill, adjust
        // balances directly (the gross figure avoids double-counting the
        // commissions already netted into the position)
        let mut deltas: Vec<Money> = Vec::new();
        if let Some(position) = self.position_for_fill(fill) {
            if position.is_closed() {
                if let Some(realized) = position.realized_pnl_gross() {
                    deltas.push(realized);
                }
            }
        }
        if let Some(commission) = fill.commission {
            deltas.push(-commission);
        }

        for delta in deltas {
            if !self.apply_balance_delta(&mut account, delta) {
                return None;
            }
        }

        // Recompute per-instrument margin from the open positions
        if let AccountAny::Margin(margin_account) = &mut account {
            let cache = self.cache.borrow();
            let open: Vec<&Position> = cache
                .positions_open(None, Some(&fill.instrument_id), None)
                .into_iter()
                .collect();

            if open.is_empty() {
                margin_account.clear_margin(&fill.instrument_id);
            } else {
                let mark = self
                    .mark_price(&fill.instrument_id)
                    .unwrap_or(fill.last_px);
                let total_qty: f64 = open.iter().map(|p| p.quantity.as_f64()).sum();
                let quantity =
                    argo_model::types::Quantity::new(total_qty, instrument.size_precision());
                let initial =
                    margin_account.calculate_initial_margin(instrument, quantity, mark);
                let maintenance =
                    margin_account.calculate_maintenance_margin(instrument, quantity, mark);
                margin_account.update_margin(MarginBalance::new(
                    initial,
                    maintenance,
                    fill.instrument_id,
                ));
            }
        }

        Some(account)
    }

    fn apply_balance_delta(&self, account: &mut AccountAny, delta: Money) -> bool {
        let core = account.core_mut();

        let delta = if core.base_currency.is_some_and(|base| base != delta.currency) {
            // Single-currency account: convert via the cached quote graph
            let base = core.base_currency.unwrap();
            match self.convert(delta, base) {
                Ok(converted) => converted,
                Err(e) => {
                    // A missing conversion is a typed error, never a silent zero
                    log::error!("Cannot update account balance: {e}");
                    return false;
                }
            }
        } else {
            delta
        };

        let current = core
            .balance(Some(delta.currency))
            .copied()
            .unwrap_or_else(|| AccountBalance::from_total(Money::zero(delta.currency)));

        let new_total = current.total + delta;
        let new_free = current.free + delta;
        if new_free.is_negative() && core.account_type == argo_model::enums::AccountType::Cash {
            log::error!(
                "CASH account balance for {} would be negative: {new_free}",
                delta.currency,
            );
        }

        core.update_balance(AccountBalance {
            currency: delta.currency,
            total: new_total,
            locked: current.locked,
            free: new_free,
        });
        true
    }

    fn convert(&self, money: Money, to: Currency) -> Result<Money, XRateError> {
        let rates = self.xrate_map();
        let rate = get_exchange_rate(money.currency, to, &rates)?;
        Ok(Money::new(money.as_f64() * rate, to))
    }

    /// Builds the direct pair rate map from cached instruments and quotes.
    fn xrate_map(&self) -> HashMap<(Ustr, Ustr), f64> {
        let cache = self.cache.borrow();
        let mut rates = HashMap::new();
        for instrument in cache.instruments(None) {
            let Some(base) = instrument.base_currency() else {
                continue;
            };
            let quote_currency = instrument.quote_currency();
            if let Some(quote) = cache.quote(&instrument.id()) {
                rates.insert(
                    (base.code, quote_currency.code),
                    quote.extract_price(PriceType::Mid).as_f64(),
                );
            }
        }
        rates
    }

    // -- QUERIES ---------------------------------------------------------------------------------

    /// Returns the mark price for the given instrument, if available.
    ///
    /// Mark is the last quote mid, or the last trade if configured.
    #[must_use]
    pub fn mark_price(&self, instrument_id: &InstrumentId) -> Option<Price> {
        let cache = self.cache.borrow();
        if self.config.mark_from_last {
            cache.price(instrument_id, PriceType::Last)
        } else {
            cache.price(instrument_id, PriceType::Mid)
        }
    }

    /// Returns the total unrealized PnL for the given instrument, if
    /// calculable from cached marks.
    #[must_use]
    pub fn unrealized_pnl(&self, instrument_id: &InstrumentId) -> Option<Money> {
        let mark = self.mark_price(instrument_id)?;
        let mark = {
            // Marks quantize to the instrument price precision
            let cache = self.cache.borrow();
            let instrument = cache.instrument(instrument_id)?;
            Price::new(mark.as_f64(), instrument.price_precision())
        };

        let cache = self.cache.borrow();
        let positions = cache.positions_open(None, Some(instrument_id), None);
        if positions.is_empty() {
            return None;
        }

        let mut total: Option<Money> = None;
        for position in positions {
            let pnl = position.unrealized_pnl(mark);
            total = Some(match total {
                Some(total) => total + pnl,
                None => pnl,
            });
        }
        total
    }

    /// Returns the total realized PnL for the given instrument.
    #[must_use]
    pub fn realized_pnl(&self, instrument_id: &InstrumentId) -> Option<Money> {
        let cache = self.cache.borrow();
        let mut total: Option<Money> = None;
        for position in cache.positions(None, Some(instrument_id), None) {
            if let Some(realized) = position.realized_pnl {
                total = Some(match total {
                    Some(total) => total + realized,
                    None => realized,
                });
            }
        }
        total
    }

    /// Returns the net exposure (mark notional of open positions) for the
    /// given instrument.
    #[must_use]
    pub fn net_exposure(&self, instrument_id: &InstrumentId) -> Option<Money> {
        let mark = self.mark_price(instrument_id)?;
        let cache = self.cache.borrow();
        let instrument = cache.instrument(instrument_id)?;
        let mark = Price::new(mark.as_f64(), instrument.price_precision());

        let positions = cache.positions_open(None, Some(instrument_id), None);
        if positions.is_empty() {
            return None;
        }

        let mut total = 0.0;
        for position in positions {
            total += position.notional_value(mark).as_f64();
        }
        Some(Money::new(total, instrument.quote_currency()))
    }

    /// Returns whether the portfolio is net long the given instrument.
    #[must_use]
    pub fn is_net_long(&self, instrument_id: &InstrumentId) -> bool {
        let cache = self.cache.borrow();
        cache
            .positions_open(None, Some(instrument_id), None)
            .iter()
            .map(|p| p.signed_qty)
            .sum::<f64>()
            > 0.0
    }

    /// Returns the net position quantity (signed) for the given instrument.
    #[must_use]
    pub fn net_position(&self, instrument_id: &InstrumentId) -> f64 {
        let cache = self.cache.borrow();
        cache
            .positions_open(None, Some(instrument_id), None)
            .iter()
            .map(|p| p.signed_qty)
            .sum()
    }

    /// Returns all open positions for the given venue.
    #[must_use]
    pub fn positions_open(&self, venue: Option<&Venue>) -> Vec<Position> {
        self.cache
            .borrow()
            .positions_open(venue, None, None)
            .into_iter()
            .cloned()
            .collect()
    }

    // -- SNAPSHOTS -------------------------------------------------------------------------------

    /// Captures serialized snapshots of all open positions (timer-driven for
    /// post-hoc equity curves).
    pub fn snapshot_positions(&mut self) {
        let snapshots: Vec<(argo_model::identifiers::PositionId, bytes::Bytes)> = {
            let cache = self.cache.borrow();
            cache
                .positions_open(None, None, None)
                .iter()
                .filter_map(|position| {
                    serde_json::to_vec(position)
                        .map(|encoded| (position.id, bytes::Bytes::from(encoded)))
                        .map_err(|e| log::error!("Failed to encode position snapshot: {e}"))
                        .ok()
                })
                .collect()
        };

        let mut cache = self.cache.borrow_mut();
        for (position_id, snapshot) in snapshots {
            cache.add_position_snapshot(position_id, snapshot);
        }
    }

    /// Returns the snapshot interval from configuration, if enabled.
    #[must_use]
    pub const fn snapshot_interval_secs(&self) -> Option<u64> {
        self.config.snapshot_positions_interval_secs
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_common::clock::TestClock;
    use argo_core::UnixNanos;
    use argo_model::{
        data::QuoteTick,
        enums::{AccountType, LiquiditySide, OrderSide, OrderType},
        identifiers::{AccountId, ClientOrderId, PositionId, StrategyId, TradeId, TraderId, VenueOrderId},
        instruments::stubs::{crypto_perpetual_btcusdt, currency_pair_ethusdt},
        types::Quantity,
    };
    use rstest::rstest;

    use super::*;

    fn setup() -> (Portfolio, Rc<RefCell<Cache>>) {
        let clock = Rc::new(RefCell::new(TestClock::new()));
        let cache = Rc::new(RefCell::new(Cache::default()));
        cache
            .borrow_mut()
            .add_instrument(currency_pair_ethusdt())
            .unwrap();
        cache
            .borrow_mut()
            .add_instrument(crypto_perpetual_btcusdt())
            .unwrap();

        let account = AccountAny::from_event(
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
        );
        cache.borrow_mut().add_account(account).unwrap();

        (Portfolio::new(clock, cache.clone(), None), cache)
    }

    fn buy_fill(qty: &str, px: &str) -> OrderFilled {
        OrderFilled {
            trader_id: TraderId::default(),
            strategy_id: StrategyId::default(),
            instrument_id: InstrumentId::from("ETHUSDT.BINANCE"),
            client_order_id: ClientOrderId::new("O-1"),
            venue_order_id: VenueOrderId::new("V-1"),
            account_id: AccountId::new("BINANCE-001"),
            trade_id: TradeId::new("T-1"),
            order_side: OrderSide::Buy,
            order_type: OrderType::Market,
            last_qty: Quantity::from(qty),
            last_px: Price::from(px),
            currency: Currency::USDT(),
            liquidity_side: LiquiditySide::Taker,
            event_id: UUID4::new(),
            ts_event: UnixNanos::from(1),
            ts_init: UnixNanos::from(1),
            reconciliation: false,
            position_id: Some(PositionId::new("P-1")),
            commission: Some(Money::new(2.0, Currency::USDT())),
        }
    }

    #[rstest]
    fn test_cash_fill_adjusts_both_currencies() {
        let (mut portfolio, cache) = setup();
        portfolio.update_account_from_fill(&buy_fill("2.000", "2500.00"));

        let cache = cache.borrow();
        let account = cache.account_for_venue(&Venue::new("BINANCE")).unwrap();
        // Bought 2 ETH for 5000 USDT plus 2 USDT commission
        assert_eq!(
            account.core().balance_total(Some(Currency::ETH())),
            Some(Money::from("12.00000000 ETH"))
        );
        assert_eq!(
            account.core().balance_total(Some(Currency::USDT())),
            Some(Money::from("94998.00000000 USDT"))
        );
    }

    #[rstest]
    fn test_unrealized_pnl_uses_quote_mid() {
        let (portfolio, cache) = setup();
        let instrument = crypto_perpetual_btcusdt();

        // Open LONG 1 @ 100
        let fill = OrderFilled {
            instrument_id: instrument.id(),
            last_px: Price::from("100.00"),
            last_qty: Quantity::from("1.000"),
            ..buy_fill("1.000", "100.00")
        };
        let position = Position::new(&instrument, fill);
        cache.borrow_mut().add_position(position).unwrap();

        // Mark mid = 105
        cache.borrow_mut().add_quote(QuoteTick::new(
            instrument.id(),
            Price::from("104.00"),
            Price::from("106.00"),
            Quantity::from("1.000"),
            Quantity::from("1.000"),
            UnixNanos::from(2),
            UnixNanos::from(2),
        ));

        let pnl = portfolio.unrealized_pnl(&instrument.id()).unwrap();
        assert_eq!(pnl, Money::new(5.0, Currency::USDT()));

        let exposure = portfolio.net_exposure(&instrument.id()).unwrap();
        assert_eq!(exposure, Money::new(105.0, Currency::USDT()));
        assert!(portfolio.is_net_long(&instrument.id()));
    }

    #[rstest]
    fn test_snapshot_positions() {
        let (mut portfolio, cache) = setup();
        let instrument = crypto_perpetual_btcusdt();
        let fill = OrderFilled {
            instrument_id: instrument.id(),
            ..buy_fill("1.000", "100.00")
        };
        let position = Position::new(&instrument, fill);
        let position_id = position.id;
        cache.borrow_mut().add_position(position).unwrap();

        portfolio.snapshot_positions();
        assert!(cache.borrow().position_snapshot(&position_id).is_some());
    }
}
