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

//! Provides the `RiskEngine` pre-trade gate.
//!
//! Trading commands pass through the risk engine before reaching the
//! execution engine. Denied orders produce `OrderDenied` with a human reason
//! and never reach the execution client. Fully bypassable by configuration
//! for advanced users.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use argo_common::{
    cache::Cache,
    clock::Clock,
    messages::execution::TradingCommand,
    msgbus::{self, switchboard, switchboard::EXEC_ENGINE_EXECUTE},
};
use argo_core::UUID4;
use argo_model::{
    accounts::AccountAny,
    enums::PriceType,
    events::{OrderDenied, OrderEventAny},
    identifiers::InstrumentId,
    instruments::{Instrument, InstrumentAny},
    orders::Order,
    types::{Money, Price},
};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

/// Configuration for `RiskEngine` instances.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RiskEngineConfig {
    /// If all pre-trade checks are bypassed (advanced users only).
    pub bypass: bool,
    /// If leverage scaling applies to CASH balance checks.
    pub is_leverage: bool,
    /// The leverage factor applied when `is_leverage` is set.
    pub leverage: Option<f64>,
}

/// The pre-trade risk gate between strategies and the execution engine.
pub struct RiskEngine {
    clock: Rc<RefCell<dyn Clock>>,
    cache: Rc<RefCell<Cache>>,
    denylist: HashSet<InstrumentId>,
    config: RiskEngineConfig,
}

impl RiskEngine {
    /// Creates a new [`RiskEngine`] instance.
    #[must_use]
    pub fn new(
        clock: Rc<RefCell<dyn Clock>>,
        cache: Rc<RefCell<Cache>>,
        config: Option<RiskEngineConfig>,
    ) -> Self {
        Self {
            clock,
            cache,
            denylist: HashSet::new(),
            config: config.unwrap_or_default(),
        }
    }

    /// Adds the given instrument to the trading denylist.
    pub fn deny_instrument(&mut self, instrument_id: InstrumentId) {
        log::warn!("Denylisted instrument {instrument_id}");
        self.denylist.insert(instrument_id);
    }

    /// Removes the given instrument from the trading denylist.
    pub fn allow_instrument(&mut self, instrument_id: InstrumentId) {
        self.denylist.remove(&instrument_id);
    }

    /// Executes the given trading command, forwarding it to the execution
    /// engine when all pre-trade checks pass.
    pub fn execute(&self, command: TradingCommand) {
        if self.config.bypass {
            self.forward(command);
            return;
        }

        match &command {
            TradingCommand::SubmitOrder(cmd) => {
                if let Err(reason) = self.check_order(&cmd.order) {
                    self.deny_order(&cmd.order, &reason);
                    return;
                }
            }
            TradingCommand::SubmitOrderList(cmd) => {
                for order in &cmd.order_list.orders {
                    if let Err(reason) = self.check_order(order) {
                        for order in &cmd.order_list.orders {
                            self.deny_order(order, &reason);
                        }
                        return;
                    }
                }
            }
            // Modifications and cancels pass through
            _ => {}
        }

        self.forward(command);
    }

    fn forward(&self, command: TradingCommand) {
        msgbus::send(&Ustr::from(EXEC_ENGINE_EXECUTE), &command);
    }

    fn check_order(&self, order: &Order) -> Result<(), String> {
        if self.denylist.contains(&order.instrument_id) {
            return Err(format!("Instrument {} denylisted", order.instrument_id));
        }

        let cache = self.cache.borrow();
        let Some(instrument) = cache.instrument(&order.instrument_id) else {
            return Err(format!(
                "Instrument {} not found in the cache",
                order.instrument_id
            ));
        };

        self.check_precision(order, instrument)?;
        self.check_quantity_limits(order, instrument)?;
        self.check_balance(order, instrument, &cache)?;
        Ok(())
    }

    fn check_precision(&self, order: &Order, instrument: &InstrumentAny) -> Result<(), String> {
        if order.quantity.precision != instrument.size_precision() {
            return Err(format!(
                "Order quantity precision {} invalid for {} (expected {})",
                order.quantity.precision,
                instrument.id(),
                instrument.size_precision(),
            ));
        }

        for price in [order.price, order.trigger_price].into_iter().flatten() {
            if price.precision != instrument.price_precision() {
                return Err(format!(
                    "Order price precision {} invalid for {} (expected {})",
                    price.precision,
                    instrument.id(),
                    instrument.price_precision(),
                ));
            }
            if !price.is_positive() {
                return Err(format!("Order price {price} not positive"));
            }
        }
        Ok(())
    }

    fn check_quantity_limits(
        &self,
        order: &Order,
        instrument: &InstrumentAny,
    ) -> Result<(), String> {
        if let Some(min_quantity) = instrument.min_quantity() {
            if order.quantity < min_quantity {
                return Err(format!(
                    "Order quantity {} below minimum {min_quantity}",
                    order.quantity
                ));
            }
        }
        if let Some(max_quantity) = instrument.max_quantity() {
            if order.quantity > max_quantity {
                return Err(format!(
                    "Order quantity {} above maximum {max_quantity}",
                    order.quantity
                ));
            }
        }

        if let Some(price) = order.price {
            let notional = instrument.calculate_notional_value(order.quantity, price);
            if let Some(min_notional) = instrument.min_notional() {
                if notional.currency == min_notional.currency && notional < min_notional {
                    return Err(format!("Order notional {notional} below minimum {min_notional}"));
                }
            }
            if let Some(max_notional) = instrument.max_notional() {
                if notional.currency == max_notional.currency && notional > max_notional {
                    return Err(format!("Order notional {notional} above maximum {max_notional}"));
                }
            }
        }
        Ok(())
    }

    fn check_balance(
        &self,
        order: &Order,
        instrument: &InstrumentAny,
        cache: &Cache,
    ) -> Result<(), String> {
        let Some(account) = cache.account_for_venue(&order.instrument_id.venue) else {
            // No account yet (e.g. pre-seeded backtests): nothing to check
            return Ok(());
        };

        // The order price for notional purposes: limit, trigger, or mark
        let price = order
            .price
            .or(order.trigger_price)
            .or_else(|| cache.price(&order.instrument_id, PriceType::Mid))
            .or_else(|| cache.price(&order.instrument_id, PriceType::Last));
        let Some(price) = price else {
            return Ok(()); // No price available to evaluate notional
        };
        let price = Price::new(price.as_f64(), instrument.price_precision());

        match account {
            AccountAny::Cash(cash) => {
                let locked = cash.calculate_balance_locked(
                    instrument,
                    order.side_specified(),
                    order.quantity,
                    price,
                );
                let leverage = if self.config.is_leverage {
                    self.config.leverage.unwrap_or(1.0).max(1.0)
                } else {
                    1.0
                };
                let required = Money::new(locked.as_f64() / leverage, locked.currency);

                let free = cash.core.balance_free(Some(locked.currency));
                match free {
                    Some(free) if free >= required => Ok(()),
                    Some(free) => Err(format!(
                        "Insufficient free balance for order: required {required}, free {free}"
                    )),
                    None => Err(format!(
                        "No balance for required currency {}",
                        locked.currency
                    )),
                }
            }
            AccountAny::Margin(margin) => {
                let initial =
                    margin.calculate_initial_margin(instrument, order.quantity, price);
                let required = initial.as_f64() + margin.initial_margins_total();
                let free = margin.core.balance_free(Some(initial.currency));
                match free {
                    Some(free) if free.as_f64() >= required => Ok(()),
                    Some(free) => Err(format!(
                        "Insufficient margin for order: required {required:.2} {}, free {free}",
                        initial.currency,
                    )),
                    None => Err(format!(
                        "No balance for margin currency {}",
                        initial.currency
                    )),
                }
            }
        }
    }

    fn deny_order(&self, order: &Order, reason: &str) {
        log::warn!("Denied order {}: {reason}", order.client_order_id);
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::Denied(OrderDenied {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            reason: Ustr::from(reason),
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
        });

        // Denied orders surface to the owning strategy, never the client
        let topic = switchboard::get_order_events_topic(order.strategy_id);
        msgbus::publish(&topic, &event);
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
        accounts::AccountAny,
        enums::{AccountType, OrderSide, OrderType},
        events::{AccountState, order::OrderInitializedBuilder},
        identifiers::{AccountId, ClientOrderId},
        instruments::stubs::currency_pair_ethusdt,
        types::{AccountBalance, Currency, Quantity},
    };
    use rstest::rstest;

    use super::*;

    fn setup(balance: &str) -> RiskEngine {
        let clock = Rc::new(RefCell::new(TestClock::new()));
        let cache = Rc::new(RefCell::new(Cache::default()));
        cache
            .borrow_mut()
            .add_instrument(currency_pair_ethusdt())
            .unwrap();

        let account = AccountAny::from_event(
            AccountState::new(
                AccountId::new("BINANCE-001"),
                AccountType::Cash,
                None,
                vec![AccountBalance::from_total(Money::new(
                    balance.parse().unwrap(),
                    Currency::USDT(),
                ))],
                vec![],
                true,
                UUID4::new(),
                UnixNanos::default(),
                UnixNanos::default(),
            ),
            true,
        );
        cache.borrow_mut().add_account(account).unwrap();

        RiskEngine::new(clock, cache, None)
    }

    fn limit_order(qty: &str, price: &str) -> Order {
        Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-1"))
                .instrument_id(InstrumentId::from("ETHUSDT.BINANCE"))
                .order_side(OrderSide::Buy)
                .order_type(OrderType::Limit)
                .price(Some(Price::from(price)))
                .quantity(Quantity::from(qty))
                .build()
                .unwrap(),
        )
    }

    #[rstest]
    fn test_sufficient_balance_passes() {
        let engine = setup("10000.0");
        // 2 ETH @ 2500 = 5000 USDT notional <= 10000 free
        assert!(engine.check_order(&limit_order("2.000", "2500.00")).is_ok());
    }

    #[rstest]
    fn test_insufficient_balance_denied() {
        let engine = setup("1000.0");
        let result = engine.check_order(&limit_order("2.000", "2500.00"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Insufficient free balance"));
    }

    #[rstest]
    fn test_precision_violation_denied() {
        let engine = setup("10000.0");
        // Quantity precision 1 != instrument size precision 3
        let order = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-1"))
                .instrument_id(InstrumentId::from("ETHUSDT.BINANCE"))
                .order_side(OrderSide::Buy)
                .order_type(OrderType::Limit)
                .price(Some(Price::from("2500.00")))
                .quantity(Quantity::from("2.0"))
                .build()
                .unwrap(),
        );
        let result = engine.check_order(&order);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("precision"));
    }

    #[rstest]
    fn test_denylist() {
        let mut engine = setup("10000.0");
        engine.deny_instrument(InstrumentId::from("ETHUSDT.BINANCE"));
        let result = engine.check_order(&limit_order("2.000", "2500.00"));
        assert!(result.unwrap_err().contains("denylisted"));

        engine.allow_instrument(InstrumentId::from("ETHUSDT.BINANCE"));
        assert!(engine.check_order(&limit_order("2.000", "2500.00")).is_ok());
    }

    #[rstest]
    fn test_unknown_instrument_denied() {
        let engine = setup("10000.0");
        let order = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-1"))
                .instrument_id(InstrumentId::from("UNKNOWN.BINANCE"))
                .order_side(OrderSide::Buy)
                .order_type(OrderType::Limit)
                .price(Some(Price::from("1.00")))
                .quantity(Quantity::from("1.000"))
                .build()
                .unwrap(),
        );
        assert!(engine.check_order(&order).is_err());
    }
}
