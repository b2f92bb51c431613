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

//! The `Strategy` handle providing the ergonomic trading API.
//!
//! A strategy pairs a user component (implementing `DataActor`) with this
//! handle for submitting orders and managing subscriptions. All operations
//! are rejected before the strategy is `RUNNING`.

use std::{cell::RefCell, rc::Rc};

use argo_common::{
    cache::Cache,
    clock::Clock,
    component::Component,
    enums::{ComponentState, ComponentTrigger},
    messages::{
        data::{
            DataCommand, RequestBars, RequestCommand, SubscribeBars, SubscribeCommand,
            SubscribeQuotes, SubscribeTrades, UnsubscribeBars, UnsubscribeCommand,
        },
        execution::{CancelOrder, ModifyOrder, SubmitOrder, SubmitOrderList, TradingCommand},
    },
    msgbus::{
        self,
        handler::ShareableMessageHandler,
        switchboard::{DATA_ENGINE_EXECUTE, RISK_ENGINE_EXECUTE},
    },
};
use argo_core::{UUID4, UnixNanos};
use argo_model::{
    data::BarType,
    enums::{OrderSide, TimeInForce},
    identifiers::{InstrumentId, PositionId, StrategyId, TraderId},
    orders::{Order, OrderList},
    position::Position,
    types::{Price, Quantity},
};
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::factory::OrderFactory;

/// Configuration for [`Strategy`] instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// The strategy ID (`{name}-{tag}` form).
    pub strategy_id: StrategyId,
    /// Instruments whose external orders this strategy claims on reconciliation.
    pub external_order_claims: Vec<InstrumentId>,
}

impl Default for StrategyConfig {
    /// Creates a new default [`StrategyConfig`] instance.
    fn default() -> Self {
        Self {
            strategy_id: StrategyId::default(),
            external_order_claims: Vec::new(),
        }
    }
}

/// The trading strategy handle: order submission, subscriptions and requests.
pub struct Strategy {
    /// The trader ID for the strategy.
    pub trader_id: TraderId,
    /// The strategy ID.
    pub strategy_id: StrategyId,
    /// The order factory for the strategy.
    pub order_factory: OrderFactory,
    clock: Rc<RefCell<dyn Clock>>,
    cache: Rc<RefCell<Cache>>,
    state: ComponentState,
    config: StrategyConfig,
}

impl Strategy {
    /// Creates a new [`Strategy`] instance in the `READY` state.
    #[must_use]
    pub fn new(
        trader_id: TraderId,
        config: StrategyConfig,
        clock: Rc<RefCell<dyn Clock>>,
        cache: Rc<RefCell<Cache>>,
    ) -> Self {
        let strategy_id = config.strategy_id;
        Self {
            trader_id,
            strategy_id,
            order_factory: OrderFactory::new(trader_id, strategy_id),
            clock,
            cache,
            state: ComponentState::PreInitialized
                .transition(&ComponentTrigger::Initialize)
                .expect("Valid initial transition"),
            config,
        }
    }

    /// Returns the instruments whose external orders this strategy claims.
    #[must_use]
    pub fn external_order_claims(&self) -> &[InstrumentId] {
        &self.config.external_order_claims
    }

    /// Returns a handle to the cache.
    #[must_use]
    pub fn cache(&self) -> Rc<RefCell<Cache>> {
        self.cache.clone()
    }

    /// Returns the current UNIX timestamp (nanoseconds) from the clock.
    #[must_use]
    pub fn timestamp_ns(&self) -> UnixNanos {
        self.clock.borrow().timestamp_ns()
    }

    fn check_running(&self) -> anyhow::Result<()> {
        if self.state != ComponentState::Running {
            anyhow::bail!(
                "Strategy {} operation rejected: state was {} (not RUNNING)",
                self.strategy_id,
                self.state,
            );
        }
        Ok(())
    }

    // -- ORDER MANAGEMENT ------------------------------------------------------------------------

    /// Submits the given order for execution (via the pre-trade risk gate).
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING`.
    pub fn submit_order(&mut self, order: Order) -> anyhow::Result<()> {
        self.check_running()?;
        let ts_now = self.timestamp_ns();
        let command = TradingCommand::SubmitOrder(SubmitOrder {
            trader_id: self.trader_id,
            strategy_id: self.strategy_id,
            instrument_id: order.instrument_id,
            order,
            position_id: None,
            client_id: None,
            command_id: UUID4::new(),
            ts_init: ts_now,
        });
        msgbus::send(&Ustr::from(RISK_ENGINE_EXECUTE), &command);
        Ok(())
    }

    /// Submits the given order list for execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING`.
    pub fn submit_order_list(&mut self, order_list: OrderList) -> anyhow::Result<()> {
        self.check_running()?;
        let ts_now = self.timestamp_ns();
        let command = TradingCommand::SubmitOrderList(SubmitOrderList {
            trader_id: self.trader_id,
            strategy_id: self.strategy_id,
            instrument_id: order_list.instrument_id,
            order_list,
            position_id: None,
            client_id: None,
            command_id: UUID4::new(),
            ts_init: ts_now,
        });
        msgbus::send(&Ustr::from(RISK_ENGINE_EXECUTE), &command);
        Ok(())
    }

    /// Requests a modification of the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING`.
    pub fn modify_order(
        &mut self,
        order: &Order,
        quantity: Option<Quantity>,
        price: Option<Price>,
        trigger_price: Option<Price>,
    ) -> anyhow::Result<()> {
        self.check_running()?;
        let ts_now = self.timestamp_ns();
        let command = TradingCommand::ModifyOrder(ModifyOrder {
            trader_id: self.trader_id,
            strategy_id: self.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id,
            quantity,
            price,
            trigger_price,
            client_id: None,
            command_id: UUID4::new(),
            ts_init: ts_now,
        });
        msgbus::send(&Ustr::from(RISK_ENGINE_EXECUTE), &command);
        Ok(())
    }

    /// Requests a cancellation of the given order.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING`.
    pub fn cancel_order(&mut self, order: &Order) -> anyhow::Result<()> {
        self.check_running()?;
        let ts_now = self.timestamp_ns();
        let command = TradingCommand::CancelOrder(CancelOrder {
            trader_id: self.trader_id,
            strategy_id: self.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id,
            client_id: None,
            command_id: UUID4::new(),
            ts_init: ts_now,
        });
        msgbus::send(&Ustr::from(RISK_ENGINE_EXECUTE), &command);
        Ok(())
    }

    /// Closes the given position with an opposing MARKET order.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING` or the position is
    /// already closed.
    pub fn close_position(&mut self, position: &Position) -> anyhow::Result<()> {
        self.check_running()?;
        if position.is_closed() {
            anyhow::bail!("Position {} already closed", position.id);
        }

        let side = match position.side {
            argo_model::enums::PositionSide::Long => OrderSide::Sell,
            argo_model::enums::PositionSide::Short => OrderSide::Buy,
            _ => anyhow::bail!("Position {} has no directional side", position.id),
        };

        let ts_now = self.timestamp_ns();
        let order = self.order_factory.market(
            position.instrument_id,
            side,
            position.quantity,
            TimeInForce::Ioc,
            ts_now,
        );
        self.submit_order_with_position(order, Some(position.id))
    }

    fn submit_order_with_position(
        &mut self,
        order: Order,
        position_id: Option<PositionId>,
    ) -> anyhow::Result<()> {
        let ts_now = self.timestamp_ns();
        let command = TradingCommand::SubmitOrder(SubmitOrder {
            trader_id: self.trader_id,
            strategy_id: self.strategy_id,
            instrument_id: order.instrument_id,
            order,
            position_id,
            client_id: None,
            command_id: UUID4::new(),
            ts_init: ts_now,
        });
        msgbus::send(&Ustr::from(RISK_ENGINE_EXECUTE), &command);
        Ok(())
    }

    // -- SUBSCRIPTIONS ---------------------------------------------------------------------------

    /// Subscribes the given handler to quote updates for the instrument.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING`.
    pub fn subscribe_quotes(
        &self,
        instrument_id: InstrumentId,
        handler: ShareableMessageHandler,
    ) -> anyhow::Result<()> {
        self.check_running()?;
        let topic = argo_common::msgbus::switchboard::get_quotes_topic(instrument_id);
        msgbus::subscribe(topic, handler, None);

        let command = DataCommand::Subscribe(SubscribeCommand::Quotes(SubscribeQuotes {
            instrument_id,
            client_id: None,
            command_id: UUID4::new(),
            ts_init: self.timestamp_ns(),
        }));
        msgbus::send(&Ustr::from(DATA_ENGINE_EXECUTE), &command);
        Ok(())
    }

    /// Subscribes the given handler to trade updates for the instrument.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING`.
    pub fn subscribe_trades(
        &self,
        instrument_id: InstrumentId,
        handler: ShareableMessageHandler,
    ) -> anyhow::Result<()> {
        self.check_running()?;
        let topic = argo_common::msgbus::switchboard::get_trades_topic(instrument_id);
        msgbus::subscribe(topic, handler, None);

        let command = DataCommand::Subscribe(SubscribeCommand::Trades(SubscribeTrades {
            instrument_id,
            client_id: None,
            command_id: UUID4::new(),
            ts_init: self.timestamp_ns(),
        }));
        msgbus::send(&Ustr::from(DATA_ENGINE_EXECUTE), &command);
        Ok(())
    }

    /// Subscribes the given handler to bar updates for the bar type.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING`.
    pub fn subscribe_bars(
        &self,
        bar_type: BarType,
        handler: ShareableMessageHandler,
    ) -> anyhow::Result<()> {
        self.check_running()?;
        // Emitted bars carry the standard form of the bar type
        let topic = argo_common::msgbus::switchboard::get_bars_topic(bar_type.standard());
        msgbus::subscribe(topic, handler, None);

        let command = DataCommand::Subscribe(SubscribeCommand::Bars(SubscribeBars {
            bar_type,
            client_id: None,
            command_id: UUID4::new(),
            ts_init: self.timestamp_ns(),
        }));
        msgbus::send(&Ustr::from(DATA_ENGINE_EXECUTE), &command);
        Ok(())
    }

    /// Unsubscribes from bar updates for the bar type.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING`.
    pub fn unsubscribe_bars(&self, bar_type: BarType) -> anyhow::Result<()> {
        self.check_running()?;
        let command = DataCommand::Unsubscribe(UnsubscribeCommand::Bars(UnsubscribeBars {
            bar_type,
            client_id: None,
            command_id: UUID4::new(),
            ts_init: self.timestamp_ns(),
        }));
        msgbus::send(&Ustr::from(DATA_ENGINE_EXECUTE), &command);
        Ok(())
    }

    // -- REQUESTS --------------------------------------------------------------------------------

    /// Requests historical bars, delivering the correlated response to the
    /// given handler. Returns the correlation ID (which cancels the request
    /// when passed to the bus `cancel_request`).
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is not `RUNNING`.
    pub fn request_bars(
        &self,
        bar_type: BarType,
        start: Option<UnixNanos>,
        end: Option<UnixNanos>,
        limit: Option<usize>,
        handler: ShareableMessageHandler,
    ) -> anyhow::Result<UUID4> {
        self.check_running()?;
        let correlation_id = UUID4::new();
        msgbus::register_response_handler(correlation_id, handler, None);

        let command = DataCommand::Request(RequestCommand::Bars(RequestBars {
            bar_type,
            start,
            end,
            limit,
            client_id: None,
            correlation_id,
            ts_init: self.timestamp_ns(),
        }));
        msgbus::send(&Ustr::from(DATA_ENGINE_EXECUTE), &command);
        Ok(correlation_id)
    }
}

impl Component for Strategy {
    fn state(&self) -> ComponentState {
        self.state
    }

    fn transition_state(&mut self, trigger: ComponentTrigger) -> anyhow::Result<()> {
        self.state = self.state.transition(&trigger)?;
        log::debug!("Strategy {} -> {}", self.strategy_id, self.state);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_common::clock::TestClock;
    use rstest::rstest;

    use super::*;

    fn strategy() -> Strategy {
        let clock = Rc::new(RefCell::new(TestClock::new()));
        let cache = Rc::new(RefCell::new(Cache::default()));
        Strategy::new(TraderId::default(), StrategyConfig::default(), clock, cache)
    }

    #[rstest]
    fn test_initial_state_ready() {
        let strategy = strategy();
        assert_eq!(strategy.state(), ComponentState::Ready);
    }

    #[rstest]
    fn test_operations_rejected_before_running() {
        let mut strategy = strategy();
        let ts_now = strategy.timestamp_ns();
        let order = strategy.order_factory.market(
            InstrumentId::from("ETHUSDT.BINANCE"),
            OrderSide::Buy,
            Quantity::from("1.000"),
            TimeInForce::Gtc,
            ts_now,
        );
        let result = strategy.submit_order(order);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not RUNNING"));
    }

    #[rstest]
    fn test_lifecycle_transitions_enable_operations() {
        let mut strategy = strategy();
        strategy.transition_state(ComponentTrigger::Start).unwrap();
        strategy
            .transition_state(ComponentTrigger::StartCompleted)
            .unwrap();
        assert!(strategy.is_running());
        assert!(strategy.check_running().is_ok());

        strategy.transition_state(ComponentTrigger::Stop).unwrap();
        strategy
            .transition_state(ComponentTrigger::StopCompleted)
            .unwrap();
        assert!(strategy.is_stopped());
        assert!(strategy.check_running().is_err());
    }
}
