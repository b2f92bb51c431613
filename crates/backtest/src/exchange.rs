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

//! A simulated trading venue for backtesting.

use std::{cell::RefCell, collections::{HashMap, VecDeque}, rc::Rc};

use argo_common::{
    cache::Cache,
    clock::Clock,
    msgbus::{self, switchboard, switchboard::EXEC_ENGINE_PROCESS},
    messages::execution::TradingCommand,
};
use argo_core::UUID4;
use argo_model::{
    accounts::AccountAny,
    data::{Bar, Data, OrderBookDeltas, QuoteTick, TradeTick},
    enums::{AccountType, BookType, OmsType},
    events::{AccountState, OrderEventAny, OrderSubmitted},
    identifiers::{AccountId, InstrumentId, Venue},
    instruments::InstrumentAny,
    types::{AccountBalance, Currency, Money},
};
use ustr::Ustr;

use crate::{
    matching::{OrderMatchingEngine, OrderMatchingEngineConfig},
    models::{FeeModel, FillModel},
};

/// A simulated venue: owns one matching engine per instrument, accepts
/// orders via a venue-local command queue, and emits order events back
/// through the bus.
pub struct SimulatedExchange {
    /// The venue for the exchange.
    pub venue: Venue,
    /// The account ID for the exchange.
    pub account_id: AccountId,
    /// The account type for the exchange.
    pub account_type: AccountType,
    /// The order management system (OMS) type for the exchange.
    pub oms_type: OmsType,
    /// The order book type for the exchange's matching engines.
    pub book_type: BookType,
    clock: Rc<RefCell<dyn Clock>>,
    cache: Rc<RefCell<Cache>>,
    matching_engines: HashMap<InstrumentId, OrderMatchingEngine>,
    command_queue: Rc<RefCell<VecDeque<TradingCommand>>>,
    fill_model: FillModel,
    starting_balances: Vec<Money>,
    base_currency: Option<Currency>,
    config: OrderMatchingEngineConfig,
}

impl SimulatedExchange {
    /// Creates a new [`SimulatedExchange`] instance.
    ///
    /// # Panics
    ///
    /// Panics if `starting_balances` is empty.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        venue: Venue,
        account_type: AccountType,
        oms_type: OmsType,
        book_type: BookType,
        starting_balances: Vec<Money>,
        base_currency: Option<Currency>,
        fill_model: FillModel,
        clock: Rc<RefCell<dyn Clock>>,
        cache: Rc<RefCell<Cache>>,
        config: OrderMatchingEngineConfig,
    ) -> Self {
        assert!(
            !starting_balances.is_empty(),
            "`starting_balances` cannot be empty"
        );
        Self {
            venue,
            account_id: AccountId::new(format!("{venue}-001")),
            account_type,
            oms_type,
            book_type,
            clock,
            cache,
            matching_engines: HashMap::new(),
            command_queue: Rc::new(RefCell::new(VecDeque::new())),
            fill_model,
            starting_balances,
            base_currency,
            config,
        }
    }

    /// Initializes the venue account in the cache and publishes its state.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be cached.
    pub fn initialize_account(&mut self) -> anyhow::Result<()> {
        let ts_now = self.clock.borrow().timestamp_ns();
        let balances = self
            .starting_balances
            .iter()
            .map(|money| AccountBalance::from_total(*money))
            .collect();

        let event = AccountState::new(
            self.account_id,
            self.account_type,
            self.base_currency,
            balances,
            vec![],
            true,
            UUID4::new(),
            ts_now,
            ts_now,
        );

        let account = AccountAny::from_event(event.clone(), true);
        self.cache.borrow_mut().add_account(account)?;

        let topic = switchboard::get_account_events_topic(self.account_id);
        msgbus::publish(&topic, &event);
        Ok(())
    }

    /// Adds the given instrument to the exchange, creating its matching engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the instrument venue does not match the exchange.
    pub fn add_instrument(&mut self, instrument: InstrumentAny) -> anyhow::Result<()> {
        if instrument.id().venue != self.venue {
            anyhow::bail!(
                "Instrument {} not for venue {}",
                instrument.id(),
                self.venue
            );
        }

        self.cache.borrow_mut().add_instrument(instrument.clone())?;

        let engine = OrderMatchingEngine::new(
            instrument.clone(),
            self.fill_model.clone(),
            FeeModel,
            self.book_type,
            self.oms_type,
            self.account_id,
            self.clock.clone(),
            self.cache.clone(),
            self.config.clone(),
        );
        log::info!("Added instrument {} to {}", instrument.id(), self.venue);
        self.matching_engines.insert(instrument.id(), engine);
        Ok(())
    }

    /// Returns the best bid price for the given instrument, if any.
    #[must_use]
    pub fn best_bid_price(&self, instrument_id: &InstrumentId) -> Option<argo_model::types::Price> {
        self.matching_engines
            .get(instrument_id)
            .and_then(OrderMatchingEngine::best_bid_price)
    }

    /// Returns the best ask price for the given instrument, if any.
    #[must_use]
    pub fn best_ask_price(&self, instrument_id: &InstrumentId) -> Option<argo_model::types::Price> {
        self.matching_engines
            .get(instrument_id)
            .and_then(OrderMatchingEngine::best_ask_price)
    }

    /// Returns the venue-local command sink, for clients to enqueue commands
    /// without holding the exchange.
    #[must_use]
    pub fn command_sink(&self) -> Rc<RefCell<VecDeque<TradingCommand>>> {
        self.command_queue.clone()
    }

    /// Enqueues the given trading command on the venue-local queue.
    pub fn send(&mut self, command: TradingCommand) {
        self.command_queue.borrow_mut().push_back(command);
    }

    /// Processes all queued trading commands.
    pub fn process_queue(&mut self) {
        loop {
            let Some(command) = self.command_queue.borrow_mut().pop_front() else {
                break;
            };
            self.process_command(command);
        }
        self.flush_events();
    }

    fn process_command(&mut self, command: TradingCommand) {
        let instrument_id = command.instrument_id();
        if !self.matching_engines.contains_key(&instrument_id) {
            log::error!("No matching engine for {instrument_id}");
            return;
        }

        match command {
            TradingCommand::SubmitOrder(cmd) => {
                self.submit_to_engine(cmd.order);
            }
            TradingCommand::SubmitOrderList(cmd) => {
                for order in cmd.order_list.orders {
                    self.submit_to_engine(order);
                }
            }
            TradingCommand::ModifyOrder(cmd) => {
                // SAFETY: Engine presence checked above
                let engine = self.matching_engines.get_mut(&instrument_id).unwrap();
                engine.process_modify(&cmd);
            }
            TradingCommand::CancelOrder(cmd) => {
                let engine = self.matching_engines.get_mut(&instrument_id).unwrap();
                engine.process_cancel(&cmd);
            }
            TradingCommand::CancelAllOrders(cmd) => {
                let engine = self.matching_engines.get_mut(&instrument_id).unwrap();
                engine.process_cancel_all(&cmd);
            }
            TradingCommand::QueryOrder(_) => {} // State queries answered from the cache
        }
    }

    /// Acknowledges receipt of the order at the venue, then matches it.
    fn submit_to_engine(&mut self, mut order: argo_model::orders::Order) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let submitted = OrderEventAny::Submitted(OrderSubmitted {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            account_id: self.account_id,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
        });
        Self::emit_event(&submitted);

        if order.apply(submitted).is_err() {
            log::error!("Invalid submit for {}", order.client_order_id);
            return;
        }
        if let Some(engine) = self.matching_engines.get_mut(&order.instrument_id) {
            engine.process_order(&mut order);
        }
    }

    /// Processes the given market data through the owning matching engine.
    pub fn process_data(&mut self, data: &Data) {
        let instrument_id = data.instrument_id();
        let Some(engine) = self.matching_engines.get_mut(&instrument_id) else {
            return; // Data for an instrument not traded on this exchange
        };

        match data {
            Data::Delta(delta) => engine.process_order_book_delta(delta),
            Data::Deltas(deltas) => engine.process_order_book_deltas(deltas),
            Data::Depth10(depth) => engine.process_order_book_depth10(depth),
            Data::Quote(quote) => engine.process_quote_tick(quote),
            Data::Trade(trade) => engine.process_trade_tick(trade),
            Data::Bar(bar) => engine.process_bar(bar),
        }

        // Commands deferred while this exchange was busy process now
        self.process_queue();
    }

    /// Processes the given quote tick (convenience for tests and adapters).
    pub fn process_quote_tick(&mut self, quote: &QuoteTick) {
        self.process_data(&Data::Quote(*quote));
    }

    /// Processes the given trade tick (convenience for tests and adapters).
    pub fn process_trade_tick(&mut self, trade: &TradeTick) {
        self.process_data(&Data::Trade(*trade));
    }

    /// Processes the given bar (convenience for tests and adapters).
    pub fn process_bar(&mut self, bar: &Bar) {
        self.process_data(&Data::Bar(*bar));
    }

    /// Processes the given book deltas (convenience for tests and adapters).
    pub fn process_deltas(&mut self, deltas: &OrderBookDeltas) {
        self.process_data(&Data::Deltas(deltas.clone()));
    }

    /// Drains matching engine events onto the bus in FIFO order.
    pub fn flush_events(&mut self) {
        for engine in self.matching_engines.values_mut() {
            for event in engine.drain_events() {
                Self::emit_event(&event);
            }
        }
    }

    fn emit_event(event: &OrderEventAny) {
        msgbus::send(&Ustr::from(EXEC_ENGINE_PROCESS), event);
    }

    /// Resets the exchange to an initial state, retaining instruments.
    pub fn reset(&mut self) {
        for engine in self.matching_engines.values_mut() {
            engine.reset();
        }
        self.command_queue.borrow_mut().clear();
        log::info!("Reset {}", self.venue);
    }
}
