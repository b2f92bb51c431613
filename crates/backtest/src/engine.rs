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

//! The `BacktestEngine` driving a deterministic event loop from historical data.
//!
//! Historical data advances the simulated clock: for each data point the
//! engine fires any elapsed timers, routes the data through the simulated
//! venue (matching), then through the data engine (subscribers). Strategy
//! code runs against identical semantics to a live deployment.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use argo_common::clock::{Clock, TestClock};
use argo_data::client::DataClientAdapter;
use argo_execution::client::ExecutionClient;
use argo_model::{
    data::{Data, GetTsInit},
    enums::{AccountType, BookType, OmsType},
    identifiers::{ClientId, Venue},
    instruments::InstrumentAny,
    types::{Currency, Money},
};
use argo_system::ArgoKernel;

use crate::{
    config::BacktestEngineConfig,
    data_client::BacktestDataClient,
    data_iterator::BacktestDataIterator,
    exchange::SimulatedExchange,
    execution_client::BacktestExecutionClient,
    models::FillModel,
};

/// A backtest engine assembling a kernel, simulated venues and a data
/// iterator into one deterministic run.
pub struct BacktestEngine {
    /// The assembled system kernel.
    pub kernel: ArgoKernel,
    test_clock: Rc<RefCell<TestClock>>,
    exchanges: HashMap<Venue, Rc<RefCell<SimulatedExchange>>>,
    data_iterator: BacktestDataIterator,
    raw_data: Vec<Data>,
    config: BacktestEngineConfig,
}

impl BacktestEngine {
    /// Creates a new [`BacktestEngine`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if a kernel has already been constructed for this
    /// thread.
    pub fn new(config: BacktestEngineConfig) -> anyhow::Result<Self> {
        let test_clock = Rc::new(RefCell::new(TestClock::new()));
        let clock: Rc<RefCell<dyn Clock>> = test_clock.clone();
        let kernel = ArgoKernel::with_clock(config.kernel.clone(), clock)?;

        Ok(Self {
            kernel,
            test_clock,
            exchanges: HashMap::new(),
            data_iterator: BacktestDataIterator::new(),
            raw_data: Vec::new(),
            config,
        })
    }

    /// Adds a simulated venue to the backtest.
    ///
    /// # Errors
    ///
    /// Returns an error if account initialization or client registration fails.
    #[allow(clippy::too_many_arguments)]
    pub fn add_venue(
        &mut self,
        venue: Venue,
        account_type: AccountType,
        oms_type: OmsType,
        book_type: BookType,
        starting_balances: Vec<Money>,
        base_currency: Option<Currency>,
    ) -> anyhow::Result<()> {
        let mut exchange = SimulatedExchange::new(
            venue,
            account_type,
            oms_type,
            book_type,
            starting_balances,
            base_currency,
            FillModel::default(),
            self.kernel.clock.clone(),
            self.kernel.cache.clone(),
            self.config.matching.clone(),
        );
        exchange.initialize_account()?;

        let exchange = Rc::new(RefCell::new(exchange));
        let client = Rc::new(BacktestExecutionClient::new(exchange.clone()));
        self.kernel
            .exec_engine
            .borrow_mut()
            .register_client(client as Rc<dyn ExecutionClient>)?;

        log::info!("Added venue {venue}");
        self.exchanges.insert(venue, exchange);
        Ok(())
    }

    /// Adds the given instrument to its venue's simulated exchange and the
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the instrument's venue has not been added.
    pub fn add_instrument(&mut self, instrument: InstrumentAny) -> anyhow::Result<()> {
        let venue = instrument.id().venue;
        let Some(exchange) = self.exchanges.get(&venue) else {
            anyhow::bail!("No venue {venue} added (call `add_venue` first)");
        };
        exchange.borrow_mut().add_instrument(instrument)
    }

    /// Adds the given historical data stream (must be sorted ascending by
    /// `ts_init`).
    pub fn add_data(&mut self, data: Vec<Data>) {
        self.raw_data.extend(data.iter().cloned());
        self.data_iterator.add_stream(data);
    }

    /// Returns the simulated exchange for the given venue, if added.
    #[must_use]
    pub fn exchange(&self, venue: &Venue) -> Option<Rc<RefCell<SimulatedExchange>>> {
        self.exchanges.get(venue).cloned()
    }

    /// Runs the backtest to completion.
    pub fn run(&mut self) {
        // Register the backtest data client for request/response flows
        let data_client = BacktestDataClient::new(
            ClientId::new("BACKTEST"),
            None,
            self.kernel.clock.clone(),
            self.raw_data.clone(),
        );
        self.kernel
            .data_engine
            .borrow_mut()
            .register_default_client(DataClientAdapter::new(Box::new(data_client)));

        self.kernel.start();

        while let Some(data) = self.data_iterator.next() {
            let ts = data.ts_init();

            // Advance the simulated clock, dispatching elapsed timers in
            // `ts_event` order before the data point
            let events = self.test_clock.borrow_mut().advance_time(ts, true);
            let handlers = self.test_clock.borrow().match_handlers(events);
            for handler in handlers {
                handler.run();
            }
            self.kernel.drain_queues();

            // The venue sees the market first (trigger/fill evaluation), then
            // subscribers via the data engine
            if let Some(exchange) = self.exchanges.get(&data.instrument_id().venue) {
                exchange.borrow_mut().process_data(&data);
            }
            self.kernel.drain_queues();

            self.kernel.data_engine.borrow_mut().process_data(data);
            self.kernel.drain_queues();
        }

        self.kernel.stop();
        let _ = self.kernel.exec_engine.borrow().check_residuals();
        log::info!("Backtest run complete");
    }
}
