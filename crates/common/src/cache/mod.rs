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

//! A common in-memory `Cache` for market and execution related data.
//!
//! The cache is the single source of truth for instruments, recent market
//! data windows, orders, positions, accounts and arbitrary user bytes.
//! Mutations are single-writer from the engine that owns each record kind;
//! queries are non-blocking reads.

pub mod config;
pub mod database;

mod index;

use std::collections::{HashMap, VecDeque};

use argo_model::{
    accounts::AccountAny,
    data::{Bar, BarType, QuoteTick, TradeTick},
    enums::PriceType,
    identifiers::{
        AccountId, ClientId, ClientOrderId, InstrumentId, OrderListId, PositionId, StrategyId,
        Venue, VenueOrderId,
    },
    instruments::InstrumentAny,
    orderbook::OrderBook,
    orders::{Order, OrderList},
    position::Position,
    types::Price,
};
use bytes::Bytes;
pub use config::CacheConfig;
use database::{CacheDatabaseAdapter, CacheMap};
use index::CacheIndex;

/// A common in-memory `Cache` for market and execution related data.
pub struct Cache {
    config: CacheConfig,
    index: CacheIndex,
    database: Option<Box<dyn CacheDatabaseAdapter>>,
    general: HashMap<String, Bytes>,
    instruments: HashMap<InstrumentId, InstrumentAny>,
    books: HashMap<InstrumentId, OrderBook>,
    quotes: HashMap<InstrumentId, VecDeque<QuoteTick>>,
    trades: HashMap<InstrumentId, VecDeque<TradeTick>>,
    bars: HashMap<BarType, VecDeque<Bar>>,
    accounts: HashMap<AccountId, AccountAny>,
    orders: HashMap<ClientOrderId, Order>,
    order_lists: HashMap<OrderListId, OrderList>,
    positions: HashMap<PositionId, Position>,
    position_snapshots: HashMap<PositionId, Bytes>,
}

impl Default for Cache {
    /// Creates a new default [`Cache`] instance.
    fn default() -> Self {
        Self::new(Some(CacheConfig::default()), None)
    }
}

impl Cache {
    /// Creates a new [`Cache`] instance.
    #[must_use]
    pub fn new(
        config: Option<CacheConfig>,
        database: Option<Box<dyn CacheDatabaseAdapter>>,
    ) -> Self {
        Self {
            config: config.unwrap_or_default(),
            index: CacheIndex::default(),
            database,
            general: HashMap::new(),
            instruments: HashMap::new(),
            books: HashMap::new(),
            quotes: HashMap::new(),
            trades: HashMap::new(),
            bars: HashMap::new(),
            accounts: HashMap::new(),
            orders: HashMap::new(),
            order_lists: HashMap::new(),
            positions: HashMap::new(),
            position_snapshots: HashMap::new(),
        }
    }

    /// Returns whether the cache has a durable backing database.
    #[must_use]
    pub const fn has_backing(&self) -> bool {
        self.database.is_some()
    }

    // -- COMMANDS --------------------------------------------------------------------------------

    /// Loads all records from the backing database (startup).
    ///
    /// # Errors
    ///
    /// Returns an error if loading or decoding any record fails.
    pub fn load_state(&mut self) -> anyhow::Result<()> {
        let cache_map = match &self.database {
            Some(db) => db.load_all()?,
            None => CacheMap::default(),
        };

        self.general = match &self.database {
            Some(db) => db.load()?,
            None => HashMap::new(),
        };

        log::info!(
            "Loaded {} instruments, {} accounts, {} orders, {} positions from database",
            cache_map.instruments.len(),
            cache_map.accounts.len(),
            cache_map.orders.len(),
            cache_map.positions.len(),
        );

        self.instruments = cache_map.instruments;
        self.accounts = cache_map.accounts;
        self.orders = cache_map.orders;
        self.positions = cache_map.positions;

        self.build_index();
        Ok(())
    }

    /// Clears the current cache index and rebuilds it from cached records.
    pub fn build_index(&mut self) {
        log::debug!("Building index");
        self.index.clear();

        for (account_id, _) in &self.accounts {
            self.index
                .venue_account
                .insert(account_id.get_issuer(), *account_id);
        }

        for (client_order_id, order) in &self.orders {
            let instrument_id = order.instrument_id;
            let venue = instrument_id.venue;
            let strategy_id = order.strategy_id;

            self.index
                .venue_orders
                .entry(venue)
                .or_default()
                .insert(*client_order_id);

            if let Some(venue_order_id) = order.venue_order_id {
                self.index
                    .venue_order_ids
                    .insert(venue_order_id, *client_order_id);
                self.index
                    .client_order_ids
                    .insert(*client_order_id, venue_order_id);
            }

            if let Some(position_id) = order.position_id {
                self.index
                    .order_position
                    .insert(*client_order_id, position_id);
            }

            self.index
                .order_strategy
                .insert(*client_order_id, strategy_id);
            self.index
                .instrument_orders
                .entry(instrument_id)
                .or_default()
                .insert(*client_order_id);
            self.index
                .strategy_orders
                .entry(strategy_id)
                .or_default()
                .insert(*client_order_id);
            self.index.orders.insert(*client_order_id);

            if order.is_open() {
                self.index.orders_open.insert(*client_order_id);
            }
            if order.is_closed() {
                self.index.orders_closed.insert(*client_order_id);
            }
            if order.is_inflight() {
                self.index.orders_inflight.insert(*client_order_id);
            }

            self.index.strategies.insert(strategy_id);
        }

        for (position_id, position) in &self.positions {
            let instrument_id = position.instrument_id;
            let venue = instrument_id.venue;
            let strategy_id = position.strategy_id;

            self.index
                .venue_positions
                .entry(venue)
                .or_default()
                .insert(*position_id);
            self.index
                .position_strategy
                .insert(*position_id, strategy_id);
            self.index
                .position_orders
                .entry(*position_id)
                .or_default()
                .extend(position.client_order_ids().iter().copied());
            self.index
                .instrument_positions
                .entry(instrument_id)
                .or_default()
                .insert(*position_id);
            self.index
                .strategy_positions
                .entry(strategy_id)
                .or_default()
                .insert(*position_id);
            self.index.positions.insert(*position_id);

            if position.is_open() {
                self.index.positions_open.insert(*position_id);
            }
            if position.is_closed() {
                self.index.positions_closed.insert(*position_id);
            }

            self.index.strategies.insert(strategy_id);
        }
    }

    /// Resets the cache to an empty initial state.
    pub fn reset(&mut self) {
        log::debug!("Resetting cache");
        self.index.clear();
        self.general.clear();
        self.instruments.clear();
        self.books.clear();
        self.quotes.clear();
        self.trades.clear();
        self.bars.clear();
        self.accounts.clear();
        self.orders.clear();
        self.order_lists.clear();
        self.positions.clear();
        self.position_snapshots.clear();
    }

    /// Flushes the backing database, persisting all pending writes.
    pub fn flush_db(&mut self) {
        if let Some(db) = &mut self.database {
            if let Err(e) = db.flush() {
                log::error!("Error flushing cache database: {e}");
            }
        }
    }

    /// Checks integrity between cached records and indices, returning whether
    /// the check passed.
    #[must_use]
    pub fn check_integrity(&self) -> bool {
        let mut integrity = true;

        for client_order_id in self.orders.keys() {
            if !self.index.orders.contains(client_order_id) {
                log::error!("Integrity error: order {client_order_id} not indexed");
                integrity = false;
            }
        }
        for position_id in self.positions.keys() {
            if !self.index.positions.contains(position_id) {
                log::error!("Integrity error: position {position_id} not indexed");
                integrity = false;
            }
        }

        integrity
    }

    /// Checks for residual open state, returning whether any was found.
    #[must_use]
    pub fn check_residuals(&self) -> bool {
        let mut residuals = false;
        for order in self.orders_open(None, None, None) {
            log::warn!("Residual open order: {order}");
            residuals = true;
        }
        for position in self.positions_open(None, None, None) {
            log::warn!("Residual open position: {position}");
            residuals = true;
        }
        residuals
    }

    // -- GENERAL ---------------------------------------------------------------------------------

    /// Adds the given general (raw bytes) value for the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn add(&mut self, key: &str, value: Bytes) -> anyhow::Result<()> {
        argo_core::correctness::check_valid_string(key, stringify!(key))?;

        self.general.insert(key.to_string(), value.clone());

        if let Some(db) = &mut self.database {
            db.add(key.to_string(), value)?;
        }
        Ok(())
    }

    /// Returns the general (raw bytes) value for the key, if it exists.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.general.get(key)
    }

    // -- INSTRUMENTS -----------------------------------------------------------------------------

    /// Adds the given instrument to the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn add_instrument(&mut self, instrument: InstrumentAny) -> anyhow::Result<()> {
        if let Some(db) = &mut self.database {
            db.add_instrument(&instrument)?;
        }
        self.instruments.insert(instrument.id(), instrument);
        Ok(())
    }

    /// Returns the instrument with the given ID, if it exists.
    #[must_use]
    pub fn instrument(&self, instrument_id: &InstrumentId) -> Option<&InstrumentAny> {
        self.instruments.get(instrument_id)
    }

    /// Returns all instruments, optionally scoped to the given venue.
    #[must_use]
    pub fn instruments(&self, venue: Option<&Venue>) -> Vec<&InstrumentAny> {
        self.instruments
            .values()
            .filter(|i| venue.is_none_or(|v| &i.id().venue == v))
            .collect()
    }

    // -- BOOKS -----------------------------------------------------------------------------------

    /// Adds the given order book to the cache.
    pub fn add_book(&mut self, book: OrderBook) {
        self.books.insert(book.instrument_id, book);
    }

    /// Returns the order book for the given instrument, if it exists.
    #[must_use]
    pub fn book(&self, instrument_id: &InstrumentId) -> Option<&OrderBook> {
        self.books.get(instrument_id)
    }

    /// Returns a mutable reference to the order book for the given instrument.
    pub fn book_mut(&mut self, instrument_id: &InstrumentId) -> Option<&mut OrderBook> {
        self.books.get_mut(instrument_id)
    }

    // -- MARKET DATA -----------------------------------------------------------------------------

    /// Adds the given quote tick to the cache.
    pub fn add_quote(&mut self, quote: QuoteTick) {
        let capacity = self.config.tick_capacity;
        let quotes = self
            .quotes
            .entry(quote.instrument_id)
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        if quotes.len() >= capacity {
            quotes.pop_back();
        }
        quotes.push_front(quote);
    }

    /// Returns the latest quote tick for the given instrument, if it exists.
    #[must_use]
    pub fn quote(&self, instrument_id: &InstrumentId) -> Option<&QuoteTick> {
        self.quotes.get(instrument_id).and_then(VecDeque::front)
    }

    /// Returns the cached quote tick window for the given instrument, newest first.
    #[must_use]
    pub fn quotes(&self, instrument_id: &InstrumentId) -> Option<Vec<QuoteTick>> {
        self.quotes
            .get(instrument_id)
            .map(|quotes| quotes.iter().copied().collect())
    }

    /// Adds the given trade tick to the cache.
    pub fn add_trade(&mut self, trade: TradeTick) {
        let capacity = self.config.tick_capacity;
        let trades = self
            .trades
            .entry(trade.instrument_id)
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        if trades.len() >= capacity {
            trades.pop_back();
        }
        trades.push_front(trade);
    }

    /// Returns the latest trade tick for the given instrument, if it exists.
    #[must_use]
    pub fn trade(&self, instrument_id: &InstrumentId) -> Option<&TradeTick> {
        self.trades.get(instrument_id).and_then(VecDeque::front)
    }

    /// Returns the cached trade tick window for the given instrument, newest first.
    #[must_use]
    pub fn trades(&self, instrument_id: &InstrumentId) -> Option<Vec<TradeTick>> {
        self.trades
            .get(instrument_id)
            .map(|trades| trades.iter().copied().collect())
    }

    /// Adds the given bar to the cache.
    pub fn add_bar(&mut self, bar: Bar) {
        let capacity = self.config.bar_capacity;
        let bars = self
            .bars
            .entry(bar.bar_type)
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        if bars.len() >= capacity {
            bars.pop_back();
        }
        bars.push_front(bar);
    }

    /// Returns the latest bar for the given bar type, if it exists.
    #[must_use]
    pub fn bar(&self, bar_type: &BarType) -> Option<&Bar> {
        self.bars.get(bar_type).and_then(VecDeque::front)
    }

    /// Returns the cached bar window for the given bar type, newest first.
    #[must_use]
    pub fn bars(&self, bar_type: &BarType) -> Option<Vec<Bar>> {
        self.bars
            .get(bar_type)
            .map(|bars| bars.iter().copied().collect())
    }

    /// Returns the latest price of the given type for the instrument.
    ///
    /// `LAST` is sourced from trades; `BID`/`ASK`/`MID` from quotes.
    #[must_use]
    pub fn price(&self, instrument_id: &InstrumentId, price_type: PriceType) -> Option<Price> {
        match price_type {
            PriceType::Last => self.trade(instrument_id).map(|trade| trade.price),
            PriceType::Mark => None,
            _ => self
                .quote(instrument_id)
                .map(|quote| quote.extract_price(price_type)),
        }
    }

    // -- ACCOUNTS --------------------------------------------------------------------------------

    /// Adds the given account to the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn add_account(&mut self, account: AccountAny) -> anyhow::Result<()> {
        if let Some(db) = &mut self.database {
            db.add_account(&account)?;
        }
        let account_id = account.id();
        self.index
            .venue_account
            .insert(account_id.get_issuer(), account_id);
        self.accounts.insert(account_id, account);
        Ok(())
    }

    /// Updates the given account in the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn update_account(&mut self, account: AccountAny) -> anyhow::Result<()> {
        if let Some(db) = &mut self.database {
            db.update_account(&account)?;
        }
        self.accounts.insert(account.id(), account);
        Ok(())
    }

    /// Returns the account with the given ID, if it exists.
    #[must_use]
    pub fn account(&self, account_id: &AccountId) -> Option<&AccountAny> {
        self.accounts.get(account_id)
    }

    /// Returns the account for the given venue, if it exists.
    #[must_use]
    pub fn account_for_venue(&self, venue: &Venue) -> Option<&AccountAny> {
        self.index
            .venue_account
            .get(venue)
            .and_then(|account_id| self.accounts.get(account_id))
    }

    /// Returns the account ID for the given venue, if it exists.
    #[must_use]
    pub fn account_id(&self, venue: &Venue) -> Option<&AccountId> {
        self.index.venue_account.get(venue)
    }

    // -- ORDERS ----------------------------------------------------------------------------------

    /// Adds the given order to the cache, indexed by its identifiers.
    ///
    /// # Errors
    ///
    /// This function returns an error:
    /// - If the order already exists and `replace_existing` is false.
    /// - If the database write fails.
    pub fn add_order(
        &mut self,
        order: Order,
        position_id: Option<PositionId>,
        client_id: Option<ClientId>,
        replace_existing: bool,
    ) -> anyhow::Result<()> {
        let client_order_id = order.client_order_id;
        if !replace_existing && self.orders.contains_key(&client_order_id) {
            anyhow::bail!("Order {client_order_id} already exists in the cache");
        }

        let instrument_id = order.instrument_id;
        let strategy_id = order.strategy_id;

        self.index
            .venue_orders
            .entry(instrument_id.venue)
            .or_default()
            .insert(client_order_id);
        self.index
            .order_strategy
            .insert(client_order_id, strategy_id);
        self.index
            .instrument_orders
            .entry(instrument_id)
            .or_default()
            .insert(client_order_id);
        self.index
            .strategy_orders
            .entry(strategy_id)
            .or_default()
            .insert(client_order_id);
        self.index.orders.insert(client_order_id);
        self.index.strategies.insert(strategy_id);

        if let Some(position_id) = position_id {
            self.add_position_id(&position_id, &client_order_id);
        }
        if let Some(client_id) = client_id {
            self.index.order_client.insert(client_order_id, client_id);
        }

        if let Some(db) = &mut self.database {
            db.add_order(&order)?;
        }

        self.orders.insert(client_order_id, order);
        Ok(())
    }

    /// Indexes the given position ID for the client order ID.
    pub fn add_position_id(&mut self, position_id: &PositionId, client_order_id: &ClientOrderId) {
        self.index
            .order_position
            .insert(*client_order_id, *position_id);
        self.index
            .position_orders
            .entry(*position_id)
            .or_default()
            .insert(*client_order_id);
    }

    /// Indexes the given venue order ID for the client order ID.
    pub fn add_venue_order_id(
        &mut self,
        client_order_id: &ClientOrderId,
        venue_order_id: &VenueOrderId,
    ) {
        self.index
            .venue_order_ids
            .insert(*venue_order_id, *client_order_id);
        self.index
            .client_order_ids
            .insert(*client_order_id, *venue_order_id);
    }

    /// Updates the given order in the cache, reindexing open/closed state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn update_order(&mut self, order: &Order) -> anyhow::Result<()> {
        let client_order_id = order.client_order_id;

        if let Some(venue_order_id) = order.venue_order_id {
            self.index
                .venue_order_ids
                .insert(venue_order_id, client_order_id);
            self.index
                .client_order_ids
                .insert(client_order_id, venue_order_id);
        }
        if let Some(position_id) = order.position_id {
            self.add_position_id(&position_id, &client_order_id);
        }

        if order.is_open() {
            self.index.orders_closed.remove(&client_order_id);
            self.index.orders_open.insert(client_order_id);
        }
        if order.is_closed() {
            self.index.orders_open.remove(&client_order_id);
            self.index.orders_inflight.remove(&client_order_id);
            self.index.orders_closed.insert(client_order_id);
        }
        if order.is_inflight() {
            self.index.orders_inflight.insert(client_order_id);
        } else {
            self.index.orders_inflight.remove(&client_order_id);
        }

        if let Some(db) = &mut self.database {
            db.update_order(order)?;
        }

        self.orders.insert(client_order_id, order.clone());
        Ok(())
    }

    /// Returns the order with the given ID, if it exists.
    #[must_use]
    pub fn order(&self, client_order_id: &ClientOrderId) -> Option<&Order> {
        self.orders.get(client_order_id)
    }

    /// Returns a mutable reference to the order with the given ID.
    pub fn mut_order(&mut self, client_order_id: &ClientOrderId) -> Option<&mut Order> {
        self.orders.get_mut(client_order_id)
    }

    /// Returns whether an order with the given ID exists.
    #[must_use]
    pub fn order_exists(&self, client_order_id: &ClientOrderId) -> bool {
        self.index.orders.contains(client_order_id)
    }

    /// Returns the client order ID for the given venue order ID, if indexed.
    #[must_use]
    pub fn client_order_id(&self, venue_order_id: &VenueOrderId) -> Option<&ClientOrderId> {
        self.index.venue_order_ids.get(venue_order_id)
    }

    /// Returns the venue order ID for the given client order ID, if indexed.
    #[must_use]
    pub fn venue_order_id(&self, client_order_id: &ClientOrderId) -> Option<&VenueOrderId> {
        self.index.client_order_ids.get(client_order_id)
    }

    /// Returns the strategy ID for the given client order ID, if indexed.
    #[must_use]
    pub fn strategy_id_for_order(&self, client_order_id: &ClientOrderId) -> Option<&StrategyId> {
        self.index.order_strategy.get(client_order_id)
    }

    fn order_ids_filtered(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<&ClientOrderId> {
        self.index
            .orders
            .iter()
            .filter(|id| {
                venue.is_none_or(|v| {
                    self.index
                        .venue_orders
                        .get(v)
                        .is_some_and(|ids| ids.contains(id))
                })
            })
            .filter(|id| {
                instrument_id.is_none_or(|i| {
                    self.index
                        .instrument_orders
                        .get(i)
                        .is_some_and(|ids| ids.contains(id))
                })
            })
            .filter(|id| {
                strategy_id.is_none_or(|s| {
                    self.index
                        .strategy_orders
                        .get(s)
                        .is_some_and(|ids| ids.contains(id))
                })
            })
            .collect()
    }

    /// Returns all orders matching the given optional filters.
    #[must_use]
    pub fn orders(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<&Order> {
        self.order_ids_filtered(venue, instrument_id, strategy_id)
            .into_iter()
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    /// Returns all open orders matching the given optional filters.
    #[must_use]
    pub fn orders_open(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<&Order> {
        self.order_ids_filtered(venue, instrument_id, strategy_id)
            .into_iter()
            .filter(|id| self.index.orders_open.contains(*id))
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    /// Returns all closed orders matching the given optional filters.
    #[must_use]
    pub fn orders_closed(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<&Order> {
        self.order_ids_filtered(venue, instrument_id, strategy_id)
            .into_iter()
            .filter(|id| self.index.orders_closed.contains(*id))
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    /// Returns all in-flight orders matching the given optional filters.
    #[must_use]
    pub fn orders_inflight(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<&Order> {
        self.order_ids_filtered(venue, instrument_id, strategy_id)
            .into_iter()
            .filter(|id| self.index.orders_inflight.contains(*id))
            .filter_map(|id| self.orders.get(id))
            .collect()
    }

    /// Adds the given order list to the cache.
    pub fn add_order_list(&mut self, order_list: OrderList) {
        self.order_lists.insert(order_list.id, order_list);
    }

    /// Returns the order list with the given ID, if it exists.
    #[must_use]
    pub fn order_list(&self, order_list_id: &OrderListId) -> Option<&OrderList> {
        self.order_lists.get(order_list_id)
    }

    // -- POSITIONS -------------------------------------------------------------------------------

    /// Adds the given position to the cache, indexed by its identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn add_position(&mut self, position: Position) -> anyhow::Result<()> {
        let position_id = position.id;
        let instrument_id = position.instrument_id;
        let strategy_id = position.strategy_id;

        self.index.positions.insert(position_id);
        self.index.positions_open.insert(position_id);
        self.index
            .venue_positions
            .entry(instrument_id.venue)
            .or_default()
            .insert(position_id);
        self.index
            .position_strategy
            .insert(position_id, strategy_id);
        self.index
            .instrument_positions
            .entry(instrument_id)
            .or_default()
            .insert(position_id);
        self.index
            .strategy_positions
            .entry(strategy_id)
            .or_default()
            .insert(position_id);
        self.index
            .position_orders
            .entry(position_id)
            .or_default()
            .insert(position.opening_order_id);
        self.index
            .order_position
            .insert(position.opening_order_id, position_id);

        if let Some(db) = &mut self.database {
            db.add_position(&position)?;
        }

        self.positions.insert(position_id, position);
        Ok(())
    }

    /// Updates the given position in the cache, reindexing open/closed state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn update_position(&mut self, position: &Position) -> anyhow::Result<()> {
        if position.is_open() {
            self.index.positions_closed.remove(&position.id);
            self.index.positions_open.insert(position.id);
        } else {
            self.index.positions_open.remove(&position.id);
            self.index.positions_closed.insert(position.id);
        }

        if let Some(db) = &mut self.database {
            db.update_position(position)?;
        }

        self.positions.insert(position.id, position.clone());
        Ok(())
    }

    /// Returns the position with the given ID, if it exists.
    #[must_use]
    pub fn position(&self, position_id: &PositionId) -> Option<&Position> {
        self.positions.get(position_id)
    }

    /// Returns the position associated with the given client order ID, if any.
    #[must_use]
    pub fn position_for_order(&self, client_order_id: &ClientOrderId) -> Option<&Position> {
        self.index
            .order_position
            .get(client_order_id)
            .and_then(|position_id| self.positions.get(position_id))
    }

    /// Returns the position ID associated with the given client order ID, if indexed.
    #[must_use]
    pub fn position_id(&self, client_order_id: &ClientOrderId) -> Option<&PositionId> {
        self.index.order_position.get(client_order_id)
    }

    fn position_ids_filtered(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<&PositionId> {
        self.index
            .positions
            .iter()
            .filter(|id| {
                venue.is_none_or(|v| {
                    self.index
                        .venue_positions
                        .get(v)
                        .is_some_and(|ids| ids.contains(id))
                })
            })
            .filter(|id| {
                instrument_id.is_none_or(|i| {
                    self.index
                        .instrument_positions
                        .get(i)
                        .is_some_and(|ids| ids.contains(id))
                })
            })
            .filter(|id| {
                strategy_id.is_none_or(|s| {
                    self.index
                        .strategy_positions
                        .get(s)
                        .is_some_and(|ids| ids.contains(id))
                })
            })
            .collect()
    }

    /// Returns all positions matching the given optional filters.
    #[must_use]
    pub fn positions(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<&Position> {
        self.position_ids_filtered(venue, instrument_id, strategy_id)
            .into_iter()
            .filter_map(|id| self.positions.get(id))
            .collect()
    }

    /// Returns all open positions matching the given optional filters.
    #[must_use]
    pub fn positions_open(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<&Position> {
        self.position_ids_filtered(venue, instrument_id, strategy_id)
            .into_iter()
            .filter(|id| self.index.positions_open.contains(*id))
            .filter_map(|id| self.positions.get(id))
            .collect()
    }

    /// Returns all closed positions matching the given optional filters.
    #[must_use]
    pub fn positions_closed(
        &self,
        venue: Option<&Venue>,
        instrument_id: Option<&InstrumentId>,
        strategy_id: Option<&StrategyId>,
    ) -> Vec<&Position> {
        self.position_ids_filtered(venue, instrument_id, strategy_id)
            .into_iter()
            .filter(|id| self.index.positions_closed.contains(*id))
            .filter_map(|id| self.positions.get(id))
            .collect()
    }

    /// Adds a serialized position snapshot.
    pub fn add_position_snapshot(&mut self, position_id: PositionId, snapshot: Bytes) {
        self.position_snapshots.insert(position_id, snapshot);
    }

    /// Returns the serialized position snapshot for the given ID, if it exists.
    #[must_use]
    pub fn position_snapshot(&self, position_id: &PositionId) -> Option<&Bytes> {
        self.position_snapshots.get(position_id)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_core::UnixNanos;
    use argo_model::{
        events::order::OrderInitializedBuilder,
        instruments::stubs::crypto_perpetual_btcusdt,
        types::{Price, Quantity},
    };
    use rstest::rstest;

    use super::*;

    fn test_order(client_order_id: &str) -> Order {
        Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new(client_order_id))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .build()
                .unwrap(),
        )
    }

    #[rstest]
    fn test_add_instrument_and_query() {
        let mut cache = Cache::default();
        let instrument = crypto_perpetual_btcusdt();
        cache.add_instrument(instrument.clone()).unwrap();

        assert_eq!(cache.instrument(&instrument.id()), Some(&instrument));
        assert_eq!(cache.instruments(None).len(), 1);
        assert_eq!(
            cache
                .instruments(Some(&Venue::new("BINANCE")))
                .len(),
            1
        );
        assert!(cache.instruments(Some(&Venue::new("BYBIT"))).is_empty());
    }

    #[rstest]
    fn test_quote_window_newest_first() {
        let mut cache = Cache::default();
        let instrument_id = InstrumentId::from("ETHUSDT.BINANCE");
        for i in 1..=3_u64 {
            cache.add_quote(QuoteTick::new(
                instrument_id,
                Price::from("100.00"),
                Price::from("100.10"),
                Quantity::from("1.0"),
                Quantity::from("1.0"),
                UnixNanos::from(i),
                UnixNanos::from(i),
            ));
        }

        assert_eq!(cache.quote(&instrument_id).unwrap().ts_init, UnixNanos::from(3));
        assert_eq!(cache.quotes(&instrument_id).unwrap().len(), 3);
    }

    #[rstest]
    fn test_tick_capacity_bounded() {
        let mut cache = Cache::new(
            Some(CacheConfig {
                tick_capacity: 2,
                ..CacheConfig::default()
            }),
            None,
        );
        let instrument_id = InstrumentId::from("ETHUSDT.BINANCE");
        for i in 1..=5_u64 {
            cache.add_quote(QuoteTick::new(
                instrument_id,
                Price::from("100.00"),
                Price::from("100.10"),
                Quantity::from("1.0"),
                Quantity::from("1.0"),
                UnixNanos::from(i),
                UnixNanos::from(i),
            ));
        }

        let quotes = cache.quotes(&instrument_id).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].ts_init, UnixNanos::from(5));
    }

    #[rstest]
    fn test_add_order_and_indices() {
        let mut cache = Cache::default();
        let order = test_order("O-1");
        cache.add_order(order, None, None, false).unwrap();

        assert!(cache.order_exists(&ClientOrderId::new("O-1")));
        assert_eq!(cache.orders(None, None, None).len(), 1);
        assert_eq!(
            cache
                .orders(
                    Some(&Venue::new("BINANCE")),
                    Some(&InstrumentId::from("BTCUSDT-PERP.BINANCE")),
                    None,
                )
                .len(),
            1
        );
        // Initialized orders are neither open nor closed
        assert!(cache.orders_open(None, None, None).is_empty());
        assert!(cache.orders_closed(None, None, None).is_empty());
    }

    #[rstest]
    fn test_duplicate_order_rejected() {
        let mut cache = Cache::default();
        cache
            .add_order(test_order("O-1"), None, None, false)
            .unwrap();
        let result = cache.add_order(test_order("O-1"), None, None, false);
        assert!(result.is_err());
    }

    #[rstest]
    fn test_price_sources() {
        use argo_model::{data::TradeTick, enums::AggressorSide, identifiers::TradeId};

        let mut cache = Cache::default();
        let instrument_id = InstrumentId::from("ETHUSDT.BINANCE");
        cache.add_quote(QuoteTick::new(
            instrument_id,
            Price::from("100.00"),
            Price::from("100.20"),
            Quantity::from("1.0"),
            Quantity::from("1.0"),
            UnixNanos::from(1),
            UnixNanos::from(1),
        ));
        cache.add_trade(TradeTick::new(
            instrument_id,
            Price::from("100.10"),
            Quantity::from("0.5"),
            AggressorSide::Buyer,
            TradeId::new("T-1"),
            UnixNanos::from(2),
            UnixNanos::from(2),
        ));

        assert_eq!(
            cache.price(&instrument_id, PriceType::Last),
            Some(Price::from("100.10"))
        );
        assert_eq!(
            cache.price(&instrument_id, PriceType::Bid),
            Some(Price::from("100.00"))
        );
        assert_eq!(
            cache.price(&instrument_id, PriceType::Mid),
            Some(Price::from("100.100"))
        );
    }

    #[rstest]
    fn test_venue_order_id_index() {
        let mut cache = Cache::default();
        let order = test_order("O-1");
        cache.add_order(order, None, None, false).unwrap();
        cache.add_venue_order_id(&ClientOrderId::new("O-1"), &VenueOrderId::new("V-9"));

        assert_eq!(
            cache.client_order_id(&VenueOrderId::new("V-9")),
            Some(&ClientOrderId::new("O-1"))
        );
        assert_eq!(
            cache.venue_order_id(&ClientOrderId::new("O-1")),
            Some(&VenueOrderId::new("V-9"))
        );
    }

    #[rstest]
    fn test_general_bytes_round_trip() {
        let mut cache = Cache::default();
        cache.add("my-key", Bytes::from_static(b"some-value")).unwrap();
        assert_eq!(cache.get("my-key"), Some(&Bytes::from_static(b"some-value")));
        assert!(cache.get("missing").is_none());
    }

    #[rstest]
    fn test_orders_open_transitions() {
        use argo_core::UUID4;
        use argo_model::{events::order::{OrderAccepted, OrderSubmitted}, identifiers::AccountId};

        let mut cache = Cache::default();
        let mut order = test_order("O-1");
        cache.add_order(order.clone(), None, None, false).unwrap();

        order
            .apply(argo_model::events::OrderEventAny::Submitted(OrderSubmitted {
                trader_id: order.trader_id,
                strategy_id: order.strategy_id,
                instrument_id: order.instrument_id,
                client_order_id: order.client_order_id,
                account_id: AccountId::default(),
                event_id: UUID4::new(),
                ts_event: UnixNanos::from(1),
                ts_init: UnixNanos::from(1),
            }))
            .unwrap();
        cache.update_order(&order).unwrap();
        assert_eq!(cache.orders_inflight(None, None, None).len(), 1);

        order
            .apply(argo_model::events::OrderEventAny::Accepted(OrderAccepted {
                trader_id: order.trader_id,
                strategy_id: order.strategy_id,
                instrument_id: order.instrument_id,
                client_order_id: order.client_order_id,
                venue_order_id: VenueOrderId::new("V-1"),
                account_id: AccountId::default(),
                event_id: UUID4::new(),
                ts_event: UnixNanos::from(2),
                ts_init: UnixNanos::from(2),
                reconciliation: false,
            }))
            .unwrap();
        cache.update_order(&order).unwrap();

        assert_eq!(cache.orders_open(None, None, None).len(), 1);
        assert!(cache.orders_inflight(None, None, None).is_empty());
    }
}
