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

//! An order matching engine for a single market.
//!
//! Tick-driven: on each incoming book update, quote, trade or bar the engine
//! updates its book, evaluates all resting orders for trigger/fill, and
//! collects the resulting order events for the owning exchange to emit.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use argo_common::{
    cache::Cache,
    clock::Clock,
    messages::execution::{CancelAllOrders, CancelOrder, ModifyOrder},
};
use argo_core::{UUID4, UnixNanos};
use argo_model::{
    data::{Bar, OrderBookDelta, OrderBookDeltas, OrderBookDepth10, QuoteTick, TradeTick},
    enums::{
        AggregationSource, AggressorSide, BookType, ContingencyType, LiquiditySide, OmsType,
        OrderSide, OrderSideSpecified, OrderStatus, OrderType, TimeInForce, TrailingOffsetType,
    },
    events::{
        OrderAccepted, OrderCancelRejected, OrderCanceled, OrderEventAny, OrderExpired,
        OrderFilled, OrderModifyRejected, OrderRejected, OrderTriggered, OrderUpdated,
    },
    identifiers::{AccountId, ClientOrderId, Venue},
    instruments::{EXPIRING_INSTRUMENT_CLASSES, Instrument, InstrumentAny},
    orderbook::OrderBook,
    orders::Order,
    types::{Price, Quantity},
};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::{
    ids::IdsGenerator,
    matching::core::OrderMatchingCore,
    models::{FeeModel, FillModel},
};

/// Configuration for `OrderMatchingEngine` instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderMatchingEngineConfig {
    /// If the engine processes bars into synthetic ticks for execution.
    pub bar_execution: bool,
    /// If stop orders already in the market at submit are rejected.
    pub reject_stop_orders: bool,
    /// If GTD orders are supported (otherwise treated as GTC).
    pub support_gtd_orders: bool,
    /// If contingent orders (OTO/OCO/OUO) are supported.
    pub support_contingent_orders: bool,
    /// If filled quantity is persistently removed from the simulated book, so
    /// subsequent fills against the same level are not possible until the
    /// data feed replenishes it. Effective for L1 books; deeper books are
    /// replenished by replay. Default is non-stateful replay.
    pub liquidity_consumption: bool,
}

impl Default for OrderMatchingEngineConfig {
    /// Creates a new default [`OrderMatchingEngineConfig`] instance.
    fn default() -> Self {
        Self {
            bar_execution: true,
            reject_stop_orders: true,
            support_gtd_orders: true,
            support_contingent_orders: true,
            liquidity_consumption: false,
        }
    }
}

/// An order matching engine for a single market.
pub struct OrderMatchingEngine {
    /// The venue for the matching engine.
    pub venue: Venue,
    /// The instrument for the matching engine.
    pub instrument: InstrumentAny,
    /// The order book type for the matching engine.
    pub book_type: BookType,
    /// The order management system (OMS) type for the matching engine.
    pub oms_type: OmsType,
    /// The account ID for events produced by the engine.
    pub account_id: AccountId,
    /// The config for the matching engine.
    pub config: OrderMatchingEngineConfig,
    clock: Rc<RefCell<dyn Clock>>,
    cache: Rc<RefCell<Cache>>,
    book: OrderBook,
    core: OrderMatchingCore,
    fill_model: FillModel,
    fee_model: FeeModel,
    ids_generator: IdsGenerator,
    oto_children: HashMap<ClientOrderId, Vec<Order>>,
    order_index: HashMap<ClientOrderId, Order>,
    events: Vec<OrderEventAny>,
}

impl OrderMatchingEngine {
    /// Creates a new [`OrderMatchingEngine`] instance.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        instrument: InstrumentAny,
        fill_model: FillModel,
        fee_model: FeeModel,
        book_type: BookType,
        oms_type: OmsType,
        account_id: AccountId,
        clock: Rc<RefCell<dyn Clock>>,
        cache: Rc<RefCell<Cache>>,
        config: OrderMatchingEngineConfig,
    ) -> Self {
        let venue = instrument.id().venue;
        let book = OrderBook::new(instrument.id(), book_type);
        let core = OrderMatchingCore::new(instrument.id(), instrument.price_increment());
        Self {
            venue,
            instrument,
            book_type,
            oms_type,
            account_id,
            config,
            clock,
            cache,
            book,
            core,
            fill_model,
            fee_model,
            ids_generator: IdsGenerator::new(venue),
            oto_children: HashMap::new(),
            order_index: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Resets the engine to an initial state.
    pub fn reset(&mut self) {
        self.book.clear(0, UnixNanos::default());
        self.core.reset();
        self.ids_generator.reset();
        self.oto_children.clear();
        self.order_index.clear();
        self.events.clear();
        log::info!("Reset OrderMatchingEngine for {}", self.instrument.id());
    }

    /// Drains and returns the order events produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<OrderEventAny> {
        std::mem::take(&mut self.events)
    }

    /// Returns the best bid price in the book, if any.
    #[must_use]
    pub fn best_bid_price(&self) -> Option<Price> {
        self.book.best_bid_price()
    }

    /// Returns the best ask price in the book, if any.
    #[must_use]
    pub fn best_ask_price(&self) -> Option<Price> {
        self.book.best_ask_price()
    }

    /// Returns a reference to the engine's order book.
    #[must_use]
    pub const fn get_book(&self) -> &OrderBook {
        &self.book
    }

    /// Returns all open (resting) orders in the matching core.
    #[must_use]
    pub fn get_open_orders(&self) -> Vec<Order> {
        self.core.get_orders()
    }

    /// Returns whether an order with the given ID exists in the matching core.
    #[must_use]
    pub fn order_exists(&self, client_order_id: ClientOrderId) -> bool {
        self.core.order_exists(client_order_id)
    }

    // -- DATA PROCESSING -------------------------------------------------------------------------

    /// Processes the given order book delta through the engine.
    pub fn process_order_book_delta(&mut self, delta: &OrderBookDelta) {
        log::debug!("Processing {delta}");

        if self.book_type == BookType::L2_MBP || self.book_type == BookType::L3_MBO {
            self.book.apply_delta(delta);
        }

        self.iterate(delta.ts_event);
    }

    /// Processes the given order book deltas through the engine.
    pub fn process_order_book_deltas(&mut self, deltas: &OrderBookDeltas) {
        log::debug!("Processing {deltas:?}");

        if self.book_type == BookType::L2_MBP || self.book_type == BookType::L3_MBO {
            self.book.apply_deltas(deltas);
        }

        self.iterate(deltas.ts_event);
    }

    /// Processes the given depth snapshot through the engine.
    pub fn process_order_book_depth10(&mut self, depth: &OrderBookDepth10) {
        log::debug!("Processing {depth}");

        if self.book_type == BookType::L2_MBP || self.book_type == BookType::L3_MBO {
            self.book.apply_depth(depth);
        }

        self.iterate(depth.ts_event);
    }

    /// Processes the given quote tick through the engine.
    pub fn process_quote_tick(&mut self, quote: &QuoteTick) {
        log::debug!("Processing {quote}");

        if self.book_type == BookType::L1_MBP {
            self.book
                .update_quote_tick(quote)
                .expect("Book type checked");
        }

        self.iterate(quote.ts_event);
    }

    /// Processes the given trade tick through the engine.
    ///
    /// The trade price acts as a transient price override: a trade with
    /// aggressor SELL at price *P* matches any resting BUY with price >= *P*
    /// (and symmetrically), allowing fills better than the current book top
    /// when the trade itself is the evidence of that price.
    pub fn process_trade_tick(&mut self, trade: &TradeTick) {
        log::debug!("Processing {trade}");

        if self.book_type == BookType::L1_MBP {
            self.book
                .update_trade_tick(trade)
                .expect("Book type checked");
        }
        self.core.set_last_raw(trade.price);

        match trade.aggressor_side {
            AggressorSide::Seller => {
                self.core
                    .set_transient_override(None, Some(trade.price));
            }
            AggressorSide::Buyer => {
                self.core
                    .set_transient_override(Some(trade.price), None);
            }
            AggressorSide::NoAggressor => {}
        }

        self.iterate(trade.ts_event);
        self.core.clear_transient_override();
    }

    /// Processes the given bar through the engine by decomposing it into
    /// synthetic trades in O-H-L-C order (L1 books only).
    pub fn process_bar(&mut self, bar: &Bar) {
        if !self.config.bar_execution || self.book_type != BookType::L1_MBP {
            return;
        }

        let bar_type = bar.bar_type;
        // Do not process internally aggregated bars
        if bar_type.aggregation_source() == AggregationSource::Internal {
            return;
        }

        log::debug!("Processing {bar}");
        self.process_trade_ticks_from_bar(bar);
    }

    fn process_trade_ticks_from_bar(&mut self, bar: &Bar) {
        // Split the bar into 4 trades with quarter volume
        let size = Quantity::new(bar.volume.as_f64() / 4.0, bar.volume.precision);
        if size.is_zero() {
            return;
        }

        let aggressor_side = if !self.core.is_last_initialized || bar.open > self.core.last.unwrap()
        {
            AggressorSide::Buyer
        } else {
            AggressorSide::Seller
        };

        let mut trade = TradeTick::new(
            bar.instrument_id(),
            bar.open,
            size,
            aggressor_side,
            self.ids_generator.generate_trade_id(),
            bar.ts_event,
            bar.ts_init,
        );

        // Open
        self.process_trade_tick(&trade);

        // High (assumption: market traded up, aggressor lifting the offer)
        if self.core.last.is_some_and(|last| bar.high > last) {
            trade.price = bar.high;
            trade.aggressor_side = AggressorSide::Buyer;
            trade.trade_id = self.ids_generator.generate_trade_id();
            self.process_trade_tick(&trade);
        }

        // Low (assumption: market traded down, aggressor hitting the bid)
        if self.core.last.is_some_and(|last| bar.low < last) {
            trade.price = bar.low;
            trade.aggressor_side = AggressorSide::Seller;
            trade.trade_id = self.ids_generator.generate_trade_id();
            self.process_trade_tick(&trade);
        }

        // Close
        if self.core.last.is_some_and(|last| bar.close != last) {
            trade.aggressor_side = if bar.close > self.core.last.unwrap() {
                AggressorSide::Buyer
            } else {
                AggressorSide::Seller
            };
            trade.price = bar.close;
            trade.trade_id = self.ids_generator.generate_trade_id();
            self.process_trade_tick(&trade);
        }
    }

    // -- TRADING COMMANDS ------------------------------------------------------------------------

    /// Processes the given order through the engine.
    pub fn process_order(&mut self, order: &mut Order) {
        if self.core.order_exists(order.client_order_id) {
            self.generate_order_rejected(order, "Order already exists");
            return;
        }

        // Check for instrument expiration or activation
        if EXPIRING_INSTRUMENT_CLASSES.contains(&self.instrument.instrument_class()) {
            let ts_now = self.clock.borrow().timestamp_ns();
            if let Some(activation_ns) = self.instrument.activation_ns() {
                if ts_now < activation_ns {
                    self.generate_order_rejected(
                        order,
                        &format!(
                            "Contract {} is not yet active, activation {activation_ns}",
                            self.instrument.id(),
                        ),
                    );
                    return;
                }
            }
            if let Some(expiration_ns) = self.instrument.expiration_ns() {
                if ts_now >= expiration_ns {
                    self.generate_order_rejected(
                        order,
                        &format!(
                            "Contract {} has expired, expiration {expiration_ns}",
                            self.instrument.id(),
                        ),
                    );
                    return;
                }
            }
        }

        // Contingent child orders wait for their parent
        if self.config.support_contingent_orders {
            if let Some(parent_order_id) = order.parent_order_id {
                let parent_status = self.order_index.get(&parent_order_id).map(|o| o.status);
                match parent_status {
                    Some(OrderStatus::Rejected | OrderStatus::Canceled | OrderStatus::Expired | OrderStatus::Denied) => {
                        self.generate_order_rejected(
                            order,
                            &format!("Contingent parent {parent_order_id} closed"),
                        );
                        return;
                    }
                    Some(OrderStatus::Filled | OrderStatus::PartiallyFilled) | None => {
                        // Parent executed (or unknown): process the child now
                    }
                    Some(_) => {
                        // Parent still working: hold the child until it fills
                        log::debug!(
                            "Holding OTO child {} for parent {parent_order_id}",
                            order.client_order_id,
                        );
                        self.order_index
                            .insert(order.client_order_id, order.clone());
                        self.oto_children
                            .entry(parent_order_id)
                            .or_default()
                            .push(order.clone());
                        return;
                    }
                }
            }
        }

        // Reduce-only orders are clamped to the open position, never rejected
        if order.is_reduce_only {
            let position_qty = self.open_position_qty();
            if position_qty.is_zero() {
                self.generate_order_canceled(order, "Reduce-only order with no open position");
                return;
            }
            if order.quantity > position_qty {
                let (price, trigger_price) = (order.price, order.trigger_price);
                self.generate_order_updated(order, position_qty, price, trigger_price);
            }
        }

        match order.order_type {
            OrderType::Market => self.process_market_order(order),
            OrderType::Limit => self.process_limit_order(order),
            OrderType::StopMarket | OrderType::TrailingStopMarket => {
                self.process_stop_market_order(order);
            }
            OrderType::StopLimit | OrderType::TrailingStopLimit => {
                self.process_stop_limit_order(order);
            }
            OrderType::MarketIfTouched => self.process_market_if_touched_order(order),
            OrderType::LimitIfTouched => self.process_limit_if_touched_order(order),
        }

        self.order_index
            .insert(order.client_order_id, order.clone());
    }

    fn process_market_order(&mut self, order: &mut Order) {
        if order.time_in_force == TimeInForce::Fok && !self.is_fok_fillable(order) {
            self.generate_order_canceled(order, "FOK order could not be filled in full");
            return;
        }

        self.fill_market_order(order);

        if order.leaves_qty.is_positive() && !order.is_closed() {
            self.generate_order_canceled(order, "Market order unfilled remainder");
        }
    }

    fn process_limit_order(&mut self, order: &mut Order) {
        let price = order.price.expect("LIMIT order must have price");
        let crossing = self.core.is_limit_matched(order.side_specified(), price);

        if crossing && order.is_post_only {
            // Post-only limits that would be takers at submit time are rejected
            self.generate_order_rejected_post_only(order, price);
            return;
        }

        if order.time_in_force == TimeInForce::Fok && !self.is_fok_fillable(order) {
            self.generate_order_canceled(order, "FOK order could not be filled in full");
            return;
        }

        self.generate_order_accepted(order);

        if crossing {
            self.fill_limit_order_as_taker(order);
        }

        if order.leaves_qty.is_positive() && !order.is_closed() {
            match order.time_in_force {
                TimeInForce::Ioc | TimeInForce::Fok => {
                    self.generate_order_canceled(order, "IOC/FOK unfilled remainder");
                }
                _ => self.core.add_order(order.clone()),
            }
        }
    }

    fn process_stop_market_order(&mut self, order: &mut Order) {
        let trigger_price = order.trigger_price.expect("STOP order must have trigger");
        if self
            .core
            .is_stop_triggered(order.side_specified(), trigger_price)
        {
            if self.config.reject_stop_orders {
                self.generate_order_rejected(
                    order,
                    &format!("STOP trigger {trigger_price} already in the market"),
                );
                return;
            }
            self.generate_order_accepted(order);
            self.generate_order_triggered(order);
            self.fill_market_order(order);
            return;
        }

        self.generate_order_accepted(order);
        self.core.add_order(order.clone());
    }

    fn process_stop_limit_order(&mut self, order: &mut Order) {
        let trigger_price = order.trigger_price.expect("STOP order must have trigger");
        if self
            .core
            .is_stop_triggered(order.side_specified(), trigger_price)
        {
            if self.config.reject_stop_orders {
                self.generate_order_rejected(
                    order,
                    &format!("STOP trigger {trigger_price} already in the market"),
                );
                return;
            }
            self.generate_order_accepted(order);
            self.generate_order_triggered(order);

            let price = order.price.expect("STOP_LIMIT order must have price");
            if self.core.is_limit_matched(order.side_specified(), price) {
                self.fill_limit_order_as_taker(order);
            }
            if order.leaves_qty.is_positive() && !order.is_closed() {
                self.core.add_order(order.clone());
            }
            return;
        }

        self.generate_order_accepted(order);
        self.core.add_order(order.clone());
    }

    fn process_market_if_touched_order(&mut self, order: &mut Order) {
        let trigger_price = order.trigger_price.expect("MIT order must have trigger");
        if self
            .core
            .is_touch_triggered(order.side_specified(), trigger_price)
        {
            self.generate_order_accepted(order);
            self.generate_order_triggered(order);
            self.fill_market_order(order);
            return;
        }

        self.generate_order_accepted(order);
        self.core.add_order(order.clone());
    }

    fn process_limit_if_touched_order(&mut self, order: &mut Order) {
        let trigger_price = order.trigger_price.expect("LIT order must have trigger");
        if self
            .core
            .is_touch_triggered(order.side_specified(), trigger_price)
        {
            self.generate_order_accepted(order);
            self.generate_order_triggered(order);

            let price = order.price.expect("LIT order must have price");
            if self.core.is_limit_matched(order.side_specified(), price) {
                self.fill_limit_order_as_taker(order);
            }
            if order.leaves_qty.is_positive() && !order.is_closed() {
                self.core.add_order(order.clone());
            }
            return;
        }

        self.generate_order_accepted(order);
        self.core.add_order(order.clone());
    }

    /// Processes the given modify command against a resting order.
    pub fn process_modify(&mut self, command: &ModifyOrder) {
        let Some(order) = self.core.get_order(command.client_order_id).cloned() else {
            self.generate_order_modify_rejected(command, "Order not found");
            return;
        };

        let mut order = order;
        let new_qty = command.quantity.unwrap_or(order.quantity);
        let new_price = command.price.or(order.price);
        let new_trigger = command.trigger_price.or(order.trigger_price);

        self.generate_order_updated(&mut order, new_qty, new_price, new_trigger);
        self.core.update_order(&order);
        self.order_index
            .insert(order.client_order_id, order.clone());

        // A price move may now cross the market
        if order.order_type == OrderType::Limit {
            if let Some(price) = order.price {
                if self.core.is_limit_matched(order.side_specified(), price) {
                    self.fill_limit_order_resting(&mut order);
                }
            }
        }
    }

    /// Processes the given cancel command against a resting order.
    pub fn process_cancel(&mut self, command: &CancelOrder) {
        let Some(order) = self.core.get_order(command.client_order_id).cloned() else {
            self.generate_order_cancel_rejected(command, "Order not found");
            return;
        };

        let mut order = order;
        self.cancel_order(&mut order, true, "Canceled by request");
    }

    /// Processes the given cancel-all command.
    pub fn process_cancel_all(&mut self, command: &CancelAllOrders) {
        let orders = self.core.get_orders();
        for order in orders {
            if command.order_side != OrderSide::NoOrderSide && order.side != command.order_side {
                continue;
            }
            let mut order = order;
            self.cancel_order(&mut order, true, "Canceled by mass cancel request");
        }
    }

    fn cancel_order(&mut self, order: &mut Order, cancel_contingencies: bool, reason: &str) {
        self.core.delete_order(order.client_order_id);
        self.generate_order_canceled(order, reason);
        self.order_index
            .insert(order.client_order_id, order.clone());

        if cancel_contingencies
            && self.config.support_contingent_orders
            && order.contingency_type == ContingencyType::Oco
        {
            self.cancel_linked_orders(order);
        }
        // An OTO parent canceled before filling cancels its held children
        if let Some(children) = self.oto_children.remove(&order.client_order_id) {
            for child in children {
                let mut child = child;
                self.generate_order_canceled(&mut child, "OTO parent canceled");
                self.order_index
                    .insert(child.client_order_id, child.clone());
            }
        }
    }

    // -- MATCHING --------------------------------------------------------------------------------

    /// Iterates all resting orders, evaluating triggers and fills against the
    /// current market.
    pub fn iterate(&mut self, ts_now: UnixNanos) {
        // Refresh top-of-book state
        if let Some(bid) = self.book.best_bid_price() {
            self.core.set_bid_raw(bid);
        }
        if let Some(ask) = self.book.best_ask_price() {
            self.core.set_ask_raw(ask);
        }

        for order in self.core.get_orders() {
            let mut order = order;

            // A contingency earlier in this pass may have removed the order
            if !self.core.order_exists(order.client_order_id) {
                continue;
            }
            if order.is_closed() {
                self.core.delete_order(order.client_order_id);
                continue;
            }

            // GTD expiry
            if self.config.support_gtd_orders
                && order.time_in_force == TimeInForce::Gtd
                && order.expire_time.is_some_and(|expire| expire <= ts_now)
            {
                self.core.delete_order(order.client_order_id);
                self.generate_order_expired(&mut order);
                self.order_index
                    .insert(order.client_order_id, order.clone());
                continue;
            }

            // Trailing orders recompute their trigger on each best-price update
            if order.is_trailing() {
                self.update_trailing_stop(&mut order);
            }

            match order.order_type {
                OrderType::Limit => {
                    let price = order.price.expect("LIMIT order must have price");
                    if self.core.is_limit_matched(order.side_specified(), price) {
                        self.fill_limit_order_resting(&mut order);
                    }
                }
                OrderType::StopMarket | OrderType::TrailingStopMarket => {
                    let trigger = order.trigger_price.expect("STOP order must have trigger");
                    if self.core.is_stop_triggered(order.side_specified(), trigger) {
                        self.core.delete_order(order.client_order_id);
                        self.generate_order_triggered(&mut order);
                        self.fill_market_order(&mut order);
                    }
                }
                OrderType::StopLimit | OrderType::TrailingStopLimit => {
                    let trigger = order.trigger_price.expect("STOP order must have trigger");
                    if !order.is_triggered {
                        if self.core.is_stop_triggered(order.side_specified(), trigger) {
                            self.generate_order_triggered(&mut order);
                            self.core.update_order(&order);
                        }
                    }
                    if order.is_triggered {
                        let price = order.price.expect("STOP_LIMIT order must have price");
                        if self.core.is_limit_matched(order.side_specified(), price) {
                            self.fill_limit_order_resting(&mut order);
                        }
                    }
                }
                OrderType::MarketIfTouched => {
                    let trigger = order.trigger_price.expect("MIT order must have trigger");
                    if self.core.is_touch_triggered(order.side_specified(), trigger) {
                        self.core.delete_order(order.client_order_id);
                        self.generate_order_triggered(&mut order);
                        self.fill_market_order(&mut order);
                    }
                }
                OrderType::LimitIfTouched => {
                    let trigger = order.trigger_price.expect("LIT order must have trigger");
                    if !order.is_triggered {
                        if self.core.is_touch_triggered(order.side_specified(), trigger) {
                            self.generate_order_triggered(&mut order);
                            self.core.update_order(&order);
                        }
                    }
                    if order.is_triggered {
                        let price = order.price.expect("LIT order must have price");
                        if self.core.is_limit_matched(order.side_specified(), price) {
                            self.fill_limit_order_resting(&mut order);
                        }
                    }
                }
                OrderType::Market => {
                    // Market orders never rest
                    self.core.delete_order(order.client_order_id);
                }
            }
        }
    }

    fn is_fok_fillable(&self, order: &Order) -> bool {
        let fills = self.book.simulate_fills(
            order.side_specified(),
            order.leaves_qty,
            order.price,
        );
        let available: f64 = fills.iter().map(|(_, qty)| qty.as_f64()).sum();
        available >= order.leaves_qty.as_f64()
    }

    /// Fills a market (or triggered market-style) order by walking the book.
    fn fill_market_order(&mut self, order: &mut Order) {
        let fills = self
            .book
            .simulate_fills(order.side_specified(), order.leaves_qty, None);

        if fills.is_empty() {
            self.generate_order_rejected(
                order,
                &format!("No market for {}", self.instrument.id()),
            );
            return;
        }

        if order.venue_order_id.is_none() {
            self.generate_order_accepted(order);
        }

        self.apply_fills(order, &fills, LiquiditySide::Taker);
    }

    /// Fills a limit order crossing the market at submit (taker).
    fn fill_limit_order_as_taker(&mut self, order: &mut Order) {
        let price = order.price.expect("LIMIT order must have price");
        let fills = self
            .book
            .simulate_fills(order.side_specified(), order.leaves_qty, Some(price));

        if fills.is_empty() {
            // Transient override crossing with no book volume: fill at limit
            let leaves = order.leaves_qty;
            self.apply_fills(order, &[(price, leaves)], LiquiditySide::Taker);
            return;
        }

        self.apply_fills(order, &fills, LiquiditySide::Taker);
    }

    /// Fills a resting limit order matched by a market move (maker).
    fn fill_limit_order_resting(&mut self, order: &mut Order) {
        if !self.fill_probability_passes() {
            return; // Queue position uncertainty: not filled on this touch
        }
        let price = order.price.expect("LIMIT order must have price");
        self.core.delete_order(order.client_order_id);
        let leaves = order.leaves_qty;
        self.apply_fills(order, &[(price, leaves)], LiquiditySide::Maker);
    }

    fn fill_probability_passes(&self) -> bool {
        if self.fill_model.prob_fill_on_limit >= 1.0 {
            return true;
        }
        use rand::RngExt;
        rand::rng().random_bool(self.fill_model.prob_fill_on_limit.clamp(0.0, 1.0))
    }

    fn apply_fills(
        &mut self,
        order: &mut Order,
        fills: &[(Price, Quantity)],
        liquidity_side: LiquiditySide,
    ) {
        for (price, quantity) in fills {
            if order.leaves_qty.is_zero() {
                break;
            }
            let last_qty = (*quantity).min(order.leaves_qty);
            self.fill_order(order, *price, last_qty, liquidity_side);

            if self.config.liquidity_consumption {
                self.consume_liquidity(order.side_specified(), *price, last_qty);
            }
        }
    }

    fn fill_order(
        &mut self,
        order: &mut Order,
        last_px: Price,
        last_qty: Quantity,
        liquidity_side: LiquiditySide,
    ) {
        // A produced price outside the instrument's valid range is a fatal
        // engine error: fail fast on precision violations
        assert!(
            last_px.precision == self.instrument.price_precision(),
            "Fill price precision {} invalid for {} (expected {})",
            last_px.precision,
            self.instrument.id(),
            self.instrument.price_precision(),
        );

        let venue_order_id = order
            .venue_order_id
            .unwrap_or_else(|| self.ids_generator.generate_venue_order_id());
        let commission =
            self.fee_model
                .commission(&self.instrument, last_qty, last_px, liquidity_side);
        let ts_now = self.clock.borrow().timestamp_ns();

        let event = OrderEventAny::Filled(OrderFilled {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id,
            account_id: self.account_id,
            trade_id: self.ids_generator.generate_trade_id(),
            order_side: order.side,
            order_type: order.order_type,
            last_qty,
            last_px,
            currency: self.instrument.quote_currency(),
            liquidity_side,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
            position_id: order.position_id,
            commission: Some(commission),
        });

        self.apply_and_collect(order, event);

        if self.config.support_contingent_orders {
            self.handle_contingencies_on_fill(order);
        }
    }

    fn consume_liquidity(&mut self, side: OrderSideSpecified, price: Price, quantity: Quantity) {
        // Persistently remove filled quantity from the simulated book; for L1
        // books this shrinks the synthetic top level until the feed refreshes
        use argo_model::data::delta::BookOrder;

        let (book_side, order_id) = match side {
            OrderSideSpecified::Buy => (OrderSide::Sell, 2),
            OrderSideSpecified::Sell => (OrderSide::Buy, 1),
        };

        if self.book_type != BookType::L1_MBP {
            log::debug!("Liquidity consumption skipped for {} book", self.book_type);
            return;
        }

        let current = match side {
            OrderSideSpecified::Buy => self.book.best_ask_size(),
            OrderSideSpecified::Sell => self.book.best_bid_size(),
        };
        if let Some(current) = current {
            let remaining = current.saturating_sub(quantity);
            self.book.update(
                BookOrder::new(book_side, price, remaining, order_id),
                self.book.sequence + 1,
                self.clock.borrow().timestamp_ns(),
            );
        }
    }

    // -- CONTINGENCIES ---------------------------------------------------------------------------

    fn handle_contingencies_on_fill(&mut self, order: &Order) {
        // One-triggers-other: activate any held children on parent execution
        if let Some(children) = self.oto_children.remove(&order.client_order_id) {
            for child in children {
                log::debug!(
                    "Releasing OTO child {} from parent {}",
                    child.client_order_id,
                    order.client_order_id,
                );
                let mut child = child;
                self.process_order(&mut child);
            }
        }

        match order.contingency_type {
            // One-cancels-other: a fill on one side cancels the linked orders
            ContingencyType::Oco => self.cancel_linked_orders(order),
            // One-updates-other: reduce linked orders to the remaining quantity
            ContingencyType::Ouo => self.update_linked_orders(order),
            _ => {}
        }
    }

    fn cancel_linked_orders(&mut self, order: &Order) {
        let Some(linked) = order.linked_order_ids.clone() else {
            return;
        };
        for linked_id in linked {
            if let Some(linked_order) = self.core.get_order(linked_id).cloned() {
                let mut linked_order = linked_order;
                log::debug!(
                    "OCO: canceling {linked_id} linked to {}",
                    order.client_order_id,
                );
                self.cancel_order(&mut linked_order, false, "OCO linked order executed");
            }
        }
    }

    fn update_linked_orders(&mut self, order: &Order) {
        let Some(linked) = order.linked_order_ids.clone() else {
            return;
        };
        for linked_id in linked {
            if let Some(linked_order) = self.core.get_order(linked_id).cloned() {
                let mut linked_order = linked_order;
                if order.leaves_qty.is_zero() {
                    self.cancel_order(&mut linked_order, false, "OUO linked order fully executed");
                } else if linked_order.quantity != order.leaves_qty {
                    log::debug!(
                        "OUO: updating {linked_id} to quantity {}",
                        order.leaves_qty,
                    );
                    let (price, trigger_price) = (linked_order.price, linked_order.trigger_price);
                    self.generate_order_updated(
                        &mut linked_order,
                        order.leaves_qty,
                        price,
                        trigger_price,
                    );
                    self.core.update_order(&linked_order);
                    self.order_index
                        .insert(linked_order.client_order_id, linked_order.clone());
                }
            }
        }
    }

    // -- TRAILING --------------------------------------------------------------------------------

    fn update_trailing_stop(&mut self, order: &mut Order) {
        let Some(offset) = order.trailing_offset else {
            return;
        };
        let Some(current_trigger) = order.trigger_price else {
            return;
        };

        let reference = match order.side_specified() {
            // A sell trail follows the bid up; a buy trail follows the ask down
            OrderSideSpecified::Sell => self.core.bid,
            OrderSideSpecified::Buy => self.core.ask,
        };
        let Some(reference) = reference else {
            return;
        };

        let offset_value = match order.trailing_offset_type {
            Some(TrailingOffsetType::BasisPoints) => {
                reference.as_f64() * offset.to_f64().unwrap_or(0.0) / 10_000.0
            }
            _ => offset.to_f64().unwrap_or(0.0),
        };

        let precision = self.instrument.price_precision();
        let new_trigger = match order.side_specified() {
            OrderSideSpecified::Sell => {
                let candidate = Price::new(reference.as_f64() - offset_value, precision);
                (candidate > current_trigger).then_some(candidate)
            }
            OrderSideSpecified::Buy => {
                let candidate = Price::new(reference.as_f64() + offset_value, precision);
                (candidate < current_trigger).then_some(candidate)
            }
        };

        if let Some(new_trigger) = new_trigger {
            let (quantity, price) = (order.quantity, order.price);
            self.generate_order_updated(order, quantity, price, Some(new_trigger));
            self.core.update_order(order);
            self.order_index
                .insert(order.client_order_id, order.clone());
        }
    }

    // -- HELPERS ---------------------------------------------------------------------------------

    fn open_position_qty(&self) -> Quantity {
        let cache = self.cache.borrow();
        let signed: f64 = cache
            .positions_open(None, Some(&self.instrument.id()), None)
            .iter()
            .map(|p| p.signed_qty)
            .sum();
        Quantity::new(signed.abs(), self.instrument.size_precision())
    }

    fn apply_and_collect(&mut self, order: &mut Order, event: OrderEventAny) {
        if let Err(e) = order.apply(event.clone()) {
            log::error!("Error applying event in matching engine: {e}");
            return;
        }
        self.order_index
            .insert(order.client_order_id, order.clone());
        self.events.push(event);
    }

    // -- EVENT GENERATORS ------------------------------------------------------------------------

    fn generate_order_rejected(&mut self, order: &mut Order, reason: &str) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::Rejected(OrderRejected {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            account_id: self.account_id,
            reason: Ustr::from(reason),
            due_post_only: false,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_collect(order, event);
    }

    fn generate_order_rejected_post_only(&mut self, order: &mut Order, price: Price) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::Rejected(OrderRejected {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            account_id: self.account_id,
            reason: Ustr::from(&format!(
                "POST_ONLY LIMIT order would have been a taker at {price}"
            )),
            due_post_only: true,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_collect(order, event);
    }

    fn generate_order_accepted(&mut self, order: &mut Order) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let venue_order_id = order
            .venue_order_id
            .unwrap_or_else(|| self.ids_generator.generate_venue_order_id());
        let event = OrderEventAny::Accepted(OrderAccepted {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id,
            account_id: self.account_id,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_collect(order, event);
    }

    fn generate_order_triggered(&mut self, order: &mut Order) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::Triggered(OrderTriggered {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id,
            account_id: Some(self.account_id),
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_collect(order, event);
    }

    fn generate_order_canceled(&mut self, order: &mut Order, reason: &str) {
        log::debug!("Canceling {}: {reason}", order.client_order_id);
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::Canceled(OrderCanceled {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id,
            account_id: Some(self.account_id),
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_collect(order, event);
    }

    fn generate_order_expired(&mut self, order: &mut Order) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::Expired(OrderExpired {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id,
            account_id: Some(self.account_id),
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_collect(order, event);
    }

    fn generate_order_updated(
        &mut self,
        order: &mut Order,
        quantity: Quantity,
        price: Option<Price>,
        trigger_price: Option<Price>,
    ) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::Updated(OrderUpdated {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id,
            account_id: Some(self.account_id),
            quantity,
            price,
            trigger_price,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_collect(order, event);
    }

    fn generate_order_modify_rejected(&mut self, command: &ModifyOrder, reason: &str) {
        let ts_now = self.clock.borrow().timestamp_ns();
        self.events
            .push(OrderEventAny::ModifyRejected(OrderModifyRejected {
                trader_id: command.trader_id,
                strategy_id: command.strategy_id,
                instrument_id: command.instrument_id,
                client_order_id: command.client_order_id,
                venue_order_id: command.venue_order_id,
                account_id: Some(self.account_id),
                reason: Ustr::from(reason),
                event_id: UUID4::new(),
                ts_event: ts_now,
                ts_init: ts_now,
                reconciliation: false,
            }));
    }

    fn generate_order_cancel_rejected(&mut self, command: &CancelOrder, reason: &str) {
        let ts_now = self.clock.borrow().timestamp_ns();
        self.events
            .push(OrderEventAny::CancelRejected(OrderCancelRejected {
                trader_id: command.trader_id,
                strategy_id: command.strategy_id,
                instrument_id: command.instrument_id,
                client_order_id: command.client_order_id,
                venue_order_id: command.venue_order_id,
                account_id: Some(self.account_id),
                reason: Ustr::from(reason),
                event_id: UUID4::new(),
                ts_event: ts_now,
                ts_init: ts_now,
                reconciliation: false,
            }));
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_common::clock::TestClock;
    use argo_model::{
        events::order::OrderInitializedBuilder,
        identifiers::{InstrumentId, OrderListId, VenueOrderId},
        instruments::stubs::{crypto_perpetual_btcusdt, currency_pair_low_priced},
        types::Currency,
    };
    use rstest::rstest;

    use super::*;

    fn engine(instrument: InstrumentAny) -> OrderMatchingEngine {
        let clock = Rc::new(RefCell::new(TestClock::new()));
        let cache = Rc::new(RefCell::new(Cache::default()));
        cache.borrow_mut().add_instrument(instrument.clone()).unwrap();
        OrderMatchingEngine::new(
            instrument,
            FillModel::default(),
            FeeModel,
            BookType::L1_MBP,
            OmsType::Netting,
            AccountId::new("SIM-001"),
            clock,
            cache,
            OrderMatchingEngineConfig::default(),
        )
    }

    fn btcusdt_engine_with_quote(bid: &str, ask: &str) -> OrderMatchingEngine {
        let mut engine = engine(crypto_perpetual_btcusdt());
        let quote = QuoteTick::new(
            InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            Price::from(bid),
            Price::from(ask),
            Quantity::from("1.000"),
            Quantity::from("1.000"),
            UnixNanos::from(1),
            UnixNanos::from(1),
        );
        engine.process_quote_tick(&quote);
        engine
    }

    fn order(
        id: &str,
        side: OrderSide,
        order_type: OrderType,
        qty: &str,
        price: Option<&str>,
        trigger: Option<&str>,
    ) -> Order {
        let mut builder = OrderInitializedBuilder::default();
        builder
            .client_order_id(ClientOrderId::new(id))
            .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
            .order_side(side)
            .order_type(order_type)
            .quantity(Quantity::from(qty));
        if let Some(price) = price {
            builder.price(Some(Price::from(price)));
        }
        if let Some(trigger) = trigger {
            builder.trigger_price(Some(Price::from(trigger)));
        }
        Order::new(builder.build().unwrap())
    }

    fn fills_of(events: &[OrderEventAny]) -> Vec<&OrderFilled> {
        events
            .iter()
            .filter_map(|event| match event {
                OrderEventAny::Filled(fill) => Some(fill),
                _ => None,
            })
            .collect()
    }

    #[rstest]
    fn test_market_order_fills_at_ask_as_taker() {
        // Seed top of book bid 50000.00 x 1.000 / ask 50000.50 x 1.000, then
        // submit BUY MARKET 0.500: filled at the ask as taker
        let mut engine = btcusdt_engine_with_quote("50000.00", "50000.50");
        let mut market = order("O-1", OrderSide::Buy, OrderType::Market, "0.500", None, None);

        engine.process_order(&mut market);
        let events = engine.drain_events();

        let fills = fills_of(&events);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].last_px, Price::from("50000.50"));
        assert_eq!(fills[0].last_qty, Quantity::from("0.500"));
        assert_eq!(fills[0].liquidity_side, LiquiditySide::Taker);
        assert!(fills[0].commission.is_some());
        assert_eq!(market.status, OrderStatus::Filled);
    }

    #[rstest]
    fn test_market_order_empty_book_rejected() {
        let mut engine = engine(crypto_perpetual_btcusdt());
        let mut market = order("O-1", OrderSide::Buy, OrderType::Market, "0.500", None, None);

        engine.process_order(&mut market);
        let events = engine.drain_events();

        assert!(matches!(events.last(), Some(OrderEventAny::Rejected(_))));
        assert_eq!(market.status, OrderStatus::Rejected);
    }

    #[rstest]
    fn test_limit_order_rests_then_fills_on_cross() {
        let mut engine = btcusdt_engine_with_quote("50000.00", "50000.50");
        let mut limit = order(
            "O-1",
            OrderSide::Buy,
            OrderType::Limit,
            "0.500",
            Some("49999.00"),
            None,
        );

        engine.process_order(&mut limit);
        assert!(engine.order_exists(ClientOrderId::new("O-1")));
        let events = engine.drain_events();
        assert!(matches!(events.last(), Some(OrderEventAny::Accepted(_))));

        // Market drops through the limit price
        let quote = QuoteTick::new(
            InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            Price::from("49998.00"),
            Price::from("49998.50"),
            Quantity::from("1.000"),
            Quantity::from("1.000"),
            UnixNanos::from(2),
            UnixNanos::from(2),
        );
        engine.process_quote_tick(&quote);

        let events = engine.drain_events();
        let fills = fills_of(&events);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].last_px, Price::from("49999.00"));
        assert_eq!(fills[0].liquidity_side, LiquiditySide::Maker);
        assert!(!engine.order_exists(ClientOrderId::new("O-1")));
    }

    #[rstest]
    fn test_post_only_taker_rejected() {
        let mut engine = btcusdt_engine_with_quote("50000.00", "50000.50");
        let mut limit = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-1"))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .order_side(OrderSide::Buy)
                .order_type(OrderType::Limit)
                .price(Some(Price::from("50001.00"))) // Crosses the ask
                .quantity(Quantity::from("0.500"))
                .post_only(true)
                .build()
                .unwrap(),
        );

        engine.process_order(&mut limit);
        let events = engine.drain_events();

        match events.last() {
            Some(OrderEventAny::Rejected(rejected)) => assert!(rejected.due_post_only),
            other => panic!("Expected rejection, was {other:?}"),
        }
    }

    #[rstest]
    fn test_fok_unfillable_canceled_without_fills() {
        // Only 1.000 available at the ask
        let mut engine = btcusdt_engine_with_quote("50000.00", "50000.50");
        let mut market = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-1"))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .order_side(OrderSide::Buy)
                .order_type(OrderType::Market)
                .quantity(Quantity::from("2.000"))
                .time_in_force(TimeInForce::Fok)
                .build()
                .unwrap(),
        );

        engine.process_order(&mut market);
        let events = engine.drain_events();

        assert!(fills_of(&events).is_empty());
        assert!(matches!(events.last(), Some(OrderEventAny::Canceled(_))));
    }

    #[rstest]
    fn test_stop_market_triggers_and_fills() {
        let mut engine = btcusdt_engine_with_quote("50000.00", "50000.50");
        let mut stop = order(
            "O-1",
            OrderSide::Buy,
            OrderType::StopMarket,
            "0.500",
            None,
            Some("50100.00"),
        );

        engine.process_order(&mut stop);
        assert!(engine.order_exists(ClientOrderId::new("O-1")));
        engine.drain_events();

        // Market prints through the trigger
        let quote = QuoteTick::new(
            InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            Price::from("50100.00"),
            Price::from("50100.50"),
            Quantity::from("1.000"),
            Quantity::from("1.000"),
            UnixNanos::from(2),
            UnixNanos::from(2),
        );
        engine.process_quote_tick(&quote);

        let events = engine.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, OrderEventAny::Triggered(_))));
        let fills = fills_of(&events);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].last_px, Price::from("50100.50"));
    }

    #[rstest]
    fn test_stop_already_in_market_rejected() {
        let mut engine = btcusdt_engine_with_quote("50000.00", "50000.50");
        let mut stop = order(
            "O-1",
            OrderSide::Buy,
            OrderType::StopMarket,
            "0.500",
            None,
            Some("50000.25"), // Ask already >= trigger
        );

        engine.process_order(&mut stop);
        let events = engine.drain_events();
        assert!(matches!(events.last(), Some(OrderEventAny::Rejected(_))));
    }

    #[rstest]
    fn test_gtd_order_expires() {
        let mut engine = btcusdt_engine_with_quote("50000.00", "50000.50");
        let mut limit = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-1"))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .order_side(OrderSide::Buy)
                .order_type(OrderType::Limit)
                .price(Some(Price::from("49000.00")))
                .quantity(Quantity::from("0.500"))
                .time_in_force(TimeInForce::Gtd)
                .expire_time(Some(UnixNanos::from(100)))
                .build()
                .unwrap(),
        );

        engine.process_order(&mut limit);
        engine.drain_events();

        engine.iterate(UnixNanos::from(200));
        let events = engine.drain_events();
        assert!(matches!(events.last(), Some(OrderEventAny::Expired(_))));
        assert!(!engine.order_exists(ClientOrderId::new("O-1")));
    }

    #[rstest]
    fn test_better_priced_fill_from_trade_tick() {
        // Book: best bid 0.27, best ask 0.37. Resting BUY LIMIT 1 @ 0.28.
        // A trade prints 0.27 with aggressor SELL: the BUY LIMIT fills at
        // 0.28 (price improvement inside the spread).
        let instrument = currency_pair_low_priced();
        let mut engine = OrderMatchingEngine::new(
            instrument.clone(),
            FillModel::default(),
            FeeModel,
            BookType::L1_MBP,
            OmsType::Netting,
            AccountId::new("SIM-001"),
            Rc::new(RefCell::new(TestClock::new())),
            {
                let cache = Rc::new(RefCell::new(Cache::default()));
                cache.borrow_mut().add_instrument(instrument.clone()).unwrap();
                cache
            },
            OrderMatchingEngineConfig::default(),
        );

        let quote = QuoteTick::new(
            instrument.id(),
            Price::from("0.27"),
            Price::from("0.37"),
            Quantity::from("10"),
            Quantity::from("10"),
            UnixNanos::from(1),
            UnixNanos::from(1),
        );
        engine.process_quote_tick(&quote);

        let mut buy_limit = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-BUY"))
                .instrument_id(instrument.id())
                .order_side(OrderSide::Buy)
                .order_type(OrderType::Limit)
                .price(Some(Price::from("0.28")))
                .quantity(Quantity::from("1"))
                .build()
                .unwrap(),
        );
        let mut sell_limit = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-SELL"))
                .instrument_id(instrument.id())
                .order_side(OrderSide::Sell)
                .order_type(OrderType::Limit)
                .price(Some(Price::from("0.36")))
                .quantity(Quantity::from("1"))
                .build()
                .unwrap(),
        );
        engine.process_order(&mut buy_limit);
        engine.process_order(&mut sell_limit);
        engine.drain_events();

        let trade = TradeTick::new(
            instrument.id(),
            Price::from("0.27"),
            Quantity::from("1"),
            AggressorSide::Seller,
            argo_model::identifiers::TradeId::new("T-1"),
            UnixNanos::from(2),
            UnixNanos::from(2),
        );
        engine.process_trade_tick(&trade);

        let events = engine.drain_events();
        let fills = fills_of(&events);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].client_order_id, ClientOrderId::new("O-BUY"));
        assert_eq!(fills[0].last_px, Price::from("0.28"));
        // The SELL LIMIT above the market remains resting
        assert!(engine.order_exists(ClientOrderId::new("O-SELL")));
    }

    #[rstest]
    fn test_oco_contingency_fill_cancels_sibling() {
        // Parent fills, then OCO children: SELL LIMIT @ 60 and SELL STOP @ 45.
        // Market trades at 60: the limit fills and the stop auto-cancels.
        let mut engine = btcusdt_engine_with_quote("50.00", "50.50");

        let mut tp = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-TP"))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .order_side(OrderSide::Sell)
                .order_type(OrderType::Limit)
                .price(Some(Price::from("60.00")))
                .quantity(Quantity::from("0.100"))
                .contingency_type(ContingencyType::Oco)
                .order_list_id(Some(OrderListId::new("OL-1")))
                .linked_order_ids(Some(vec![ClientOrderId::new("O-SL")]))
                .build()
                .unwrap(),
        );
        let mut sl = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-SL"))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .order_side(OrderSide::Sell)
                .order_type(OrderType::StopMarket)
                .trigger_price(Some(Price::from("45.00")))
                .quantity(Quantity::from("0.100"))
                .contingency_type(ContingencyType::Oco)
                .order_list_id(Some(OrderListId::new("OL-1")))
                .linked_order_ids(Some(vec![ClientOrderId::new("O-TP")]))
                .build()
                .unwrap(),
        );

        engine.process_order(&mut tp);
        engine.process_order(&mut sl);
        engine.drain_events();
        assert!(engine.order_exists(ClientOrderId::new("O-TP")));
        assert!(engine.order_exists(ClientOrderId::new("O-SL")));

        // Market trades up to 60
        let quote = QuoteTick::new(
            InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            Price::from("60.00"),
            Price::from("60.50"),
            Quantity::from("1.000"),
            Quantity::from("1.000"),
            UnixNanos::from(2),
            UnixNanos::from(2),
        );
        engine.process_quote_tick(&quote);

        let events = engine.drain_events();
        let fills = fills_of(&events);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].client_order_id, ClientOrderId::new("O-TP"));
        assert_eq!(fills[0].last_px, Price::from("60.00"));

        // The linked stop auto-canceled
        assert!(events.iter().any(|event| matches!(
            event,
            OrderEventAny::Canceled(canceled) if canceled.client_order_id == ClientOrderId::new("O-SL")
        )));
        assert!(!engine.order_exists(ClientOrderId::new("O-SL")));
    }

    #[rstest]
    fn test_reduce_only_clamped_never_rejected() {
        // With a LONG position of 79, a reduce-only SELL LIMIT 80 is
        // auto-reduced to 79 and accepted - never rejected, no overflow
        let instrument = crypto_perpetual_btcusdt();
        let clock: Rc<RefCell<dyn Clock>> = Rc::new(RefCell::new(TestClock::new()));
        let cache = Rc::new(RefCell::new(Cache::default()));
        cache.borrow_mut().add_instrument(instrument.clone()).unwrap();

        // Seed an open LONG position of 79 in the cache
        let fill = OrderFilled {
            trader_id: Default::default(),
            strategy_id: Default::default(),
            instrument_id: instrument.id(),
            client_order_id: ClientOrderId::new("O-OPEN"),
            venue_order_id: VenueOrderId::new("V-0"),
            account_id: AccountId::new("SIM-001"),
            trade_id: argo_model::identifiers::TradeId::new("T-0"),
            order_side: OrderSide::Buy,
            order_type: OrderType::Market,
            last_qty: Quantity::from("79.000"),
            last_px: Price::from("50.00"),
            currency: Currency::USDT(),
            liquidity_side: LiquiditySide::Taker,
            event_id: UUID4::new(),
            ts_event: UnixNanos::from(1),
            ts_init: UnixNanos::from(1),
            reconciliation: false,
            position_id: Some(argo_model::identifiers::PositionId::new("P-1")),
            commission: None,
        };
        let position = argo_model::position::Position::new(&instrument, fill);
        cache.borrow_mut().add_position(position).unwrap();

        let mut engine = OrderMatchingEngine::new(
            instrument.clone(),
            FillModel::default(),
            FeeModel,
            BookType::L1_MBP,
            OmsType::Netting,
            AccountId::new("SIM-001"),
            clock,
            cache,
            OrderMatchingEngineConfig::default(),
        );
        let quote = QuoteTick::new(
            instrument.id(),
            Price::from("50.00"),
            Price::from("50.50"),
            Quantity::from("100.000"),
            Quantity::from("100.000"),
            UnixNanos::from(1),
            UnixNanos::from(1),
        );
        engine.process_quote_tick(&quote);
        engine.drain_events();

        let mut reduce = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-RO"))
                .instrument_id(instrument.id())
                .order_side(OrderSide::Sell)
                .order_type(OrderType::Limit)
                .price(Some(Price::from("60.00")))
                .quantity(Quantity::from("80.000"))
                .reduce_only(true)
                .build()
                .unwrap(),
        );
        engine.process_order(&mut reduce);

        let events = engine.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, OrderEventAny::Updated(_))));
        assert!(events
            .iter()
            .any(|event| matches!(event, OrderEventAny::Accepted(_))));
        assert!(!events
            .iter()
            .any(|event| matches!(event, OrderEventAny::Rejected(_))));
        assert_eq!(reduce.quantity, Quantity::from("79.000"));
        assert_eq!(reduce.status, OrderStatus::Accepted);
    }

    #[rstest]
    fn test_trailing_stop_trigger_follows_market() {
        use rust_decimal_macros::dec;

        let mut engine = btcusdt_engine_with_quote("100.00", "100.50");
        let mut trailing = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-TS"))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .order_side(OrderSide::Sell)
                .order_type(OrderType::TrailingStopMarket)
                .trigger_price(Some(Price::from("95.00")))
                .trailing_offset(Some(dec!(5.00)))
                .trailing_offset_type(Some(TrailingOffsetType::Price))
                .quantity(Quantity::from("1.000"))
                .build()
                .unwrap(),
        );
        engine.process_order(&mut trailing);
        engine.drain_events();

        // Market rises: the trigger trails the bid up
        let quote = QuoteTick::new(
            InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            Price::from("110.00"),
            Price::from("110.50"),
            Quantity::from("1.000"),
            Quantity::from("1.000"),
            UnixNanos::from(2),
            UnixNanos::from(2),
        );
        engine.process_quote_tick(&quote);

        let events = engine.drain_events();
        let updated = events.iter().find_map(|event| match event {
            OrderEventAny::Updated(updated) => Some(updated),
            _ => None,
        });
        assert_eq!(updated.unwrap().trigger_price, Some(Price::from("105.00")));
    }
}
