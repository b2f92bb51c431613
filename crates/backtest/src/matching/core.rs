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

//! The core order matching state: resting orders per side and the price
//! predicates deciding matches and triggers.

use argo_model::{
    enums::OrderSideSpecified,
    identifiers::{ClientOrderId, InstrumentId},
    orders::Order,
    types::Price,
};

/// The core matching state for a single market.
///
/// Holds the resting passive orders per side, and the current bid/ask/last
/// prices the match predicates evaluate against. A transient price override
/// (set from an aggressing trade print) allows fills better than the current
/// book top when the trade itself is the evidence of that price.
pub struct OrderMatchingCore {
    /// The instrument ID for the matching core.
    pub instrument_id: InstrumentId,
    /// The price increment (tick size) for the market.
    pub price_increment: Price,
    /// The current best bid price.
    pub bid: Option<Price>,
    /// The current best ask price.
    pub ask: Option<Price>,
    /// The last traded price.
    pub last: Option<Price>,
    /// If a last traded price has been set.
    pub is_last_initialized: bool,
    orders_bid: Vec<Order>,
    orders_ask: Vec<Order>,
    override_bid: Option<Price>,
    override_ask: Option<Price>,
}

impl OrderMatchingCore {
    /// Creates a new [`OrderMatchingCore`] instance.
    #[must_use]
    pub fn new(instrument_id: InstrumentId, price_increment: Price) -> Self {
        Self {
            instrument_id,
            price_increment,
            bid: None,
            ask: None,
            last: None,
            is_last_initialized: false,
            orders_bid: Vec::new(),
            orders_ask: Vec::new(),
            override_bid: None,
            override_ask: None,
        }
    }

    /// Returns the price precision for the matching core.
    #[must_use]
    pub const fn price_precision(&self) -> u8 {
        self.price_increment.precision
    }

    /// Sets the last traded price.
    pub const fn set_last_raw(&mut self, last: Price) {
        self.last = Some(last);
        self.is_last_initialized = true;
    }

    /// Sets the best bid price.
    pub const fn set_bid_raw(&mut self, bid: Price) {
        self.bid = Some(bid);
    }

    /// Sets the best ask price.
    pub const fn set_ask_raw(&mut self, ask: Price) {
        self.ask = Some(ask);
    }

    /// Sets a transient price override from an aggressing trade print.
    pub const fn set_transient_override(&mut self, bid: Option<Price>, ask: Option<Price>) {
        self.override_bid = bid;
        self.override_ask = ask;
    }

    /// Clears any transient price override.
    pub const fn clear_transient_override(&mut self) {
        self.override_bid = None;
        self.override_ask = None;
    }

    fn effective_bid(&self) -> Option<Price> {
        match (self.bid, self.override_bid) {
            (Some(bid), Some(over)) => Some(bid.max(over)),
            (bid, over) => over.or(bid),
        }
    }

    fn effective_ask(&self) -> Option<Price> {
        match (self.ask, self.override_ask) {
            (Some(ask), Some(over)) => Some(ask.min(over)),
            (ask, over) => over.or(ask),
        }
    }

    /// Returns the resting BUY side orders.
    #[must_use]
    pub fn get_orders_bid(&self) -> &[Order] {
        &self.orders_bid
    }

    /// Returns the resting SELL side orders.
    #[must_use]
    pub fn get_orders_ask(&self) -> &[Order] {
        &self.orders_ask
    }

    /// Returns all resting orders (bids then asks).
    #[must_use]
    pub fn get_orders(&self) -> Vec<Order> {
        let mut orders = Vec::with_capacity(self.orders_bid.len() + self.orders_ask.len());
        orders.extend_from_slice(&self.orders_bid);
        orders.extend_from_slice(&self.orders_ask);
        orders
    }

    /// Returns the resting order with the given ID, if it exists.
    #[must_use]
    pub fn get_order(&self, client_order_id: ClientOrderId) -> Option<&Order> {
        self.orders_bid
            .iter()
            .chain(self.orders_ask.iter())
            .find(|o| o.client_order_id == client_order_id)
    }

    /// Returns whether a resting order with the given ID exists.
    #[must_use]
    pub fn order_exists(&self, client_order_id: ClientOrderId) -> bool {
        self.get_order(client_order_id).is_some()
    }

    /// Adds the given order to its side's resting list.
    pub fn add_order(&mut self, order: Order) {
        match order.side_specified() {
            OrderSideSpecified::Buy => self.orders_bid.push(order),
            OrderSideSpecified::Sell => self.orders_ask.push(order),
        }
    }

    /// Replaces the resting order with the same ID (modification).
    pub fn update_order(&mut self, order: &Order) {
        self.delete_order(order.client_order_id);
        self.add_order(order.clone());
    }

    /// Deletes the resting order with the given ID.
    pub fn delete_order(&mut self, client_order_id: ClientOrderId) {
        self.orders_bid
            .retain(|o| o.client_order_id != client_order_id);
        self.orders_ask
            .retain(|o| o.client_order_id != client_order_id);
    }

    /// Resets the matching core to an empty initial state.
    pub fn reset(&mut self) {
        self.bid = None;
        self.ask = None;
        self.last = None;
        self.is_last_initialized = false;
        self.orders_bid.clear();
        self.orders_ask.clear();
        self.override_bid = None;
        self.override_ask = None;
    }

    /// Returns whether a limit order of `side` at `price` is matched by the
    /// opposing top (or transient override).
    #[must_use]
    pub fn is_limit_matched(&self, side: OrderSideSpecified, price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self.effective_ask().is_some_and(|ask| ask <= price),
            OrderSideSpecified::Sell => self.effective_bid().is_some_and(|bid| bid >= price),
        }
    }

    /// Returns whether a stop order of `side` with `trigger_price` has been
    /// activated by the market printing at or through the trigger.
    #[must_use]
    pub fn is_stop_triggered(&self, side: OrderSideSpecified, trigger_price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self
                .effective_ask()
                .is_some_and(|ask| ask >= trigger_price),
            OrderSideSpecified::Sell => self
                .effective_bid()
                .is_some_and(|bid| bid <= trigger_price),
        }
    }

    /// Returns whether a market-if-touched order of `side` with
    /// `trigger_price` has been touched by a favorable move.
    #[must_use]
    pub fn is_touch_triggered(&self, side: OrderSideSpecified, trigger_price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self
                .effective_ask()
                .is_some_and(|ask| ask <= trigger_price),
            OrderSideSpecified::Sell => self
                .effective_bid()
                .is_some_and(|bid| bid >= trigger_price),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_model::{
        enums::{OrderSide, OrderType},
        events::order::OrderInitializedBuilder,
        types::Quantity,
    };
    use rstest::rstest;

    use super::*;

    fn create_core() -> OrderMatchingCore {
        OrderMatchingCore::new(InstrumentId::from("ETHUSDT.BINANCE"), Price::from("0.01"))
    }

    fn limit_order(id: &str, side: OrderSide, price: &str) -> Order {
        Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new(id))
                .instrument_id(InstrumentId::from("ETHUSDT.BINANCE"))
                .order_side(side)
                .order_type(OrderType::Limit)
                .price(Some(Price::from(price)))
                .quantity(Quantity::from("1.000"))
                .build()
                .unwrap(),
        )
    }

    #[rstest]
    fn test_add_get_delete_order() {
        let mut core = create_core();
        core.add_order(limit_order("O-1", OrderSide::Buy, "100.00"));
        core.add_order(limit_order("O-2", OrderSide::Sell, "101.00"));

        assert!(core.order_exists(ClientOrderId::new("O-1")));
        assert_eq!(core.get_orders_bid().len(), 1);
        assert_eq!(core.get_orders_ask().len(), 1);

        core.delete_order(ClientOrderId::new("O-1"));
        assert!(!core.order_exists(ClientOrderId::new("O-1")));
    }

    #[rstest]
    #[case(OrderSideSpecified::Buy, "100.00", "100.00", true)] // ask at limit
    #[case(OrderSideSpecified::Buy, "100.00", "99.00", true)] // ask through limit
    #[case(OrderSideSpecified::Buy, "100.00", "101.00", false)] // ask above limit
    fn test_is_limit_matched_buy(
        #[case] side: OrderSideSpecified,
        #[case] price: &str,
        #[case] ask: &str,
        #[case] expected: bool,
    ) {
        let mut core = create_core();
        core.set_ask_raw(Price::from(ask));
        assert_eq!(core.is_limit_matched(side, Price::from(price)), expected);
    }

    #[rstest]
    fn test_is_stop_triggered() {
        let mut core = create_core();
        core.set_bid_raw(Price::from("99.00"));
        core.set_ask_raw(Price::from("100.00"));

        // Buy stop above market not yet triggered
        assert!(!core.is_stop_triggered(OrderSideSpecified::Buy, Price::from("101.00")));
        // Sell stop below market not yet triggered
        assert!(!core.is_stop_triggered(OrderSideSpecified::Sell, Price::from("98.00")));

        core.set_ask_raw(Price::from("101.00"));
        assert!(core.is_stop_triggered(OrderSideSpecified::Buy, Price::from("101.00")));

        core.set_bid_raw(Price::from("98.00"));
        assert!(core.is_stop_triggered(OrderSideSpecified::Sell, Price::from("98.00")));
    }

    #[rstest]
    fn test_transient_override_allows_better_fill() {
        let mut core = create_core();
        core.set_bid_raw(Price::from("0.27"));
        core.set_ask_raw(Price::from("0.37"));

        // A resting BUY LIMIT inside the spread is not matched by the book
        assert!(!core.is_limit_matched(OrderSideSpecified::Buy, Price::from("0.28")));

        // A SELL aggressor printing 0.27 is evidence of that price
        core.set_transient_override(None, Some(Price::from("0.27")));
        assert!(core.is_limit_matched(OrderSideSpecified::Buy, Price::from("0.28")));

        core.clear_transient_override();
        assert!(!core.is_limit_matched(OrderSideSpecified::Buy, Price::from("0.28")));
    }
}
