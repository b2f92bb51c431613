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

//! A performant, generic, multi-purpose `OrderBook` maintained at L1/L2/L3 granularity.

pub mod ladder;

use argo_core::UnixNanos;
use ladder::Ladder;

use crate::{
    data::{
        delta::{BookOrder, OrderBookDelta, OrderBookDeltas},
        depth::OrderBookDepth10,
        quote::QuoteTick,
        trade::TradeTick,
    },
    enums::{BookAction, BookType, OrderSide, OrderSideSpecified},
    identifiers::InstrumentId,
    types::{Price, Quantity},
};

/// Fixed order IDs used to maintain the synthetic top levels of an L1 book.
const L1_BID_ORDER_ID: u64 = 1;
const L1_ASK_ORDER_ID: u64 = 2;

/// An error for order book integrity violations.
#[derive(thiserror::Error, Debug)]
pub enum BookIntegrityError {
    #[error("Invalid book operation: order side was `NoOrderSide`")]
    NoOrderSide,
    #[error("Invalid book operation for book type {0}")]
    InvalidBookOperation(BookType),
}

/// Provides a performant, generic, multi-purpose order book.
///
/// Maintains bid and ask ladders at the configured granularity:
/// - `L1_MBP`: single synthetic top-of-book level per side.
/// - `L2_MBP`: one aggregated order per price level.
/// - `L3_MBO`: multiple orders per price level.
pub struct OrderBook {
    /// The instrument ID for the book.
    pub instrument_id: InstrumentId,
    /// The order book type (granularity).
    pub book_type: BookType,
    /// The last event sequence number applied to the book.
    pub sequence: u64,
    /// UNIX timestamp (nanoseconds) of the last event applied to the book.
    pub ts_last: UnixNanos,
    /// The count of events applied to the book.
    pub update_count: u64,
    bids: Ladder,
    asks: Ladder,
}

impl OrderBook {
    /// Creates a new [`OrderBook`] instance.
    #[must_use]
    pub fn new(instrument_id: InstrumentId, book_type: BookType) -> Self {
        Self {
            instrument_id,
            book_type,
            sequence: 0,
            ts_last: UnixNanos::default(),
            update_count: 0,
            bids: Ladder::new(OrderSide::Buy),
            asks: Ladder::new(OrderSide::Sell),
        }
    }

    /// Resets the book to an empty initial state.
    pub fn clear(&mut self, sequence: u64, ts_event: UnixNanos) {
        self.bids.clear();
        self.asks.clear();
        self.sequence = sequence;
        self.ts_last = ts_event;
        self.update_count += 1;
    }

    /// Adds the given order to the book.
    pub fn add(&mut self, order: BookOrder, sequence: u64, ts_event: UnixNanos) {
        match order.side {
            OrderSide::Buy => self.bids.add(order),
            OrderSide::Sell => self.asks.add(order),
            OrderSide::NoOrderSide => panic!("{}", BookIntegrityError::NoOrderSide),
        }
        self.increment(sequence, ts_event);
    }

    /// Updates the given order in the book.
    pub fn update(&mut self, order: BookOrder, sequence: u64, ts_event: UnixNanos) {
        match order.side {
            OrderSide::Buy => self.bids.update(order),
            OrderSide::Sell => self.asks.update(order),
            OrderSide::NoOrderSide => panic!("{}", BookIntegrityError::NoOrderSide),
        }
        self.increment(sequence, ts_event);
    }

    /// Deletes the given order from the book.
    pub fn delete(&mut self, order: BookOrder, sequence: u64, ts_event: UnixNanos) {
        match order.side {
            OrderSide::Buy => self.bids.delete(order.order_id),
            OrderSide::Sell => self.asks.delete(order.order_id),
            OrderSide::NoOrderSide => panic!("{}", BookIntegrityError::NoOrderSide),
        }
        self.increment(sequence, ts_event);
    }

    /// Applies the given delta to the book.
    pub fn apply_delta(&mut self, delta: &OrderBookDelta) {
        match delta.action {
            BookAction::Add => self.add(delta.order, delta.sequence, delta.ts_event),
            BookAction::Update => self.update(delta.order, delta.sequence, delta.ts_event),
            BookAction::Delete => self.delete(delta.order, delta.sequence, delta.ts_event),
            BookAction::Clear => self.clear(delta.sequence, delta.ts_event),
        }
    }

    /// Applies the given batch of deltas to the book.
    pub fn apply_deltas(&mut self, deltas: &OrderBookDeltas) {
        for delta in &deltas.deltas {
            self.apply_delta(delta);
        }
    }

    /// Applies the given depth snapshot to the book, replacing all levels.
    pub fn apply_depth(&mut self, depth: &OrderBookDepth10) {
        self.bids.clear();
        self.asks.clear();

        for order in depth.bids.iter().filter(|o| o.size.is_positive()) {
            self.bids.add(*order);
        }
        for order in depth.asks.iter().filter(|o| o.size.is_positive()) {
            self.asks.add(*order);
        }

        self.increment(depth.sequence, depth.ts_event);
    }

    /// Updates the book from the given quote tick (L1 books only).
    ///
    /// # Errors
    ///
    /// Returns an error if the book type is not `L1_MBP`.
    pub fn update_quote_tick(&mut self, quote: &QuoteTick) -> Result<(), BookIntegrityError> {
        if self.book_type != BookType::L1_MBP {
            return Err(BookIntegrityError::InvalidBookOperation(self.book_type));
        }

        self.bids.clear();
        self.bids.add(BookOrder::new(
            OrderSide::Buy,
            quote.bid_price,
            quote.bid_size,
            L1_BID_ORDER_ID,
        ));
        self.asks.clear();
        self.asks.add(BookOrder::new(
            OrderSide::Sell,
            quote.ask_price,
            quote.ask_size,
            L1_ASK_ORDER_ID,
        ));

        self.increment(self.sequence + 1, quote.ts_event);
        Ok(())
    }

    /// Updates the book from the given trade tick (L1 books only).
    ///
    /// # Errors
    ///
    /// Returns an error if the book type is not `L1_MBP`.
    pub fn update_trade_tick(&mut self, trade: &TradeTick) -> Result<(), BookIntegrityError> {
        if self.book_type != BookType::L1_MBP {
            return Err(BookIntegrityError::InvalidBookOperation(self.book_type));
        }

        self.bids.clear();
        self.bids.add(BookOrder::new(
            OrderSide::Buy,
            trade.price,
            trade.size,
            L1_BID_ORDER_ID,
        ));
        self.asks.clear();
        self.asks.add(BookOrder::new(
            OrderSide::Sell,
            trade.price,
            trade.size,
            L1_ASK_ORDER_ID,
        ));

        self.increment(self.sequence + 1, trade.ts_event);
        Ok(())
    }

    /// Returns the best bid price, if any.
    #[must_use]
    pub fn best_bid_price(&self) -> Option<Price> {
        self.bids.top().map(|level| level.price.value)
    }

    /// Returns the best ask price, if any.
    #[must_use]
    pub fn best_ask_price(&self) -> Option<Price> {
        self.asks.top().map(|level| level.price.value)
    }

    /// Returns the size at the best bid, if any.
    #[must_use]
    pub fn best_bid_size(&self) -> Option<Quantity> {
        self.bids
            .top()
            .map(|level| Quantity::from_raw(level.size_raw(), top_size_precision(level)))
    }

    /// Returns the size at the best ask, if any.
    #[must_use]
    pub fn best_ask_size(&self) -> Option<Quantity> {
        self.asks
            .top()
            .map(|level| Quantity::from_raw(level.size_raw(), top_size_precision(level)))
    }

    /// Returns whether the book has any bid levels.
    #[must_use]
    pub fn has_bid(&self) -> bool {
        !self.bids.is_empty()
    }

    /// Returns whether the book has any ask levels.
    #[must_use]
    pub fn has_ask(&self) -> bool {
        !self.asks.is_empty()
    }

    /// Returns the current bid/ask spread, if both sides exist.
    #[must_use]
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some(ask.as_f64() - bid.as_f64()),
            _ => None,
        }
    }

    /// Returns the current midpoint price, if both sides exist.
    #[must_use]
    pub fn midpoint(&self) -> Option<f64> {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => Some((ask.as_f64() + bid.as_f64()) / 2.0),
            _ => None,
        }
    }

    /// Returns an iterator over bid levels, best-first.
    pub fn bids(&self) -> impl Iterator<Item = &ladder::BookLevel> {
        self.bids.levels()
    }

    /// Returns an iterator over ask levels, best-first.
    pub fn asks(&self) -> impl Iterator<Item = &ladder::BookLevel> {
        self.asks.levels()
    }

    /// Simulates fills for an aggressing order against the opposing side of
    /// the book, walking levels best-first while the optional `price_limit`
    /// is satisfied.
    #[must_use]
    pub fn simulate_fills(
        &self,
        side: OrderSideSpecified,
        quantity: Quantity,
        price_limit: Option<Price>,
    ) -> Vec<(Price, Quantity)> {
        match side {
            OrderSideSpecified::Buy => self.asks.simulate_fills(quantity, price_limit),
            OrderSideSpecified::Sell => self.bids.simulate_fills(quantity, price_limit),
        }
    }

    fn increment(&mut self, sequence: u64, ts_event: UnixNanos) {
        self.sequence = sequence;
        self.ts_last = ts_event;
        self.update_count += 1;
    }
}

fn top_size_precision(level: &ladder::BookLevel) -> u8 {
    level
        .orders
        .values()
        .next()
        .map_or(0, |order| order.size.precision)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::data::depth::DEPTH10_LEN;

    fn delta(
        action: BookAction,
        side: OrderSide,
        price: &str,
        size: &str,
        order_id: u64,
        sequence: u64,
    ) -> OrderBookDelta {
        OrderBookDelta::new(
            InstrumentId::from("ETHUSDT.BINANCE"),
            action,
            BookOrder::new(side, Price::from(price), Quantity::from(size), order_id),
            0,
            sequence,
            UnixNanos::from(sequence),
            UnixNanos::from(sequence),
        )
    }

    #[rstest]
    fn test_empty_book() {
        let book = OrderBook::new(InstrumentId::from("ETHUSDT.BINANCE"), BookType::L2_MBP);
        assert!(!book.has_bid());
        assert!(!book.has_ask());
        assert!(book.best_bid_price().is_none());
        assert!(book.spread().is_none());
    }

    #[rstest]
    fn test_apply_deltas_and_tops() {
        let mut book = OrderBook::new(InstrumentId::from("ETHUSDT.BINANCE"), BookType::L3_MBO);
        book.apply_delta(&delta(BookAction::Add, OrderSide::Buy, "100.00", "1.0", 1, 1));
        book.apply_delta(&delta(BookAction::Add, OrderSide::Buy, "100.50", "2.0", 2, 2));
        book.apply_delta(&delta(BookAction::Add, OrderSide::Sell, "101.00", "1.5", 3, 3));
        book.apply_delta(&delta(BookAction::Add, OrderSide::Sell, "101.50", "1.0", 4, 4));

        assert_eq!(book.best_bid_price(), Some(Price::from("100.50")));
        assert_eq!(book.best_ask_price(), Some(Price::from("101.00")));
        assert_eq!(book.best_bid_size(), Some(Quantity::from("2.0")));
        assert_eq!(book.spread(), Some(0.5));
        assert_eq!(book.midpoint(), Some(100.75));
        assert_eq!(book.sequence, 4);
    }

    #[rstest]
    fn test_delete_and_clear() {
        let mut book = OrderBook::new(InstrumentId::from("ETHUSDT.BINANCE"), BookType::L3_MBO);
        book.apply_delta(&delta(BookAction::Add, OrderSide::Buy, "100.00", "1.0", 1, 1));
        book.apply_delta(&delta(
            BookAction::Delete,
            OrderSide::Buy,
            "100.00",
            "1.0",
            1,
            2,
        ));
        assert!(!book.has_bid());

        book.apply_delta(&delta(BookAction::Add, OrderSide::Sell, "101.00", "1.0", 2, 3));
        book.clear(4, UnixNanos::from(4));
        assert!(!book.has_ask());
    }

    #[rstest]
    fn test_update_quote_tick_l1() {
        let mut book = OrderBook::new(InstrumentId::from("ETHUSDT.BINANCE"), BookType::L1_MBP);
        let quote = QuoteTick::new(
            InstrumentId::from("ETHUSDT.BINANCE"),
            Price::from("100.00"),
            Price::from("100.10"),
            Quantity::from("1.0"),
            Quantity::from("2.0"),
            UnixNanos::from(1),
            UnixNanos::from(1),
        );
        book.update_quote_tick(&quote).unwrap();

        assert_eq!(book.best_bid_price(), Some(Price::from("100.00")));
        assert_eq!(book.best_ask_price(), Some(Price::from("100.10")));
    }

    #[rstest]
    fn test_update_quote_tick_rejected_for_l2() {
        let mut book = OrderBook::new(InstrumentId::from("ETHUSDT.BINANCE"), BookType::L2_MBP);
        let quote = QuoteTick::new(
            InstrumentId::from("ETHUSDT.BINANCE"),
            Price::from("100.00"),
            Price::from("100.10"),
            Quantity::from("1.0"),
            Quantity::from("2.0"),
            UnixNanos::from(1),
            UnixNanos::from(1),
        );
        assert!(book.update_quote_tick(&quote).is_err());
    }

    #[rstest]
    fn test_simulate_fills_buy() {
        let mut book = OrderBook::new(InstrumentId::from("ETHUSDT.BINANCE"), BookType::L2_MBP);
        book.apply_delta(&delta(BookAction::Add, OrderSide::Sell, "101.00", "1.0", 1, 1));
        book.apply_delta(&delta(BookAction::Add, OrderSide::Sell, "102.00", "1.0", 2, 2));

        let fills = book.simulate_fills(OrderSideSpecified::Buy, Quantity::from("1.5"), None);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].0, Price::from("101.00"));
        assert_eq!(fills[1], (Price::from("102.00"), Quantity::from("0.5")));
    }

    #[rstest]
    fn test_depth10_round_trip_through_book() {
        // Feeding deltas into an L3 book reconstructs the same top levels as a
        // contemporaneous depth snapshot
        let mut book = OrderBook::new(InstrumentId::from("ETHUSDT.BINANCE"), BookType::L3_MBO);
        let mut bids = [BookOrder::default(); DEPTH10_LEN];
        let mut asks = [BookOrder::default(); DEPTH10_LEN];

        for i in 0..3_u64 {
            let bid_price = format!("{}.00", 100 - i);
            let ask_price = format!("{}.00", 101 + i);
            let bid =
                BookOrder::new(OrderSide::Buy, Price::from(bid_price.as_str()), Quantity::from("1.0"), i + 1);
            let ask = BookOrder::new(
                OrderSide::Sell,
                Price::from(ask_price.as_str()),
                Quantity::from("1.0"),
                i + 100,
            );
            bids[i as usize] = bid;
            asks[i as usize] = ask;
            book.add(bid, i, UnixNanos::from(i));
            book.add(ask, i, UnixNanos::from(i));
        }

        let book_bids: Vec<Price> = book.bids().map(|l| l.price.value).collect();
        let depth_bids: Vec<Price> = bids
            .iter()
            .filter(|o| o.size.is_positive())
            .map(|o| o.price)
            .collect();
        assert_eq!(book_bids, depth_bids);

        let book_asks: Vec<Price> = book.asks().map(|l| l.price.value).collect();
        let depth_asks: Vec<Price> = asks
            .iter()
            .filter(|o| o.size.is_positive())
            .map(|o| o.price)
            .collect();
        assert_eq!(book_asks, depth_asks);
    }
}
