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

//! Book maintenance and synthetic top-of-book quote emission.

use std::collections::HashMap;

use argo_core::UnixNanos;
use argo_model::{
    data::{OrderBookDeltas, OrderBookDepth10, QuoteTick},
    enums::BookType,
    identifiers::InstrumentId,
    orderbook::OrderBook,
    types::{Price, Quantity},
};

/// Maintains a top-of-book snapshot per instrument from deltas/depth and
/// produces a synthetic [`QuoteTick`] on every top-of-book change.
///
/// Required for backtests that value positions against an L3-only feed.
pub struct BookManager {
    books: HashMap<InstrumentId, OrderBook>,
    last_tops: HashMap<InstrumentId, (Option<Price>, Option<Price>)>,
}

impl BookManager {
    /// Creates a new [`BookManager`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            books: HashMap::new(),
            last_tops: HashMap::new(),
        }
    }

    /// Returns the maintained book for the given instrument, if it exists.
    #[must_use]
    pub fn book(&self, instrument_id: &InstrumentId) -> Option<&OrderBook> {
        self.books.get(instrument_id)
    }

    /// Applies the given deltas, returning a synthetic quote if the top of
    /// book changed and both sides exist.
    pub fn apply_deltas(&mut self, deltas: &OrderBookDeltas) -> Option<QuoteTick> {
        let book = self
            .books
            .entry(deltas.instrument_id)
            .or_insert_with(|| OrderBook::new(deltas.instrument_id, BookType::L3_MBO));
        book.apply_deltas(deltas);
        self.emit_if_top_changed(deltas.instrument_id, deltas.ts_event, deltas.ts_init)
    }

    /// Applies the given depth snapshot, returning a synthetic quote if the
    /// top of book changed and both sides exist.
    pub fn apply_depth(&mut self, depth: &OrderBookDepth10) -> Option<QuoteTick> {
        let book = self
            .books
            .entry(depth.instrument_id)
            .or_insert_with(|| OrderBook::new(depth.instrument_id, BookType::L2_MBP));
        book.apply_depth(depth);
        self.emit_if_top_changed(depth.instrument_id, depth.ts_event, depth.ts_init)
    }

    fn emit_if_top_changed(
        &mut self,
        instrument_id: InstrumentId,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Option<QuoteTick> {
        let book = self.books.get(&instrument_id)?;
        let top = (book.best_bid_price(), book.best_ask_price());
        let last = self.last_tops.insert(instrument_id, top);

        if last == Some(top) {
            return None; // Top of book unchanged
        }

        let (Some(bid_price), Some(ask_price)) = top else {
            return None; // One-sided book, no valid quote yet
        };

        let bid_size = book
            .best_bid_size()
            .unwrap_or_else(|| Quantity::zero(0));
        let ask_size = book
            .best_ask_size()
            .unwrap_or_else(|| Quantity::zero(0));

        Some(QuoteTick::new(
            instrument_id,
            bid_price,
            ask_price,
            Quantity::from_raw(bid_size.raw, bid_size.precision.max(ask_size.precision)),
            Quantity::from_raw(ask_size.raw, bid_size.precision.max(ask_size.precision)),
            ts_event,
            ts_init,
        ))
    }
}

impl Default for BookManager {
    /// Creates a new default [`BookManager`] instance.
    fn default() -> Self {
        Self::new()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_model::{
        data::delta::{BookOrder, OrderBookDelta},
        enums::{BookAction, OrderSide},
    };
    use rstest::rstest;

    use super::*;

    fn deltas(instrument_id: InstrumentId, deltas: Vec<OrderBookDelta>) -> OrderBookDeltas {
        OrderBookDeltas::new(instrument_id, deltas)
    }

    fn delta(
        instrument_id: InstrumentId,
        side: OrderSide,
        price: &str,
        size: &str,
        order_id: u64,
        sequence: u64,
    ) -> OrderBookDelta {
        OrderBookDelta::new(
            instrument_id,
            BookAction::Add,
            BookOrder::new(side, Price::from(price), Quantity::from(size), order_id),
            0,
            sequence,
            UnixNanos::from(sequence),
            UnixNanos::from(sequence),
        )
    }

    #[rstest]
    fn test_synthetic_quote_on_top_change() {
        let instrument_id = InstrumentId::from("YESNO.POLY");
        let mut manager = BookManager::new();

        // One-sided book produces no quote
        let quote = manager.apply_deltas(&deltas(
            instrument_id,
            vec![delta(instrument_id, OrderSide::Buy, "0.27", "10", 1, 1)],
        ));
        assert!(quote.is_none());

        // Both sides present produces the first quote
        let quote = manager
            .apply_deltas(&deltas(
                instrument_id,
                vec![delta(instrument_id, OrderSide::Sell, "0.37", "10", 2, 2)],
            ))
            .unwrap();
        assert_eq!(quote.bid_price, Price::from("0.27"));
        assert_eq!(quote.ask_price, Price::from("0.37"));

        // A delta deeper in the book does not change the top: no quote
        let quote = manager.apply_deltas(&deltas(
            instrument_id,
            vec![delta(instrument_id, OrderSide::Sell, "0.40", "10", 3, 3)],
        ));
        assert!(quote.is_none());

        // Improving the best bid emits again
        let quote = manager
            .apply_deltas(&deltas(
                instrument_id,
                vec![delta(instrument_id, OrderSide::Buy, "0.28", "10", 4, 4)],
            ))
            .unwrap();
        assert_eq!(quote.bid_price, Price::from("0.28"));
    }
}
