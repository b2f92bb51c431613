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

//! Represents a ladder of price levels for one side of an order book.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    fmt::{Debug, Display},
};

use indexmap::IndexMap;

use crate::{
    data::delta::BookOrder,
    enums::OrderSide,
    types::{Price, Quantity},
};

/// Represents a price level with a specified side in an order books ladder.
///
/// Ordering is side-aware: bid levels sort descending by price so iteration
/// yields best-first on both sides.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BookPrice {
    pub value: Price,
    pub side: OrderSide,
}

impl BookPrice {
    /// Creates a new [`BookPrice`] instance.
    #[must_use]
    pub const fn new(value: Price, side: OrderSide) -> Self {
        Self { value, side }
    }
}

impl PartialOrd for BookPrice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BookPrice {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.side {
            OrderSide::Buy => other.value.cmp(&self.value),
            OrderSide::Sell => self.value.cmp(&other.value),
            OrderSide::NoOrderSide => panic!("`BookPrice` side was `NoOrderSide`"),
        }
    }
}

impl Display for BookPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Represents one price level in an order book ladder, containing its orders
/// in price-time priority.
#[derive(Clone, Debug)]
pub struct BookLevel {
    pub price: BookPrice,
    pub orders: IndexMap<u64, BookOrder>,
}

impl BookLevel {
    /// Creates a new [`BookLevel`] instance.
    #[must_use]
    pub fn new(price: BookPrice) -> Self {
        Self {
            price,
            orders: IndexMap::new(),
        }
    }

    /// Returns the number of orders at the level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns whether the level holds no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Returns the total size of all orders at the level.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.orders.values().map(|o| o.size.as_f64()).sum()
    }

    /// Returns the total size of all orders at the level as raw fixed-point.
    #[must_use]
    pub fn size_raw(&self) -> u64 {
        self.orders.values().map(|o| o.size.raw).sum()
    }

    /// Returns the total exposure (price * size) of all orders at the level.
    #[must_use]
    pub fn exposure(&self) -> f64 {
        self.orders
            .values()
            .map(|o| o.price.as_f64() * o.size.as_f64())
            .sum()
    }

    /// Adds the given order to the level.
    pub fn add(&mut self, order: BookOrder) {
        debug_assert_eq!(order.price, self.price.value);
        self.orders.insert(order.order_id, order);
    }

    /// Updates the given order at the level, removing it if the new size is zero.
    pub fn update(&mut self, order: BookOrder) {
        if order.size.is_zero() {
            self.orders.shift_remove(&order.order_id);
        } else {
            self.orders.insert(order.order_id, order);
        }
    }

    /// Deletes the order with the given ID from the level.
    pub fn delete(&mut self, order_id: u64) {
        self.orders.shift_remove(&order_id);
    }
}

/// Represents one side of an order book as a ladder of price levels.
pub struct Ladder {
    /// The ladder side (BUY for bids, SELL for asks).
    pub side: OrderSide,
    levels: BTreeMap<BookPrice, BookLevel>,
    cache: HashMap<u64, BookPrice>,
}

impl Ladder {
    /// Creates a new [`Ladder`] instance.
    #[must_use]
    pub fn new(side: OrderSide) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Returns the number of price levels in the ladder.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns whether the ladder holds no levels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns the best level of the ladder, if any.
    #[must_use]
    pub fn top(&self) -> Option<&BookLevel> {
        self.levels.values().next()
    }

    /// Returns an iterator over the ladder levels, best-first.
    pub fn levels(&self) -> impl Iterator<Item = &BookLevel> {
        self.levels.values()
    }

    /// Adds the given order to the ladder.
    pub fn add(&mut self, order: BookOrder) {
        let book_price = BookPrice::new(order.price, self.side);
        self.cache.insert(order.order_id, book_price);
        self.levels
            .entry(book_price)
            .or_insert_with(|| BookLevel::new(book_price))
            .add(order);
    }

    /// Updates the given order in the ladder, handling price moves.
    pub fn update(&mut self, order: BookOrder) {
        if let Some(existing_price) = self.cache.get(&order.order_id).copied() {
            if existing_price.value != order.price {
                // Price moved: delete from the old level then re-add
                self.delete_from_level(order.order_id, existing_price);
                self.add(order);
                return;
            }
            if let Some(level) = self.levels.get_mut(&existing_price) {
                level.update(order);
                if level.is_empty() {
                    self.levels.remove(&existing_price);
                }
                if order.size.is_zero() {
                    self.cache.remove(&order.order_id);
                }
                return;
            }
        }
        self.add(order);
    }

    /// Deletes the given order from the ladder.
    pub fn delete(&mut self, order_id: u64) {
        if let Some(book_price) = self.cache.remove(&order_id) {
            self.delete_from_level(order_id, book_price);
        }
    }

    /// Removes all levels and orders from the ladder.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.cache.clear();
    }

    fn delete_from_level(&mut self, order_id: u64, book_price: BookPrice) {
        if let Some(level) = self.levels.get_mut(&book_price) {
            level.delete(order_id);
            if level.is_empty() {
                self.levels.remove(&book_price);
            }
        }
        self.cache.remove(&order_id);
    }

    /// Simulates fills for an aggressing order of `quantity`, walking levels
    /// best-first while the optional `price_limit` is satisfied.
    ///
    /// Returns `(price, quantity)` pairs per consumed level.
    #[must_use]
    pub fn simulate_fills(&self, quantity: Quantity, price_limit: Option<Price>) -> Vec<(Price, Quantity)> {
        let mut fills = Vec::new();
        let mut remaining = quantity;

        for level in self.levels.values() {
            if remaining.is_zero() {
                break;
            }
            if let Some(limit) = price_limit {
                let crossed = match self.side {
                    // Aggressor is selling into bids: bid must be >= limit
                    OrderSide::Buy => level.price.value >= limit,
                    // Aggressor is buying from asks: ask must be <= limit
                    OrderSide::Sell => level.price.value <= limit,
                    OrderSide::NoOrderSide => panic!("`Ladder` side was `NoOrderSide`"),
                };
                if !crossed {
                    break;
                }
            }

            let level_size = Quantity::from_raw(level.size_raw(), remaining.precision);
            let fill_qty = remaining.min(level_size);
            if fill_qty.is_positive() {
                fills.push((level.price.value, fill_qty));
                remaining = remaining.saturating_sub(fill_qty);
            }
        }

        fills
    }
}

impl Debug for Ladder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Ladder))
            .field("side", &self.side)
            .field("levels", &self.levels.len())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn order(side: OrderSide, price: &str, size: &str, order_id: u64) -> BookOrder {
        BookOrder::new(side, Price::from(price), Quantity::from(size), order_id)
    }

    #[rstest]
    fn test_bid_ordering_best_first() {
        let mut ladder = Ladder::new(OrderSide::Buy);
        ladder.add(order(OrderSide::Buy, "100.00", "1.0", 1));
        ladder.add(order(OrderSide::Buy, "101.00", "1.0", 2));
        ladder.add(order(OrderSide::Buy, "99.00", "1.0", 3));

        assert_eq!(ladder.top().unwrap().price.value, Price::from("101.00"));
    }

    #[rstest]
    fn test_ask_ordering_best_first() {
        let mut ladder = Ladder::new(OrderSide::Sell);
        ladder.add(order(OrderSide::Sell, "100.00", "1.0", 1));
        ladder.add(order(OrderSide::Sell, "101.00", "1.0", 2));
        ladder.add(order(OrderSide::Sell, "99.00", "1.0", 3));

        assert_eq!(ladder.top().unwrap().price.value, Price::from("99.00"));
    }

    #[rstest]
    fn test_update_price_move() {
        let mut ladder = Ladder::new(OrderSide::Buy);
        ladder.add(order(OrderSide::Buy, "100.00", "1.0", 1));
        ladder.update(order(OrderSide::Buy, "100.50", "1.0", 1));

        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder.top().unwrap().price.value, Price::from("100.50"));
    }

    #[rstest]
    fn test_update_zero_size_removes() {
        let mut ladder = Ladder::new(OrderSide::Buy);
        ladder.add(order(OrderSide::Buy, "100.00", "1.0", 1));
        ladder.update(BookOrder::new(
            OrderSide::Buy,
            Price::from("100.00"),
            Quantity::zero(1),
            1,
        ));

        assert!(ladder.is_empty());
    }

    #[rstest]
    fn test_delete() {
        let mut ladder = Ladder::new(OrderSide::Sell);
        ladder.add(order(OrderSide::Sell, "100.00", "1.0", 1));
        ladder.add(order(OrderSide::Sell, "100.00", "2.0", 2));
        ladder.delete(1);

        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder.top().unwrap().size(), 2.0);
    }

    #[rstest]
    fn test_simulate_fills_walks_levels() {
        let mut ladder = Ladder::new(OrderSide::Sell);
        ladder.add(order(OrderSide::Sell, "100.00", "1.0", 1));
        ladder.add(order(OrderSide::Sell, "101.00", "1.0", 2));
        ladder.add(order(OrderSide::Sell, "102.00", "1.0", 3));

        // Market buy for 2.5 walks two levels and part of the third
        let fills = ladder.simulate_fills(Quantity::from("2.5"), None);
        assert_eq!(fills.len(), 3);
        assert_eq!(fills[0], (Price::from("100.00"), Quantity::from("1.0")));
        assert_eq!(fills[1], (Price::from("101.00"), Quantity::from("1.0")));
        assert_eq!(fills[2], (Price::from("102.00"), Quantity::from("0.5")));
    }

    #[rstest]
    fn test_simulate_fills_respects_limit() {
        let mut ladder = Ladder::new(OrderSide::Sell);
        ladder.add(order(OrderSide::Sell, "100.00", "1.0", 1));
        ladder.add(order(OrderSide::Sell, "101.00", "1.0", 2));

        // Limit buy at 100.00 only consumes the first level
        let fills = ladder.simulate_fills(Quantity::from("2.0"), Some(Price::from("100.00")));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0], (Price::from("100.00"), Quantity::from("1.0")));
    }
}
