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

//! An `OrderBookDelta` data type intended to carry book state information.

use std::fmt::Display;

use argo_core::{UnixNanos, correctness::FAILED};
use serde::{Deserialize, Serialize};

use super::GetTsInit;
use crate::{
    enums::{BookAction, OrderSide},
    identifiers::InstrumentId,
    types::{Price, Quantity},
};

/// Represents an order in a book.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct BookOrder {
    /// The order side.
    pub side: OrderSide,
    /// The order price.
    pub price: Price,
    /// The order size.
    pub size: Quantity,
    /// The order ID.
    pub order_id: u64,
}

impl BookOrder {
    /// Creates a new [`BookOrder`] instance.
    #[must_use]
    pub const fn new(side: OrderSide, price: Price, size: Quantity, order_id: u64) -> Self {
        Self {
            side,
            price,
            size,
            order_id,
        }
    }
}

impl Display for BookOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.price, self.size, self.side, self.order_id,
        )
    }
}

/// Represents a single change/delta in an order book.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct OrderBookDelta {
    /// The instrument ID for the book.
    pub instrument_id: InstrumentId,
    /// The order book delta action.
    pub action: BookAction,
    /// The order to apply.
    pub order: BookOrder,
    /// The record flags bit field, indicating event end and data information.
    pub flags: u8,
    /// The message sequence number assigned at the venue.
    pub sequence: u64,
    /// UNIX timestamp (nanoseconds) when the book event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the struct was initialized.
    pub ts_init: UnixNanos,
}

impl OrderBookDelta {
    /// Creates a new [`OrderBookDelta`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-`CLEAR` action carries a zero-sized order.
    #[allow(clippy::too_many_arguments)]
    pub fn new_checked(
        instrument_id: InstrumentId,
        action: BookAction,
        order: BookOrder,
        flags: u8,
        sequence: u64,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> anyhow::Result<Self> {
        if action != BookAction::Clear && action != BookAction::Delete && order.size.is_zero() {
            anyhow::bail!("invalid `OrderBookDelta`: zero-sized order for {action} action");
        }
        Ok(Self {
            instrument_id,
            action,
            order,
            flags,
            sequence,
            ts_event,
            ts_init,
        })
    }

    /// Creates a new [`OrderBookDelta`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument_id: InstrumentId,
        action: BookAction,
        order: BookOrder,
        flags: u8,
        sequence: u64,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self::new_checked(
            instrument_id,
            action,
            order,
            flags,
            sequence,
            ts_event,
            ts_init,
        )
        .expect(FAILED)
    }

    /// Creates a new `CLEAR` action [`OrderBookDelta`] instance.
    #[must_use]
    pub fn clear(
        instrument_id: InstrumentId,
        sequence: u64,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            instrument_id,
            action: BookAction::Clear,
            order: BookOrder::default(),
            flags: 0,
            sequence,
            ts_event,
            ts_init,
        }
    }
}

impl Display for OrderBookDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.instrument_id,
            self.action,
            self.order,
            self.flags,
            self.sequence,
            self.ts_event,
            self.ts_init,
        )
    }
}

impl GetTsInit for OrderBookDelta {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

/// Represents a grouped batch of `OrderBookDelta` updates for an `OrderBook`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderBookDeltas {
    /// The instrument ID for the book.
    pub instrument_id: InstrumentId,
    /// The batch of order book deltas.
    pub deltas: Vec<OrderBookDelta>,
    /// The record flags bit field of the last delta.
    pub flags: u8,
    /// The message sequence number of the last delta.
    pub sequence: u64,
    /// UNIX timestamp (nanoseconds) when the last book event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) of the last delta initialization.
    pub ts_init: UnixNanos,
}

impl OrderBookDeltas {
    /// Creates a new [`OrderBookDeltas`] instance.
    ///
    /// # Panics
    ///
    /// Panics if `deltas` is empty.
    #[must_use]
    pub fn new(instrument_id: InstrumentId, deltas: Vec<OrderBookDelta>) -> Self {
        let last = deltas.last().expect("`deltas` cannot be empty");
        Self {
            instrument_id,
            flags: last.flags,
            sequence: last.sequence,
            ts_event: last.ts_event,
            ts_init: last.ts_init,
            deltas,
        }
    }
}

impl GetTsInit for OrderBookDeltas {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn delta(action: BookAction, price: &str, size: &str, sequence: u64) -> OrderBookDelta {
        OrderBookDelta::new(
            InstrumentId::from("ETHUSDT.BINANCE"),
            action,
            BookOrder::new(
                OrderSide::Buy,
                Price::from(price),
                Quantity::from(size),
                sequence,
            ),
            0,
            sequence,
            UnixNanos::from(sequence),
            UnixNanos::from(sequence),
        )
    }

    #[rstest]
    fn test_new_checked_zero_size_add() {
        let result = OrderBookDelta::new_checked(
            InstrumentId::from("ETHUSDT.BINANCE"),
            BookAction::Add,
            BookOrder::new(OrderSide::Buy, Price::from("2500.10"), Quantity::zero(3), 1),
            0,
            1,
            UnixNanos::from(1),
            UnixNanos::from(1),
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn test_clear() {
        let delta = OrderBookDelta::clear(
            InstrumentId::from("ETHUSDT.BINANCE"),
            7,
            UnixNanos::from(1),
            UnixNanos::from(2),
        );
        assert_eq!(delta.action, BookAction::Clear);
        assert_eq!(delta.sequence, 7);
    }

    #[rstest]
    fn test_deltas_takes_last_fields() {
        let deltas = OrderBookDeltas::new(
            InstrumentId::from("ETHUSDT.BINANCE"),
            vec![
                delta(BookAction::Add, "2500.10", "1.000", 1),
                delta(BookAction::Add, "2500.20", "2.000", 2),
            ],
        );
        assert_eq!(deltas.sequence, 2);
        assert_eq!(deltas.ts_event, UnixNanos::from(2));
        assert_eq!(deltas.deltas.len(), 2);
    }
}
