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

//! A k-way merge iterator over heterogeneous historical data streams.

use std::{cmp::Ordering, collections::BinaryHeap};

use argo_core::UnixNanos;
use argo_model::data::{Data, GetTsInit, is_monotonically_increasing_by_init};

struct HeapEntry {
    ts_init: UnixNanos,
    stream_index: usize,
    element_index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.ts_init == other.ts_init && self.stream_index == other.stream_index
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; stream index breaks ties stably
        other
            .ts_init
            .cmp(&self.ts_init)
            .then_with(|| other.stream_index.cmp(&self.stream_index))
    }
}

/// Merges multiple historical data streams into one sequence ordered by
/// ascending `ts_init` (the stable merge preserves stream order on ties).
pub struct BacktestDataIterator {
    streams: Vec<Vec<Data>>,
    heap: BinaryHeap<HeapEntry>,
}

impl BacktestDataIterator {
    /// Creates a new [`BacktestDataIterator`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            streams: Vec::new(),
            heap: BinaryHeap::new(),
        }
    }

    /// Adds the given data stream to the merge.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not sorted ascending by `ts_init`.
    pub fn add_stream(&mut self, data: Vec<Data>) {
        assert!(
            is_monotonically_increasing_by_init(&data),
            "Data stream must be sorted ascending by `ts_init`"
        );

        if let Some(first) = data.first() {
            self.heap.push(HeapEntry {
                ts_init: first.ts_init(),
                stream_index: self.streams.len(),
                element_index: 0,
            });
        }
        self.streams.push(data);
    }

    /// Returns the `ts_init` of the next element, if any.
    #[must_use]
    pub fn peek_ts_init(&self) -> Option<UnixNanos> {
        self.heap.peek().map(|entry| entry.ts_init)
    }

    /// Returns whether the iterator is exhausted.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Default for BacktestDataIterator {
    /// Creates a new default [`BacktestDataIterator`] instance.
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for BacktestDataIterator {
    type Item = Data;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.heap.pop()?;
        let stream = &self.streams[entry.stream_index];
        let element = stream[entry.element_index].clone();

        let next_index = entry.element_index + 1;
        if next_index < stream.len() {
            self.heap.push(HeapEntry {
                ts_init: stream[next_index].ts_init(),
                stream_index: entry.stream_index,
                element_index: next_index,
            });
        }

        Some(element)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_model::{
        data::TradeTick,
        enums::AggressorSide,
        identifiers::{InstrumentId, TradeId},
        types::{Price, Quantity},
    };
    use rstest::rstest;

    use super::*;

    fn trade(instrument: &str, ts: u64) -> Data {
        Data::Trade(TradeTick::new(
            InstrumentId::from(instrument),
            Price::from("100.00"),
            Quantity::from("1.0"),
            AggressorSide::Buyer,
            TradeId::new(format!("T-{ts}")),
            UnixNanos::from(ts),
            UnixNanos::from(ts),
        ))
    }

    #[rstest]
    fn test_merge_is_sorted_by_ts_init() {
        let mut iterator = BacktestDataIterator::new();
        iterator.add_stream(vec![
            trade("ETHUSDT.BINANCE", 1),
            trade("ETHUSDT.BINANCE", 4),
            trade("ETHUSDT.BINANCE", 7),
        ]);
        iterator.add_stream(vec![
            trade("BTCUSDT.BINANCE", 2),
            trade("BTCUSDT.BINANCE", 3),
            trade("BTCUSDT.BINANCE", 9),
        ]);

        let merged: Vec<u64> = iterator.map(|data| data.ts_init().as_u64()).collect();
        assert_eq!(merged, vec![1, 2, 3, 4, 7, 9]);
    }

    #[rstest]
    fn test_ties_preserve_stream_order() {
        let mut iterator = BacktestDataIterator::new();
        iterator.add_stream(vec![trade("A.X", 5)]);
        iterator.add_stream(vec![trade("B.X", 5)]);

        let merged: Vec<String> = iterator
            .map(|data| data.instrument_id().to_string())
            .collect();
        assert_eq!(merged, vec!["A.X", "B.X"]);
    }

    #[rstest]
    #[should_panic(expected = "sorted ascending")]
    fn test_unsorted_stream_panics() {
        let mut iterator = BacktestDataIterator::new();
        iterator.add_stream(vec![trade("A.X", 5), trade("A.X", 3)]);
    }
}
