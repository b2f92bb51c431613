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

//! Deterministic identifier generators with date-tagged formats.

use argo_core::datetime::MILLISECONDS_IN_SECOND;
use argo_model::identifiers::{ClientOrderId, PositionId, StrategyId, TraderId};
use chrono::{DateTime, Utc};

/// Returns a datetime tag (`YYYYMMDD-HHMMSS`) for the given UNIX milliseconds.
#[must_use]
pub fn get_datetime_tag(unix_ms: u64) -> String {
    let secs = (unix_ms / MILLISECONDS_IN_SECOND) as i64;
    let datetime: DateTime<Utc> =
        DateTime::from_timestamp(secs, 0).expect("Invalid timestamp");
    datetime.format("%Y%m%d-%H%M%S").to_string()
}

/// Generates client order IDs in the form
/// `O-{datetime_tag}-{trader_tag}-{strategy_tag}-{count}`.
#[derive(Debug)]
pub struct ClientOrderIdGenerator {
    trader_id: TraderId,
    strategy_id: StrategyId,
    count: usize,
}

impl ClientOrderIdGenerator {
    /// Creates a new [`ClientOrderIdGenerator`] instance.
    #[must_use]
    pub const fn new(trader_id: TraderId, strategy_id: StrategyId, initial_count: usize) -> Self {
        Self {
            trader_id,
            strategy_id,
            count: initial_count,
        }
    }

    /// Sets the internal count.
    pub const fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    /// Resets the internal count to zero.
    pub const fn reset(&mut self) {
        self.count = 0;
    }

    /// Returns the current internal count.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Generates the next client order ID for the given UNIX milliseconds.
    pub fn generate(&mut self, unix_ms: u64) -> ClientOrderId {
        let datetime_tag = get_datetime_tag(unix_ms);
        let trader_tag = self.trader_id.get_tag();
        let strategy_tag = self.strategy_id.get_tag();
        self.count += 1;
        ClientOrderId::new(format!(
            "O-{}-{}-{}-{}",
            datetime_tag, trader_tag, strategy_tag, self.count
        ))
    }
}

/// Generates position IDs in the form
/// `P-{datetime_tag}-{trader_tag}-{strategy_tag}-{count}`.
#[derive(Debug)]
pub struct PositionIdGenerator {
    trader_id: TraderId,
    counts: std::collections::HashMap<StrategyId, usize>,
}

impl PositionIdGenerator {
    /// Creates a new [`PositionIdGenerator`] instance.
    #[must_use]
    pub fn new(trader_id: TraderId) -> Self {
        Self {
            trader_id,
            counts: std::collections::HashMap::new(),
        }
    }

    /// Returns the current count for the given strategy.
    #[must_use]
    pub fn count(&self, strategy_id: StrategyId) -> usize {
        self.counts.get(&strategy_id).copied().unwrap_or(0)
    }

    /// Sets the count for the given strategy.
    pub fn set_count(&mut self, strategy_id: StrategyId, count: usize) {
        self.counts.insert(strategy_id, count);
    }

    /// Resets all internal counts.
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// Generates the next position ID for the given strategy and UNIX milliseconds.
    pub fn generate(&mut self, strategy_id: StrategyId, unix_ms: u64) -> PositionId {
        let count = self.counts.entry(strategy_id).or_insert(0);
        *count += 1;
        let datetime_tag = get_datetime_tag(unix_ms);
        PositionId::new(format!(
            "P-{}-{}-{}-{}",
            datetime_tag,
            self.trader_id.get_tag(),
            strategy_id.get_tag(),
            count
        ))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_get_datetime_tag() {
        assert_eq!(get_datetime_tag(0), "19700101-000000");
        assert_eq!(get_datetime_tag(1_707_577_123_000), "20240210-145843");
    }

    #[rstest]
    fn test_client_order_id_generator() {
        let mut generator =
            ClientOrderIdGenerator::new(TraderId::default(), StrategyId::default(), 0);
        assert_eq!(
            generator.generate(0),
            ClientOrderId::new("O-19700101-000000-001-001-1")
        );
        assert_eq!(
            generator.generate(0),
            ClientOrderId::new("O-19700101-000000-001-001-2")
        );

        generator.reset();
        assert_eq!(
            generator.generate(0),
            ClientOrderId::new("O-19700101-000000-001-001-1")
        );
    }

    #[rstest]
    fn test_position_id_generator_per_strategy() {
        let mut generator = PositionIdGenerator::new(TraderId::default());
        let strategy_a = StrategyId::new("A-001");
        let strategy_b = StrategyId::new("B-002");

        assert_eq!(
            generator.generate(strategy_a, 0),
            PositionId::new("P-19700101-000000-001-001-1")
        );
        assert_eq!(
            generator.generate(strategy_b, 0),
            PositionId::new("P-19700101-000000-001-002-1")
        );
        assert_eq!(generator.count(strategy_a), 1);
    }
}
