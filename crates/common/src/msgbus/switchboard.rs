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

//! Standard topic builders with interned-string caches.
//!
//! Topic strings are cached per key so hot publish paths avoid per-event
//! string allocation.

use std::{cell::RefCell, collections::HashMap};

use argo_model::{
    data::BarType,
    identifiers::{AccountId, InstrumentId, PositionId, StrategyId, Venue},
};
use ustr::Ustr;

/// The endpoint address for the data engine command queue.
pub const DATA_ENGINE_EXECUTE: &str = "DataEngine.execute";
/// The endpoint address for the data engine data processing.
pub const DATA_ENGINE_PROCESS: &str = "DataEngine.process";
/// The endpoint address for the data engine responses.
pub const DATA_ENGINE_RESPONSE: &str = "DataEngine.response";
/// The endpoint address for the execution engine command queue.
pub const EXEC_ENGINE_EXECUTE: &str = "ExecEngine.execute";
/// The endpoint address for the execution engine event processing.
pub const EXEC_ENGINE_PROCESS: &str = "ExecEngine.process";
/// The endpoint address for the risk engine command queue.
pub const RISK_ENGINE_EXECUTE: &str = "RiskEngine.execute";

thread_local! {
    static INSTRUMENT_TOPICS: RefCell<HashMap<InstrumentId, Ustr>> = RefCell::new(HashMap::new());
    static DELTAS_TOPICS: RefCell<HashMap<InstrumentId, Ustr>> = RefCell::new(HashMap::new());
    static DEPTH_TOPICS: RefCell<HashMap<InstrumentId, Ustr>> = RefCell::new(HashMap::new());
    static QUOTES_TOPICS: RefCell<HashMap<InstrumentId, Ustr>> = RefCell::new(HashMap::new());
    static TRADES_TOPICS: RefCell<HashMap<InstrumentId, Ustr>> = RefCell::new(HashMap::new());
    static BARS_TOPICS: RefCell<HashMap<BarType, Ustr>> = RefCell::new(HashMap::new());
    static ORDER_EVENT_TOPICS: RefCell<HashMap<StrategyId, Ustr>> = RefCell::new(HashMap::new());
    static POSITION_EVENT_TOPICS: RefCell<HashMap<StrategyId, Ustr>> = RefCell::new(HashMap::new());
    static ACCOUNT_EVENT_TOPICS: RefCell<HashMap<AccountId, Ustr>> = RefCell::new(HashMap::new());
}

fn get_or_intern<K, F>(
    cache: &'static std::thread::LocalKey<RefCell<HashMap<K, Ustr>>>,
    key: K,
    make: F,
) -> Ustr
where
    K: std::hash::Hash + Eq + Copy,
    F: FnOnce() -> String,
{
    cache.with(|map| {
        *map.borrow_mut()
            .entry(key)
            .or_insert_with(|| Ustr::from(&make()))
    })
}

/// Returns the topic for instrument definition updates for the given `venue`.
#[must_use]
pub fn get_instruments_topic(venue: Venue) -> Ustr {
    Ustr::from(&format!("data.instrument.{venue}"))
}

/// Returns the topic for instrument definition updates for the given `instrument_id`.
#[must_use]
pub fn get_instrument_topic(instrument_id: InstrumentId) -> Ustr {
    get_or_intern(&INSTRUMENT_TOPICS, instrument_id, || {
        format!(
            "data.instrument.{}.{}",
            instrument_id.venue, instrument_id.symbol
        )
    })
}

/// Returns the topic for order book delta updates for the given `instrument_id`.
#[must_use]
pub fn get_book_deltas_topic(instrument_id: InstrumentId) -> Ustr {
    get_or_intern(&DELTAS_TOPICS, instrument_id, || {
        format!("data.book.deltas.{instrument_id}")
    })
}

/// Returns the topic for order book depth snapshots for the given `instrument_id`.
#[must_use]
pub fn get_book_depth10_topic(instrument_id: InstrumentId) -> Ustr {
    get_or_intern(&DEPTH_TOPICS, instrument_id, || {
        format!("data.book.depth10.{instrument_id}")
    })
}

/// Returns the topic for quote updates for the given `instrument_id`.
#[must_use]
pub fn get_quotes_topic(instrument_id: InstrumentId) -> Ustr {
    get_or_intern(&QUOTES_TOPICS, instrument_id, || {
        format!("data.quotes.{instrument_id}")
    })
}

/// Returns the topic for trade updates for the given `instrument_id`.
#[must_use]
pub fn get_trades_topic(instrument_id: InstrumentId) -> Ustr {
    get_or_intern(&TRADES_TOPICS, instrument_id, || {
        format!("data.trades.{instrument_id}")
    })
}

/// Returns the topic for bar updates for the given `bar_type`.
#[must_use]
pub fn get_bars_topic(bar_type: BarType) -> Ustr {
    get_or_intern(&BARS_TOPICS, bar_type, || format!("data.bars.{bar_type}"))
}

/// Returns the topic for order events for the given `strategy_id`.
#[must_use]
pub fn get_order_events_topic(strategy_id: StrategyId) -> Ustr {
    get_or_intern(&ORDER_EVENT_TOPICS, strategy_id, || {
        format!("events.order.{strategy_id}")
    })
}

/// Returns the topic for position events for the given `strategy_id`.
#[must_use]
pub fn get_position_events_topic(strategy_id: StrategyId) -> Ustr {
    get_or_intern(&POSITION_EVENT_TOPICS, strategy_id, || {
        format!("events.position.{strategy_id}")
    })
}

/// Returns the topic for position snapshot captures for the given `position_id`.
#[must_use]
pub fn get_positions_snapshots_topic(position_id: PositionId) -> Ustr {
    Ustr::from(&format!("snapshots.positions.{position_id}"))
}

/// Returns the topic for account events for the given `account_id`.
#[must_use]
pub fn get_account_events_topic(account_id: AccountId) -> Ustr {
    get_or_intern(&ACCOUNT_EVENT_TOPICS, account_id, || {
        format!("events.account.{account_id}")
    })
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_topic_shapes() {
        let instrument_id = InstrumentId::from("BTCUSDT-PERP.BINANCE");
        assert_eq!(
            get_quotes_topic(instrument_id).as_str(),
            "data.quotes.BTCUSDT-PERP.BINANCE"
        );
        assert_eq!(
            get_trades_topic(instrument_id).as_str(),
            "data.trades.BTCUSDT-PERP.BINANCE"
        );
        assert_eq!(
            get_book_deltas_topic(instrument_id).as_str(),
            "data.book.deltas.BTCUSDT-PERP.BINANCE"
        );
        assert_eq!(
            get_order_events_topic(StrategyId::new("S-001")).as_str(),
            "events.order.S-001"
        );
    }

    #[rstest]
    fn test_topics_interned() {
        let instrument_id = InstrumentId::from("ETHUSDT.BINANCE");
        let a = get_quotes_topic(instrument_id);
        let b = get_quotes_topic(instrument_id);
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[rstest]
    fn test_bars_topic() {
        let bar_type = BarType::from("BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL");
        assert_eq!(
            get_bars_topic(bar_type).as_str(),
            "data.bars.BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL"
        );
    }
}
