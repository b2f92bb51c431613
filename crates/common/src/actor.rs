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

//! The `DataActor` capability trait for user components.
//!
//! Each handler is optional with a no-op default; the runtime dispatches only
//! those a concrete actor implements.

use std::any::Any;

use argo_model::{
    data::{Bar, Data, OrderBookDeltas, OrderBookDepth10, QuoteTick, TradeTick},
    events::{OrderEventAny, PositionEvent},
    identifiers::ComponentId,
    instruments::InstrumentAny,
};

use crate::timer::TimeEvent;

/// A user component receiving data and event callbacks from the engines.
///
/// Lifecycle callbacks (`on_start`, `on_stop`, `on_reset`, `on_dispose`) are
/// invoked exactly once per transition by the owning trader.
#[allow(unused_variables)]
pub trait DataActor {
    /// Returns the component ID for the actor.
    fn component_id(&self) -> ComponentId;

    /// Actions to be performed on start.
    fn on_start(&mut self) {}

    /// Actions to be performed on stop.
    fn on_stop(&mut self) {}

    /// Actions to be performed on reset.
    fn on_reset(&mut self) {}

    /// Actions to be performed on dispose.
    fn on_dispose(&mut self) {}

    /// Actions to be performed when receiving an instrument update.
    fn on_instrument(&mut self, instrument: &InstrumentAny) {}

    /// Actions to be performed when receiving a bar.
    fn on_bar(&mut self, bar: &Bar) {}

    /// Actions to be performed when receiving a quote tick.
    fn on_quote_tick(&mut self, quote: &QuoteTick) {}

    /// Actions to be performed when receiving a trade tick.
    fn on_trade_tick(&mut self, trade: &TradeTick) {}

    /// Actions to be performed when receiving order book deltas.
    fn on_order_book(&mut self, deltas: &OrderBookDeltas) {}

    /// Actions to be performed when receiving an order book depth snapshot.
    fn on_order_book_depth(&mut self, depth: &OrderBookDepth10) {}

    /// Actions to be performed when receiving custom data.
    fn on_data(&mut self, data: &dyn Any) {}

    /// Actions to be performed when receiving historical data from a request.
    fn on_historical_data(&mut self, data: &[Data]) {}

    /// Actions to be performed when receiving an order event.
    fn on_order_event(&mut self, event: &OrderEventAny) {}

    /// Actions to be performed when receiving a position event.
    fn on_position_event(&mut self, event: &PositionEvent) {}

    /// Actions to be performed when receiving a time event.
    fn on_time_event(&mut self, event: &TimeEvent) {}
}
