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

//! Position events for the trading domain model.

use std::fmt::Display;

use argo_core::{UUID4, UnixNanos};
use serde::{Deserialize, Serialize};

use crate::{
    enums::{OrderSide, PositionSide},
    identifiers::{AccountId, ClientOrderId, InstrumentId, PositionId, StrategyId, TraderId},
    types::{Currency, Money, Price, Quantity},
};

/// The state fields common to all position events.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The position ID.
    pub position_id: PositionId,
    /// The account ID associated with the position.
    pub account_id: AccountId,
    /// The client order ID for the order which opened the position.
    pub opening_order_id: ClientOrderId,
    /// The entry direction from the opening order.
    pub entry: OrderSide,
    /// The position side.
    pub side: PositionSide,
    /// The current signed quantity (positive for LONG, negative for SHORT).
    pub signed_qty: f64,
    /// The current open quantity (always non-negative).
    pub quantity: Quantity,
    /// The last fill quantity for the position.
    pub last_qty: Quantity,
    /// The last fill price for the position.
    pub last_px: Price,
    /// The position settlement currency.
    pub currency: Currency,
    /// The average open price.
    pub avg_px_open: f64,
    /// The realized PnL for the position (including commissions).
    pub realized_pnl: Option<Money>,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the position event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
}

/// Represents an event where a position has been opened.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionOpened {
    /// The position state at the event.
    pub state: PositionState,
}

impl Display for PositionOpened {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, position_id={}, side={}, quantity={})",
            stringify!(PositionOpened),
            self.state.instrument_id,
            self.state.position_id,
            self.state.side,
            self.state.quantity,
        )
    }
}

/// Represents an event where a position has changed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionChanged {
    /// The position state at the event.
    pub state: PositionState,
    /// The unrealized PnL at the event (if calculable).
    pub unrealized_pnl: Option<Money>,
}

impl Display for PositionChanged {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, position_id={}, side={}, quantity={})",
            stringify!(PositionChanged),
            self.state.instrument_id,
            self.state.position_id,
            self.state.side,
            self.state.quantity,
        )
    }
}

/// Represents an event where a position has been closed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionClosed {
    /// The position state at the event.
    pub state: PositionState,
    /// The client order ID for the order which closed the position.
    pub closing_order_id: Option<ClientOrderId>,
    /// The average close price.
    pub avg_px_close: f64,
    /// The open duration of the position in nanoseconds.
    pub duration_ns: u64,
}

impl Display for PositionClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, position_id={}, realized_pnl={})",
            stringify!(PositionClosed),
            self.state.instrument_id,
            self.state.position_id,
            self.state
                .realized_pnl
                .map_or("None".to_string(), |p| p.to_string()),
        )
    }
}

/// Represents an event where a position quantity was adjusted to converge with
/// external truth during reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionAdjusted {
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The position ID.
    pub position_id: PositionId,
    /// The account ID associated with the position.
    pub account_id: AccountId,
    /// The signed quantity difference applied (external - local).
    pub quantity_delta: f64,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the adjustment occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
}

impl Display for PositionAdjusted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, position_id={}, quantity_delta={})",
            stringify!(PositionAdjusted),
            self.instrument_id,
            self.position_id,
            self.quantity_delta,
        )
    }
}

/// A sum type covering all position events.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PositionEvent {
    Opened(PositionOpened),
    Changed(PositionChanged),
    Closed(PositionClosed),
    Adjusted(PositionAdjusted),
}

impl PositionEvent {
    /// Returns the instrument ID associated with the event.
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        match self {
            Self::Opened(event) => event.state.instrument_id,
            Self::Changed(event) => event.state.instrument_id,
            Self::Closed(event) => event.state.instrument_id,
            Self::Adjusted(event) => event.instrument_id,
        }
    }

    /// Returns the position ID associated with the event.
    #[must_use]
    pub fn position_id(&self) -> PositionId {
        match self {
            Self::Opened(event) => event.state.position_id,
            Self::Changed(event) => event.state.position_id,
            Self::Closed(event) => event.state.position_id,
            Self::Adjusted(event) => event.position_id,
        }
    }

    /// Returns the UNIX timestamp (nanoseconds) when the event occurred.
    #[must_use]
    pub fn ts_event(&self) -> UnixNanos {
        match self {
            Self::Opened(event) => event.state.ts_event,
            Self::Changed(event) => event.state.ts_event,
            Self::Closed(event) => event.state.ts_event,
            Self::Adjusted(event) => event.ts_event,
        }
    }
}
