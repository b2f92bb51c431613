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

//! Trading command messages for the execution engine.

use std::fmt::Display;

use argo_core::{UUID4, UnixNanos};
use argo_model::{
    identifiers::{ClientId, ClientOrderId, InstrumentId, PositionId, StrategyId, TraderId, VenueOrderId},
    orders::{Order, OrderList},
    types::{Price, Quantity},
};

/// A command for the execution engine, routed to an execution client.
#[derive(Clone, Debug)]
pub enum TradingCommand {
    SubmitOrder(SubmitOrder),
    SubmitOrderList(SubmitOrderList),
    ModifyOrder(ModifyOrder),
    CancelOrder(CancelOrder),
    CancelAllOrders(CancelAllOrders),
    QueryOrder(QueryOrder),
}

impl TradingCommand {
    /// Returns the client ID for routing the command.
    #[must_use]
    pub const fn client_id(&self) -> Option<&ClientId> {
        match self {
            Self::SubmitOrder(cmd) => cmd.client_id.as_ref(),
            Self::SubmitOrderList(cmd) => cmd.client_id.as_ref(),
            Self::ModifyOrder(cmd) => cmd.client_id.as_ref(),
            Self::CancelOrder(cmd) => cmd.client_id.as_ref(),
            Self::CancelAllOrders(cmd) => cmd.client_id.as_ref(),
            Self::QueryOrder(cmd) => cmd.client_id.as_ref(),
        }
    }

    /// Returns the instrument ID associated with the command.
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        match self {
            Self::SubmitOrder(cmd) => cmd.instrument_id,
            Self::SubmitOrderList(cmd) => cmd.instrument_id,
            Self::ModifyOrder(cmd) => cmd.instrument_id,
            Self::CancelOrder(cmd) => cmd.instrument_id,
            Self::CancelAllOrders(cmd) => cmd.instrument_id,
            Self::QueryOrder(cmd) => cmd.instrument_id,
        }
    }

    /// Returns the strategy ID associated with the command.
    #[must_use]
    pub fn strategy_id(&self) -> StrategyId {
        match self {
            Self::SubmitOrder(cmd) => cmd.strategy_id,
            Self::SubmitOrderList(cmd) => cmd.strategy_id,
            Self::ModifyOrder(cmd) => cmd.strategy_id,
            Self::CancelOrder(cmd) => cmd.strategy_id,
            Self::CancelAllOrders(cmd) => cmd.strategy_id,
            Self::QueryOrder(cmd) => cmd.strategy_id,
        }
    }
}

impl Display for TradingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubmitOrder(cmd) => write!(f, "SubmitOrder({})", cmd.order.client_order_id),
            Self::SubmitOrderList(cmd) => write!(f, "SubmitOrderList({})", cmd.order_list.id),
            Self::ModifyOrder(cmd) => write!(f, "ModifyOrder({})", cmd.client_order_id),
            Self::CancelOrder(cmd) => write!(f, "CancelOrder({})", cmd.client_order_id),
            Self::CancelAllOrders(cmd) => write!(f, "CancelAllOrders({})", cmd.instrument_id),
            Self::QueryOrder(cmd) => write!(f, "QueryOrder({})", cmd.client_order_id),
        }
    }
}

/// A command to submit the given order.
#[derive(Clone, Debug)]
pub struct SubmitOrder {
    pub trader_id: TraderId,
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub order: Order,
    /// An explicit position ID to associate fills with (HEDGING).
    pub position_id: Option<PositionId>,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to submit the given list of related orders.
#[derive(Clone, Debug)]
pub struct SubmitOrderList {
    pub trader_id: TraderId,
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub order_list: OrderList,
    pub position_id: Option<PositionId>,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to modify the given order's quantity and/or prices.
#[derive(Clone, Debug)]
pub struct ModifyOrder {
    pub trader_id: TraderId,
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub client_order_id: ClientOrderId,
    pub venue_order_id: Option<VenueOrderId>,
    pub quantity: Option<Quantity>,
    pub price: Option<Price>,
    pub trigger_price: Option<Price>,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to cancel the given order.
#[derive(Clone, Debug)]
pub struct CancelOrder {
    pub trader_id: TraderId,
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub client_order_id: ClientOrderId,
    pub venue_order_id: Option<VenueOrderId>,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to cancel all orders for an instrument.
#[derive(Clone, Debug)]
pub struct CancelAllOrders {
    pub trader_id: TraderId,
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub order_side: argo_model::enums::OrderSide,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to query the current status of an order at the venue.
#[derive(Clone, Debug)]
pub struct QueryOrder {
    pub trader_id: TraderId,
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub client_order_id: ClientOrderId,
    pub venue_order_id: Option<VenueOrderId>,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}
