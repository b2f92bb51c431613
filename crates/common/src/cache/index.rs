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

//! The scoped indices backing O(k) cache queries.

use std::collections::{HashMap, HashSet};

use argo_model::identifiers::{
    AccountId, ClientId, ClientOrderId, InstrumentId, PositionId, StrategyId, Venue, VenueOrderId,
};

/// A key-value lookup index for the `Cache`.
#[derive(Debug, Default)]
pub struct CacheIndex {
    pub(crate) venue_account: HashMap<Venue, AccountId>,
    pub(crate) venue_orders: HashMap<Venue, HashSet<ClientOrderId>>,
    pub(crate) venue_positions: HashMap<Venue, HashSet<PositionId>>,
    pub(crate) venue_order_ids: HashMap<VenueOrderId, ClientOrderId>,
    pub(crate) client_order_ids: HashMap<ClientOrderId, VenueOrderId>,
    pub(crate) order_position: HashMap<ClientOrderId, PositionId>,
    pub(crate) order_strategy: HashMap<ClientOrderId, StrategyId>,
    pub(crate) order_client: HashMap<ClientOrderId, ClientId>,
    pub(crate) position_strategy: HashMap<PositionId, StrategyId>,
    pub(crate) position_orders: HashMap<PositionId, HashSet<ClientOrderId>>,
    pub(crate) instrument_orders: HashMap<InstrumentId, HashSet<ClientOrderId>>,
    pub(crate) instrument_positions: HashMap<InstrumentId, HashSet<PositionId>>,
    pub(crate) strategy_orders: HashMap<StrategyId, HashSet<ClientOrderId>>,
    pub(crate) strategy_positions: HashMap<StrategyId, HashSet<PositionId>>,
    pub(crate) orders: HashSet<ClientOrderId>,
    pub(crate) orders_open: HashSet<ClientOrderId>,
    pub(crate) orders_closed: HashSet<ClientOrderId>,
    pub(crate) orders_inflight: HashSet<ClientOrderId>,
    pub(crate) positions: HashSet<PositionId>,
    pub(crate) positions_open: HashSet<PositionId>,
    pub(crate) positions_closed: HashSet<PositionId>,
    pub(crate) strategies: HashSet<StrategyId>,
}

impl CacheIndex {
    /// Clears the index which will clear/reset all internal state.
    pub fn clear(&mut self) {
        self.venue_account.clear();
        self.venue_orders.clear();
        self.venue_positions.clear();
        self.venue_order_ids.clear();
        self.client_order_ids.clear();
        self.order_position.clear();
        self.order_strategy.clear();
        self.order_client.clear();
        self.position_strategy.clear();
        self.position_orders.clear();
        self.instrument_orders.clear();
        self.instrument_positions.clear();
        self.strategy_orders.clear();
        self.strategy_positions.clear();
        self.orders.clear();
        self.orders_open.clear();
        self.orders_closed.clear();
        self.orders_inflight.clear();
        self.positions.clear();
        self.positions_open.clear();
        self.positions_closed.clear();
        self.strategies.clear();
    }
}
