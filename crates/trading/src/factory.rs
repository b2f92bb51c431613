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

//! A factory for constructing orders with generated identifiers.

use argo_core::{UUID4, UnixNanos, datetime::nanos_to_millis};
use argo_model::{
    enums::{ContingencyType, OrderSide, OrderType, TimeInForce, TrailingOffsetType},
    events::OrderInitialized,
    identifiers::{ClientOrderId, InstrumentId, OrderListId, StrategyId, TraderId},
    orders::{Order, OrderList},
    types::{Price, Quantity},
};
use argo_common::generators::ClientOrderIdGenerator;
use rust_decimal::Decimal;

/// A factory for constructing orders for a single strategy, with
/// deterministic generated client order IDs.
pub struct OrderFactory {
    trader_id: TraderId,
    strategy_id: StrategyId,
    order_id_generator: ClientOrderIdGenerator,
    order_list_count: usize,
}

impl OrderFactory {
    /// Creates a new [`OrderFactory`] instance.
    #[must_use]
    pub const fn new(trader_id: TraderId, strategy_id: StrategyId) -> Self {
        Self {
            trader_id,
            strategy_id,
            order_id_generator: ClientOrderIdGenerator::new(trader_id, strategy_id, 0),
            order_list_count: 0,
        }
    }

    /// Generates the next client order ID for the given time.
    pub fn generate_client_order_id(&mut self, ts_now: UnixNanos) -> ClientOrderId {
        self.order_id_generator.generate(nanos_to_millis(ts_now.as_u64()))
    }

    /// Generates the next order list ID.
    pub fn generate_order_list_id(&mut self) -> OrderListId {
        self.order_list_count += 1;
        OrderListId::new(format!("OL-{}", self.order_list_count))
    }

    /// Resets the factory's internal counters.
    pub const fn reset(&mut self) {
        self.order_id_generator.reset();
    }

    fn base_init(
        &mut self,
        instrument_id: InstrumentId,
        order_side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
        ts_now: UnixNanos,
    ) -> OrderInitialized {
        OrderInitialized {
            trader_id: self.trader_id,
            strategy_id: self.strategy_id,
            instrument_id,
            client_order_id: self.generate_client_order_id(ts_now),
            order_side,
            order_type,
            quantity,
            price: None,
            trigger_price: None,
            trigger_type: None,
            trailing_offset: None,
            trailing_offset_type: None,
            time_in_force: TimeInForce::Gtc,
            expire_time: None,
            post_only: false,
            reduce_only: false,
            display_qty: None,
            contingency_type: ContingencyType::NoContingency,
            order_list_id: None,
            linked_order_ids: None,
            parent_order_id: None,
            tags: None,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        }
    }

    /// Creates a new MARKET order.
    pub fn market(
        &mut self,
        instrument_id: InstrumentId,
        order_side: OrderSide,
        quantity: Quantity,
        time_in_force: TimeInForce,
        ts_now: UnixNanos,
    ) -> Order {
        let mut init = self.base_init(instrument_id, order_side, OrderType::Market, quantity, ts_now);
        init.time_in_force = time_in_force;
        Order::new(init)
    }

    /// Creates a new LIMIT order.
    #[allow(clippy::too_many_arguments)]
    pub fn limit(
        &mut self,
        instrument_id: InstrumentId,
        order_side: OrderSide,
        quantity: Quantity,
        price: Price,
        time_in_force: TimeInForce,
        post_only: bool,
        reduce_only: bool,
        ts_now: UnixNanos,
    ) -> Order {
        let mut init = self.base_init(instrument_id, order_side, OrderType::Limit, quantity, ts_now);
        init.price = Some(price);
        init.time_in_force = time_in_force;
        init.post_only = post_only;
        init.reduce_only = reduce_only;
        Order::new(init)
    }

    /// Creates a new STOP_MARKET order.
    #[allow(clippy::too_many_arguments)]
    pub fn stop_market(
        &mut self,
        instrument_id: InstrumentId,
        order_side: OrderSide,
        quantity: Quantity,
        trigger_price: Price,
        time_in_force: TimeInForce,
        reduce_only: bool,
        ts_now: UnixNanos,
    ) -> Order {
        let mut init =
            self.base_init(instrument_id, order_side, OrderType::StopMarket, quantity, ts_now);
        init.trigger_price = Some(trigger_price);
        init.time_in_force = time_in_force;
        init.reduce_only = reduce_only;
        Order::new(init)
    }

    /// Creates a new STOP_LIMIT order.
    #[allow(clippy::too_many_arguments)]
    pub fn stop_limit(
        &mut self,
        instrument_id: InstrumentId,
        order_side: OrderSide,
        quantity: Quantity,
        price: Price,
        trigger_price: Price,
        time_in_force: TimeInForce,
        ts_now: UnixNanos,
    ) -> Order {
        let mut init =
            self.base_init(instrument_id, order_side, OrderType::StopLimit, quantity, ts_now);
        init.price = Some(price);
        init.trigger_price = Some(trigger_price);
        init.time_in_force = time_in_force;
        Order::new(init)
    }

    /// Creates a new TRAILING_STOP_MARKET order.
    #[allow(clippy::too_many_arguments)]
    pub fn trailing_stop_market(
        &mut self,
        instrument_id: InstrumentId,
        order_side: OrderSide,
        quantity: Quantity,
        trigger_price: Price,
        trailing_offset: Decimal,
        trailing_offset_type: TrailingOffsetType,
        ts_now: UnixNanos,
    ) -> Order {
        let mut init = self.base_init(
            instrument_id,
            order_side,
            OrderType::TrailingStopMarket,
            quantity,
            ts_now,
        );
        init.trigger_price = Some(trigger_price);
        init.trailing_offset = Some(trailing_offset);
        init.trailing_offset_type = Some(trailing_offset_type);
        Order::new(init)
    }

    /// Creates a bracket order list: an entry with OCO take-profit and
    /// stop-loss children contingent on the entry fill.
    #[allow(clippy::too_many_arguments)]
    pub fn bracket(
        &mut self,
        instrument_id: InstrumentId,
        order_side: OrderSide,
        quantity: Quantity,
        entry_price: Price,
        take_profit_price: Price,
        stop_loss_trigger: Price,
        ts_now: UnixNanos,
    ) -> OrderList {
        let order_list_id = self.generate_order_list_id();

        let mut entry_init =
            self.base_init(instrument_id, order_side, OrderType::Limit, quantity, ts_now);
        entry_init.price = Some(entry_price);
        entry_init.order_list_id = Some(order_list_id);
        entry_init.contingency_type = ContingencyType::Oto;
        let entry_id = entry_init.client_order_id;

        let child_side = order_side.opposite();

        let mut tp_init =
            self.base_init(instrument_id, child_side, OrderType::Limit, quantity, ts_now);
        tp_init.price = Some(take_profit_price);
        tp_init.order_list_id = Some(order_list_id);
        tp_init.contingency_type = ContingencyType::Oco;
        tp_init.parent_order_id = Some(entry_id);
        let tp_id = tp_init.client_order_id;

        let mut sl_init = self.base_init(
            instrument_id,
            child_side,
            OrderType::StopMarket,
            quantity,
            ts_now,
        );
        sl_init.trigger_price = Some(stop_loss_trigger);
        sl_init.order_list_id = Some(order_list_id);
        sl_init.contingency_type = ContingencyType::Oco;
        sl_init.parent_order_id = Some(entry_id);
        let sl_id = sl_init.client_order_id;

        entry_init.linked_order_ids = Some(vec![tp_id, sl_id]);
        tp_init.linked_order_ids = Some(vec![sl_id]);
        sl_init.linked_order_ids = Some(vec![tp_id]);

        let orders = vec![
            Order::new(entry_init),
            Order::new(tp_init),
            Order::new(sl_init),
        ];
        OrderList::new(order_list_id, instrument_id, self.strategy_id, orders, ts_now)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn factory() -> OrderFactory {
        OrderFactory::new(TraderId::default(), StrategyId::default())
    }

    #[rstest]
    fn test_market_order_ids_sequential() {
        let mut factory = factory();
        let a = factory.market(
            InstrumentId::from("ETHUSDT.BINANCE"),
            OrderSide::Buy,
            Quantity::from("1.000"),
            TimeInForce::Gtc,
            UnixNanos::default(),
        );
        let b = factory.market(
            InstrumentId::from("ETHUSDT.BINANCE"),
            OrderSide::Sell,
            Quantity::from("1.000"),
            TimeInForce::Gtc,
            UnixNanos::default(),
        );
        assert_ne!(a.client_order_id, b.client_order_id);
        assert_eq!(a.client_order_id, ClientOrderId::new("O-19700101-000000-001-001-1"));
        assert_eq!(b.client_order_id, ClientOrderId::new("O-19700101-000000-001-001-2"));
    }

    #[rstest]
    fn test_bracket_linkage() {
        let mut factory = factory();
        let bracket = factory.bracket(
            InstrumentId::from("ETHUSDT.BINANCE"),
            OrderSide::Buy,
            Quantity::from("100"),
            Price::from("50.00"),
            Price::from("60.00"),
            Price::from("45.00"),
            UnixNanos::default(),
        );

        assert_eq!(bracket.orders.len(), 3);
        let entry = &bracket.orders[0];
        let tp = &bracket.orders[1];
        let sl = &bracket.orders[2];

        assert_eq!(entry.contingency_type, ContingencyType::Oto);
        assert_eq!(tp.contingency_type, ContingencyType::Oco);
        assert_eq!(tp.parent_order_id, Some(entry.client_order_id));
        assert_eq!(sl.parent_order_id, Some(entry.client_order_id));
        assert_eq!(
            entry.linked_order_ids,
            Some(vec![tp.client_order_id, sl.client_order_id])
        );
        assert_eq!(tp.linked_order_ids, Some(vec![sl.client_order_id]));
        assert_eq!(sl.side, entry.side.opposite());
    }
}
