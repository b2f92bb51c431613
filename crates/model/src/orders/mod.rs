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

//! An event-sourced `Order` type covering all supported order types.
//!
//! An order's current state is the reduction of its event list: every applied
//! [`OrderEventAny`] is appended, and the materialized fields are a snapshot
//! for O(1) access. Events are the persistence unit.

use std::fmt::Display;

use argo_core::{UUID4, UnixNanos};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::{
    enums::{
        ContingencyType, LiquiditySide, OrderSide, OrderSideSpecified, OrderStatus, OrderType,
        TimeInForce, TrailingOffsetType, TriggerType,
    },
    events::{OrderEventAny, OrderInitialized},
    identifiers::{
        AccountId, ClientOrderId, InstrumentId, OrderListId, PositionId, StrategyId, TradeId,
        TraderId, VenueOrderId,
    },
    types::{Currency, Money, Price, Quantity},
};

/// An error related to order state and event application.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("Invalid state transition from {from} on {event}")]
    InvalidStateTransition { from: OrderStatus, event: String },
    #[error("Duplicate trade ID {0}")]
    DuplicateTradeId(TradeId),
    #[error("Out-of-order fill: ts_event {ts_event} was prior to last fill {ts_last}")]
    OutOfOrderFill {
        ts_event: UnixNanos,
        ts_last: UnixNanos,
    },
    #[error("Event client order ID {event_id} did not match order {order_id}")]
    ClientOrderIdMismatch {
        event_id: ClientOrderId,
        order_id: ClientOrderId,
    },
    #[error("Order type {order_type} missing required {field}")]
    MissingField {
        order_type: OrderType,
        field: &'static str,
    },
}

/// Represents an order in the trading domain, covering all supported order types.
///
/// State = {INITIALIZED, DENIED, EMULATED, RELEASED, SUBMITTED, ACCEPTED,
/// REJECTED, CANCELED, EXPIRED, TRIGGERED, PENDING_UPDATE, PENDING_CANCEL,
/// PARTIALLY_FILLED, FILLED}; `last_event` is the current state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    /// The trader ID associated with the order.
    pub trader_id: TraderId,
    /// The strategy ID associated with the order.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the order.
    pub instrument_id: InstrumentId,
    /// The client order ID (assigned by the Argo system).
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue, when accepted).
    pub venue_order_id: Option<VenueOrderId>,
    /// The position ID associated with the order.
    pub position_id: Option<PositionId>,
    /// The account ID associated with the order.
    pub account_id: Option<AccountId>,
    /// The order side.
    pub side: OrderSide,
    /// The order type.
    pub order_type: OrderType,
    /// The order quantity.
    pub quantity: Quantity,
    /// The order price (for orders carrying a limit price).
    pub price: Option<Price>,
    /// The order trigger price (for orders carrying a trigger).
    pub trigger_price: Option<Price>,
    /// The trigger type for the order trigger price.
    pub trigger_type: Option<TriggerType>,
    /// The trailing offset for trailing type orders.
    pub trailing_offset: Option<Decimal>,
    /// The trailing offset type for trailing type orders.
    pub trailing_offset_type: Option<TrailingOffsetType>,
    /// The order time in force.
    pub time_in_force: TimeInForce,
    /// The order expiration (for GTD orders).
    pub expire_time: Option<UnixNanos>,
    /// The current order status.
    pub status: OrderStatus,
    /// The previous order status (for reverting pending states).
    pub previous_status: Option<OrderStatus>,
    /// The total filled quantity.
    pub filled_qty: Quantity,
    /// The quantity remaining to be filled.
    pub leaves_qty: Quantity,
    /// The average fill price.
    pub avg_px: Option<f64>,
    /// The liquidity side for the last fill.
    pub liquidity_side: Option<LiquiditySide>,
    /// If the order will only provide liquidity (make a market).
    pub is_post_only: bool,
    /// If the order carries the 'reduce-only' execution instruction.
    pub is_reduce_only: bool,
    /// The quantity of the order to display on the public book (iceberg).
    pub display_qty: Option<Quantity>,
    /// If the order has been triggered at the venue.
    pub is_triggered: bool,
    /// The orders contingency type.
    pub contingency_type: ContingencyType,
    /// The order list ID associated with the order.
    pub order_list_id: Option<OrderListId>,
    /// The order linked client order ID(s).
    pub linked_order_ids: Option<Vec<ClientOrderId>>,
    /// The orders parent client order ID.
    pub parent_order_id: Option<ClientOrderId>,
    /// The custom user tags for the order.
    pub tags: Option<Vec<Ustr>>,
    /// The trade match IDs for the order fills.
    pub trade_ids: Vec<TradeId>,
    /// The commissions generated by the order, per currency.
    pub commissions: IndexMap<Currency, Money>,
    /// The event ID of the `OrderInitialized` event.
    pub init_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the order was initialized.
    pub ts_init: UnixNanos,
    /// UNIX timestamp (nanoseconds) of the last event applied.
    pub ts_last: UnixNanos,
    events: Vec<OrderEventAny>,
}

impl Order {
    /// Creates a new [`Order`] instance from the given `OrderInitialized` seed event.
    ///
    /// # Errors
    ///
    /// Returns an error if the initialization is missing fields required by
    /// the order type (e.g. a LIMIT order with no price).
    pub fn new_checked(init: OrderInitialized) -> Result<Self, OrderError> {
        if init.order_type.has_price() && init.price.is_none() {
            return Err(OrderError::MissingField {
                order_type: init.order_type,
                field: "price",
            });
        }
        if init.order_type.has_trigger_price()
            && init.trigger_price.is_none()
            && init.trailing_offset.is_none()
        {
            return Err(OrderError::MissingField {
                order_type: init.order_type,
                field: "trigger_price",
            });
        }

        let quantity = init.quantity;
        Ok(Self {
            trader_id: init.trader_id,
            strategy_id: init.strategy_id,
            instrument_id: init.instrument_id,
            client_order_id: init.client_order_id,
            venue_order_id: None,
            position_id: None,
            account_id: None,
            side: init.order_side,
            order_type: init.order_type,
            quantity,
            price: init.price,
            trigger_price: init.trigger_price,
            trigger_type: init.trigger_type,
            trailing_offset: init.trailing_offset,
            trailing_offset_type: init.trailing_offset_type,
            time_in_force: init.time_in_force,
            expire_time: init.expire_time,
            status: OrderStatus::Initialized,
            previous_status: None,
            filled_qty: Quantity::zero(quantity.precision),
            leaves_qty: quantity,
            avg_px: None,
            liquidity_side: None,
            is_post_only: init.post_only,
            is_reduce_only: init.reduce_only,
            display_qty: init.display_qty,
            is_triggered: false,
            contingency_type: init.contingency_type,
            order_list_id: init.order_list_id,
            linked_order_ids: init.linked_order_ids.clone(),
            parent_order_id: init.parent_order_id,
            tags: init.tags.clone(),
            trade_ids: Vec::new(),
            commissions: IndexMap::new(),
            init_id: init.event_id,
            ts_init: init.ts_init,
            ts_last: init.ts_init,
            events: vec![OrderEventAny::Initialized(init)],
        })
    }

    /// Creates a new [`Order`] instance.
    ///
    /// # Panics
    ///
    /// Panics if the initialization is invalid for the order type.
    #[must_use]
    pub fn new(init: OrderInitialized) -> Self {
        Self::new_checked(init).expect("Invalid `OrderInitialized`")
    }

    /// Returns the `OrderInitialized` seed event for the order.
    ///
    /// # Panics
    ///
    /// Panics if the order has no events (invariant violation).
    #[must_use]
    pub fn init_event(&self) -> &OrderInitialized {
        match self.events.first() {
            Some(OrderEventAny::Initialized(init)) => init,
            _ => panic!("Order had no `OrderInitialized` seed event"),
        }
    }

    /// Returns all events applied to the order.
    #[must_use]
    pub fn events(&self) -> &[OrderEventAny] {
        &self.events
    }

    /// Returns the count of events applied to the order.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns the last event applied to the order.
    ///
    /// # Panics
    ///
    /// Panics if the order has no events (invariant violation).
    #[must_use]
    pub fn last_event(&self) -> &OrderEventAny {
        self.events.last().expect("Order had no events")
    }

    /// Returns the last trade match ID, if any fills have been applied.
    #[must_use]
    pub fn last_trade_id(&self) -> Option<TradeId> {
        self.trade_ids.last().copied()
    }

    /// Returns the specified order side.
    ///
    /// # Panics
    ///
    /// Panics if the side is `NoOrderSide`.
    #[must_use]
    pub fn side_specified(&self) -> OrderSideSpecified {
        self.side.as_specified()
    }

    /// Returns whether the order is BUY side.
    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.side == OrderSide::Buy
    }

    /// Returns whether the order is SELL side.
    #[must_use]
    pub fn is_sell(&self) -> bool {
        self.side == OrderSide::Sell
    }

    /// Returns whether the order is open at the venue.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Accepted
                | OrderStatus::Triggered
                | OrderStatus::PendingUpdate
                | OrderStatus::PendingCancel
                | OrderStatus::PartiallyFilled
        )
    }

    /// Returns whether the order is closed (done).
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Denied
                | OrderStatus::Rejected
                | OrderStatus::Canceled
                | OrderStatus::Expired
                | OrderStatus::Filled
        )
    }

    /// Returns whether the order is in-flight (sent but not yet confirmed).
    #[must_use]
    pub const fn is_inflight(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Submitted | OrderStatus::PendingUpdate | OrderStatus::PendingCancel
        )
    }

    /// Returns whether the order rests passively in a book when open.
    #[must_use]
    pub const fn is_passive(&self) -> bool {
        !matches!(self.order_type, OrderType::Market)
    }

    /// Returns whether the order is of a type carrying an activation trigger.
    #[must_use]
    pub const fn has_trigger(&self) -> bool {
        self.order_type.has_trigger_price()
    }

    /// Returns whether the order is a trailing type.
    #[must_use]
    pub const fn is_trailing(&self) -> bool {
        matches!(
            self.order_type,
            OrderType::TrailingStopMarket | OrderType::TrailingStopLimit
        )
    }

    /// Applies the given event to the order, transitioning its state.
    ///
    /// # Errors
    ///
    /// This function returns an error:
    /// - If the event's client order ID does not match.
    /// - If the transition is invalid from the current status.
    /// - If a fill carries a duplicate `TradeId` (idempotency guard).
    /// - If a fill is out of order by `ts_event`.
    pub fn apply(&mut self, event: OrderEventAny) -> Result<(), OrderError> {
        if event.client_order_id() != self.client_order_id {
            return Err(OrderError::ClientOrderIdMismatch {
                event_id: event.client_order_id(),
                order_id: self.client_order_id,
            });
        }

        let new_status = self.transition_status(&event)?;
        self.previous_status = Some(self.status);
        self.status = new_status;

        match &event {
            OrderEventAny::Denied(_)
            | OrderEventAny::Emulated(_)
            | OrderEventAny::Released(_)
            | OrderEventAny::Initialized(_) => {}
            OrderEventAny::Submitted(e) => self.account_id = Some(e.account_id),
            OrderEventAny::Accepted(e) => {
                self.venue_order_id = Some(e.venue_order_id);
                self.account_id = Some(e.account_id);
            }
            OrderEventAny::Rejected(_)
            | OrderEventAny::Canceled(_)
            | OrderEventAny::Expired(_)
            | OrderEventAny::PendingUpdate(_)
            | OrderEventAny::PendingCancel(_)
            | OrderEventAny::ModifyRejected(_)
            | OrderEventAny::CancelRejected(_) => {}
            OrderEventAny::Triggered(_) => self.is_triggered = true,
            OrderEventAny::Updated(e) => {
                self.quantity = e.quantity;
                self.leaves_qty = self.quantity.saturating_sub(self.filled_qty);
                if let Some(price) = e.price {
                    self.price = Some(price);
                }
                if let Some(trigger_price) = e.trigger_price {
                    self.trigger_price = Some(trigger_price);
                }
                if let Some(venue_order_id) = e.venue_order_id {
                    self.venue_order_id = Some(venue_order_id);
                }
            }
            OrderEventAny::Filled(fill) => {
                if self.trade_ids.contains(&fill.trade_id) {
                    // Roll back the status transition before surfacing the error
                    self.status = self.previous_status.take().unwrap_or(self.status);
                    return Err(OrderError::DuplicateTradeId(fill.trade_id));
                }
                if fill.ts_event < self.ts_last && !self.trade_ids.is_empty() {
                    self.status = self.previous_status.take().unwrap_or(self.status);
                    return Err(OrderError::OutOfOrderFill {
                        ts_event: fill.ts_event,
                        ts_last: self.ts_last,
                    });
                }

                self.venue_order_id = Some(fill.venue_order_id);
                self.account_id = Some(fill.account_id);
                if self.position_id.is_none() {
                    self.position_id = fill.position_id;
                }
                self.trade_ids.push(fill.trade_id);
                self.liquidity_side = Some(fill.liquidity_side);

                // Update average price from total notional before this fill
                let total_qty = self.filled_qty.as_f64() + fill.last_qty.as_f64();
                let prev_notional = self.avg_px.unwrap_or(0.0) * self.filled_qty.as_f64();
                if total_qty > 0.0 {
                    self.avg_px = Some(
                        (prev_notional + fill.last_px.as_f64() * fill.last_qty.as_f64())
                            / total_qty,
                    );
                }

                self.filled_qty += fill.last_qty;
                self.leaves_qty = self.quantity.saturating_sub(self.filled_qty);

                if let Some(commission) = fill.commission {
                    let entry = self
                        .commissions
                        .entry(commission.currency)
                        .or_insert_with(|| Money::zero(commission.currency));
                    *entry += commission;
                }
            }
        }

        self.ts_last = event.ts_event();
        self.events.push(event);
        Ok(())
    }

    fn transition_status(&self, event: &OrderEventAny) -> Result<OrderStatus, OrderError> {
        use OrderStatus as S;

        let invalid = || OrderError::InvalidStateTransition {
            from: self.status,
            event: event.kind().to_string(),
        };

        let new_status = match (self.status, event) {
            (S::Initialized, OrderEventAny::Denied(_)) => S::Denied,
            (S::Initialized, OrderEventAny::Emulated(_)) => S::Emulated,
            (S::Initialized, OrderEventAny::Released(_)) => S::Released,
            (S::Initialized, OrderEventAny::Submitted(_)) => S::Submitted,
            // Reconciliation can bring an order directly to external truth
            (S::Initialized, OrderEventAny::Accepted(_)) => S::Accepted,
            (S::Initialized, OrderEventAny::Rejected(_)) => S::Rejected,
            (S::Initialized, OrderEventAny::Canceled(_)) => S::Canceled,
            (S::Initialized, OrderEventAny::Expired(_)) => S::Expired,
            (S::Initialized, OrderEventAny::Triggered(_)) => S::Triggered,
            (S::Initialized, OrderEventAny::Filled(_)) => self.fill_status(event),
            // A venue amendment (e.g. reduce-only clamp) before acknowledgement
            (S::Initialized, OrderEventAny::Updated(_)) => S::Initialized,

            (S::Emulated, OrderEventAny::Canceled(_)) => S::Canceled,
            (S::Emulated, OrderEventAny::Updated(_)) => S::Emulated,
            (S::Emulated, OrderEventAny::Released(_)) => S::Released,

            (S::Released, OrderEventAny::Denied(_)) => S::Denied,
            (S::Released, OrderEventAny::Submitted(_)) => S::Submitted,
            (S::Released, OrderEventAny::Canceled(_)) => S::Canceled,

            (S::Submitted, OrderEventAny::Accepted(_)) => S::Accepted,
            (S::Submitted, OrderEventAny::Rejected(_)) => S::Rejected,
            (S::Submitted, OrderEventAny::Canceled(_)) => S::Canceled,
            (S::Submitted, OrderEventAny::Expired(_)) => S::Expired,
            (S::Submitted, OrderEventAny::PendingUpdate(_)) => S::PendingUpdate,
            (S::Submitted, OrderEventAny::PendingCancel(_)) => S::PendingCancel,
            (S::Submitted, OrderEventAny::Filled(_)) => self.fill_status(event),

            (S::Accepted, OrderEventAny::Rejected(_)) => S::Rejected,
            (S::Accepted, OrderEventAny::Canceled(_)) => S::Canceled,
            (S::Accepted, OrderEventAny::Expired(_)) => S::Expired,
            (S::Accepted, OrderEventAny::Triggered(_)) => S::Triggered,
            (S::Accepted, OrderEventAny::PendingUpdate(_)) => S::PendingUpdate,
            (S::Accepted, OrderEventAny::PendingCancel(_)) => S::PendingCancel,
            (S::Accepted, OrderEventAny::Updated(_)) => S::Accepted,
            (S::Accepted, OrderEventAny::Filled(_)) => self.fill_status(event),
            // Client-boundary request failures leave the order working
            (S::Accepted, OrderEventAny::ModifyRejected(_)) => S::Accepted,
            (S::Accepted, OrderEventAny::CancelRejected(_)) => S::Accepted,

            (S::Triggered, OrderEventAny::Rejected(_)) => S::Rejected,
            (S::Triggered, OrderEventAny::Canceled(_)) => S::Canceled,
            (S::Triggered, OrderEventAny::Expired(_)) => S::Expired,
            (S::Triggered, OrderEventAny::PendingUpdate(_)) => S::PendingUpdate,
            (S::Triggered, OrderEventAny::PendingCancel(_)) => S::PendingCancel,
            (S::Triggered, OrderEventAny::Updated(_)) => S::Triggered,
            (S::Triggered, OrderEventAny::Filled(_)) => self.fill_status(event),

            // The only permitted back-transition: a pending update resolves
            // back to ACCEPTED (directly or via venue acknowledgement)
            (S::PendingUpdate, OrderEventAny::Accepted(_)) => S::Accepted,
            (S::PendingUpdate, OrderEventAny::Updated(_)) => self.revert_status(),
            (S::PendingUpdate, OrderEventAny::ModifyRejected(_)) => self.revert_status(),
            (S::PendingUpdate, OrderEventAny::Canceled(_)) => S::Canceled,
            (S::PendingUpdate, OrderEventAny::Expired(_)) => S::Expired,
            (S::PendingUpdate, OrderEventAny::PendingCancel(_)) => S::PendingCancel,
            (S::PendingUpdate, OrderEventAny::Filled(_)) => self.fill_status(event),

            (S::PendingCancel, OrderEventAny::Canceled(_)) => S::Canceled,
            (S::PendingCancel, OrderEventAny::Expired(_)) => S::Expired,
            (S::PendingCancel, OrderEventAny::CancelRejected(_)) => self.revert_status(),
            (S::PendingCancel, OrderEventAny::Filled(_)) => self.fill_status(event),

            (S::PartiallyFilled, OrderEventAny::Canceled(_)) => S::Canceled,
            (S::PartiallyFilled, OrderEventAny::Expired(_)) => S::Expired,
            (S::PartiallyFilled, OrderEventAny::PendingUpdate(_)) => S::PendingUpdate,
            (S::PartiallyFilled, OrderEventAny::PendingCancel(_)) => S::PendingCancel,
            (S::PartiallyFilled, OrderEventAny::Updated(_)) => S::PartiallyFilled,
            (S::PartiallyFilled, OrderEventAny::Filled(_)) => self.fill_status(event),

            _ => return Err(invalid()),
        };

        Ok(new_status)
    }

    fn fill_status(&self, event: &OrderEventAny) -> OrderStatus {
        if let OrderEventAny::Filled(fill) = event {
            if self.filled_qty + fill.last_qty < self.quantity {
                OrderStatus::PartiallyFilled
            } else {
                OrderStatus::Filled
            }
        } else {
            self.status
        }
    }

    fn revert_status(&self) -> OrderStatus {
        match self.previous_status {
            Some(status)
                if matches!(
                    status,
                    OrderStatus::Accepted | OrderStatus::Triggered | OrderStatus::PartiallyFilled
                ) =>
            {
                status
            }
            _ => OrderStatus::Accepted,
        }
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.client_order_id == other.client_order_id
    }
}

impl Eq for Order {}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({} {} {} {}, status={}, client_order_id={}, filled_qty={})",
            stringify!(Order),
            self.side,
            self.quantity,
            self.instrument_id,
            self.order_type,
            self.status,
            self.client_order_id,
            self.filled_qty,
        )
    }
}

/// Represents a list of bulk or related contingent orders.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderList {
    /// The order list ID.
    pub id: OrderListId,
    /// The instrument ID for the list.
    pub instrument_id: InstrumentId,
    /// The strategy ID for the list.
    pub strategy_id: StrategyId,
    /// The contained orders.
    pub orders: Vec<Order>,
    /// UNIX timestamp (nanoseconds) when the list was initialized.
    pub ts_init: UnixNanos,
}

impl OrderList {
    /// Creates a new [`OrderList`] instance.
    ///
    /// # Panics
    ///
    /// Panics if `orders` is empty.
    #[must_use]
    pub fn new(
        id: OrderListId,
        instrument_id: InstrumentId,
        strategy_id: StrategyId,
        orders: Vec<Order>,
        ts_init: UnixNanos,
    ) -> Self {
        assert!(!orders.is_empty(), "`orders` cannot be empty");
        Self {
            id,
            instrument_id,
            strategy_id,
            orders,
            ts_init,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::events::order::{
        OrderAccepted, OrderCanceled, OrderFilled, OrderInitializedBuilder, OrderSubmitted,
        OrderUpdated,
    };

    fn market_order(quantity: &str) -> Order {
        Order::new(
            OrderInitializedBuilder::default()
                .quantity(Quantity::from(quantity))
                .build()
                .unwrap(),
        )
    }

    fn limit_order(price: &str, quantity: &str) -> Order {
        Order::new(
            OrderInitializedBuilder::default()
                .order_type(OrderType::Limit)
                .price(Some(Price::from(price)))
                .quantity(Quantity::from(quantity))
                .build()
                .unwrap(),
        )
    }

    fn submitted(order: &Order) -> OrderEventAny {
        OrderEventAny::Submitted(OrderSubmitted {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            account_id: AccountId::default(),
            event_id: UUID4::new(),
            ts_event: UnixNanos::from(1),
            ts_init: UnixNanos::from(1),
        })
    }

    fn accepted(order: &Order) -> OrderEventAny {
        OrderEventAny::Accepted(OrderAccepted {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: VenueOrderId::new("V-1"),
            account_id: AccountId::default(),
            event_id: UUID4::new(),
            ts_event: UnixNanos::from(2),
            ts_init: UnixNanos::from(2),
            reconciliation: false,
        })
    }

    fn filled(order: &Order, trade_id: &str, last_qty: &str, ts_event: u64) -> OrderEventAny {
        OrderEventAny::Filled(OrderFilled {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: VenueOrderId::new("V-1"),
            account_id: AccountId::default(),
            trade_id: TradeId::new(trade_id),
            order_side: order.side,
            order_type: order.order_type,
            last_qty: Quantity::from(last_qty),
            last_px: Price::from("100.00"),
            currency: Currency::USDT(),
            liquidity_side: LiquiditySide::Taker,
            event_id: UUID4::new(),
            ts_event: UnixNanos::from(ts_event),
            ts_init: UnixNanos::from(ts_event),
            reconciliation: false,
            position_id: None,
            commission: None,
        })
    }

    #[rstest]
    fn test_initialized_state() {
        let order = market_order("100");
        assert_eq!(order.status, OrderStatus::Initialized);
        assert_eq!(order.event_count(), 1);
        assert_eq!(order.leaves_qty, Quantity::from("100"));
        assert!(!order.is_open());
        assert!(!order.is_closed());
    }

    #[rstest]
    fn test_limit_requires_price() {
        let result = Order::new_checked(
            OrderInitializedBuilder::default()
                .order_type(OrderType::Limit)
                .build()
                .unwrap(),
        );
        assert!(matches!(result, Err(OrderError::MissingField { .. })));
    }

    #[rstest]
    fn test_lifecycle_to_filled() {
        let mut order = market_order("100");
        order.apply(submitted(&order)).unwrap();
        assert_eq!(order.status, OrderStatus::Submitted);
        assert!(order.is_inflight());

        order.apply(accepted(&order)).unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert!(order.is_open());

        order.apply(filled(&order, "T-1", "40", 3)).unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.filled_qty, Quantity::from("40"));
        assert_eq!(order.leaves_qty, Quantity::from("60"));

        order.apply(filled(&order, "T-2", "60", 4)).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.leaves_qty, Quantity::from("0"));
        assert!(order.is_closed());
        assert_eq!(order.avg_px, Some(100.0));
    }

    #[rstest]
    fn test_duplicate_trade_id_rejected_idempotently() {
        let mut order = market_order("100");
        order.apply(submitted(&order)).unwrap();
        order.apply(accepted(&order)).unwrap();
        order.apply(filled(&order, "T-1", "40", 3)).unwrap();

        let result = order.apply(filled(&order, "T-1", "40", 4));
        assert_eq!(result, Err(OrderError::DuplicateTradeId(TradeId::new("T-1"))));
        // State unchanged after the duplicate
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.filled_qty, Quantity::from("40"));
        assert_eq!(order.event_count(), 4);
    }

    #[rstest]
    fn test_out_of_order_fill_rejected() {
        let mut order = market_order("100");
        order.apply(submitted(&order)).unwrap();
        order.apply(accepted(&order)).unwrap();
        order.apply(filled(&order, "T-1", "40", 10)).unwrap();

        let result = order.apply(filled(&order, "T-2", "40", 5));
        assert!(matches!(result, Err(OrderError::OutOfOrderFill { .. })));
    }

    #[rstest]
    fn test_invalid_transition() {
        let mut order = market_order("100");
        let event = accepted(&order);
        order.apply(submitted(&order)).unwrap();
        order.apply(event.clone()).unwrap();
        order.apply(filled(&order, "T-1", "100", 3)).unwrap();

        // Filled is terminal
        let result = order.apply(event);
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[rstest]
    fn test_pending_update_back_transition() {
        let mut order = limit_order("100.00", "100");
        order.apply(submitted(&order)).unwrap();
        order.apply(accepted(&order)).unwrap();

        order
            .apply(OrderEventAny::PendingUpdate(
                crate::events::order::OrderPendingUpdate {
                    trader_id: order.trader_id,
                    strategy_id: order.strategy_id,
                    instrument_id: order.instrument_id,
                    client_order_id: order.client_order_id,
                    venue_order_id: order.venue_order_id,
                    account_id: AccountId::default(),
                    event_id: UUID4::new(),
                    ts_event: UnixNanos::from(3),
                    ts_init: UnixNanos::from(3),
                    reconciliation: false,
                },
            ))
            .unwrap();
        assert_eq!(order.status, OrderStatus::PendingUpdate);

        order
            .apply(OrderEventAny::Updated(OrderUpdated {
                trader_id: order.trader_id,
                strategy_id: order.strategy_id,
                instrument_id: order.instrument_id,
                client_order_id: order.client_order_id,
                venue_order_id: order.venue_order_id,
                account_id: order.account_id,
                quantity: Quantity::from("50"),
                price: Some(Price::from("99.00")),
                trigger_price: None,
                event_id: UUID4::new(),
                ts_event: UnixNanos::from(4),
                ts_init: UnixNanos::from(4),
                reconciliation: false,
            }))
            .unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.quantity, Quantity::from("50"));
        assert_eq!(order.price, Some(Price::from("99.00")));
    }

    #[rstest]
    fn test_canceled_from_accepted() {
        let mut order = limit_order("100.00", "100");
        order.apply(submitted(&order)).unwrap();
        order.apply(accepted(&order)).unwrap();
        order
            .apply(OrderEventAny::Canceled(OrderCanceled {
                trader_id: order.trader_id,
                strategy_id: order.strategy_id,
                instrument_id: order.instrument_id,
                client_order_id: order.client_order_id,
                venue_order_id: order.venue_order_id,
                account_id: order.account_id,
                event_id: UUID4::new(),
                ts_event: UnixNanos::from(3),
                ts_init: UnixNanos::from(3),
                reconciliation: false,
            }))
            .unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
        assert!(order.is_closed());
    }

    #[rstest]
    fn test_events_monotonic_status_machine() {
        // Events are appended; last_event reflects the current state
        let mut order = market_order("100");
        order.apply(submitted(&order)).unwrap();
        order.apply(accepted(&order)).unwrap();
        order.apply(filled(&order, "T-1", "100", 3)).unwrap();

        assert_eq!(order.event_count(), 4);
        assert_eq!(order.last_event().kind(), "OrderFilled");
        assert_eq!(order.ts_last, UnixNanos::from(3));
    }
}
