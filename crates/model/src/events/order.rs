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

//! Order events for the trading domain model.
//!
//! An order's lifecycle is event-sourced: the current state of an order is the
//! reduction of its appended event list.

use std::fmt::Display;

use argo_core::{UUID4, UnixNanos};
use derive_builder::Builder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::{
    enums::{
        ContingencyType, LiquiditySide, OrderSide, OrderType, TimeInForce, TrailingOffsetType,
        TriggerType,
    },
    identifiers::{
        AccountId, ClientOrderId, InstrumentId, OrderListId, PositionId, StrategyId, TradeId,
        TraderId, VenueOrderId,
    },
    types::{Currency, Money, Price, Quantity},
};

/// Represents an event where an order has been initialized.
///
/// This is a seed event which can instantiate any order through a creation
/// method. This event should contain enough information to be able to send it
/// 'over the wire' and have a valid order created with exactly the same
/// properties as if it had been instantiated locally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
pub struct OrderInitialized {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The order side.
    pub order_side: OrderSide,
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
    /// If the order will only provide liquidity (make a market).
    pub post_only: bool,
    /// If the order carries the 'reduce-only' execution instruction.
    pub reduce_only: bool,
    /// The quantity of the order to display on the public book (iceberg).
    pub display_qty: Option<Quantity>,
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
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

impl Default for OrderInitialized {
    /// Creates a new default [`OrderInitialized`] instance for testing.
    fn default() -> Self {
        Self {
            trader_id: TraderId::default(),
            strategy_id: StrategyId::default(),
            instrument_id: InstrumentId::default(),
            client_order_id: ClientOrderId::default(),
            order_side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::new(100.0, 0),
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
            ts_event: UnixNanos::default(),
            ts_init: UnixNanos::default(),
            reconciliation: false,
        }
    }
}

impl Display for OrderInitialized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, client_order_id={}, side={}, type={}, quantity={}, time_in_force={})",
            stringify!(OrderInitialized),
            self.instrument_id,
            self.client_order_id,
            self.order_side,
            self.order_type,
            self.quantity,
            self.time_in_force,
        )
    }
}

/// Represents an event where an order has been denied by the Argo system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDenied {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The reason the order was denied.
    pub reason: Ustr,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
}

impl Display for OrderDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, client_order_id={}, reason={})",
            stringify!(OrderDenied),
            self.instrument_id,
            self.client_order_id,
            self.reason,
        )
    }
}

/// Represents an event where an order has become emulated by the Argo system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEmulated {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
}

/// Represents an event where an order was released from the emulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReleased {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The price the order was released at.
    pub released_price: Price,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
}

/// Represents an event where an order has been submitted by the Argo system to the venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The account ID associated with the event.
    pub account_id: AccountId,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
}

impl Display for OrderSubmitted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, client_order_id={}, account_id={})",
            stringify!(OrderSubmitted),
            self.instrument_id,
            self.client_order_id,
            self.account_id,
        )
    }
}

/// Represents an event where an order has been accepted by the trading venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAccepted {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: VenueOrderId,
    /// The account ID associated with the event.
    pub account_id: AccountId,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

impl Display for OrderAccepted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, client_order_id={}, venue_order_id={})",
            stringify!(OrderAccepted),
            self.instrument_id,
            self.client_order_id,
            self.venue_order_id,
        )
    }
}

/// Represents an event where an order has been rejected by the trading venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejected {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The account ID associated with the event.
    pub account_id: AccountId,
    /// The reason the order was rejected.
    pub reason: Ustr,
    /// If the rejection was due to a post-only instruction.
    pub due_post_only: bool,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

impl Display for OrderRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, client_order_id={}, reason={})",
            stringify!(OrderRejected),
            self.instrument_id,
            self.client_order_id,
            self.reason,
        )
    }
}

/// Represents an event where an order has been canceled at the trading venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCanceled {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: Option<VenueOrderId>,
    /// The account ID associated with the event.
    pub account_id: Option<AccountId>,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

impl Display for OrderCanceled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, client_order_id={})",
            stringify!(OrderCanceled),
            self.instrument_id,
            self.client_order_id,
        )
    }
}

/// Represents an event where an order has expired at the trading venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpired {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: Option<VenueOrderId>,
    /// The account ID associated with the event.
    pub account_id: Option<AccountId>,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

/// Represents an event where an order has triggered at the trading venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTriggered {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: Option<VenueOrderId>,
    /// The account ID associated with the event.
    pub account_id: Option<AccountId>,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

/// Represents an event where a request to modify an order is pending at the venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPendingUpdate {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: Option<VenueOrderId>,
    /// The account ID associated with the event.
    pub account_id: AccountId,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

/// Represents an event where a request to cancel an order is pending at the venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPendingCancel {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: Option<VenueOrderId>,
    /// The account ID associated with the event.
    pub account_id: AccountId,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

/// Represents an event where a request to modify an order was rejected by the venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModifyRejected {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: Option<VenueOrderId>,
    /// The account ID associated with the event.
    pub account_id: Option<AccountId>,
    /// The reason the modification was rejected.
    pub reason: Ustr,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

/// Represents an event where a request to cancel an order was rejected by the venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelRejected {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: Option<VenueOrderId>,
    /// The account ID associated with the event.
    pub account_id: Option<AccountId>,
    /// The reason the cancel was rejected.
    pub reason: Ustr,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

/// Represents an event where an order has been updated at the trading venue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdated {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: Option<VenueOrderId>,
    /// The account ID associated with the event.
    pub account_id: Option<AccountId>,
    /// The orders current quantity.
    pub quantity: Quantity,
    /// The orders current price (if applicable).
    pub price: Option<Price>,
    /// The orders current trigger price (if applicable).
    pub trigger_price: Option<Price>,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
}

impl Display for OrderUpdated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, client_order_id={}, quantity={})",
            stringify!(OrderUpdated),
            self.instrument_id,
            self.client_order_id,
            self.quantity,
        )
    }
}

/// Represents an event where an order has been filled at the trading venue.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderFilled {
    /// The trader ID associated with the event.
    pub trader_id: TraderId,
    /// The strategy ID associated with the event.
    pub strategy_id: StrategyId,
    /// The instrument ID associated with the event.
    pub instrument_id: InstrumentId,
    /// The client order ID associated with the event.
    pub client_order_id: ClientOrderId,
    /// The venue order ID (assigned by the venue).
    pub venue_order_id: VenueOrderId,
    /// The account ID associated with the event.
    pub account_id: AccountId,
    /// The trade match ID (assigned by the venue).
    pub trade_id: TradeId,
    /// The order side.
    pub order_side: OrderSide,
    /// The order type.
    pub order_type: OrderType,
    /// The fill quantity for this execution.
    pub last_qty: Quantity,
    /// The fill price for this execution.
    pub last_px: Price,
    /// The currency of the `last_px`.
    pub currency: Currency,
    /// The liquidity side of the execution.
    pub liquidity_side: LiquiditySide,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
    /// If the event was generated during reconciliation.
    pub reconciliation: bool,
    /// The position ID (assigned by the venue or the Argo system).
    pub position_id: Option<PositionId>,
    /// The commission generated from this execution.
    pub commission: Option<Money>,
}

impl OrderFilled {
    /// Returns whether this is a BUY side fill.
    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.order_side == OrderSide::Buy
    }

    /// Returns whether this is a SELL side fill.
    #[must_use]
    pub fn is_sell(&self) -> bool {
        self.order_side == OrderSide::Sell
    }
}

impl Display for OrderFilled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(instrument_id={}, client_order_id={}, trade_id={}, side={}, last_qty={}, last_px={} {}, liquidity_side={}, ts_event={})",
            stringify!(OrderFilled),
            self.instrument_id,
            self.client_order_id,
            self.trade_id,
            self.order_side,
            self.last_qty,
            self.last_px,
            self.currency,
            self.liquidity_side,
            self.ts_event,
        )
    }
}

/// A sum type covering all order events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrderEventAny {
    Initialized(OrderInitialized),
    Denied(OrderDenied),
    Emulated(OrderEmulated),
    Released(OrderReleased),
    Submitted(OrderSubmitted),
    Accepted(OrderAccepted),
    Rejected(OrderRejected),
    Canceled(OrderCanceled),
    Expired(OrderExpired),
    Triggered(OrderTriggered),
    PendingUpdate(OrderPendingUpdate),
    PendingCancel(OrderPendingCancel),
    ModifyRejected(OrderModifyRejected),
    CancelRejected(OrderCancelRejected),
    Updated(OrderUpdated),
    Filled(OrderFilled),
}

macro_rules! for_all_variants {
    ($self:expr, $event:ident, $body:expr) => {
        match $self {
            OrderEventAny::Initialized($event) => $body,
            OrderEventAny::Denied($event) => $body,
            OrderEventAny::Emulated($event) => $body,
            OrderEventAny::Released($event) => $body,
            OrderEventAny::Submitted($event) => $body,
            OrderEventAny::Accepted($event) => $body,
            OrderEventAny::Rejected($event) => $body,
            OrderEventAny::Canceled($event) => $body,
            OrderEventAny::Expired($event) => $body,
            OrderEventAny::Triggered($event) => $body,
            OrderEventAny::PendingUpdate($event) => $body,
            OrderEventAny::PendingCancel($event) => $body,
            OrderEventAny::ModifyRejected($event) => $body,
            OrderEventAny::CancelRejected($event) => $body,
            OrderEventAny::Updated($event) => $body,
            OrderEventAny::Filled($event) => $body,
        }
    };
}

impl OrderEventAny {
    /// Returns the short name of the event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Initialized(_) => "OrderInitialized",
            Self::Denied(_) => "OrderDenied",
            Self::Emulated(_) => "OrderEmulated",
            Self::Released(_) => "OrderReleased",
            Self::Submitted(_) => "OrderSubmitted",
            Self::Accepted(_) => "OrderAccepted",
            Self::Rejected(_) => "OrderRejected",
            Self::Canceled(_) => "OrderCanceled",
            Self::Expired(_) => "OrderExpired",
            Self::Triggered(_) => "OrderTriggered",
            Self::PendingUpdate(_) => "OrderPendingUpdate",
            Self::PendingCancel(_) => "OrderPendingCancel",
            Self::ModifyRejected(_) => "OrderModifyRejected",
            Self::CancelRejected(_) => "OrderCancelRejected",
            Self::Updated(_) => "OrderUpdated",
            Self::Filled(_) => "OrderFilled",
        }
    }

    /// Returns the trader ID associated with the event.
    #[must_use]
    pub fn trader_id(&self) -> TraderId {
        for_all_variants!(self, event, event.trader_id)
    }

    /// Returns the strategy ID associated with the event.
    #[must_use]
    pub fn strategy_id(&self) -> StrategyId {
        for_all_variants!(self, event, event.strategy_id)
    }

    /// Returns the instrument ID associated with the event.
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        for_all_variants!(self, event, event.instrument_id)
    }

    /// Returns the client order ID associated with the event.
    #[must_use]
    pub fn client_order_id(&self) -> ClientOrderId {
        for_all_variants!(self, event, event.client_order_id)
    }

    /// Returns the unique event ID.
    #[must_use]
    pub fn event_id(&self) -> UUID4 {
        for_all_variants!(self, event, event.event_id)
    }

    /// Returns the UNIX timestamp (nanoseconds) when the event occurred.
    #[must_use]
    pub fn ts_event(&self) -> UnixNanos {
        for_all_variants!(self, event, event.ts_event)
    }

    /// Returns the UNIX timestamp (nanoseconds) when the event was initialized.
    #[must_use]
    pub fn ts_init(&self) -> UnixNanos {
        for_all_variants!(self, event, event.ts_init)
    }

    /// Returns the venue order ID associated with the event, if any.
    #[must_use]
    pub fn venue_order_id(&self) -> Option<VenueOrderId> {
        match self {
            Self::Initialized(_)
            | Self::Denied(_)
            | Self::Emulated(_)
            | Self::Released(_)
            | Self::Submitted(_)
            | Self::Rejected(_) => None,
            Self::Accepted(event) => Some(event.venue_order_id),
            Self::Canceled(event) => event.venue_order_id,
            Self::Expired(event) => event.venue_order_id,
            Self::Triggered(event) => event.venue_order_id,
            Self::PendingUpdate(event) => event.venue_order_id,
            Self::PendingCancel(event) => event.venue_order_id,
            Self::ModifyRejected(event) => event.venue_order_id,
            Self::CancelRejected(event) => event.venue_order_id,
            Self::Updated(event) => event.venue_order_id,
            Self::Filled(event) => Some(event.venue_order_id),
        }
    }
}

impl Display for OrderEventAny {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(client_order_id={}, ts_event={})",
            self.kind(),
            self.client_order_id(),
            self.ts_event(),
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::enums::OrderStatus;

    fn filled() -> OrderFilled {
        OrderFilled {
            trader_id: TraderId::default(),
            strategy_id: StrategyId::default(),
            instrument_id: InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            client_order_id: ClientOrderId::default(),
            venue_order_id: VenueOrderId::new("V-001"),
            account_id: AccountId::default(),
            trade_id: TradeId::new("T-001"),
            order_side: OrderSide::Buy,
            order_type: OrderType::Market,
            last_qty: Quantity::from("0.500"),
            last_px: Price::from("50000.50"),
            currency: Currency::USDT(),
            liquidity_side: LiquiditySide::Taker,
            event_id: UUID4::new(),
            ts_event: UnixNanos::from(1),
            ts_init: UnixNanos::from(2),
            reconciliation: false,
            position_id: None,
            commission: None,
        }
    }

    #[rstest]
    fn test_event_any_accessors() {
        let event = OrderEventAny::Filled(filled());
        assert_eq!(event.kind(), "OrderFilled");
        assert_eq!(event.ts_event(), UnixNanos::from(1));
        assert_eq!(event.venue_order_id(), Some(VenueOrderId::new("V-001")));
        assert_eq!(
            event.instrument_id(),
            InstrumentId::from("BTCUSDT-PERP.BINANCE")
        );
    }

    #[rstest]
    fn test_filled_sides() {
        let fill = filled();
        assert!(fill.is_buy());
        assert!(!fill.is_sell());
    }

    #[rstest]
    fn test_serde_round_trip() {
        let event = OrderEventAny::Filled(filled());
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: OrderEventAny = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[rstest]
    fn test_status_is_not_event() {
        // Sanity check the enums remain distinct concepts
        assert_ne!(
            std::mem::discriminant(&OrderStatus::Filled),
            std::mem::discriminant(&OrderStatus::PartiallyFilled),
        );
    }
}
