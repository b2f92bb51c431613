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

//! Execution state reports, the wire types for reconciliation.

use argo_core::{UUID4, UnixNanos};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    enums::{LiquiditySide, OrderSide, OrderStatus, OrderType, PositionSide, TimeInForce},
    identifiers::{
        AccountId, ClientId, ClientOrderId, InstrumentId, PositionId, TradeId, Venue, VenueOrderId,
    },
    types::{Money, Price, Quantity},
};

/// Represents an order status at a point in time, as reported by a venue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    /// The account ID associated with the report.
    pub account_id: AccountId,
    /// The instrument ID associated with the report.
    pub instrument_id: InstrumentId,
    /// The client order ID, if it could be sourced from the venue.
    pub client_order_id: Option<ClientOrderId>,
    /// The venue order ID.
    pub venue_order_id: VenueOrderId,
    /// The order side.
    pub order_side: OrderSide,
    /// The order type.
    pub order_type: OrderType,
    /// The order time in force.
    pub time_in_force: TimeInForce,
    /// The reported order status.
    pub order_status: OrderStatus,
    /// The order price, if applicable.
    pub price: Option<Price>,
    /// The order trigger price, if applicable.
    pub trigger_price: Option<Price>,
    /// The order quantity.
    pub quantity: Quantity,
    /// The reported filled quantity.
    pub filled_qty: Quantity,
    /// The reported average fill price.
    pub avg_px: Option<f64>,
    /// The reason for a cancellation/rejection, if provided.
    pub cancel_reason: Option<String>,
    /// UNIX timestamp (nanoseconds) when the order was accepted.
    pub ts_accepted: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the order was triggered, if applicable.
    pub ts_triggered: Option<UnixNanos>,
    /// UNIX timestamp (nanoseconds) of the last order state change.
    pub ts_last: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the report was initialized.
    pub ts_init: UnixNanos,
    /// The unique identifier for the report.
    pub report_id: UUID4,
}

impl OrderStatusReport {
    /// Creates a new [`OrderStatusReport`] instance.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        account_id: AccountId,
        instrument_id: InstrumentId,
        client_order_id: Option<ClientOrderId>,
        venue_order_id: VenueOrderId,
        order_side: OrderSide,
        order_type: OrderType,
        time_in_force: TimeInForce,
        order_status: OrderStatus,
        quantity: Quantity,
        filled_qty: Quantity,
        ts_accepted: UnixNanos,
        ts_last: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            account_id,
            instrument_id,
            client_order_id,
            venue_order_id,
            order_side,
            order_type,
            time_in_force,
            order_status,
            price: None,
            trigger_price: None,
            quantity,
            filled_qty,
            avg_px: None,
            cancel_reason: None,
            ts_accepted,
            ts_triggered: None,
            ts_last,
            ts_init,
            report_id: UUID4::new(),
        }
    }

    /// Sets the order price and returns the report.
    #[must_use]
    pub const fn with_price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }

    /// Sets the trigger price and returns the report.
    #[must_use]
    pub const fn with_trigger_price(mut self, trigger_price: Price) -> Self {
        self.trigger_price = Some(trigger_price);
        self
    }

    /// Sets the average fill price and returns the report.
    #[must_use]
    pub const fn with_avg_px(mut self, avg_px: f64) -> Self {
        self.avg_px = Some(avg_px);
        self
    }
}

/// Represents a single fill, as reported by a venue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillReport {
    /// The account ID associated with the report.
    pub account_id: AccountId,
    /// The instrument ID associated with the report.
    pub instrument_id: InstrumentId,
    /// The client order ID, if it could be sourced from the venue.
    pub client_order_id: Option<ClientOrderId>,
    /// The venue order ID.
    pub venue_order_id: VenueOrderId,
    /// The trade match ID (assigned by the venue).
    pub trade_id: TradeId,
    /// The order side for the fill.
    pub order_side: OrderSide,
    /// The fill quantity.
    pub last_qty: Quantity,
    /// The fill price.
    pub last_px: Price,
    /// The commission for the fill.
    pub commission: Money,
    /// The liquidity side of the fill.
    pub liquidity_side: LiquiditySide,
    /// The venue position ID, if assigned by the venue.
    pub venue_position_id: Option<PositionId>,
    /// UNIX timestamp (nanoseconds) when the fill occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the report was initialized.
    pub ts_init: UnixNanos,
    /// The unique identifier for the report.
    pub report_id: UUID4,
}

/// Represents a position status at a point in time, as reported by a venue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionStatusReport {
    /// The account ID associated with the report.
    pub account_id: AccountId,
    /// The instrument ID associated with the report.
    pub instrument_id: InstrumentId,
    /// The reported position side.
    pub position_side: PositionSide,
    /// The reported open quantity (non-negative).
    pub quantity: Quantity,
    /// The reported signed quantity (negative for SHORT).
    pub signed_qty: f64,
    /// The venue position ID, if assigned by the venue.
    pub venue_position_id: Option<PositionId>,
    /// UNIX timestamp (nanoseconds) of the last position state change.
    pub ts_last: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the report was initialized.
    pub ts_init: UnixNanos,
    /// The unique identifier for the report.
    pub report_id: UUID4,
}

/// Represents an execution mass status for an execution client - including
/// all reported order, fill and position state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionMassStatus {
    /// The client ID for the report.
    pub client_id: ClientId,
    /// The account ID for the report.
    pub account_id: AccountId,
    /// The venue for the report.
    pub venue: Venue,
    /// UNIX timestamp (nanoseconds) when the report was initialized.
    pub ts_init: UnixNanos,
    /// The unique identifier for the report.
    pub report_id: UUID4,
    order_reports: IndexMap<VenueOrderId, OrderStatusReport>,
    fill_reports: IndexMap<VenueOrderId, Vec<FillReport>>,
    position_reports: IndexMap<InstrumentId, Vec<PositionStatusReport>>,
}

impl ExecutionMassStatus {
    /// Creates a new [`ExecutionMassStatus`] instance.
    #[must_use]
    pub fn new(
        client_id: ClientId,
        account_id: AccountId,
        venue: Venue,
        ts_init: UnixNanos,
        report_id: Option<UUID4>,
    ) -> Self {
        Self {
            client_id,
            account_id,
            venue,
            ts_init,
            report_id: report_id.unwrap_or_default(),
            order_reports: IndexMap::new(),
            fill_reports: IndexMap::new(),
            position_reports: IndexMap::new(),
        }
    }

    /// Adds the given order status report.
    pub fn add_order_report(&mut self, report: OrderStatusReport) {
        self.order_reports.insert(report.venue_order_id, report);
    }

    /// Adds the given fill reports.
    pub fn add_fill_reports(&mut self, reports: Vec<FillReport>) {
        for report in reports {
            self.fill_reports
                .entry(report.venue_order_id)
                .or_default()
                .push(report);
        }
    }

    /// Adds the given position status reports.
    pub fn add_position_reports(&mut self, reports: Vec<PositionStatusReport>) {
        for report in reports {
            self.position_reports
                .entry(report.instrument_id)
                .or_default()
                .push(report);
        }
    }

    /// Returns the order status reports keyed by venue order ID.
    #[must_use]
    pub const fn order_reports(&self) -> &IndexMap<VenueOrderId, OrderStatusReport> {
        &self.order_reports
    }

    /// Returns the fill reports keyed by venue order ID.
    #[must_use]
    pub const fn fill_reports(&self) -> &IndexMap<VenueOrderId, Vec<FillReport>> {
        &self.fill_reports
    }

    /// Returns the position status reports keyed by instrument ID.
    #[must_use]
    pub const fn position_reports(&self) -> &IndexMap<InstrumentId, Vec<PositionStatusReport>> {
        &self.position_reports
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
    fn test_mass_status_accumulates_reports() {
        let mut mass_status = ExecutionMassStatus::new(
            ClientId::new("BINANCE"),
            AccountId::new("BINANCE-001"),
            Venue::new("BINANCE"),
            UnixNanos::default(),
            None,
        );

        let report = OrderStatusReport::new(
            AccountId::new("BINANCE-001"),
            InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            None,
            VenueOrderId::new("V-1"),
            OrderSide::Buy,
            OrderType::Limit,
            TimeInForce::Gtc,
            OrderStatus::Accepted,
            Quantity::from("1.000"),
            Quantity::from("0.000"),
            UnixNanos::from(1),
            UnixNanos::from(1),
            UnixNanos::from(2),
        )
        .with_price(Price::from("50000.00"));

        mass_status.add_order_report(report);
        assert_eq!(mass_status.order_reports().len(), 1);
        assert_eq!(
            mass_status
                .order_reports()
                .get(&VenueOrderId::new("V-1"))
                .unwrap()
                .price,
            Some(Price::from("50000.00"))
        );
    }
}
