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

//! Represents a position in a market, the result of one or many order fills.

use std::fmt::Display;

use argo_core::UnixNanos;
use serde::{Deserialize, Serialize};

use crate::{
    enums::{OrderSide, PositionSide},
    events::OrderFilled,
    identifiers::{
        AccountId, ClientOrderId, InstrumentId, PositionId, StrategyId, TradeId, TraderId,
        VenueOrderId,
    },
    instruments::{Instrument, InstrumentAny},
    types::{Currency, Money, Price, Quantity},
};

/// Represents a position in a market.
///
/// The position quantity is always non-negative; direction is carried by
/// `side`. `TradeId`s are unique per position: duplicate fills are rejected
/// by the caller via [`Position::is_duplicate`] before application.
///
/// Positions are created and closed by the execution engine in response to
/// fills; they are never mutated by user code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    /// The trader ID associated with the position.
    pub trader_id: TraderId,
    /// The strategy ID associated with the position.
    pub strategy_id: StrategyId,
    /// The instrument ID for the position.
    pub instrument_id: InstrumentId,
    /// The position ID.
    pub id: PositionId,
    /// The account ID associated with the position.
    pub account_id: AccountId,
    /// The client order ID for the order which opened the position.
    pub opening_order_id: ClientOrderId,
    /// The client order ID for the order which closed the position.
    pub closing_order_id: Option<ClientOrderId>,
    /// The entry direction from the opening order.
    pub entry: OrderSide,
    /// The current position side.
    pub side: PositionSide,
    /// The current signed quantity (positive for LONG, negative for SHORT).
    pub signed_qty: f64,
    /// The current open quantity (always non-negative).
    pub quantity: Quantity,
    /// The peak directional quantity reached by the position.
    pub peak_qty: Quantity,
    /// The position quote currency.
    pub quote_currency: Currency,
    /// The position settlement currency.
    pub settlement_currency: Currency,
    /// The contract multiplier for the instrument.
    pub multiplier: Quantity,
    /// The price precision for the instrument.
    pub price_precision: u8,
    /// The size precision for the instrument.
    pub size_precision: u8,
    /// The average open price.
    pub avg_px_open: f64,
    /// The average closing price.
    pub avg_px_close: Option<f64>,
    /// The realized PnL for the position (including commissions).
    pub realized_pnl: Option<Money>,
    /// The realized return for the position.
    pub realized_return: f64,
    /// The commissions accrued, per currency (stored in settlement currency terms).
    pub commissions: Vec<Money>,
    /// UNIX timestamp (nanoseconds) when the position was opened.
    pub ts_opened: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the position was closed.
    pub ts_closed: Option<UnixNanos>,
    /// UNIX timestamp (nanoseconds) when the position was initialized.
    pub ts_init: UnixNanos,
    /// UNIX timestamp (nanoseconds) of the last fill applied.
    pub ts_last: UnixNanos,
    /// The open duration of the position in nanoseconds (set when closed).
    pub duration_ns: u64,
    /// The quantity bought.
    buy_qty: f64,
    /// The quantity sold.
    sell_qty: f64,
    trade_ids: Vec<TradeId>,
    venue_order_ids: Vec<VenueOrderId>,
    client_order_ids: Vec<ClientOrderId>,
}

impl Position {
    /// Creates a new [`Position`] instance from the opening fill.
    ///
    /// # Panics
    ///
    /// Panics if the fill carries no position ID or a `NoOrderSide`.
    #[must_use]
    pub fn new(instrument: &InstrumentAny, fill: OrderFilled) -> Self {
        assert_eq!(instrument.id(), fill.instrument_id);
        let position_id = fill.position_id.expect("Fill had no `position_id`");

        let mut position = Self {
            trader_id: fill.trader_id,
            strategy_id: fill.strategy_id,
            instrument_id: fill.instrument_id,
            id: position_id,
            account_id: fill.account_id,
            opening_order_id: fill.client_order_id,
            closing_order_id: None,
            entry: fill.order_side,
            side: PositionSide::Flat,
            signed_qty: 0.0,
            quantity: Quantity::zero(instrument.size_precision()),
            peak_qty: Quantity::zero(instrument.size_precision()),
            quote_currency: instrument.quote_currency(),
            settlement_currency: instrument.settlement_currency(),
            multiplier: instrument.multiplier(),
            price_precision: instrument.price_precision(),
            size_precision: instrument.size_precision(),
            avg_px_open: fill.last_px.as_f64(),
            avg_px_close: None,
            realized_pnl: None,
            realized_return: 0.0,
            commissions: Vec::new(),
            ts_opened: fill.ts_event,
            ts_closed: None,
            ts_init: fill.ts_init,
            ts_last: fill.ts_event,
            duration_ns: 0,
            buy_qty: 0.0,
            sell_qty: 0.0,
            trade_ids: Vec::new(),
            venue_order_ids: Vec::new(),
            client_order_ids: Vec::new(),
        };
        position.apply(&fill);
        position
    }

    /// Returns whether the given fill's `TradeId` has already been applied.
    #[must_use]
    pub fn is_duplicate(&self, trade_id: &TradeId) -> bool {
        self.trade_ids.contains(trade_id)
    }

    /// Returns the trade match IDs applied to the position.
    #[must_use]
    pub fn trade_ids(&self) -> &[TradeId] {
        &self.trade_ids
    }

    /// Returns the client order IDs associated with the position.
    #[must_use]
    pub fn client_order_ids(&self) -> &[ClientOrderId] {
        &self.client_order_ids
    }

    /// Returns the count of fills applied to the position.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.trade_ids.len()
    }

    /// Returns whether the position is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(
            self.side,
            PositionSide::Long | PositionSide::Short
        )
    }

    /// Returns whether the position is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.side, PositionSide::Flat)
    }

    /// Returns whether the position is LONG.
    #[must_use]
    pub const fn is_long(&self) -> bool {
        matches!(self.side, PositionSide::Long)
    }

    /// Returns whether the position is SHORT.
    #[must_use]
    pub const fn is_short(&self) -> bool {
        matches!(self.side, PositionSide::Short)
    }

    /// Returns the position side for the given order side when opening.
    #[must_use]
    pub fn side_from_order_side(side: OrderSide) -> PositionSide {
        match side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
            OrderSide::NoOrderSide => PositionSide::NoPositionSide,
        }
    }

    /// Applies the given fill to the position.
    ///
    /// Duplicate `TradeId`s must be filtered by the caller (checked with a
    /// debug assertion here).
    pub fn apply(&mut self, fill: &OrderFilled) {
        debug_assert!(
            !self.is_duplicate(&fill.trade_id),
            "Duplicate `trade_id` {}",
            fill.trade_id
        );

        self.trade_ids.push(fill.trade_id);
        self.venue_order_ids.push(fill.venue_order_id);
        if !self.client_order_ids.contains(&fill.client_order_id) {
            self.client_order_ids.push(fill.client_order_id);
        }
        self.ts_last = fill.ts_event;

        if let Some(commission) = fill.commission {
            self.add_commission(commission);
        }

        let last_qty = fill.last_qty.as_f64();
        let last_px = fill.last_px.as_f64();

        match fill.order_side {
            OrderSide::Buy => self.handle_fill(last_qty, last_px, fill),
            OrderSide::Sell => self.handle_fill(-last_qty, last_px, fill),
            OrderSide::NoOrderSide => panic!("Fill side was `NoOrderSide`"),
        }

        // Quantize the signed quantity to the instrument size precision so
        // floating-point residues cannot keep a flat position open
        let pow = 10_f64.powi(i32::from(self.size_precision));
        self.signed_qty = (self.signed_qty * pow).round() / pow;

        // Materialize quantity and side from the signed quantity
        self.quantity = Quantity::new(self.signed_qty.abs(), self.size_precision);
        if self.quantity > self.peak_qty {
            self.peak_qty = self.quantity;
        }

        self.side = if self.signed_qty > 0.0 {
            PositionSide::Long
        } else if self.signed_qty < 0.0 {
            PositionSide::Short
        } else {
            PositionSide::Flat
        };

        if self.side == PositionSide::Flat {
            self.closing_order_id = Some(fill.client_order_id);
            self.ts_closed = Some(fill.ts_event);
            self.duration_ns = (fill.ts_event - self.ts_opened).as_u64();
        }
    }

    fn handle_fill(&mut self, signed_fill_qty: f64, last_px: f64, fill: &OrderFilled) {
        if signed_fill_qty > 0.0 {
            self.buy_qty += signed_fill_qty;
        } else {
            self.sell_qty += -signed_fill_qty;
        }

        let previous_signed = self.signed_qty;

        // Portion reducing the existing exposure realizes PnL
        let reducing = if previous_signed != 0.0 && previous_signed.signum() != signed_fill_qty.signum()
        {
            signed_fill_qty.abs().min(previous_signed.abs())
        } else {
            0.0
        };

        if reducing > 0.0 {
            let avg_open = self.avg_px_open;
            let direction = previous_signed.signum();
            let pnl_per_unit = (last_px - avg_open) * direction;
            let pnl = pnl_per_unit * reducing * self.multiplier.as_f64();

            let realized = self
                .realized_pnl
                .unwrap_or_else(|| Money::zero(self.settlement_currency));
            self.realized_pnl = Some(realized + Money::new(pnl, self.settlement_currency));

            if avg_open != 0.0 {
                self.realized_return = pnl_per_unit / avg_open;
            }

            // Track the closing side average
            let closed_so_far = match self.avg_px_close {
                Some(avg_close) => {
                    let prev_closed =
                        self.total_closed_qty(previous_signed, signed_fill_qty) - reducing;
                    (avg_close * prev_closed + last_px * reducing) / (prev_closed + reducing)
                }
                None => last_px,
            };
            self.avg_px_close = Some(closed_so_far);
        }

        // Portion extending (or flipping into) a new exposure moves the open average
        let extending = signed_fill_qty.abs() - reducing;
        if extending > 0.0 {
            if previous_signed.signum() == signed_fill_qty.signum() && previous_signed != 0.0 {
                let total = previous_signed.abs() + extending;
                self.avg_px_open =
                    (self.avg_px_open * previous_signed.abs() + last_px * extending) / total;
            } else {
                // Opening flat, or flipping through flat: new entry at the fill price
                self.avg_px_open = last_px;
                if previous_signed == 0.0 || previous_signed.signum() != signed_fill_qty.signum() {
                    self.entry = fill.order_side;
                }
            }
        }

        self.signed_qty = previous_signed + signed_fill_qty;
    }

    fn total_closed_qty(&self, previous_signed: f64, signed_fill_qty: f64) -> f64 {
        let _ = (previous_signed, signed_fill_qty);
        if self.entry == OrderSide::Buy {
            self.sell_qty
        } else {
            self.buy_qty
        }
    }

    fn add_commission(&mut self, commission: Money) {
        match self
            .commissions
            .iter_mut()
            .find(|c| c.currency == commission.currency)
        {
            Some(existing) => *existing += commission,
            None => self.commissions.push(commission),
        }

        // Commissions in the settlement currency reduce realized PnL
        if commission.currency == self.settlement_currency {
            let realized = self
                .realized_pnl
                .unwrap_or_else(|| Money::zero(self.settlement_currency));
            self.realized_pnl = Some(realized - commission);
        }
    }

    /// Returns the realized PnL from price action only (excluding the
    /// commissions already netted into `realized_pnl`).
    #[must_use]
    pub fn realized_pnl_gross(&self) -> Option<Money> {
        let realized = self.realized_pnl?;
        let commissions = self
            .commissions
            .iter()
            .filter(|c| c.currency == self.settlement_currency)
            .fold(Money::zero(self.settlement_currency), |acc, c| acc + *c);
        Some(realized + commissions)
    }

    /// Calculates the unrealized PnL at the given mark `price`.
    #[must_use]
    pub fn unrealized_pnl(&self, price: Price) -> Money {
        if self.side == PositionSide::Flat {
            return Money::zero(self.settlement_currency);
        }

        let direction = match self.side {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
            _ => 0.0,
        };
        let pnl = (price.as_f64() - self.avg_px_open)
            * direction
            * self.quantity.as_f64()
            * self.multiplier.as_f64();
        Money::new(pnl, self.settlement_currency)
    }

    /// Calculates the current notional value at the given mark `price`.
    #[must_use]
    pub fn notional_value(&self, price: Price) -> Money {
        Money::new(
            price.as_f64() * self.quantity.as_f64() * self.multiplier.as_f64(),
            self.quote_currency,
        )
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Position {}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({} {} {}, id={})",
            stringify!(Position),
            self.side,
            self.quantity,
            self.instrument_id,
            self.id,
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_core::UUID4;
    use rstest::rstest;

    use super::*;
    use crate::{
        enums::{LiquiditySide, OrderType},
        instruments::stubs::crypto_perpetual_btcusdt,
    };

    fn fill(
        side: OrderSide,
        qty: &str,
        px: &str,
        trade_id: &str,
        ts_event: u64,
    ) -> OrderFilled {
        OrderFilled {
            trader_id: TraderId::default(),
            strategy_id: StrategyId::default(),
            instrument_id: InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            client_order_id: ClientOrderId::new(format!("O-{trade_id}")),
            venue_order_id: VenueOrderId::new("V-1"),
            account_id: AccountId::default(),
            trade_id: TradeId::new(trade_id),
            order_side: side,
            order_type: OrderType::Market,
            last_qty: Quantity::from(qty),
            last_px: Price::from(px),
            currency: Currency::USDT(),
            liquidity_side: LiquiditySide::Taker,
            event_id: UUID4::new(),
            ts_event: UnixNanos::from(ts_event),
            ts_init: UnixNanos::from(ts_event),
            reconciliation: false,
            position_id: Some(PositionId::new("P-1")),
            commission: None,
        }
    }

    #[rstest]
    fn test_opened_long() {
        let instrument = crypto_perpetual_btcusdt();
        let position = Position::new(&instrument, fill(OrderSide::Buy, "0.500", "50000.50", "T-1", 1));

        assert!(position.is_open());
        assert!(position.is_long());
        assert_eq!(position.quantity, Quantity::from("0.500"));
        assert_eq!(position.signed_qty, 0.5);
        assert_eq!(position.avg_px_open, 50000.50);
        assert_eq!(position.peak_qty, Quantity::from("0.500"));
    }

    #[rstest]
    fn test_extend_then_close() {
        let instrument = crypto_perpetual_btcusdt();
        let mut position =
            Position::new(&instrument, fill(OrderSide::Buy, "1.000", "100.00", "T-1", 1));
        position.apply(&fill(OrderSide::Buy, "1.000", "110.00", "T-2", 2));

        assert_eq!(position.quantity, Quantity::from("2.000"));
        assert_eq!(position.avg_px_open, 105.0);

        position.apply(&fill(OrderSide::Sell, "2.000", "120.00", "T-3", 3));
        assert!(position.is_closed());
        assert_eq!(position.side, PositionSide::Flat);
        // (120 - 105) * 2 = 30
        assert_eq!(position.realized_pnl, Some(Money::new(30.0, Currency::USDT())));
        assert_eq!(position.ts_closed, Some(UnixNanos::from(3)));
        assert_eq!(position.duration_ns, 2);
    }

    #[rstest]
    fn test_short_position_pnl() {
        let instrument = crypto_perpetual_btcusdt();
        let mut position =
            Position::new(&instrument, fill(OrderSide::Sell, "1.000", "100.00", "T-1", 1));
        assert!(position.is_short());

        // Buy back lower: profit
        position.apply(&fill(OrderSide::Buy, "1.000", "90.00", "T-2", 2));
        assert!(position.is_closed());
        assert_eq!(position.realized_pnl, Some(Money::new(10.0, Currency::USDT())));
    }

    #[rstest]
    fn test_unrealized_pnl() {
        let instrument = crypto_perpetual_btcusdt();
        let position =
            Position::new(&instrument, fill(OrderSide::Buy, "2.000", "100.00", "T-1", 1));
        assert_eq!(
            position.unrealized_pnl(Price::from("110.00")),
            Money::new(20.0, Currency::USDT())
        );
    }

    #[rstest]
    fn test_trade_ids_unique() {
        let instrument = crypto_perpetual_btcusdt();
        let position =
            Position::new(&instrument, fill(OrderSide::Buy, "1.000", "100.00", "T-1", 1));
        assert!(position.is_duplicate(&TradeId::new("T-1")));
        assert!(!position.is_duplicate(&TradeId::new("T-2")));
    }

    #[rstest]
    fn test_commission_reduces_realized_pnl() {
        let instrument = crypto_perpetual_btcusdt();
        let mut opening = fill(OrderSide::Buy, "1.000", "100.00", "T-1", 1);
        opening.commission = Some(Money::new(1.0, Currency::USDT()));
        let position = Position::new(&instrument, opening);

        assert_eq!(
            position.realized_pnl,
            Some(Money::new(-1.0, Currency::USDT()))
        );
    }

    #[rstest]
    fn test_closed_position_flat_sum() {
        // For a closed position the net signed fill quantity is zero
        let instrument = crypto_perpetual_btcusdt();
        let mut position =
            Position::new(&instrument, fill(OrderSide::Buy, "1.500", "100.00", "T-1", 1));
        position.apply(&fill(OrderSide::Sell, "0.700", "101.00", "T-2", 2));
        position.apply(&fill(OrderSide::Sell, "0.800", "102.00", "T-3", 3));

        assert!(position.is_closed());
        assert_eq!(position.signed_qty, 0.0);
        assert_eq!(position.quantity, Quantity::zero(3));
    }
}
