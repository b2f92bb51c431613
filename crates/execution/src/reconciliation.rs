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

//! Reconciliation of local cached execution state against venue truth.
//!
//! On start and on every reconciliation interval, the execution engine
//! requests execution state from each client. The manager then diffs both
//! directions: external orders missing locally are synthesized with
//! deterministic client order IDs (so repeat reconciliations across restarts
//! are idempotent), cached open orders missing at the venue are closed per
//! venue truth, and residual position deltas produce adjustments. The venue's
//! truth is always preferred; convergence uses the minimal synthetic events.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use argo_common::{cache::Cache, clock::Clock};
use argo_core::UUID4;
use argo_model::{
    enums::OrderStatus,
    events::{
        OrderAccepted, OrderCanceled, OrderEventAny, OrderExpired, OrderFilled, OrderInitialized,
        OrderTriggered, position::PositionAdjusted,
    },
    identifiers::{ClientOrderId, InstrumentId, PositionId, StrategyId, TradeId},
    instruments::Instrument,
    orders::Order,
    reports::{ExecutionMassStatus, FillReport, OrderStatusReport, PositionStatusReport},
};

/// Manages reconciliation of cached execution state against venue reports.
pub struct ReconciliationManager {
    clock: Rc<RefCell<dyn Clock>>,
    cache: Rc<RefCell<Cache>>,
    processed_fills: HashMap<TradeId, ClientOrderId>,
}

impl ReconciliationManager {
    /// Creates a new [`ReconciliationManager`] instance.
    #[must_use]
    pub fn new(clock: Rc<RefCell<dyn Clock>>, cache: Rc<RefCell<Cache>>) -> Self {
        Self {
            clock,
            cache,
            processed_fills: HashMap::new(),
        }
    }

    /// Returns the deterministic client order ID synthesized for an external
    /// order, encoding the venue order ID so repeat reconciliations across
    /// restarts resolve to the same ID.
    #[must_use]
    pub fn external_client_order_id(report: &OrderStatusReport) -> ClientOrderId {
        let sanitized: String = report
            .venue_order_id
            .as_str()
            .chars()
            .map(|c| if c == ':' || c == ';' { '-' } else { c })
            .collect();
        ClientOrderId::new(format!("O-{sanitized}"))
    }

    /// Reconciles the given mass status against the cache, returning the
    /// order events to apply and any position adjustments.
    pub fn reconcile_mass_status(
        &mut self,
        mass_status: &ExecutionMassStatus,
        external_order_claims: &HashMap<InstrumentId, StrategyId>,
    ) -> (Vec<OrderEventAny>, Vec<PositionAdjusted>) {
        let mut events = Vec::new();

        // 1: Venue -> local. Known orders converge; unknown orders are
        // synthesized with deterministic IDs.
        for report in mass_status.order_reports().values() {
            let client_order_id = self.resolve_client_order_id(report);

            let cached = self.cache.borrow().order(&client_order_id).cloned();
            match cached {
                Some(order) => {
                    events.extend(self.reconcile_order_report(&order, report));
                }
                None => {
                    events.extend(self.synthesize_external_order(
                        report,
                        client_order_id,
                        external_order_claims,
                        mass_status,
                    ));
                }
            }

            // Fills for the order, oldest first, skipping already-processed trades
            if let Some(fills) = mass_status.fill_reports().get(&report.venue_order_id) {
                let mut fills: Vec<&FillReport> = fills.iter().collect();
                fills.sort_by_key(|fill| fill.ts_event);
                for fill in fills {
                    if self.processed_fills.contains_key(&fill.trade_id) {
                        continue;
                    }
                    if let Some(event) = self.fill_event_from_report(client_order_id, fill, report)
                    {
                        self.processed_fills.insert(fill.trade_id, client_order_id);
                        events.push(event);
                    }
                }
            }
        }

        // 2: Local -> venue. Cached open orders the venue no longer reports
        // are closed per venue truth.
        let open_orders: Vec<Order> = self
            .cache
            .borrow()
            .orders_open(Some(&mass_status.venue), None, None)
            .into_iter()
            .cloned()
            .collect();
        for order in open_orders {
            let known_at_venue = order.venue_order_id.is_some_and(|venue_order_id| {
                mass_status.order_reports().contains_key(&venue_order_id)
            });
            if !known_at_venue {
                log::warn!(
                    "Order {} open locally but not reported by venue, canceling",
                    order.client_order_id,
                );
                events.push(self.canceled_event(&order));
            }
        }

        // 3: Position deltas converge via adjustments
        let adjustments = self.reconcile_positions(mass_status);

        (events, adjustments)
    }

    fn resolve_client_order_id(&self, report: &OrderStatusReport) -> ClientOrderId {
        if let Some(client_order_id) = report.client_order_id {
            return client_order_id;
        }
        // The venue order ID may already be indexed from a prior run
        if let Some(client_order_id) = self.cache.borrow().client_order_id(&report.venue_order_id)
        {
            return *client_order_id;
        }
        Self::external_client_order_id(report)
    }

    fn reconcile_order_report(
        &self,
        order: &Order,
        report: &OrderStatusReport,
    ) -> Vec<OrderEventAny> {
        if order.status == report.order_status && order.filled_qty == report.filled_qty {
            return Vec::new(); // Already in sync
        }

        let mut events = Vec::new();
        match report.order_status {
            OrderStatus::Accepted if order.status != OrderStatus::Accepted => {
                events.push(self.accepted_event(order, report));
            }
            OrderStatus::Canceled => events.push(self.canceled_event(order)),
            OrderStatus::Expired => events.push(self.expired_event(order)),
            OrderStatus::Triggered if !order.is_triggered => {
                events.push(self.triggered_event(order));
            }
            // Fill deltas converge through fill reports
            _ => {}
        }
        events
    }

    /// Synthesizes the minimal event sequence bringing an unknown external
    /// order to the reported state.
    fn synthesize_external_order(
        &self,
        report: &OrderStatusReport,
        client_order_id: ClientOrderId,
        external_order_claims: &HashMap<InstrumentId, StrategyId>,
        mass_status: &ExecutionMassStatus,
    ) -> Vec<OrderEventAny> {
        let ts_now = self.clock.borrow().timestamp_ns();
        let strategy_id = external_order_claims
            .get(&report.instrument_id)
            .copied()
            .unwrap_or_else(StrategyId::external);

        log::info!(
            "Synthesizing external order {client_order_id} (venue_order_id={}) for {strategy_id}",
            report.venue_order_id,
        );

        let init = OrderInitialized {
            trader_id: Default::default(),
            strategy_id,
            instrument_id: report.instrument_id,
            client_order_id,
            order_side: report.order_side,
            order_type: report.order_type,
            quantity: report.quantity,
            price: report.price,
            trigger_price: report.trigger_price,
            trigger_type: None,
            trailing_offset: None,
            trailing_offset_type: None,
            time_in_force: report.time_in_force,
            expire_time: None,
            post_only: false,
            reduce_only: false,
            display_qty: None,
            contingency_type: argo_model::enums::ContingencyType::NoContingency,
            order_list_id: None,
            linked_order_ids: None,
            parent_order_id: None,
            tags: None,
            event_id: UUID4::new(),
            ts_event: report.ts_accepted,
            ts_init: ts_now,
            reconciliation: true,
        };

        let mut events = vec![OrderEventAny::Initialized(init)];

        match report.order_status {
            OrderStatus::Accepted | OrderStatus::PartiallyFilled | OrderStatus::Filled => {
                events.push(OrderEventAny::Accepted(OrderAccepted {
                    trader_id: Default::default(),
                    strategy_id,
                    instrument_id: report.instrument_id,
                    client_order_id,
                    venue_order_id: report.venue_order_id,
                    account_id: mass_status.account_id,
                    event_id: UUID4::new(),
                    ts_event: report.ts_accepted,
                    ts_init: ts_now,
                    reconciliation: true,
                }));
            }
            OrderStatus::Canceled => {
                events.push(OrderEventAny::Canceled(OrderCanceled {
                    trader_id: Default::default(),
                    strategy_id,
                    instrument_id: report.instrument_id,
                    client_order_id,
                    venue_order_id: Some(report.venue_order_id),
                    account_id: Some(mass_status.account_id),
                    event_id: UUID4::new(),
                    ts_event: report.ts_last,
                    ts_init: ts_now,
                    reconciliation: true,
                }));
            }
            _ => {}
        }

        events
    }

    fn fill_event_from_report(
        &self,
        client_order_id: ClientOrderId,
        fill: &FillReport,
        report: &OrderStatusReport,
    ) -> Option<OrderEventAny> {
        let cache = self.cache.borrow();
        let instrument = cache.instrument(&fill.instrument_id)?;
        let strategy_id = cache
            .strategy_id_for_order(&client_order_id)
            .copied()
            .unwrap_or_else(StrategyId::external);

        Some(OrderEventAny::Filled(OrderFilled {
            trader_id: Default::default(),
            strategy_id,
            instrument_id: fill.instrument_id,
            client_order_id,
            venue_order_id: fill.venue_order_id,
            account_id: fill.account_id,
            trade_id: fill.trade_id,
            order_side: fill.order_side,
            order_type: report.order_type,
            last_qty: fill.last_qty,
            last_px: fill.last_px,
            currency: instrument.quote_currency(),
            liquidity_side: fill.liquidity_side,
            event_id: UUID4::new(),
            ts_event: fill.ts_event,
            ts_init: self.clock.borrow().timestamp_ns(),
            reconciliation: true,
            position_id: fill.venue_position_id,
            commission: Some(fill.commission),
        }))
    }

    fn reconcile_positions(&self, mass_status: &ExecutionMassStatus) -> Vec<PositionAdjusted> {
        let mut adjustments = Vec::new();
        let ts_now = self.clock.borrow().timestamp_ns();
        let cache = self.cache.borrow();

        for (instrument_id, reports) in mass_status.position_reports() {
            let external_signed: f64 = reports.iter().map(|r| r.signed_qty).sum();
            let local_signed: f64 = cache
                .positions_open(None, Some(instrument_id), None)
                .iter()
                .map(|p| p.signed_qty)
                .sum();

            let delta = external_signed - local_signed;
            if delta.abs() > f64::EPSILON {
                adjustments.push(PositionAdjusted {
                    instrument_id: *instrument_id,
                    position_id: reports
                        .first()
                        .and_then(|r| r.venue_position_id)
                        .unwrap_or_else(|| PositionId::new(instrument_id.to_string())),
                    account_id: mass_status.account_id,
                    quantity_delta: delta,
                    event_id: UUID4::new(),
                    ts_event: ts_now,
                    ts_init: ts_now,
                });
            }
        }

        adjustments
    }

    fn accepted_event(&self, order: &Order, report: &OrderStatusReport) -> OrderEventAny {
        OrderEventAny::Accepted(OrderAccepted {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id.unwrap_or(report.venue_order_id),
            account_id: report.account_id,
            event_id: UUID4::new(),
            ts_event: report.ts_accepted,
            ts_init: self.clock.borrow().timestamp_ns(),
            reconciliation: true,
        })
    }

    fn canceled_event(&self, order: &Order) -> OrderEventAny {
        let ts_now = self.clock.borrow().timestamp_ns();
        OrderEventAny::Canceled(OrderCanceled {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id,
            account_id: order.account_id,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: true,
        })
    }

    fn expired_event(&self, order: &Order) -> OrderEventAny {
        let ts_now = self.clock.borrow().timestamp_ns();
        OrderEventAny::Expired(OrderExpired {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id,
            account_id: order.account_id,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: true,
        })
    }

    fn triggered_event(&self, order: &Order) -> OrderEventAny {
        let ts_now = self.clock.borrow().timestamp_ns();
        OrderEventAny::Triggered(OrderTriggered {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: order.venue_order_id,
            account_id: order.account_id,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: true,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_common::clock::TestClock;
    use argo_core::UnixNanos;
    use argo_model::{
        enums::{OrderSide, OrderType, TimeInForce},
        identifiers::{AccountId, ClientId, Venue, VenueOrderId},
        instruments::stubs::crypto_perpetual_btcusdt,
        types::{Price, Quantity},
    };
    use rstest::rstest;

    use super::*;

    fn manager_with_cache() -> (ReconciliationManager, Rc<RefCell<Cache>>) {
        let clock = Rc::new(RefCell::new(TestClock::new()));
        let cache = Rc::new(RefCell::new(Cache::default()));
        cache
            .borrow_mut()
            .add_instrument(crypto_perpetual_btcusdt())
            .unwrap();
        (ReconciliationManager::new(clock, cache.clone()), cache)
    }

    fn open_limit_report(venue_order_id: &str) -> OrderStatusReport {
        OrderStatusReport::new(
            AccountId::new("BINANCE-001"),
            InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            None,
            VenueOrderId::new(venue_order_id),
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
        .with_price(Price::from("50000.00"))
    }

    fn mass_status_with(report: OrderStatusReport) -> ExecutionMassStatus {
        let mut mass_status = ExecutionMassStatus::new(
            ClientId::new("BINANCE"),
            AccountId::new("BINANCE-001"),
            Venue::new("BINANCE"),
            UnixNanos::from(10),
            None,
        );
        mass_status.add_order_report(report);
        mass_status
    }

    #[rstest]
    fn test_external_client_order_id_deterministic() {
        let report = open_limit_report("12345-67");
        let a = ReconciliationManager::external_client_order_id(&report);
        let b = ReconciliationManager::external_client_order_id(&report);
        assert_eq!(a, b);
        assert_eq!(a, ClientOrderId::new("O-12345-67"));
    }

    #[rstest]
    fn test_external_order_synthesized_with_minimal_events() {
        let (mut manager, _cache) = manager_with_cache();
        let mass_status = mass_status_with(open_limit_report("12345"));

        let (events, adjustments) =
            manager.reconcile_mass_status(&mass_status, &HashMap::new());

        assert!(adjustments.is_empty());
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], OrderEventAny::Initialized(_)));
        assert!(matches!(events[1], OrderEventAny::Accepted(_)));
        assert_eq!(events[0].client_order_id(), ClientOrderId::new("O-12345"));
        // Unclaimed external orders park under the EXTERNAL sentinel
        assert_eq!(events[0].strategy_id(), StrategyId::external());
    }

    #[rstest]
    fn test_external_order_claimed_by_strategy() {
        let (mut manager, _cache) = manager_with_cache();
        let mass_status = mass_status_with(open_limit_report("12345"));

        let mut claims = HashMap::new();
        claims.insert(
            InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            StrategyId::new("EMACross-001"),
        );

        let (events, _) = manager.reconcile_mass_status(&mass_status, &claims);
        assert_eq!(events[0].strategy_id(), StrategyId::new("EMACross-001"));
    }

    #[rstest]
    fn test_second_reconciliation_is_idempotent() {
        // At restart, the venue reports one open LIMIT order not in the cache.
        // The first reconciliation synthesizes it with a deterministic ID; a
        // repeat reconciliation finds the same ID in the cache and emits zero
        // duplicate events.
        let (mut manager, cache) = manager_with_cache();
        let mass_status = mass_status_with(open_limit_report("12345"));

        let (events, _) = manager.reconcile_mass_status(&mass_status, &HashMap::new());
        assert_eq!(events.len(), 2);

        // Apply the synthesized events to the cache (as the engine would)
        let init = match &events[0] {
            OrderEventAny::Initialized(init) => init.clone(),
            _ => panic!("expected initialization"),
        };
        let mut order = Order::new(init);
        order.apply(events[1].clone()).unwrap();
        cache
            .borrow_mut()
            .add_order(order.clone(), None, None, false)
            .unwrap();
        cache.borrow_mut().update_order(&order).unwrap();

        // Second pass: already converged, zero events
        let (events, adjustments) =
            manager.reconcile_mass_status(&mass_status, &HashMap::new());
        assert!(events.is_empty());
        assert!(adjustments.is_empty());
    }

    #[rstest]
    fn test_local_open_order_missing_at_venue_is_canceled() {
        use argo_model::events::order::{OrderAccepted, OrderInitializedBuilder, OrderSubmitted};

        let (mut manager, cache) = manager_with_cache();

        let mut order = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-LOCAL"))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .order_type(OrderType::Limit)
                .price(Some(Price::from("50000.00")))
                .quantity(Quantity::from("1.000"))
                .build()
                .unwrap(),
        );
        cache
            .borrow_mut()
            .add_order(order.clone(), None, None, false)
            .unwrap();
        order
            .apply(OrderEventAny::Submitted(OrderSubmitted {
                trader_id: order.trader_id,
                strategy_id: order.strategy_id,
                instrument_id: order.instrument_id,
                client_order_id: order.client_order_id,
                account_id: AccountId::new("BINANCE-001"),
                event_id: UUID4::new(),
                ts_event: UnixNanos::from(1),
                ts_init: UnixNanos::from(1),
            }))
            .unwrap();
        order
            .apply(OrderEventAny::Accepted(OrderAccepted {
                trader_id: order.trader_id,
                strategy_id: order.strategy_id,
                instrument_id: order.instrument_id,
                client_order_id: order.client_order_id,
                venue_order_id: VenueOrderId::new("V-GONE"),
                account_id: AccountId::new("BINANCE-001"),
                event_id: UUID4::new(),
                ts_event: UnixNanos::from(2),
                ts_init: UnixNanos::from(2),
                reconciliation: false,
            }))
            .unwrap();
        cache.borrow_mut().update_order(&order).unwrap();

        // Venue reports nothing
        let mass_status = ExecutionMassStatus::new(
            ClientId::new("BINANCE"),
            AccountId::new("BINANCE-001"),
            Venue::new("BINANCE"),
            UnixNanos::from(10),
            None,
        );

        let (events, _) = manager.reconcile_mass_status(&mass_status, &HashMap::new());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], OrderEventAny::Canceled(_)));
        assert_eq!(events[0].client_order_id(), ClientOrderId::new("O-LOCAL"));
    }

    #[rstest]
    fn test_position_delta_produces_adjustment() {
        let (mut manager, _cache) = manager_with_cache();

        let mut mass_status = ExecutionMassStatus::new(
            ClientId::new("BINANCE"),
            AccountId::new("BINANCE-001"),
            Venue::new("BINANCE"),
            UnixNanos::from(10),
            None,
        );
        mass_status.add_position_reports(vec![PositionStatusReport {
            account_id: AccountId::new("BINANCE-001"),
            instrument_id: InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            position_side: argo_model::enums::PositionSide::Long,
            quantity: Quantity::from("2.000"),
            signed_qty: 2.0,
            venue_position_id: None,
            ts_last: UnixNanos::from(5),
            ts_init: UnixNanos::from(10),
            report_id: UUID4::new(),
        }]);

        let (_, adjustments) = manager.reconcile_mass_status(&mass_status, &HashMap::new());
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].quantity_delta, 2.0);
    }
}
