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

//! Provides the `ExecutionEngine` for all environments.
//!
//! The execution engine's primary responsibility is to orchestrate
//! interactions between the `ExecutionClient` instances and the rest of the
//! platform. This includes routing order commands to the venue endpoints via
//! registered clients, applying order events in strict per-order sequence,
//! and managing the position lifecycle.

pub mod config;

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use argo_common::{
    cache::Cache,
    clock::Clock,
    generators::PositionIdGenerator,
    messages::execution::{SubmitOrder, SubmitOrderList, TradingCommand},
    msgbus::{self, CMD, EVT, RECV, switchboard},
};
use argo_core::{UUID4, datetime::nanos_to_millis};
use argo_model::{
    enums::{InstrumentClass, OmsType},
    events::{
        OrderDenied, OrderEventAny, OrderFilled, PositionChanged, PositionClosed, PositionEvent,
        PositionOpened, position::PositionState,
    },
    identifiers::{ClientId, InstrumentId, PositionId, StrategyId, Venue},
    instruments::Instrument,
    orders::{Order, OrderError},
    position::Position,
    reports::ExecutionMassStatus,
};
pub use config::ExecEngineConfig;
use ustr::Ustr;

use crate::{client::ExecutionClient, reconciliation::ReconciliationManager};

/// The central execution engine, orchestrating order routing and the order
/// and position lifecycle.
///
/// Orders are owned by the engine from submission until terminal; positions
/// are created and closed by the engine in response to fills.
pub struct ExecutionEngine {
    clock: Rc<RefCell<dyn Clock>>,
    cache: Rc<RefCell<Cache>>,
    clients: HashMap<ClientId, Rc<dyn ExecutionClient>>,
    default_client: Option<ClientId>,
    routing_map: HashMap<Venue, ClientId>,
    oms_overrides: HashMap<StrategyId, OmsType>,
    external_order_claims: HashMap<InstrumentId, StrategyId>,
    pos_id_generator: PositionIdGenerator,
    reconciliation: ReconciliationManager,
    config: ExecEngineConfig,
}

impl ExecutionEngine {
    /// Creates a new [`ExecutionEngine`] instance.
    #[must_use]
    pub fn new(
        clock: Rc<RefCell<dyn Clock>>,
        cache: Rc<RefCell<Cache>>,
        config: Option<ExecEngineConfig>,
    ) -> Self {
        let config = config.unwrap_or_default();
        Self {
            clock: clock.clone(),
            cache: cache.clone(),
            clients: HashMap::new(),
            default_client: None,
            routing_map: HashMap::new(),
            oms_overrides: HashMap::new(),
            external_order_claims: HashMap::new(),
            pos_id_generator: PositionIdGenerator::new(Default::default()),
            reconciliation: ReconciliationManager::new(clock, cache),
            config,
        }
    }

    // -- REGISTRATION ----------------------------------------------------------------------------

    /// Registers the given execution client with the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if a client with the same ID is already registered.
    pub fn register_client(&mut self, client: Rc<dyn ExecutionClient>) -> anyhow::Result<()> {
        if self.clients.contains_key(&client.client_id()) {
            anyhow::bail!("Client already registered with ID {}", client.client_id());
        }

        self.routing_map.insert(client.venue(), client.client_id());
        log::info!("Registered client {}", client.client_id());
        self.clients.insert(client.client_id(), client);
        Ok(())
    }

    /// Registers the given client as the default routing client.
    pub fn register_default_client(&mut self, client: Rc<dyn ExecutionClient>) {
        log::info!("Registered default client {}", client.client_id());
        self.default_client = Some(client.client_id());
        self.clients.insert(client.client_id(), client);
    }

    /// Sets an OMS type override for the given strategy.
    pub fn set_oms_override(&mut self, strategy_id: StrategyId, oms_type: OmsType) {
        self.oms_overrides.insert(strategy_id, oms_type);
    }

    /// Claims external orders for the given instrument for a strategy on
    /// reconciliation.
    pub fn set_external_order_claim(
        &mut self,
        instrument_id: InstrumentId,
        strategy_id: StrategyId,
    ) {
        self.external_order_claims.insert(instrument_id, strategy_id);
        log::info!("Claimed external orders for {instrument_id} to {strategy_id}");
    }

    /// Returns whether all registered clients are connected.
    #[must_use]
    pub fn check_connected(&self) -> bool {
        self.clients.values().all(|c| c.is_connected())
    }

    /// Returns whether residual open state exists in the cache.
    #[must_use]
    pub fn check_residuals(&self) -> bool {
        self.cache.borrow().check_residuals()
    }

    // -- COMMANDS --------------------------------------------------------------------------------

    /// Executes the given trading command, routing it to the appropriate
    /// execution client.
    pub fn execute(&self, command: &TradingCommand) {
        if self.config.debug {
            log::debug!("{RECV}{CMD} {command}");
        }

        let client = if let Some(client) = self
            .clients
            .get(command.client_id().unwrap_or(&ClientId::new("NONE")))
            .or_else(|| {
                self.routing_map
                    .get(&command.instrument_id().venue)
                    .and_then(|client_id| self.clients.get(client_id))
            })
            .or_else(|| {
                self.default_client
                    .as_ref()
                    .and_then(|client_id| self.clients.get(client_id))
            }) {
            client.clone()
        } else {
            log::error!(
                "No execution client found for command: client_id={:?}, venue={}",
                command.client_id(),
                command.instrument_id().venue,
            );
            return;
        };

        match command {
            TradingCommand::SubmitOrder(cmd) => self.handle_submit_order(&client, cmd),
            TradingCommand::SubmitOrderList(cmd) => self.handle_submit_order_list(&client, cmd),
            TradingCommand::ModifyOrder(cmd) => {
                // A client error on modify surfaces as a typed order event
                if let Err(e) = client.modify_order(cmd) {
                    log::error!("Error modifying order: {e}");
                    self.generate_modify_rejected(cmd, &e.to_string());
                }
            }
            TradingCommand::CancelOrder(cmd) => {
                if let Err(e) = client.cancel_order(cmd) {
                    log::error!("Error canceling order: {e}");
                    self.generate_cancel_rejected(cmd, &e.to_string());
                }
            }
            TradingCommand::CancelAllOrders(cmd) => {
                if let Err(e) = client.cancel_all_orders(cmd) {
                    log::error!("Error canceling all orders: {e}");
                }
            }
            TradingCommand::QueryOrder(cmd) => {
                if let Err(e) = client.query_order(cmd) {
                    log::error!("Error querying order: {e}");
                }
            }
        }
    }

    fn generate_modify_rejected(
        &self,
        cmd: &argo_common::messages::execution::ModifyOrder,
        reason: &str,
    ) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::ModifyRejected(argo_model::events::OrderModifyRejected {
            trader_id: cmd.trader_id,
            strategy_id: cmd.strategy_id,
            instrument_id: cmd.instrument_id,
            client_order_id: cmd.client_order_id,
            venue_order_id: cmd.venue_order_id,
            account_id: None,
            reason: Ustr::from(reason),
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_publish(event);
    }

    fn generate_cancel_rejected(
        &self,
        cmd: &argo_common::messages::execution::CancelOrder,
        reason: &str,
    ) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::CancelRejected(argo_model::events::OrderCancelRejected {
            trader_id: cmd.trader_id,
            strategy_id: cmd.strategy_id,
            instrument_id: cmd.instrument_id,
            client_order_id: cmd.client_order_id,
            venue_order_id: cmd.venue_order_id,
            account_id: None,
            reason: Ustr::from(reason),
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_publish(event);
    }

    fn handle_submit_order(&self, client: &Rc<dyn ExecutionClient>, cmd: &SubmitOrder) {
        let order = &cmd.order;
        let client_order_id = order.client_order_id;
        let instrument_id = order.instrument_id;

        if !self.cache.borrow().order_exists(&client_order_id) {
            let mut cache = self.cache.borrow_mut();
            if let Err(e) =
                cache.add_order(order.clone(), cmd.position_id, Some(client.client_id()), false)
            {
                log::error!("Error adding order to cache: {e}");
                return;
            }
        }

        // Every order references an existing instrument in the cache
        if self.cache.borrow().instrument(&instrument_id).is_none() {
            self.deny_order(order, &format!("no instrument found for {instrument_id}"));
            return;
        }

        if let Err(e) = client.submit_order(cmd) {
            // A client error on submit produces a rejection with the reason
            log::error!("Error submitting order to client: {e}");
            self.reject_order(order, client.account_id(), &e.to_string());
        }
    }

    fn reject_order(&self, order: &Order, account_id: argo_model::identifiers::AccountId, reason: &str) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let event = OrderEventAny::Rejected(argo_model::events::OrderRejected {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            account_id,
            reason: Ustr::from(reason),
            due_post_only: false,
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
            reconciliation: false,
        });
        self.apply_and_publish(event);
    }

    fn handle_submit_order_list(&self, client: &Rc<dyn ExecutionClient>, cmd: &SubmitOrderList) {
        {
            let mut cache = self.cache.borrow_mut();
            for order in &cmd.order_list.orders {
                if !cache.order_exists(&order.client_order_id) {
                    if let Err(e) = cache.add_order(
                        order.clone(),
                        cmd.position_id,
                        Some(client.client_id()),
                        false,
                    ) {
                        log::error!("Error adding order to cache: {e}");
                        return;
                    }
                }
            }
            cache.add_order_list(cmd.order_list.clone());
        }

        if self.cache.borrow().instrument(&cmd.instrument_id).is_none() {
            for order in &cmd.order_list.orders {
                self.deny_order(
                    order,
                    &format!("no instrument found for {}", cmd.instrument_id),
                );
            }
            return;
        }

        if let Err(e) = client.submit_order_list(cmd) {
            log::error!("Error submitting order list to client: {e}");
            for order in &cmd.order_list.orders {
                self.reject_order(order, client.account_id(), &e.to_string());
            }
        }
    }

    fn deny_order(&self, order: &Order, reason: &str) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let denied = OrderEventAny::Denied(OrderDenied {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            reason: Ustr::from(reason),
            event_id: UUID4::new(),
            ts_event: ts_now,
            ts_init: ts_now,
        });

        self.apply_and_publish(denied);
    }

    // -- EVENT HANDLERS --------------------------------------------------------------------------

    /// Processes the given order event, applying it to the owning order in
    /// strict sequence and driving the position lifecycle on fills.
    pub fn process(&mut self, event: &OrderEventAny) {
        if self.config.debug {
            log::debug!("{RECV}{EVT} {event}");
        }

        match event {
            OrderEventAny::Filled(fill) => {
                let oms_type = self.determine_oms_type(fill);
                let position_id = self.determine_position_id(fill, oms_type);

                let mut fill = *fill;
                if fill.position_id.is_none() {
                    fill.position_id = Some(position_id);
                }

                if self.apply_and_publish(OrderEventAny::Filled(fill)) {
                    self.handle_order_fill(&fill);
                }
            }
            _ => {
                self.apply_and_publish(event.clone());
            }
        }
    }

    /// Applies the event to the cached order and publishes it, returning
    /// whether the application succeeded.
    fn apply_and_publish(&self, event: OrderEventAny) -> bool {
        let client_order_id = event.client_order_id();

        let mut order = {
            let cache = self.cache.borrow();
            let order = cache.order(&client_order_id).cloned().or_else(|| {
                // Fall back to the venue order ID index
                event
                    .venue_order_id()
                    .and_then(|venue_order_id| cache.client_order_id(&venue_order_id).copied())
                    .and_then(|client_order_id| cache.order(&client_order_id).cloned())
            });

            match order {
                Some(order) => order,
                None => {
                    log::error!(
                        "Cannot apply event to any order: {client_order_id} not found in the cache",
                    );
                    return false;
                }
            }
        };

        match order.apply(event.clone()) {
            Ok(()) => {}
            Err(OrderError::DuplicateTradeId(trade_id)) => {
                // Idempotent: duplicate fills are dropped
                log::warn!("Duplicate fill dropped for {client_order_id}: trade_id={trade_id}");
                return false;
            }
            Err(e @ OrderError::OutOfOrderFill { .. }) => {
                log::error!("Out-of-order fill rejected for {client_order_id}: {e}");
                return false;
            }
            Err(e) => {
                log::error!("Error applying event to {client_order_id}: {e}");
                return false;
            }
        }

        if let Err(e) = self.cache.borrow_mut().update_order(&order) {
            log::error!("Error updating order in cache: {e}");
        }

        let topic = switchboard::get_order_events_topic(order.strategy_id);
        msgbus::publish(&topic, &event);
        true
    }

    fn determine_oms_type(&self, fill: &OrderFilled) -> OmsType {
        if let Some(oms_type) = self.oms_overrides.get(&fill.strategy_id) {
            return *oms_type;
        }

        // Use the native venue OMS
        if let Some(client_id) = self.routing_map.get(&fill.instrument_id.venue) {
            if let Some(client) = self.clients.get(client_id) {
                let oms_type = client.oms_type();
                if oms_type != OmsType::Unspecified {
                    return oms_type;
                }
            }
        }

        OmsType::Netting
    }

    fn determine_position_id(&mut self, fill: &OrderFilled, oms_type: OmsType) -> PositionId {
        match oms_type {
            OmsType::Hedging => {
                // A position per opening order: venue-assigned ID wins
                if let Some(position_id) = fill.position_id {
                    return position_id;
                }
                if let Some(position_id) = self.cache.borrow().position_id(&fill.client_order_id) {
                    return *position_id;
                }
                self.pos_id_generator.generate(
                    fill.strategy_id,
                    nanos_to_millis(fill.ts_event.as_u64()),
                )
            }
            _ => {
                // NETTING: one position per instrument
                PositionId::new(fill.instrument_id.to_string())
            }
        }
    }

    fn handle_order_fill(&mut self, fill: &OrderFilled) {
        let instrument = {
            let cache = self.cache.borrow();
            match cache.instrument(&fill.instrument_id) {
                Some(instrument) => instrument.clone(),
                None => {
                    log::error!(
                        "Cannot handle fill: no instrument found for {}",
                        fill.instrument_id,
                    );
                    return;
                }
            }
        };

        // Spot CASH fills adjust balances only, unless positions are opted in
        if instrument.instrument_class() == InstrumentClass::Spot
            && !self.config.generate_spot_positions
        {
            return;
        }

        let position_id = fill.position_id.expect("Fill had no `position_id`");
        let existing = self.cache.borrow().position(&position_id).cloned();

        match existing {
            Some(mut position) if position.is_open() => {
                if position.is_duplicate(&fill.trade_id) {
                    log::warn!(
                        "Duplicate fill dropped for position {position_id}: trade_id={}",
                        fill.trade_id,
                    );
                    return;
                }

                position.apply(fill);
                if let Err(e) = self.cache.borrow_mut().update_position(&position) {
                    log::error!("Error updating position in cache: {e}");
                }

                let event = if position.is_closed() {
                    PositionEvent::Closed(PositionClosed {
                        state: self.position_state(&position, fill),
                        closing_order_id: position.closing_order_id,
                        avg_px_close: position.avg_px_close.unwrap_or(0.0),
                        duration_ns: position.duration_ns,
                    })
                } else {
                    PositionEvent::Changed(PositionChanged {
                        state: self.position_state(&position, fill),
                        unrealized_pnl: self
                            .cache
                            .borrow()
                            .price(&position.instrument_id, argo_model::enums::PriceType::Mid)
                            .map(|price| position.unrealized_pnl(price)),
                    })
                };
                self.publish_position_event(&event, position.strategy_id);
            }
            _ => {
                let position = Position::new(&instrument, *fill);
                if let Err(e) = self.cache.borrow_mut().add_position(position.clone()) {
                    log::error!("Error adding position to cache: {e}");
                    return;
                }

                let event = PositionEvent::Opened(PositionOpened {
                    state: self.position_state(&position, fill),
                });
                self.publish_position_event(&event, position.strategy_id);
            }
        }
    }

    fn position_state(&self, position: &Position, fill: &OrderFilled) -> PositionState {
        PositionState {
            trader_id: position.trader_id,
            strategy_id: position.strategy_id,
            instrument_id: position.instrument_id,
            position_id: position.id,
            account_id: position.account_id,
            opening_order_id: position.opening_order_id,
            entry: position.entry,
            side: position.side,
            signed_qty: position.signed_qty,
            quantity: position.quantity,
            last_qty: fill.last_qty,
            last_px: fill.last_px,
            currency: position.settlement_currency,
            avg_px_open: position.avg_px_open,
            realized_pnl: position.realized_pnl,
            event_id: UUID4::new(),
            ts_event: fill.ts_event,
            ts_init: self.clock.borrow().timestamp_ns(),
        }
    }

    fn publish_position_event(&self, event: &PositionEvent, strategy_id: StrategyId) {
        let topic = switchboard::get_position_events_topic(strategy_id);
        msgbus::publish(&topic, event);
    }

    // -- RECONCILIATION --------------------------------------------------------------------------

    /// Runs reconciliation for all registered clients (startup and periodic).
    ///
    /// Requests execution state from each client and converges local cached
    /// state with the venue's truth. Failures surface but do not crash the
    /// engine.
    pub fn reconcile_all(&mut self) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let clients: Vec<Rc<dyn ExecutionClient>> = self.clients.values().cloned().collect();

        for client in clients {
            match client.generate_mass_status(ts_now) {
                Ok(mass_status) => self.reconcile_mass_status(&mass_status),
                Err(e) => log::warn!(
                    "Reconciliation failed for client {}: {e}",
                    client.client_id(),
                ),
            }
        }
    }

    /// Reconciles the given execution mass status against the cache.
    pub fn reconcile_mass_status(&mut self, mass_status: &ExecutionMassStatus) {
        let claims = self.external_order_claims.clone();
        let (events, adjustments) = self
            .reconciliation
            .reconcile_mass_status(mass_status, &claims);

        for event in events {
            // Synthesized initializations seed orders not yet in the cache
            if let OrderEventAny::Initialized(init) = &event {
                match Order::new_checked(init.clone()) {
                    Ok(order) => {
                        if let Err(e) = self.cache.borrow_mut().add_order(order, None, None, false)
                        {
                            log::error!("Error adding reconciled order to cache: {e}");
                            continue;
                        }
                    }
                    Err(e) => {
                        log::error!("Error constructing reconciled order: {e}");
                        continue;
                    }
                }
                continue;
            }
            self.process(&event);
        }

        for adjustment in adjustments {
            log::warn!("Position divergence: {adjustment}");
            let strategy_id = self
                .cache
                .borrow()
                .position(&adjustment.position_id)
                .map_or_else(StrategyId::external, |p| p.strategy_id);
            self.publish_position_event(&PositionEvent::Adjusted(adjustment), strategy_id);
        }
    }

    /// Returns the set of instruments with external order claims.
    #[must_use]
    pub fn external_order_claims_instruments(&self) -> HashSet<InstrumentId> {
        self.external_order_claims.keys().copied().collect()
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
        enums::{LiquiditySide, OrderSide, OrderStatus, OrderType, PositionSide},
        events::order::{OrderAccepted, OrderInitializedBuilder, OrderSubmitted},
        identifiers::{AccountId, ClientOrderId, TradeId, VenueOrderId},
        instruments::stubs::crypto_perpetual_btcusdt,
        types::{Currency, Price, Quantity},
    };
    use rstest::rstest;

    use super::*;

    fn engine() -> ExecutionEngine {
        let clock = Rc::new(RefCell::new(TestClock::new()));
        let cache = Rc::new(RefCell::new(Cache::default()));
        cache
            .borrow_mut()
            .add_instrument(crypto_perpetual_btcusdt())
            .unwrap();
        ExecutionEngine::new(clock, cache, None)
    }

    fn add_accepted_order(engine: &mut ExecutionEngine, client_order_id: &str) -> Order {
        let mut order = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new(client_order_id))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .order_side(OrderSide::Buy)
                .quantity(Quantity::from("1.000"))
                .build()
                .unwrap(),
        );
        engine
            .cache
            .borrow_mut()
            .add_order(order.clone(), None, None, false)
            .unwrap();

        order
            .apply(OrderEventAny::Submitted(OrderSubmitted {
                trader_id: order.trader_id,
                strategy_id: order.strategy_id,
                instrument_id: order.instrument_id,
                client_order_id: order.client_order_id,
                account_id: AccountId::default(),
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
                venue_order_id: VenueOrderId::new("V-1"),
                account_id: AccountId::default(),
                event_id: UUID4::new(),
                ts_event: UnixNanos::from(2),
                ts_init: UnixNanos::from(2),
                reconciliation: false,
            }))
            .unwrap();
        engine.cache.borrow_mut().update_order(&order).unwrap();
        order
    }

    fn fill_event(order: &Order, trade_id: &str, qty: &str, px: &str, ts: u64) -> OrderEventAny {
        OrderEventAny::Filled(OrderFilled {
            trader_id: order.trader_id,
            strategy_id: order.strategy_id,
            instrument_id: order.instrument_id,
            client_order_id: order.client_order_id,
            venue_order_id: VenueOrderId::new("V-1"),
            account_id: AccountId::default(),
            trade_id: TradeId::new(trade_id),
            order_side: order.side,
            order_type: OrderType::Market,
            last_qty: Quantity::from(qty),
            last_px: Price::from(px),
            currency: Currency::USDT(),
            liquidity_side: LiquiditySide::Taker,
            event_id: UUID4::new(),
            ts_event: UnixNanos::from(ts),
            ts_init: UnixNanos::from(ts),
            reconciliation: false,
            position_id: None,
            commission: None,
        })
    }

    #[rstest]
    fn test_fill_opens_netting_position() {
        let mut engine = engine();
        let order = add_accepted_order(&mut engine, "O-1");

        engine.process(&fill_event(&order, "T-1", "1.000", "50000.50", 3));

        let position_id = PositionId::new("BTCUSDT-PERP.BINANCE");
        let cache = engine.cache.borrow();
        let position = cache.position(&position_id).unwrap();
        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.quantity, Quantity::from("1.000"));
        assert_eq!(position.avg_px_open, 50000.50);

        let order = cache.order(&ClientOrderId::new("O-1")).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[rstest]
    fn test_duplicate_trade_id_idempotent() {
        let mut engine = engine();
        let order = add_accepted_order(&mut engine, "O-1");

        engine.process(&fill_event(&order, "T-1", "0.400", "50000.50", 3));
        engine.process(&fill_event(&order, "T-1", "0.400", "50000.50", 4));

        let position_id = PositionId::new("BTCUSDT-PERP.BINANCE");
        let cache = engine.cache.borrow();
        let position = cache.position(&position_id).unwrap();
        // Second (duplicate) fill was dropped
        assert_eq!(position.quantity, Quantity::from("0.400"));
        assert_eq!(position.trade_ids().len(), 1);

        let order = cache.order(&ClientOrderId::new("O-1")).unwrap();
        assert_eq!(order.filled_qty, Quantity::from("0.400"));
    }

    #[rstest]
    fn test_out_of_order_fill_rejected() {
        let mut engine = engine();
        let order = add_accepted_order(&mut engine, "O-1");

        engine.process(&fill_event(&order, "T-1", "0.400", "50000.50", 10));
        engine.process(&fill_event(&order, "T-2", "0.400", "50000.50", 5));

        let cache = engine.cache.borrow();
        let order = cache.order(&ClientOrderId::new("O-1")).unwrap();
        assert_eq!(order.filled_qty, Quantity::from("0.400"));
        assert_eq!(order.trade_ids.len(), 1);
    }

    #[rstest]
    fn test_opposing_fills_close_position() {
        let mut engine = engine();
        let buy = add_accepted_order(&mut engine, "O-1");
        engine.process(&fill_event(&buy, "T-1", "1.000", "100.00", 3));

        // An opposing sell closes the netted position
        let mut sell = Order::new(
            OrderInitializedBuilder::default()
                .client_order_id(ClientOrderId::new("O-2"))
                .instrument_id(InstrumentId::from("BTCUSDT-PERP.BINANCE"))
                .order_side(OrderSide::Sell)
                .quantity(Quantity::from("1.000"))
                .build()
                .unwrap(),
        );
        engine
            .cache
            .borrow_mut()
            .add_order(sell.clone(), None, None, false)
            .unwrap();
        sell.apply(OrderEventAny::Submitted(OrderSubmitted {
            trader_id: sell.trader_id,
            strategy_id: sell.strategy_id,
            instrument_id: sell.instrument_id,
            client_order_id: sell.client_order_id,
            account_id: AccountId::default(),
            event_id: UUID4::new(),
            ts_event: UnixNanos::from(4),
            ts_init: UnixNanos::from(4),
        }))
        .unwrap();
        engine.cache.borrow_mut().update_order(&sell).unwrap();

        engine.process(&fill_event(&sell, "T-2", "1.000", "110.00", 5));

        let position_id = PositionId::new("BTCUSDT-PERP.BINANCE");
        let cache = engine.cache.borrow();
        let position = cache.position(&position_id).unwrap();
        assert!(position.is_closed());
        assert_eq!(
            position.realized_pnl,
            Some(argo_model::types::Money::new(10.0, Currency::USDT()))
        );
        assert_eq!(cache.positions_open(None, None, None).len(), 0);
        assert_eq!(cache.positions_closed(None, None, None).len(), 1);
    }

    #[rstest]
    fn test_hedging_uses_generated_position_ids() {
        let mut engine = engine();
        let order = add_accepted_order(&mut engine, "O-1");
        engine.set_oms_override(order.strategy_id, OmsType::Hedging);

        engine.process(&fill_event(&order, "T-1", "1.000", "100.00", 3));

        let cache = engine.cache.borrow();
        // The netted instrument-keyed ID must not exist under HEDGING
        assert!(cache.position(&PositionId::new("BTCUSDT-PERP.BINANCE")).is_none());
        assert_eq!(cache.positions_open(None, None, None).len(), 1);
    }
}
