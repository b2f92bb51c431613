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

//! Provides the `DataEngine`, the central component of the data stack.
//!
//! The data engine's primary responsibility is to orchestrate interactions
//! between the `DataClient` instances and the rest of the platform. This
//! includes routing subscriptions and requests to data clients, hosting the
//! bar aggregators, and emitting synthetic quotes from book updates.

pub mod book;
pub mod config;

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
    sync::Arc,
};

use argo_common::{
    cache::Cache,
    clock::Clock,
    messages::data::{
        DataCommand, DataPayload, DataResponse, RequestAggregatedBars, RequestCommand,
        SubscribeCommand, UnsubscribeCommand,
    },
    msgbus::{self, switchboard},
    timer::TimeEvent,
};
use argo_core::{UUID4, UnixNanos, datetime::secs_to_nanos};
use argo_model::{
    data::{Bar, BarType, Data, OrderBookDelta, OrderBookDeltas, OrderBookDepth10, QuoteTick, TradeTick},
    enums::{AggregationSource, PriceType, RecordFlag},
    identifiers::{ClientId, InstrumentId, Venue},
    instruments::{Instrument, InstrumentAny},
};
use book::BookManager;
use config::DataEngineConfig;
use indexmap::IndexMap;

use crate::{
    aggregation::{
        BarAggregator, BarHandler, TickBarAggregator, TimeBarAggregator, ValueBarAggregator,
        VolumeBarAggregator, aggregate_time_bars_historical,
    },
    client::DataClientAdapter,
};

const BAR_TIMER_PREFIX: &str = "BAR-";

struct PendingRequest {
    request: RequestCommand,
    deadline_ns: UnixNanos,
}

/// The central component of the data stack, routing subscriptions and
/// requests between data clients and the rest of the platform.
pub struct DataEngine {
    clock: Rc<RefCell<dyn Clock>>,
    cache: Rc<RefCell<Cache>>,
    clients: IndexMap<ClientId, DataClientAdapter>,
    routing_map: IndexMap<Venue, ClientId>,
    default_client: Option<ClientId>,
    bar_aggregators: HashMap<BarType, Box<dyn BarAggregator>>,
    aggregator_emissions: Rc<RefCell<VecDeque<Bar>>>,
    book_manager: BookManager,
    buffered_deltas: HashMap<InstrumentId, Vec<OrderBookDelta>>,
    // Live bars held back while a historical request for the same bar type
    // is in flight: historical data precedes live streamed data
    buffered_live_bars: HashMap<BarType, Vec<Bar>>,
    pending_requests: HashMap<UUID4, PendingRequest>,
    pending_aggregations: HashMap<UUID4, RequestAggregatedBars>,
    config: DataEngineConfig,
}

impl DataEngine {
    /// Creates a new [`DataEngine`] instance.
    #[must_use]
    pub fn new(
        clock: Rc<RefCell<dyn Clock>>,
        cache: Rc<RefCell<Cache>>,
        config: Option<DataEngineConfig>,
    ) -> Self {
        Self {
            clock,
            cache,
            clients: IndexMap::new(),
            routing_map: IndexMap::new(),
            default_client: None,
            bar_aggregators: HashMap::new(),
            aggregator_emissions: Rc::new(RefCell::new(VecDeque::new())),
            book_manager: BookManager::new(),
            buffered_deltas: HashMap::new(),
            buffered_live_bars: HashMap::new(),
            pending_requests: HashMap::new(),
            pending_aggregations: HashMap::new(),
            config: config.unwrap_or_default(),
        }
    }

    /// Registers the given data client with the engine.
    ///
    /// # Panics
    ///
    /// Panics if a client with the same client ID has already been registered.
    pub fn register_client(&mut self, client: DataClientAdapter, routing: Option<Venue>) {
        assert!(
            !self.clients.contains_key(&client.client_id),
            "Client {} already registered",
            client.client_id,
        );

        if let Some(routing) = routing {
            self.routing_map.insert(routing, client.client_id);
            log::info!("Set client {} routing for {routing}", client.client_id);
        } else if let Some(venue) = client.venue {
            self.routing_map.insert(venue, client.client_id);
        }

        log::info!("Registered client {}", client.client_id);
        self.clients.insert(client.client_id, client);
    }

    /// Registers the given client as the default routing client.
    pub fn register_default_client(&mut self, client: DataClientAdapter) {
        log::info!("Registered default client {}", client.client_id);
        self.default_client = Some(client.client_id);
        self.clients.insert(client.client_id, client);
    }

    /// Deregisters the client with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if no client with the ID is registered.
    pub fn deregister_client(&mut self, client_id: &ClientId) {
        assert!(
            self.clients.contains_key(client_id),
            "Client {client_id} not registered",
        );
        self.clients.shift_remove(client_id);
        self.routing_map.retain(|_, mapped| mapped != client_id);
        log::info!("Deregistered client {client_id}");
    }

    /// Returns the registered client IDs.
    #[must_use]
    pub fn registered_clients(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    /// Returns whether all registered clients are connected.
    #[must_use]
    pub fn check_connected(&self) -> bool {
        self.clients.values().all(|c| c.client.is_connected())
    }

    /// Returns all active bar subscriptions across clients and aggregators.
    #[must_use]
    pub fn subscribed_bars(&self) -> Vec<BarType> {
        let mut bars: Vec<BarType> = self
            .clients
            .values()
            .flat_map(|c| c.subscriptions_bars.iter().copied())
            .collect();
        bars.extend(self.bar_aggregators.keys().copied());
        bars
    }

    /// Starts all registered clients.
    pub fn start(&mut self) {
        for client in self.clients.values_mut() {
            client.client.start();
        }
    }

    /// Stops all registered clients.
    pub fn stop(&mut self) {
        for client in self.clients.values_mut() {
            client.client.stop();
        }
    }

    /// Resets the engine and all registered clients.
    pub fn reset(&mut self) {
        for client in self.clients.values_mut() {
            client.client.reset();
        }
        self.bar_aggregators.clear();
        self.aggregator_emissions.borrow_mut().clear();
        self.buffered_deltas.clear();
        self.buffered_live_bars.clear();
        self.pending_requests.clear();
        self.pending_aggregations.clear();
    }

    /// Disposes the engine, releasing client resources and timers.
    pub fn dispose(&mut self) {
        for client in self.clients.values_mut() {
            client.client.dispose();
        }
        self.clock.borrow_mut().cancel_timers();
    }

    fn get_client_mut(
        &mut self,
        client_id: Option<&ClientId>,
        venue: Option<Venue>,
    ) -> Option<&mut DataClientAdapter> {
        if let Some(client_id) = client_id {
            if self.clients.contains_key(client_id) {
                return self.clients.get_mut(client_id);
            }
        }
        if let Some(venue) = venue {
            if let Some(mapped) = self.routing_map.get(&venue).copied() {
                return self.clients.get_mut(&mapped);
            }
        }
        if let Some(default) = self.default_client {
            return self.clients.get_mut(&default);
        }
        None
    }

    // -- COMMANDS --------------------------------------------------------------------------------

    /// Executes the given data command.
    pub fn execute(&mut self, command: DataCommand) {
        match command {
            DataCommand::Subscribe(cmd) => self.execute_subscribe(&cmd),
            DataCommand::Unsubscribe(cmd) => self.execute_unsubscribe(&cmd),
            DataCommand::Request(cmd) => self.execute_request(cmd),
        }
    }

    fn execute_subscribe(&mut self, cmd: &SubscribeCommand) {
        if let SubscribeCommand::Bars(sub) = cmd {
            if sub.bar_type.aggregation_source() == AggregationSource::Internal {
                if let Err(e) = self.start_bar_aggregator(sub.bar_type) {
                    log::error!("Error starting bar aggregator: {e}");
                }
                return; // Internal aggregation, upstream source handled below
            }
        }

        if let Some(client) = self.get_client_mut(cmd.client_id(), cmd.venue()) {
            client.execute_subscribe(cmd);
        } else {
            log::error!(
                "Cannot handle command: no client found for client_id={:?}, venue={:?}",
                cmd.client_id(),
                cmd.venue(),
            );
        }
    }

    fn execute_unsubscribe(&mut self, cmd: &UnsubscribeCommand) {
        if let UnsubscribeCommand::Bars(unsub) = cmd {
            if unsub.bar_type.aggregation_source() == AggregationSource::Internal {
                self.stop_bar_aggregator(unsub.bar_type);
                return;
            }
        }

        if let Some(client) = self.get_client_mut(cmd.client_id(), cmd.venue()) {
            client.execute_unsubscribe(cmd);
        } else {
            log::error!(
                "Cannot handle command: no client found for client_id={:?}, venue={:?}",
                cmd.client_id(),
                cmd.venue(),
            );
        }
    }

    fn execute_request(&mut self, req: RequestCommand) {
        let deadline_ns =
            self.clock.borrow().timestamp_ns() + secs_to_nanos(self.config.request_timeout_secs as f64);

        if let RequestCommand::AggregatedBars(agg) = &req {
            match self.prepare_aggregated_bars_request(agg) {
                Ok(source_request) => {
                    if let RequestCommand::Bars(bars_req) = &source_request {
                        self.buffered_live_bars
                            .entry(bars_req.bar_type)
                            .or_default();
                    }
                    self.pending_aggregations
                        .insert(source_request.correlation_id(), agg.clone());
                    self.pending_requests.insert(
                        source_request.correlation_id(),
                        PendingRequest {
                            request: source_request.clone(),
                            deadline_ns,
                        },
                    );
                    self.forward_request(source_request);
                }
                Err(e) => log::error!("Cannot handle aggregated bars request: {e}"),
            }
            return;
        }

        if let RequestCommand::Bars(bars_req) = &req {
            // Buffer live bars of this type until the historical chunk drains
            self.buffered_live_bars
                .entry(bars_req.bar_type)
                .or_default();
        }

        self.pending_requests.insert(
            req.correlation_id(),
            PendingRequest {
                request: req.clone(),
                deadline_ns,
            },
        );
        self.forward_request(req);
    }

    fn forward_request(&mut self, req: RequestCommand) {
        if let Some(client) = self.get_client_mut(req.client_id(), req.venue()) {
            client.execute_request(&req);
        } else {
            log::error!(
                "Cannot handle request: no client found for client_id={:?}, venue={:?}",
                req.client_id(),
                req.venue(),
            );
        }
    }

    fn prepare_aggregated_bars_request(
        &self,
        agg: &RequestAggregatedBars,
    ) -> anyhow::Result<RequestCommand> {
        let first = agg
            .bar_types
            .first()
            .ok_or_else(|| anyhow::anyhow!("`bar_types` was empty"))?;
        if !first.is_composite() {
            anyhow::bail!("Aggregated bars request requires composite bar types");
        }

        let source = first.composite();
        if source.aggregation_source() != AggregationSource::External {
            anyhow::bail!("Aggregation chain source must be EXTERNAL, was {source}");
        }

        Ok(RequestCommand::Bars(
            argo_common::messages::data::RequestBars {
                bar_type: source,
                start: agg.start,
                end: agg.end,
                limit: agg.limit,
                client_id: agg.client_id,
                correlation_id: UUID4::new(),
                ts_init: agg.ts_init,
            },
        ))
    }

    /// Completes pending requests whose deadline has passed with an empty
    /// response and a warning. Subscriptions are unaffected.
    pub fn check_request_timeouts(&mut self) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let expired: Vec<UUID4> = self
            .pending_requests
            .iter()
            .filter(|(_, pending)| pending.deadline_ns <= ts_now)
            .map(|(correlation_id, _)| *correlation_id)
            .collect();

        for correlation_id in expired {
            let Some(pending) = self.pending_requests.remove(&correlation_id) else {
                continue;
            };
            log::warn!(
                "Request {correlation_id} timed out after {}s, completing empty",
                self.config.request_timeout_secs,
            );

            let payload = match &pending.request {
                RequestCommand::Instruments(_) => DataPayload::Instruments(Arc::new(vec![])),
                RequestCommand::Quotes(_) => DataPayload::Quotes(Arc::new(vec![])),
                RequestCommand::Trades(_) => DataPayload::Trades(Arc::new(vec![])),
                RequestCommand::Bars(_) => DataPayload::Bars(Arc::new(vec![])),
                RequestCommand::AggregatedBars(_) => {
                    DataPayload::AggregatedBars(Arc::new(vec![]))
                }
            };

            // An aggregation source request resolves the original correlation
            let original_id = self
                .pending_aggregations
                .remove(&correlation_id)
                .map_or(correlation_id, |agg| agg.correlation_id);

            let response = DataResponse {
                correlation_id: original_id,
                client_id: pending.request.client_id().copied(),
                venue: pending.request.venue(),
                payload,
                ts_init: ts_now,
            };
            msgbus::respond(&original_id, &response);
            self.release_buffered_bars(Some(pending));
        }
    }

    // -- BAR AGGREGATION -------------------------------------------------------------------------

    fn start_bar_aggregator(&mut self, bar_type: BarType) -> anyhow::Result<()> {
        if self.bar_aggregators.contains_key(&bar_type.standard()) {
            return Ok(()); // Duplicate subscribe shares the aggregator
        }

        let instrument_id = bar_type.instrument_id();
        let (price_precision, size_precision) = {
            let cache = self.cache.borrow();
            let instrument = cache.instrument(&instrument_id).ok_or_else(|| {
                anyhow::anyhow!("No instrument found for {instrument_id} (write it before data)")
            })?;
            (instrument.price_precision(), instrument.size_precision())
        };

        let emissions = self.aggregator_emissions.clone();
        let handler: BarHandler = Box::new(move |bar| emissions.borrow_mut().push_back(bar));

        let spec = bar_type.spec();
        let aggregator: Box<dyn BarAggregator> = if spec.is_time_aggregated() {
            let aggregator = TimeBarAggregator::new(
                bar_type,
                price_precision,
                size_precision,
                handler,
                &self.config,
            );
            // Bucket closes are timer-driven; the kernel routes the resulting
            // time events back into `handle_time_event`
            self.clock.borrow_mut().set_timer_ns(
                &format!("{BAR_TIMER_PREFIX}{bar_type}"),
                aggregator.interval_ns().as_u64(),
                None,
                None,
                None,
                Some(true),
                None,
            )?;
            Box::new(aggregator)
        } else {
            match spec.aggregation {
                argo_model::enums::BarAggregation::Tick => Box::new(TickBarAggregator::new(
                    bar_type,
                    price_precision,
                    size_precision,
                    handler,
                )),
                argo_model::enums::BarAggregation::Volume => Box::new(VolumeBarAggregator::new(
                    bar_type,
                    price_precision,
                    size_precision,
                    handler,
                )),
                argo_model::enums::BarAggregation::Value => Box::new(ValueBarAggregator::new(
                    bar_type,
                    price_precision,
                    size_precision,
                    handler,
                )),
                aggregation => anyhow::bail!("Unsupported bar aggregation {aggregation}"),
            }
        };

        log::info!("Started bar aggregator for {bar_type}");
        self.bar_aggregators.insert(bar_type.standard(), aggregator);

        // Ensure the upstream source data flows
        self.ensure_aggregator_source(bar_type);
        Ok(())
    }

    fn ensure_aggregator_source(&mut self, bar_type: BarType) {
        let instrument_id = bar_type.instrument_id();
        let ts_init = self.clock.borrow().timestamp_ns();

        let source_cmd = if bar_type.is_composite() {
            let source = bar_type.composite();
            if source.aggregation_source() == AggregationSource::Internal {
                // Chain: ensure the upstream internal aggregator exists
                if let Err(e) = self.start_bar_aggregator(source) {
                    log::error!("Error starting source aggregator: {e}");
                }
                return;
            }
            SubscribeCommand::Bars(argo_common::messages::data::SubscribeBars {
                bar_type: source,
                client_id: None,
                command_id: UUID4::new(),
                ts_init,
            })
        } else if bar_type.spec().price_type == PriceType::Last {
            SubscribeCommand::Trades(argo_common::messages::data::SubscribeTrades {
                instrument_id,
                client_id: None,
                command_id: UUID4::new(),
                ts_init,
            })
        } else {
            SubscribeCommand::Quotes(argo_common::messages::data::SubscribeQuotes {
                instrument_id,
                client_id: None,
                command_id: UUID4::new(),
                ts_init,
            })
        };

        self.execute_subscribe(&source_cmd);
    }

    fn stop_bar_aggregator(&mut self, bar_type: BarType) {
        if self.bar_aggregators.remove(&bar_type.standard()).is_some() {
            self.clock
                .borrow_mut()
                .cancel_timer(&format!("{BAR_TIMER_PREFIX}{bar_type}"));
            log::info!("Stopped bar aggregator for {bar_type}");
        }
    }

    /// Handles a time event, closing the bucket of any matching bar aggregator.
    pub fn handle_time_event(&mut self, event: &TimeEvent) {
        let name = event.name.as_str();
        let Some(bar_type_str) = name.strip_prefix(BAR_TIMER_PREFIX) else {
            return;
        };
        let Ok(bar_type) = bar_type_str.parse::<BarType>() else {
            log::error!("Invalid bar timer name '{name}'");
            return;
        };

        if let Some(aggregator) = self.bar_aggregators.get_mut(&bar_type.standard()) {
            aggregator.on_bucket_close(event.ts_event, event.ts_init);
        }
        self.drain_emissions();
    }

    /// Drains aggregator emissions: each emitted bar is cached, published,
    /// and fed to any downstream composite aggregator - base bars are always
    /// published before the aggregated bars they produce.
    fn drain_emissions(&mut self) {
        loop {
            let Some(bar) = self.aggregator_emissions.borrow_mut().pop_front() else {
                break;
            };
            self.cache.borrow_mut().add_bar(bar);
            let topic = switchboard::get_bars_topic(bar.bar_type);
            msgbus::publish(&topic, &bar);
            self.feed_composite_aggregators(&bar);
        }
    }

    fn feed_composite_aggregators(&mut self, bar: &Bar) {
        let consumers: Vec<BarType> = self
            .bar_aggregators
            .values()
            .map(|aggregator| aggregator.bar_type())
            .filter(|bt| bt.is_composite() && bt.composite() == bar.bar_type)
            .collect();

        for bar_type in consumers {
            if let Some(aggregator) = self.bar_aggregators.get_mut(&bar_type.standard()) {
                aggregator.handle_bar(*bar);
            }
        }
    }

    // -- DATA PROCESSING -------------------------------------------------------------------------

    /// Processes the given instrument definition.
    pub fn process_instrument(&mut self, instrument: InstrumentAny) {
        if let Err(e) = self.cache.borrow_mut().add_instrument(instrument.clone()) {
            log::error!("Error on cache insert: {e}");
        }

        let topic = switchboard::get_instrument_topic(instrument.id());
        msgbus::publish(&topic, &instrument);
    }

    /// Processes the given market data.
    pub fn process_data(&mut self, data: Data) {
        match data {
            Data::Delta(delta) => self.handle_delta(delta),
            Data::Deltas(deltas) => self.handle_deltas(deltas),
            Data::Depth10(depth) => self.handle_depth10(*depth),
            Data::Quote(quote) => self.handle_quote(quote),
            Data::Trade(trade) => self.handle_trade(trade),
            Data::Bar(bar) => self.handle_bar(bar),
        }
        self.drain_emissions();
    }

    fn handle_delta(&mut self, delta: OrderBookDelta) {
        let deltas = if self.config.buffer_deltas {
            let buffer = self.buffered_deltas.entry(delta.instrument_id).or_default();
            buffer.push(delta);

            if !RecordFlag::F_LAST.matches(delta.flags) {
                return; // Not the last delta for the event
            }

            // SAFETY: The buffer was just written
            let deltas = self.buffered_deltas.remove(&delta.instrument_id).unwrap();
            OrderBookDeltas::new(delta.instrument_id, deltas)
        } else {
            OrderBookDeltas::new(delta.instrument_id, vec![delta])
        };

        self.handle_deltas(deltas);
    }

    fn handle_deltas(&mut self, deltas: OrderBookDeltas) {
        let synthetic_quote = if self.config.emit_quotes_from_book {
            self.book_manager.apply_deltas(&deltas)
        } else {
            None
        };

        let topic = switchboard::get_book_deltas_topic(deltas.instrument_id);
        msgbus::publish(&topic, &deltas);

        if let Some(quote) = synthetic_quote {
            self.handle_quote(quote);
        }
    }

    fn handle_depth10(&mut self, depth: OrderBookDepth10) {
        let synthetic_quote = if self.config.emit_quotes_from_book {
            self.book_manager.apply_depth(&depth)
        } else {
            None
        };

        let topic = switchboard::get_book_depth10_topic(depth.instrument_id);
        msgbus::publish(&topic, &depth);

        if let Some(quote) = synthetic_quote {
            self.handle_quote(quote);
        }
    }

    fn handle_quote(&mut self, quote: QuoteTick) {
        self.cache.borrow_mut().add_quote(quote);

        let topic = switchboard::get_quotes_topic(quote.instrument_id);
        msgbus::publish(&topic, &quote);

        // Feed aggregators consuming quotes for this instrument
        for aggregator in self.bar_aggregators.values_mut() {
            let bar_type = aggregator.bar_type();
            if bar_type.is_composite() || bar_type.instrument_id() != quote.instrument_id {
                continue;
            }
            if matches!(
                bar_type.spec().price_type,
                PriceType::Bid | PriceType::Ask | PriceType::Mid
            ) {
                aggregator.handle_quote(quote);
            }
        }
    }

    fn handle_trade(&mut self, trade: TradeTick) {
        self.cache.borrow_mut().add_trade(trade);

        let topic = switchboard::get_trades_topic(trade.instrument_id);
        msgbus::publish(&topic, &trade);

        // Feed aggregators consuming trades for this instrument
        for aggregator in self.bar_aggregators.values_mut() {
            let bar_type = aggregator.bar_type();
            if bar_type.is_composite() || bar_type.instrument_id() != trade.instrument_id {
                continue;
            }
            if bar_type.spec().price_type == PriceType::Last {
                aggregator.handle_trade(trade);
            }
        }
    }

    fn handle_bar(&mut self, bar: Bar) {
        if let Some(buffer) = self.buffered_live_bars.get_mut(&bar.bar_type) {
            // A historical request for this bar type is in flight: the
            // historical chunk is delivered before live streamed data
            buffer.push(bar);
            return;
        }

        if self.config.validate_data_sequence {
            if let Some(last_bar) = self.cache.borrow().bar(&bar.bar_type) {
                if bar.ts_event < last_bar.ts_event {
                    log::warn!(
                        "Bar {bar} was prior to last bar `ts_event` {}",
                        last_bar.ts_event,
                    );
                    return; // Bar is out of sequence
                }
            }
        }

        self.cache.borrow_mut().add_bar(bar);

        let topic = switchboard::get_bars_topic(bar.bar_type);
        msgbus::publish(&topic, &bar);

        self.feed_composite_aggregators(&bar);
    }

    // -- RESPONSES -------------------------------------------------------------------------------

    /// Processes the given data response from a client, routing it to the
    /// awaiting requester (after any aggregation chain or partial-bar filter).
    pub fn response(&mut self, response: DataResponse) {
        let correlation_id = response.correlation_id;
        let pending = self.pending_requests.remove(&correlation_id);

        if let Some(agg) = self.pending_aggregations.remove(&correlation_id) {
            self.handle_aggregation_response(response, agg);
            self.release_buffered_bars(pending);
            return;
        }

        let DataResponse {
            correlation_id,
            client_id,
            venue,
            payload,
            ts_init,
        } = response;

        let payload = match payload {
            DataPayload::Instruments(instruments) => {
                let mut cache = self.cache.borrow_mut();
                for instrument in instruments.iter() {
                    if let Err(e) = cache.add_instrument(instrument.clone()) {
                        log::error!("Error on cache insert: {e}");
                    }
                }
                DataPayload::Instruments(instruments)
            }
            DataPayload::Bars(bars) => {
                DataPayload::Bars(Arc::new(self.filter_partial_bars(bars.as_ref())))
            }
            payload => payload,
        };

        let response = DataResponse {
            correlation_id,
            client_id,
            venue,
            payload,
            ts_init,
        };
        msgbus::respond(&correlation_id, &response);
        self.release_buffered_bars(pending);
    }

    /// Publishes live bars held back while a historical request for their
    /// bar type was in flight.
    fn release_buffered_bars(&mut self, pending: Option<PendingRequest>) {
        let Some(PendingRequest {
            request: RequestCommand::Bars(req),
            ..
        }) = pending
        else {
            return;
        };
        if let Some(buffered) = self.buffered_live_bars.remove(&req.bar_type) {
            for bar in buffered {
                self.handle_bar(bar);
            }
        }
    }

    fn handle_aggregation_response(&mut self, response: DataResponse, agg: RequestAggregatedBars) {
        let source_bars = match &response.payload {
            DataPayload::Bars(bars) => self.filter_partial_bars(bars.as_ref()),
            _ => {
                log::error!("Aggregation source request returned non-bar payload");
                Vec::new()
            }
        };

        let mut output: Vec<Bar> = if agg.include_external_data {
            source_bars.clone()
        } else {
            Vec::new()
        };

        // Walk the chain: feed each target from its source, in ts_init order
        let mut produced: HashMap<BarType, Vec<Bar>> = HashMap::new();
        for bar_type in &agg.bar_types {
            let source = bar_type.composite();
            let source_data: &[Bar] = if source.aggregation_source() == AggregationSource::External
            {
                &source_bars
            } else if let Some(bars) = produced.get(&source) {
                bars
            } else {
                log::warn!("No source data produced for {bar_type} (chain order)");
                &[]
            };

            let (price_precision, size_precision) = {
                let cache = self.cache.borrow();
                match cache.instrument(&bar_type.instrument_id()) {
                    Some(instrument) => {
                        (instrument.price_precision(), instrument.size_precision())
                    }
                    None => {
                        log::error!("No instrument for {}", bar_type.instrument_id());
                        continue;
                    }
                }
            };

            let bars = aggregate_time_bars_historical(
                source_data,
                bar_type.standard(),
                price_precision,
                size_precision,
                &self.config,
            );
            output.extend(bars.iter().copied());
            produced.insert(bar_type.standard(), bars);
        }

        // All downstream bar types are emitted in ascending ts_init order
        output.sort_by_key(|bar| bar.ts_init);

        let response = DataResponse {
            correlation_id: agg.correlation_id,
            client_id: response.client_id,
            venue: response.venue,
            payload: DataPayload::AggregatedBars(Arc::new(output)),
            ts_init: response.ts_init,
        };
        msgbus::respond(&agg.correlation_id, &response);
    }

    /// Drops bars whose event time falls inside the currently open bucket
    /// (the partial bar filter).
    fn filter_partial_bars(&self, bars: &[Bar]) -> Vec<Bar> {
        let ts_now = self.clock.borrow().timestamp_ns();
        bars.iter()
            .filter(|bar| {
                let spec = bar.bar_type.spec();
                if !spec.is_time_aggregated() {
                    return true;
                }
                let interval_ns = argo_model::data::bar::get_bar_interval_ns(&bar.bar_type);
                let open_bucket_start = argo_core::datetime::floor_to_interval_ns(
                    ts_now,
                    interval_ns.as_u64(),
                    self.config.time_bars_origin_offset(),
                );
                let in_progress = bar.ts_event > open_bucket_start;
                if in_progress {
                    log::debug!("Dropping in-progress bar {bar}");
                }
                !in_progress
            })
            .copied()
            .collect()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_common::clock::TestClock;
    use argo_model::instruments::stubs::{crypto_perpetual_btcusdt, futures_contract_6e};
    use rstest::rstest;

    use super::*;

    fn engine_with_instruments() -> DataEngine {
        let clock = Rc::new(RefCell::new(TestClock::new()));
        let cache = Rc::new(RefCell::new(Cache::default()));
        cache
            .borrow_mut()
            .add_instrument(crypto_perpetual_btcusdt())
            .unwrap();
        cache
            .borrow_mut()
            .add_instrument(futures_contract_6e())
            .unwrap();
        DataEngine::new(clock, cache, None)
    }

    #[rstest]
    fn test_internal_bar_subscription_starts_aggregator() {
        let mut engine = engine_with_instruments();
        let bar_type = BarType::from("BTCUSDT-PERP.BINANCE-100-TICK-LAST-INTERNAL");
        engine
            .execute(DataCommand::Subscribe(SubscribeCommand::Bars(
                argo_common::messages::data::SubscribeBars {
                    bar_type,
                    client_id: None,
                    command_id: UUID4::new(),
                    ts_init: UnixNanos::default(),
                },
            )));

        assert!(engine.subscribed_bars().contains(&bar_type));

        // Duplicate subscribe is a no-op sharing the aggregator
        engine.execute(DataCommand::Subscribe(SubscribeCommand::Bars(
            argo_common::messages::data::SubscribeBars {
                bar_type,
                client_id: None,
                command_id: UUID4::new(),
                ts_init: UnixNanos::default(),
            },
        )));
        assert_eq!(
            engine
                .subscribed_bars()
                .iter()
                .filter(|bt| **bt == bar_type)
                .count(),
            1
        );
    }

    #[rstest]
    fn test_trades_feed_tick_aggregator_and_publish() {
        use argo_model::{enums::AggressorSide, identifiers::TradeId, types::{Price, Quantity}};

        let mut engine = engine_with_instruments();
        let bar_type = BarType::from("BTCUSDT-PERP.BINANCE-2-TICK-LAST-INTERNAL");
        engine.execute(DataCommand::Subscribe(SubscribeCommand::Bars(
            argo_common::messages::data::SubscribeBars {
                bar_type,
                client_id: None,
                command_id: UUID4::new(),
                ts_init: UnixNanos::default(),
            },
        )));

        let instrument_id = InstrumentId::from("BTCUSDT-PERP.BINANCE");
        for i in 1..=2_u64 {
            engine.process_data(Data::Trade(TradeTick::new(
                instrument_id,
                Price::from("50000.00"),
                Quantity::from("0.100"),
                AggressorSide::Buyer,
                TradeId::new(format!("T-{i}")),
                UnixNanos::from(i),
                UnixNanos::from(i),
            )));
        }

        // Two trades close the 2-tick bar, which lands in the cache
        let bar = engine.cache.borrow().bar(&bar_type).copied();
        assert!(bar.is_some());
        assert_eq!(bar.unwrap().volume, Quantity::from("0.200"));
    }

    #[rstest]
    fn test_unsubscribe_stops_aggregator() {
        let mut engine = engine_with_instruments();
        let bar_type = BarType::from("BTCUSDT-PERP.BINANCE-100-TICK-LAST-INTERNAL");
        engine.execute(DataCommand::Subscribe(SubscribeCommand::Bars(
            argo_common::messages::data::SubscribeBars {
                bar_type,
                client_id: None,
                command_id: UUID4::new(),
                ts_init: UnixNanos::default(),
            },
        )));
        engine.execute(DataCommand::Unsubscribe(UnsubscribeCommand::Bars(
            argo_common::messages::data::UnsubscribeBars {
                bar_type,
                client_id: None,
                command_id: UUID4::new(),
                ts_init: UnixNanos::default(),
            },
        )));

        assert!(!engine.subscribed_bars().contains(&bar_type));
    }
}
