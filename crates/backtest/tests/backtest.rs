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

//! End-to-end backtest scenarios against the simulated venue.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use argo_backtest::{config::BacktestEngineConfig, engine::BacktestEngine};
use argo_common::{
    actor::DataActor,
    msgbus::{
        self,
        handler::{ShareableMessageHandler, TypedMessageHandler},
        switchboard,
    },
};
use argo_core::UnixNanos;
use argo_model::{
    data::{Data, QuoteTick},
    enums::{
        AccountType, BookType, LiquiditySide, OmsType, OrderSide, OrderStatus, PositionSide,
        TimeInForce,
    },
    events::{OrderEventAny, PositionEvent},
    identifiers::{ComponentId, InstrumentId, PositionId, Venue},
    instruments::stubs::crypto_perpetual_btcusdt,
    types::{Money, Price, Quantity},
};
use argo_trading::{Strategy, StrategyConfig};

#[derive(Default)]
struct RecordingActor {
    order_events: Vec<String>,
    position_events: Vec<String>,
}

impl DataActor for RecordingActor {
    fn component_id(&self) -> ComponentId {
        ComponentId::new("RecordingActor")
    }

    fn on_order_event(&mut self, event: &OrderEventAny) {
        self.order_events.push(event.kind().to_string());
    }

    fn on_position_event(&mut self, event: &PositionEvent) {
        let kind = match event {
            PositionEvent::Opened(_) => "PositionOpened",
            PositionEvent::Changed(_) => "PositionChanged",
            PositionEvent::Closed(_) => "PositionClosed",
            PositionEvent::Adjusted(_) => "PositionAdjusted",
        };
        self.position_events.push(kind.to_string());
    }
}

fn quote(instrument_id: InstrumentId, bid: &str, ask: &str, ts: u64) -> Data {
    Data::Quote(QuoteTick::new(
        instrument_id,
        Price::from(bid),
        Price::from(ask),
        Quantity::from("1.000"),
        Quantity::from("1.000"),
        UnixNanos::from(ts),
        UnixNanos::from(ts),
    ))
}

/// Market fill on the simulated venue: seed top of book
/// `bid 50000.00 x 1.000 / ask 50000.50 x 1.000`, submit `BUY MARKET 0.500`,
/// expect submitted -> accepted -> filled at the ask as taker, with a LONG
/// position opened.
#[test]
fn test_market_fill_on_simulated_venue() {
    let instrument = crypto_perpetual_btcusdt();
    let instrument_id = instrument.id();
    let venue = Venue::new("BINANCE");

    let mut engine = BacktestEngine::new(BacktestEngineConfig::default()).unwrap();
    engine
        .add_venue(
            venue,
            AccountType::Margin,
            OmsType::Netting,
            BookType::L1_MBP,
            vec![Money::from("1_000_000.00000000 USDT")],
            None,
        )
        .unwrap();
    engine.add_instrument(instrument.clone()).unwrap();

    // Register the strategy and its recording component
    let strategy = Rc::new(RefCell::new(Strategy::new(
        engine.kernel.trader_id,
        StrategyConfig::default(),
        engine.kernel.clock.clone(),
        engine.kernel.cache.clone(),
    )));
    let actor = Rc::new(RefCell::new(RecordingActor::default()));
    engine
        .kernel
        .trader
        .add_strategy(strategy.clone(), actor.clone());

    // Submit a market order on the first quote
    let submitted = Rc::new(Cell::new(false));
    let strategy_for_quotes = strategy.clone();
    let submitted_clone = submitted.clone();
    let quote_handler = ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
        Some("test-quote-handler"),
        move |_quote: &QuoteTick| {
            if submitted_clone.get() {
                return;
            }
            submitted_clone.set(true);

            let mut strategy = strategy_for_quotes.borrow_mut();
            let ts_now = strategy.timestamp_ns();
            let order = strategy.order_factory.market(
                instrument_id,
                OrderSide::Buy,
                Quantity::from("0.500"),
                TimeInForce::Gtc,
                ts_now,
            );
            strategy.submit_order(order).unwrap();
        },
    )));
    msgbus::subscribe(
        switchboard::get_quotes_topic(instrument_id),
        quote_handler,
        None,
    );

    engine.add_data(vec![
        quote(instrument_id, "50000.00", "50000.50", 1_000),
        quote(instrument_id, "50000.00", "50000.50", 2_000),
    ]);

    engine.run();

    // The order reached terminal FILLED state at the ask
    let cache = engine.kernel.cache.borrow();
    let orders = cache.orders_closed(Some(&venue), None, None);
    assert_eq!(orders.len(), 1);
    let order = orders[0];
    assert_eq!(order.status, OrderStatus::Filled);
    assert_eq!(order.filled_qty, Quantity::from("0.500"));
    assert_eq!(order.avg_px, Some(50000.50));
    assert_eq!(order.liquidity_side, Some(LiquiditySide::Taker));

    // A LONG position opened from the fill
    let position = cache
        .position(&PositionId::new(instrument_id.to_string()))
        .unwrap();
    assert_eq!(position.side, PositionSide::Long);
    assert_eq!(position.quantity, Quantity::from("0.500"));
    assert_eq!(position.avg_px_open, 50000.50);

    // The component observed the lifecycle in FIFO order
    let actor = actor.borrow();
    assert_eq!(
        actor.order_events,
        vec!["OrderSubmitted", "OrderAccepted", "OrderFilled"]
    );
    assert_eq!(actor.position_events, vec!["PositionOpened"]);

    // The venue account updated from the fill (commission deducted)
    let account = cache.account_for_venue(&venue).unwrap();
    let balance = account
        .core()
        .balance_total(Some(argo_model::types::Currency::USDT()))
        .unwrap();
    assert!(balance < Money::from("1_000_000.00000000 USDT"));
}

/// Composite aggregation request: load 1-minute external bars, request
/// 5-minute internal bars aggregated from them, and expect OHLCV and
/// `ts_event` on the bucket close.
#[test]
fn test_request_aggregated_bars_five_minute_chain() {
    use argo_common::{
        cache::Cache,
        clock::TestClock,
        messages::data::{
            DataCommand, DataPayload, DataResponse, RequestAggregatedBars, RequestCommand,
        },
    };
    use argo_core::{UUID4, datetime::NANOSECONDS_IN_SECOND};
    use argo_data::{client::DataClientAdapter, engine::DataEngine};
    use argo_model::{
        data::{Bar, BarType},
        identifiers::ClientId,
        instruments::stubs::futures_contract_6e,
    };

    const MINUTE_NS: u64 = 60 * NANOSECONDS_IN_SECOND;

    let clock = Rc::new(RefCell::new(TestClock::new()));
    let cache = Rc::new(RefCell::new(Cache::default()));
    cache
        .borrow_mut()
        .add_instrument(futures_contract_6e())
        .unwrap();

    let source_type = BarType::from("6E.0.XCME-1-MINUTE-LAST-EXTERNAL");
    let target_type = BarType::from("6E.0.XCME-5-MINUTE-LAST-INTERNAL@1-MINUTE-EXTERNAL");

    // One trading hour of close-stamped 1-minute bars
    let source: Vec<Data> = (0..60_u64)
        .map(|i| {
            let ts = (i + 1) * MINUTE_NS;
            Data::Bar(Bar::new(
                source_type,
                Price::new(1.10000 + i as f64 * 0.0001, 5),
                Price::new(1.10100 + i as f64 * 0.0001, 5),
                Price::new(1.09900 + i as f64 * 0.0001, 5),
                Price::new(1.10050 + i as f64 * 0.0001, 5),
                Quantity::from("10"),
                UnixNanos::from(ts),
                UnixNanos::from(ts),
            ))
        })
        .collect();

    // Clock sits beyond the requested range so no bucket is in progress
    clock
        .borrow_mut()
        .set_time(UnixNanos::from(61 * MINUTE_NS));

    let mut engine = DataEngine::new(clock.clone(), cache, None);
    let client = argo_backtest::data_client::BacktestDataClient::new(
        ClientId::new("XCME"),
        None,
        clock,
        source,
    );
    // The adapter wraps a boxed client; requests resolve synchronously below
    let client = Rc::new(RefCell::new(client));

    struct SharedClient(Rc<RefCell<argo_backtest::data_client::BacktestDataClient>>);
    impl argo_data::client::DataClient for SharedClient {
        fn client_id(&self) -> ClientId {
            self.0.borrow().client_id()
        }
        fn venue(&self) -> Option<Venue> {
            self.0.borrow().venue()
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn subscribe(
            &mut self,
            cmd: &argo_common::messages::data::SubscribeCommand,
        ) -> anyhow::Result<()> {
            self.0.borrow_mut().subscribe(cmd)
        }
        fn unsubscribe(
            &mut self,
            cmd: &argo_common::messages::data::UnsubscribeCommand,
        ) -> anyhow::Result<()> {
            self.0.borrow_mut().unsubscribe(cmd)
        }
        fn request(&mut self, req: &RequestCommand) -> anyhow::Result<()> {
            self.0.borrow_mut().request(req)
        }
    }

    engine.register_default_client(DataClientAdapter::new(Box::new(SharedClient(
        client.clone(),
    ))));

    // Capture the correlated response
    let captured: Rc<RefCell<Option<DataResponse>>> = Rc::new(RefCell::new(None));
    let captured_clone = captured.clone();
    let correlation_id = UUID4::new();
    msgbus::register_response_handler(
        correlation_id,
        ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
            Some("test-agg-response"),
            move |response: &DataResponse| {
                *captured_clone.borrow_mut() = Some(response.clone());
            },
        ))),
        None,
    );

    engine.execute(DataCommand::Request(RequestCommand::AggregatedBars(
        RequestAggregatedBars {
            bar_types: vec![target_type],
            start: None,
            end: None,
            limit: None,
            include_external_data: false,
            client_id: None,
            correlation_id,
            ts_init: UnixNanos::default(),
        },
    )));

    // The backtest client answered synchronously: route its responses back
    for response in client.borrow_mut().drain_responses() {
        engine.response(response);
    }

    let captured = captured.borrow();
    let response = captured.as_ref().expect("response captured");
    let DataPayload::AggregatedBars(bars) = &response.payload else {
        panic!("unexpected payload");
    };
    let bars = bars.as_ref();

    assert_eq!(bars.len(), 12);

    // Each 5-minute bar composes its five 1-minute sources
    let first = &bars[0];
    assert_eq!(first.open, Price::new(1.10000, 5));
    assert_eq!(first.close, Price::new(1.10050 + 4.0 * 0.0001, 5));
    assert_eq!(first.high, Price::new(1.10100 + 4.0 * 0.0001, 5));
    assert_eq!(first.low, Price::new(1.09900, 5));
    assert_eq!(first.volume, Quantity::from("50"));
    assert_eq!(first.ts_event, UnixNanos::from(5 * MINUTE_NS));

    // Delivered sequence ascends by ts_init
    assert!(bars.windows(2).all(|w| w[0].ts_init <= w[1].ts_init));
}
