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

//! The data client backing backtests from preloaded historical data.

use std::{cell::RefCell, rc::Rc, sync::Arc};

use argo_common::{
    clock::Clock,
    messages::data::{
        DataPayload, DataResponse, RequestCommand, SubscribeCommand, UnsubscribeCommand,
    },
};
use argo_data::client::DataClient;
use argo_model::{
    data::{Bar, BarType, Data, GetTsInit, QuoteTick, TradeTick},
    identifiers::{ClientId, Venue},
};

/// A data client answering requests from preloaded historical data.
///
/// Subscriptions are satisfied by the backtest engine's data iterator (the
/// stream is already flowing); requests are answered synchronously from the
/// loaded series.
pub struct BacktestDataClient {
    client_id: ClientId,
    venue: Option<Venue>,
    clock: Rc<RefCell<dyn Clock>>,
    data: Vec<Data>,
    responses: Vec<DataResponse>,
}

impl BacktestDataClient {
    /// Creates a new [`BacktestDataClient`] instance over the given data
    /// (expected ascending by `ts_init`).
    #[must_use]
    pub fn new(
        client_id: ClientId,
        venue: Option<Venue>,
        clock: Rc<RefCell<dyn Clock>>,
        data: Vec<Data>,
    ) -> Self {
        Self {
            client_id,
            venue,
            clock,
            data,
            responses: Vec::new(),
        }
    }

    /// Drains the responses produced by processed requests.
    pub fn drain_responses(&mut self) -> Vec<DataResponse> {
        std::mem::take(&mut self.responses)
    }

    fn bars_for(&self, bar_type: BarType, limit: Option<usize>) -> Vec<Bar> {
        let mut bars: Vec<Bar> = self
            .data
            .iter()
            .filter_map(|data| match data {
                Data::Bar(bar) if bar.bar_type == bar_type => Some(*bar),
                _ => None,
            })
            .collect();
        bars.sort_by_key(GetTsInit::ts_init);
        if let Some(limit) = limit {
            let skip = bars.len().saturating_sub(limit);
            bars.drain(..skip);
        }
        bars
    }
}

impl DataClient for BacktestDataClient {
    fn client_id(&self) -> ClientId {
        self.client_id
    }

    fn venue(&self) -> Option<Venue> {
        self.venue
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn subscribe(&mut self, _cmd: &SubscribeCommand) -> anyhow::Result<()> {
        Ok(()) // The data iterator already streams everything loaded
    }

    fn unsubscribe(&mut self, _cmd: &UnsubscribeCommand) -> anyhow::Result<()> {
        Ok(())
    }

    fn request(&mut self, req: &RequestCommand) -> anyhow::Result<()> {
        let ts_now = self.clock.borrow().timestamp_ns();
        let payload = match req {
            RequestCommand::Bars(req) => DataPayload::Bars(Arc::new(
                self.bars_for(req.bar_type, req.limit)
                    .into_iter()
                    .filter(|bar| req.start.is_none_or(|start| bar.ts_init >= start))
                    .filter(|bar| req.end.is_none_or(|end| bar.ts_init <= end))
                    .collect(),
            )),
            RequestCommand::Quotes(req) => {
                let quotes: Vec<QuoteTick> = self
                    .data
                    .iter()
                    .filter_map(|data| match data {
                        Data::Quote(quote) if quote.instrument_id == req.instrument_id => {
                            Some(*quote)
                        }
                        _ => None,
                    })
                    .collect();
                DataPayload::Quotes(Arc::new(quotes))
            }
            RequestCommand::Trades(req) => {
                let trades: Vec<TradeTick> = self
                    .data
                    .iter()
                    .filter_map(|data| match data {
                        Data::Trade(trade) if trade.instrument_id == req.instrument_id => {
                            Some(*trade)
                        }
                        _ => None,
                    })
                    .collect();
                DataPayload::Trades(Arc::new(trades))
            }
            RequestCommand::Instruments(_) => DataPayload::Instruments(Arc::new(vec![])),
            RequestCommand::AggregatedBars(_) => {
                anyhow::bail!("Aggregated bars requests resolve at the data engine")
            }
        };

        self.responses.push(DataResponse {
            correlation_id: req.correlation_id(),
            client_id: Some(self.client_id),
            venue: self.venue,
            payload,
            ts_init: ts_now,
        });
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_common::clock::TestClock;
    use argo_core::{UUID4, UnixNanos};
    use argo_model::types::{Price, Quantity};
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_request_bars_filters_and_sorts() {
        let bar_type = BarType::from("6E.0.XCME-1-MINUTE-LAST-EXTERNAL");
        let bars: Vec<Data> = (1..=5_u64)
            .map(|i| {
                Data::Bar(Bar::new(
                    bar_type,
                    Price::from("1.10000"),
                    Price::from("1.10010"),
                    Price::from("1.09990"),
                    Price::from("1.10005"),
                    Quantity::from("10"),
                    UnixNanos::from(i * 60),
                    UnixNanos::from(i * 60),
                ))
            })
            .collect();

        let clock = Rc::new(RefCell::new(TestClock::new()));
        let mut client = BacktestDataClient::new(ClientId::new("XCME"), None, clock, bars);

        let req = RequestCommand::Bars(argo_common::messages::data::RequestBars {
            bar_type,
            start: Some(UnixNanos::from(120)),
            end: Some(UnixNanos::from(240)),
            limit: None,
            client_id: None,
            correlation_id: UUID4::new(),
            ts_init: UnixNanos::default(),
        });
        client.request(&req).unwrap();

        let responses = client.drain_responses();
        assert_eq!(responses.len(), 1);
        match &responses[0].payload {
            DataPayload::Bars(bars) => {
                assert_eq!(bars.len(), 3); // 120, 180, 240
            }
            other => panic!("Unexpected payload {other:?}"),
        }
    }
}
