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

//! Data command and response messages for the data engine.

use std::sync::Arc;

use argo_core::{UUID4, UnixNanos};
use argo_model::{
    data::{Bar, BarType, QuoteTick, TradeTick},
    enums::BookType,
    identifiers::{ClientId, InstrumentId, Venue},
    instruments::InstrumentAny,
};

/// A command for the data engine.
#[derive(Clone, Debug)]
pub enum DataCommand {
    Subscribe(SubscribeCommand),
    Unsubscribe(UnsubscribeCommand),
    Request(RequestCommand),
}

/// A subscription command for the data engine.
#[derive(Clone, Debug)]
pub enum SubscribeCommand {
    Instruments(SubscribeInstruments),
    BookDeltas(SubscribeBookDeltas),
    BookDepth10(SubscribeBookDepth10),
    Quotes(SubscribeQuotes),
    Trades(SubscribeTrades),
    Bars(SubscribeBars),
}

impl SubscribeCommand {
    /// Returns the explicit data client ID for the command, if provided.
    #[must_use]
    pub const fn client_id(&self) -> Option<&ClientId> {
        match self {
            Self::Instruments(cmd) => cmd.client_id.as_ref(),
            Self::BookDeltas(cmd) => cmd.client_id.as_ref(),
            Self::BookDepth10(cmd) => cmd.client_id.as_ref(),
            Self::Quotes(cmd) => cmd.client_id.as_ref(),
            Self::Trades(cmd) => cmd.client_id.as_ref(),
            Self::Bars(cmd) => cmd.client_id.as_ref(),
        }
    }

    /// Returns the venue for client routing, if determinable.
    #[must_use]
    pub fn venue(&self) -> Option<Venue> {
        match self {
            Self::Instruments(cmd) => cmd.venue,
            Self::BookDeltas(cmd) => Some(cmd.instrument_id.venue),
            Self::BookDepth10(cmd) => Some(cmd.instrument_id.venue),
            Self::Quotes(cmd) => Some(cmd.instrument_id.venue),
            Self::Trades(cmd) => Some(cmd.instrument_id.venue),
            Self::Bars(cmd) => Some(cmd.bar_type.instrument_id().venue),
        }
    }
}

/// A command to subscribe to instrument definition updates.
#[derive(Clone, Debug)]
pub struct SubscribeInstruments {
    pub client_id: Option<ClientId>,
    pub venue: Option<Venue>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to subscribe to order book delta updates.
#[derive(Clone, Debug)]
pub struct SubscribeBookDeltas {
    pub instrument_id: InstrumentId,
    pub book_type: BookType,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to subscribe to order book depth snapshots.
#[derive(Clone, Debug)]
pub struct SubscribeBookDepth10 {
    pub instrument_id: InstrumentId,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to subscribe to quote updates.
#[derive(Clone, Debug)]
pub struct SubscribeQuotes {
    pub instrument_id: InstrumentId,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to subscribe to trade updates.
#[derive(Clone, Debug)]
pub struct SubscribeTrades {
    pub instrument_id: InstrumentId,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to subscribe to bar updates.
#[derive(Clone, Debug)]
pub struct SubscribeBars {
    pub bar_type: BarType,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// An unsubscription command for the data engine.
#[derive(Clone, Debug)]
pub enum UnsubscribeCommand {
    Instruments(UnsubscribeInstruments),
    BookDeltas(UnsubscribeBookDeltas),
    BookDepth10(UnsubscribeBookDepth10),
    Quotes(UnsubscribeQuotes),
    Trades(UnsubscribeTrades),
    Bars(UnsubscribeBars),
}

impl UnsubscribeCommand {
    /// Returns the explicit data client ID for the command, if provided.
    #[must_use]
    pub const fn client_id(&self) -> Option<&ClientId> {
        match self {
            Self::Instruments(cmd) => cmd.client_id.as_ref(),
            Self::BookDeltas(cmd) => cmd.client_id.as_ref(),
            Self::BookDepth10(cmd) => cmd.client_id.as_ref(),
            Self::Quotes(cmd) => cmd.client_id.as_ref(),
            Self::Trades(cmd) => cmd.client_id.as_ref(),
            Self::Bars(cmd) => cmd.client_id.as_ref(),
        }
    }

    /// Returns the venue for client routing, if determinable.
    #[must_use]
    pub fn venue(&self) -> Option<Venue> {
        match self {
            Self::Instruments(cmd) => cmd.venue,
            Self::BookDeltas(cmd) => Some(cmd.instrument_id.venue),
            Self::BookDepth10(cmd) => Some(cmd.instrument_id.venue),
            Self::Quotes(cmd) => Some(cmd.instrument_id.venue),
            Self::Trades(cmd) => Some(cmd.instrument_id.venue),
            Self::Bars(cmd) => Some(cmd.bar_type.instrument_id().venue),
        }
    }
}

/// A command to unsubscribe from instrument definition updates.
#[derive(Clone, Debug)]
pub struct UnsubscribeInstruments {
    pub client_id: Option<ClientId>,
    pub venue: Option<Venue>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to unsubscribe from order book delta updates.
#[derive(Clone, Debug)]
pub struct UnsubscribeBookDeltas {
    pub instrument_id: InstrumentId,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to unsubscribe from order book depth snapshots.
#[derive(Clone, Debug)]
pub struct UnsubscribeBookDepth10 {
    pub instrument_id: InstrumentId,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to unsubscribe from quote updates.
#[derive(Clone, Debug)]
pub struct UnsubscribeQuotes {
    pub instrument_id: InstrumentId,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to unsubscribe from trade updates.
#[derive(Clone, Debug)]
pub struct UnsubscribeTrades {
    pub instrument_id: InstrumentId,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A command to unsubscribe from bar updates.
#[derive(Clone, Debug)]
pub struct UnsubscribeBars {
    pub bar_type: BarType,
    pub client_id: Option<ClientId>,
    pub command_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A data request for the data engine, answered via a correlated response.
#[derive(Clone, Debug)]
pub enum RequestCommand {
    Instruments(RequestInstruments),
    Quotes(RequestQuotes),
    Trades(RequestTrades),
    Bars(RequestBars),
    AggregatedBars(RequestAggregatedBars),
}

impl RequestCommand {
    /// Returns the correlation ID for the request.
    #[must_use]
    pub const fn correlation_id(&self) -> UUID4 {
        match self {
            Self::Instruments(cmd) => cmd.correlation_id,
            Self::Quotes(cmd) => cmd.correlation_id,
            Self::Trades(cmd) => cmd.correlation_id,
            Self::Bars(cmd) => cmd.correlation_id,
            Self::AggregatedBars(cmd) => cmd.correlation_id,
        }
    }

    /// Returns the explicit data client ID for the command, if provided.
    #[must_use]
    pub const fn client_id(&self) -> Option<&ClientId> {
        match self {
            Self::Instruments(cmd) => cmd.client_id.as_ref(),
            Self::Quotes(cmd) => cmd.client_id.as_ref(),
            Self::Trades(cmd) => cmd.client_id.as_ref(),
            Self::Bars(cmd) => cmd.client_id.as_ref(),
            Self::AggregatedBars(cmd) => cmd.client_id.as_ref(),
        }
    }

    /// Returns the venue for client routing, if determinable.
    #[must_use]
    pub fn venue(&self) -> Option<Venue> {
        match self {
            Self::Instruments(cmd) => cmd.venue,
            Self::Quotes(cmd) => Some(cmd.instrument_id.venue),
            Self::Trades(cmd) => Some(cmd.instrument_id.venue),
            Self::Bars(cmd) => Some(cmd.bar_type.instrument_id().venue),
            Self::AggregatedBars(cmd) => cmd
                .bar_types
                .first()
                .map(|bar_type| bar_type.instrument_id().venue),
        }
    }
}

/// A request for instrument definitions.
#[derive(Clone, Debug)]
pub struct RequestInstruments {
    pub venue: Option<Venue>,
    pub client_id: Option<ClientId>,
    pub correlation_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A request for historical quotes.
#[derive(Clone, Debug)]
pub struct RequestQuotes {
    pub instrument_id: InstrumentId,
    pub start: Option<UnixNanos>,
    pub end: Option<UnixNanos>,
    pub limit: Option<usize>,
    pub client_id: Option<ClientId>,
    pub correlation_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A request for historical trades.
#[derive(Clone, Debug)]
pub struct RequestTrades {
    pub instrument_id: InstrumentId,
    pub start: Option<UnixNanos>,
    pub end: Option<UnixNanos>,
    pub limit: Option<usize>,
    pub client_id: Option<ClientId>,
    pub correlation_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A request for historical bars.
#[derive(Clone, Debug)]
pub struct RequestBars {
    pub bar_type: BarType,
    pub start: Option<UnixNanos>,
    pub end: Option<UnixNanos>,
    pub limit: Option<usize>,
    pub client_id: Option<ClientId>,
    pub correlation_id: UUID4,
    pub ts_init: UnixNanos,
}

/// A request for bars aggregated through a composite chain.
///
/// External source bars are fetched, internal aggregators feed up the chain,
/// and all downstream bar types are emitted in ascending `ts_init` order.
#[derive(Clone, Debug)]
pub struct RequestAggregatedBars {
    pub bar_types: Vec<BarType>,
    pub start: Option<UnixNanos>,
    pub end: Option<UnixNanos>,
    pub limit: Option<usize>,
    /// If the external source bars should be included in the response.
    pub include_external_data: bool,
    pub client_id: Option<ClientId>,
    pub correlation_id: UUID4,
    pub ts_init: UnixNanos,
}

/// The typed payload of a data response.
#[derive(Clone, Debug)]
pub enum DataPayload {
    Instruments(Arc<Vec<InstrumentAny>>),
    Quotes(Arc<Vec<QuoteTick>>),
    Trades(Arc<Vec<TradeTick>>),
    Bars(Arc<Vec<Bar>>),
    /// Aggregated bars keyed by bar type, plus pass-through source data.
    AggregatedBars(Arc<Vec<Bar>>),
}

/// A response to a data request, correlated by ID.
///
/// An empty payload is a valid response.
#[derive(Clone, Debug)]
pub struct DataResponse {
    /// The correlation ID matching the originating request.
    pub correlation_id: UUID4,
    /// The client ID which produced the response.
    pub client_id: Option<ClientId>,
    /// The venue for the response data.
    pub venue: Option<Venue>,
    /// The typed response payload.
    pub payload: DataPayload,
    /// UNIX timestamp (nanoseconds) when the response was initialized.
    pub ts_init: UnixNanos,
}
