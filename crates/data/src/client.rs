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

//! The `DataClient` trait and subscription-tracking adapter.

use std::collections::HashSet;

use argo_common::messages::data::{RequestCommand, SubscribeCommand, UnsubscribeCommand};
use argo_model::{
    data::BarType,
    identifiers::{ClientId, InstrumentId, Venue},
};

/// A client providing market data from a single source (venue adapter or
/// catalog reader).
///
/// Clients emit data via the bus using the standard topics, and answer
/// requests via correlated responses. Clients own their connection/session
/// resources, including reconnection on transient errors.
pub trait DataClient {
    /// Returns the client ID.
    fn client_id(&self) -> ClientId;
    /// Returns the venue the client provides data for, if single-venue.
    fn venue(&self) -> Option<Venue>;
    /// Returns whether the client is connected.
    fn is_connected(&self) -> bool;
    /// Starts the client.
    fn start(&mut self) {}
    /// Stops the client.
    fn stop(&mut self) {}
    /// Resets the client to an initial state.
    fn reset(&mut self) {}
    /// Disposes the client, releasing resources.
    fn dispose(&mut self) {}

    /// Establishes the upstream subscription for the given command.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription fails.
    fn subscribe(&mut self, cmd: &SubscribeCommand) -> anyhow::Result<()>;

    /// Tears down the upstream subscription for the given command.
    ///
    /// # Errors
    ///
    /// Returns an error if the unsubscription fails.
    fn unsubscribe(&mut self, cmd: &UnsubscribeCommand) -> anyhow::Result<()>;

    /// Processes the given data request, answering via a correlated response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be processed.
    fn request(&mut self, req: &RequestCommand) -> anyhow::Result<()>;
}

/// Wraps a [`DataClient`], tracking its active subscriptions so duplicate
/// subscribes are no-ops sharing the upstream subscription, and the final
/// unsubscribe tears the upstream down.
pub struct DataClientAdapter {
    /// The wrapped data client.
    pub client: Box<dyn DataClient>,
    /// The client ID (cached from the client).
    pub client_id: ClientId,
    /// The venue (cached from the client).
    pub venue: Option<Venue>,
    /// The active instrument definition subscriptions (by venue).
    pub subscriptions_instruments: HashSet<Venue>,
    /// The active book delta subscriptions.
    pub subscriptions_book_deltas: HashSet<InstrumentId>,
    /// The active book depth subscriptions.
    pub subscriptions_book_depth10: HashSet<InstrumentId>,
    /// The active quote subscriptions.
    pub subscriptions_quotes: HashSet<InstrumentId>,
    /// The active trade subscriptions.
    pub subscriptions_trades: HashSet<InstrumentId>,
    /// The active bar subscriptions.
    pub subscriptions_bars: HashSet<BarType>,
}

impl DataClientAdapter {
    /// Creates a new [`DataClientAdapter`] instance.
    #[must_use]
    pub fn new(client: Box<dyn DataClient>) -> Self {
        let client_id = client.client_id();
        let venue = client.venue();
        Self {
            client,
            client_id,
            venue,
            subscriptions_instruments: HashSet::new(),
            subscriptions_book_deltas: HashSet::new(),
            subscriptions_book_depth10: HashSet::new(),
            subscriptions_quotes: HashSet::new(),
            subscriptions_trades: HashSet::new(),
            subscriptions_bars: HashSet::new(),
        }
    }

    /// Executes the given subscribe command, forwarding to the client only on
    /// the first subscription for the key (idempotent).
    pub fn execute_subscribe(&mut self, cmd: &SubscribeCommand) {
        let is_new = match cmd {
            SubscribeCommand::Instruments(cmd) => {
                let venue = cmd.venue.or(self.venue).unwrap_or_default();
                self.subscriptions_instruments.insert(venue)
            }
            SubscribeCommand::BookDeltas(cmd) => {
                self.subscriptions_book_deltas.insert(cmd.instrument_id)
            }
            SubscribeCommand::BookDepth10(cmd) => {
                self.subscriptions_book_depth10.insert(cmd.instrument_id)
            }
            SubscribeCommand::Quotes(cmd) => self.subscriptions_quotes.insert(cmd.instrument_id),
            SubscribeCommand::Trades(cmd) => self.subscriptions_trades.insert(cmd.instrument_id),
            SubscribeCommand::Bars(cmd) => self.subscriptions_bars.insert(cmd.bar_type),
        };

        if !is_new {
            log::debug!("Already subscribed, sharing upstream subscription: {cmd:?}");
            return;
        }

        if let Err(e) = self.client.subscribe(cmd) {
            log::error!("Error on subscribe: {e}");
        }
    }

    /// Executes the given unsubscribe command, tearing down the upstream
    /// client subscription when the last subscriber is removed.
    pub fn execute_unsubscribe(&mut self, cmd: &UnsubscribeCommand) {
        let was_subscribed = match cmd {
            UnsubscribeCommand::Instruments(cmd) => {
                let venue = cmd.venue.or(self.venue).unwrap_or_default();
                self.subscriptions_instruments.remove(&venue)
            }
            UnsubscribeCommand::BookDeltas(cmd) => {
                self.subscriptions_book_deltas.remove(&cmd.instrument_id)
            }
            UnsubscribeCommand::BookDepth10(cmd) => {
                self.subscriptions_book_depth10.remove(&cmd.instrument_id)
            }
            UnsubscribeCommand::Quotes(cmd) => {
                self.subscriptions_quotes.remove(&cmd.instrument_id)
            }
            UnsubscribeCommand::Trades(cmd) => {
                self.subscriptions_trades.remove(&cmd.instrument_id)
            }
            UnsubscribeCommand::Bars(cmd) => self.subscriptions_bars.remove(&cmd.bar_type),
        };

        if !was_subscribed {
            log::debug!("Not subscribed, nothing to tear down: {cmd:?}");
            return;
        }

        if let Err(e) = self.client.unsubscribe(cmd) {
            log::error!("Error on unsubscribe: {e}");
        }
    }

    /// Forwards the given request to the client.
    pub fn execute_request(&mut self, req: &RequestCommand) {
        if let Err(e) = self.client.request(req) {
            log::error!("Error on request: {e}");
        }
    }
}
