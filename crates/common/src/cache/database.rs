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

//! The `CacheDatabaseAdapter` trait for optional durable cache backing.

use std::collections::HashMap;

use argo_model::{
    accounts::AccountAny,
    identifiers::{AccountId, ClientOrderId, InstrumentId, PositionId},
    instruments::InstrumentAny,
    orders::Order,
    position::Position,
};
use bytes::Bytes;

/// A loaded snapshot of all durable cache records.
#[derive(Default)]
pub struct CacheMap {
    /// The loaded instruments.
    pub instruments: HashMap<InstrumentId, InstrumentAny>,
    /// The loaded accounts.
    pub accounts: HashMap<AccountId, AccountAny>,
    /// The loaded orders.
    pub orders: HashMap<ClientOrderId, Order>,
    /// The loaded positions.
    pub positions: HashMap<PositionId, Position>,
}

/// An adapter to a durable backing store for the cache.
///
/// Writes must be atomic per record. Records that cannot be encoded must fail
/// loudly (an error is returned and surfaced) and are never silently dropped.
pub trait CacheDatabaseAdapter {
    /// Closes the adapter, releasing any held resources.
    ///
    /// # Errors
    ///
    /// Returns an error if closing fails.
    fn close(&mut self) -> anyhow::Result<()>;

    /// Flushes all pending writes to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&mut self) -> anyhow::Result<()>;

    /// Loads all general (raw bytes) records.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails.
    fn load(&self) -> anyhow::Result<HashMap<String, Bytes>>;

    /// Loads all typed records on startup.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or decoding fails.
    fn load_all(&self) -> anyhow::Result<CacheMap>;

    /// Writes a general (raw bytes) record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn add(&mut self, key: String, value: Bytes) -> anyhow::Result<()>;

    /// Writes the given instrument.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    fn add_instrument(&mut self, instrument: &InstrumentAny) -> anyhow::Result<()>;

    /// Writes the given account.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    fn add_account(&mut self, account: &AccountAny) -> anyhow::Result<()>;

    /// Writes the given order (the full event list is the persistence unit).
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    fn add_order(&mut self, order: &Order) -> anyhow::Result<()>;

    /// Writes the given position.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    fn add_position(&mut self, position: &Position) -> anyhow::Result<()>;

    /// Updates the given account record.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    fn update_account(&mut self, account: &AccountAny) -> anyhow::Result<()>;

    /// Updates the given order record.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    fn update_order(&mut self, order: &Order) -> anyhow::Result<()>;

    /// Updates the given position record.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    fn update_position(&mut self, position: &Position) -> anyhow::Result<()>;

    /// Deletes the order record with the given ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete_order(&mut self, client_order_id: &ClientOrderId) -> anyhow::Result<()>;

    /// Deletes the position record with the given ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete_position(&mut self, position_id: &PositionId) -> anyhow::Result<()>;
}
