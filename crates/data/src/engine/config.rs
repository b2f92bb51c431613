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

//! Configuration for the `DataEngine`.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Configuration for `DataEngine` instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataEngineConfig {
    /// If synthetic top-of-book quotes should be emitted from book updates.
    pub emit_quotes_from_book: bool,
    /// If time bars are stamped at the bucket close (otherwise the open).
    pub bars_timestamp_on_close: bool,
    /// If time bars are built for buckets with no updates (carrying the previous close).
    pub bars_build_with_no_updates: bool,
    /// The time bar grid origin offset from start-of-day UTC, in seconds.
    pub time_bars_origin_offset_secs: i64,
    /// If incoming bars are validated against the cached sequence.
    pub validate_data_sequence: bool,
    /// If order book deltas are buffered until the `F_LAST` flag.
    pub buffer_deltas: bool,
    /// The deadline for data requests, after which they complete empty with a warning.
    pub request_timeout_secs: u64,
}

impl DataEngineConfig {
    /// Returns the time bar grid origin offset as a `TimeDelta`.
    #[must_use]
    pub fn time_bars_origin_offset(&self) -> TimeDelta {
        TimeDelta::seconds(self.time_bars_origin_offset_secs)
    }
}

impl Default for DataEngineConfig {
    /// Creates a new default [`DataEngineConfig`] instance.
    fn default() -> Self {
        Self {
            emit_quotes_from_book: false,
            bars_timestamp_on_close: true,
            bars_build_with_no_updates: true,
            time_bars_origin_offset_secs: 0,
            validate_data_sequence: false,
            buffer_deltas: false,
            request_timeout_secs: 5,
        }
    }
}
