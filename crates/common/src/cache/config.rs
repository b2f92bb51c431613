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

//! Configuration for the `Cache`.

use serde::{Deserialize, Serialize};

/// Configuration for `Cache` instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// If a durable backing database is configured.
    pub has_database: bool,
    /// The maximum length for internal tick deques (per instrument).
    pub tick_capacity: usize,
    /// The maximum length for internal bar deques (per bar type).
    pub bar_capacity: usize,
}

impl Default for CacheConfig {
    /// Creates a new default [`CacheConfig`] instance.
    fn default() -> Self {
        Self {
            has_database: false,
            tick_capacity: 10_000,
            bar_capacity: 10_000,
        }
    }
}
