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

//! Configuration for the `ExecutionEngine`.

use serde::{Deserialize, Serialize};

/// Configuration for `ExecutionEngine` instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecEngineConfig {
    /// The interval (seconds) between periodic reconciliation runs (`None` disables).
    pub reconciliation_interval_secs: Option<u64>,
    /// If spot CASH fills should generate position reporting (explicit opt-in).
    pub generate_spot_positions: bool,
    /// If additional debug logging is emitted.
    pub debug: bool,
}

impl Default for ExecEngineConfig {
    /// Creates a new default [`ExecEngineConfig`] instance.
    fn default() -> Self {
        Self {
            reconciliation_interval_secs: Some(60),
            generate_spot_positions: false,
            debug: false,
        }
    }
}
