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

//! Configuration for the `BacktestEngine`.

use argo_common::enums::Environment;
use argo_model::identifiers::TraderId;
use argo_system::KernelConfig;
use serde::{Deserialize, Serialize};

use crate::matching::OrderMatchingEngineConfig;

/// Configuration for `BacktestEngine` instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BacktestEngineConfig {
    /// The kernel configuration (forced to the backtest environment).
    pub kernel: KernelConfig,
    /// The matching engine configuration applied to added venues.
    pub matching: OrderMatchingEngineConfig,
}

impl BacktestEngineConfig {
    /// Creates a new [`BacktestEngineConfig`] instance for the given trader.
    #[must_use]
    pub fn new(trader_id: TraderId) -> Self {
        Self {
            kernel: KernelConfig::new(trader_id, Environment::Backtest),
            matching: OrderMatchingEngineConfig::default(),
        }
    }
}

impl Default for BacktestEngineConfig {
    /// Creates a new default [`BacktestEngineConfig`] instance.
    fn default() -> Self {
        Self::new(TraderId::default())
    }
}
