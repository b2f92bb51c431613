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

//! Configuration for the `ArgoKernel`.

use argo_common::{cache::CacheConfig, enums::Environment, logging::LoggerConfig};
use argo_data::engine::config::DataEngineConfig;
use argo_execution::engine::ExecEngineConfig;
use argo_model::identifiers::TraderId;
use argo_portfolio::portfolio::PortfolioConfig;
use argo_risk::RiskEngineConfig;
use serde::{Deserialize, Serialize};

/// The single configuration object assembling an `ArgoKernel`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelConfig {
    /// The trader ID for the system.
    pub trader_id: TraderId,
    /// The environment context (backtest, sandbox or live).
    pub environment: Environment,
    /// The logging configuration.
    pub logging: LoggerConfig,
    /// The cache configuration.
    pub cache: CacheConfig,
    /// The data engine configuration.
    pub data_engine: DataEngineConfig,
    /// The execution engine configuration.
    pub exec_engine: ExecEngineConfig,
    /// The risk engine configuration.
    pub risk_engine: RiskEngineConfig,
    /// The portfolio configuration.
    pub portfolio: PortfolioConfig,
}

impl KernelConfig {
    /// Creates a new [`KernelConfig`] with defaults for the given environment.
    #[must_use]
    pub fn new(trader_id: TraderId, environment: Environment) -> Self {
        Self {
            trader_id,
            environment,
            logging: LoggerConfig::default(),
            cache: CacheConfig::default(),
            data_engine: DataEngineConfig::default(),
            exec_engine: ExecEngineConfig::default(),
            risk_engine: RiskEngineConfig::default(),
            portfolio: PortfolioConfig::default(),
        }
    }
}

impl Default for KernelConfig {
    /// Creates a new default [`KernelConfig`] instance (backtest environment).
    fn default() -> Self {
        Self::new(TraderId::default(), Environment::Backtest)
    }
}
