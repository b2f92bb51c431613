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

//! The backtest venue simulation for the Argo platform: the order matching
//! engine, simulated exchange, fill and fee models, and the backtest engine
//! driving a deterministic event loop from historical data.

pub mod config;
pub mod data_client;
pub mod data_iterator;
pub mod engine;
pub mod exchange;
pub mod execution_client;
pub mod ids;
pub mod matching;
pub mod models;
