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

//! The common components shared across the Argo platform: the message bus,
//! the cache, clocks and timers, component lifecycle, logging, command and
//! message types.

pub mod actor;
pub mod cache;
pub mod clock;
pub mod component;
pub mod enums;
pub mod generators;
pub mod logging;
pub mod messages;
pub mod msgbus;
pub mod timer;
pub mod xrate;
