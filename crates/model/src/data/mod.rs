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

//! Market data types for the trading domain model.

pub mod bar;
pub mod delta;
pub mod depth;
pub mod quote;
pub mod trade;

use argo_core::UnixNanos;
use serde::{Deserialize, Serialize};

pub use bar::{Bar, BarSpecification, BarType};
pub use delta::{BookOrder, OrderBookDelta, OrderBookDeltas};
pub use depth::{DEPTH10_LEN, OrderBookDepth10};
pub use quote::QuoteTick;
pub use trade::TradeTick;

use crate::identifiers::InstrumentId;

/// A built-in Argo market data type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Data {
    Delta(OrderBookDelta),
    Deltas(OrderBookDeltas),
    Depth10(Box<OrderBookDepth10>), // This variant is significantly larger
    Quote(QuoteTick),
    Trade(TradeTick),
    Bar(Bar),
}

impl Data {
    /// Returns the instrument ID for the data.
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        match self {
            Self::Delta(delta) => delta.instrument_id,
            Self::Deltas(deltas) => deltas.instrument_id,
            Self::Depth10(depth) => depth.instrument_id,
            Self::Quote(quote) => quote.instrument_id,
            Self::Trade(trade) => trade.instrument_id,
            Self::Bar(bar) => bar.bar_type.instrument_id(),
        }
    }
}

/// A trait for retrieving the system initialization timestamp, used for ordering.
pub trait GetTsInit {
    /// Returns the UNIX timestamp (nanoseconds) when the instance was initialized.
    fn ts_init(&self) -> UnixNanos;
}

impl GetTsInit for Data {
    fn ts_init(&self) -> UnixNanos {
        match self {
            Self::Delta(delta) => delta.ts_init,
            Self::Deltas(deltas) => deltas.ts_init,
            Self::Depth10(depth) => depth.ts_init,
            Self::Quote(quote) => quote.ts_init,
            Self::Trade(trade) => trade.ts_init,
            Self::Bar(bar) => bar.ts_init,
        }
    }
}

/// Returns whether the given data slice is monotonically ascending by `ts_init`.
#[must_use]
pub fn is_monotonically_increasing_by_init<T: GetTsInit>(data: &[T]) -> bool {
    data.windows(2).all(|w| w[0].ts_init() <= w[1].ts_init())
}

macro_rules! impl_from_data {
    ($variant:ident, $type:ty) => {
        impl From<$type> for Data {
            fn from(value: $type) -> Self {
                Self::$variant(value)
            }
        }
    };
}

impl_from_data!(Delta, OrderBookDelta);
impl_from_data!(Deltas, OrderBookDeltas);
impl_from_data!(Quote, QuoteTick);
impl_from_data!(Trade, TradeTick);
impl_from_data!(Bar, Bar);

impl From<OrderBookDepth10> for Data {
    fn from(value: OrderBookDepth10) -> Self {
        Self::Depth10(Box::new(value))
    }
}
