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

//! Venue-side identifier generation for the simulated exchange.

use argo_model::identifiers::{PositionId, TradeId, Venue, VenueOrderId};

/// Generates deterministic venue-side identifiers for a simulated venue.
#[derive(Debug)]
pub struct IdsGenerator {
    venue: Venue,
    order_count: usize,
    trade_count: usize,
    position_count: usize,
}

impl IdsGenerator {
    /// Creates a new [`IdsGenerator`] instance.
    #[must_use]
    pub const fn new(venue: Venue) -> Self {
        Self {
            venue,
            order_count: 0,
            trade_count: 0,
            position_count: 0,
        }
    }

    /// Resets all internal counts.
    pub const fn reset(&mut self) {
        self.order_count = 0;
        self.trade_count = 0;
        self.position_count = 0;
    }

    /// Generates the next venue order ID.
    pub fn generate_venue_order_id(&mut self) -> VenueOrderId {
        self.order_count += 1;
        VenueOrderId::new(format!("{}-{}", self.venue, self.order_count))
    }

    /// Generates the next trade ID.
    pub fn generate_trade_id(&mut self) -> TradeId {
        self.trade_count += 1;
        TradeId::new(format!("{}-{}", self.venue, self.trade_count))
    }

    /// Generates the next venue position ID.
    pub fn generate_position_id(&mut self) -> PositionId {
        self.position_count += 1;
        PositionId::new(format!("{}-{}", self.venue, self.position_count))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_deterministic_sequences() {
        let mut generator = IdsGenerator::new(Venue::new("BINANCE"));
        assert_eq!(
            generator.generate_venue_order_id(),
            VenueOrderId::new("BINANCE-1")
        );
        assert_eq!(generator.generate_trade_id(), TradeId::new("BINANCE-1"));
        assert_eq!(generator.generate_trade_id(), TradeId::new("BINANCE-2"));

        generator.reset();
        assert_eq!(generator.generate_trade_id(), TradeId::new("BINANCE-1"));
    }
}
