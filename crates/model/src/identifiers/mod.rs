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

//! Value types for identifying domain entities.
//!
//! All identifiers are thin wrappers over interned strings ([`ustr::Ustr`]) so
//! equality checks and hashing on hot paths are pointer comparisons.

pub(crate) mod macros;

pub mod client_order_id;
pub mod instrument_id;
pub mod symbol;
pub mod trade_id;
pub mod venue;

use macros::{define_identifier, impl_identifier_traits};

pub use crate::identifiers::{
    client_order_id::ClientOrderId, instrument_id::InstrumentId, symbol::Symbol, trade_id::TradeId,
    venue::Venue,
};

define_identifier!(
    /// Represents a valid account ID, in the form `{issuer}-{number}`.
    AccountId
);

define_identifier!(
    /// Represents a system client ID.
    ClientId
);

define_identifier!(
    /// Represents a valid component ID.
    ComponentId
);

define_identifier!(
    /// Represents a valid order list ID (assigned by the Argo system).
    OrderListId
);

define_identifier!(
    /// Represents a valid position ID.
    PositionId
);

define_identifier!(
    /// Represents a valid strategy ID, in the form `{name}-{tag}`.
    StrategyId
);

define_identifier!(
    /// Represents a valid trader ID, in the form `{name}-{tag}`.
    TraderId
);

define_identifier!(
    /// Represents a valid venue order ID (assigned by a trading venue).
    VenueOrderId
);

impl AccountId {
    /// Returns the issuer portion of the account ID.
    ///
    /// # Panics
    ///
    /// Panics if the account ID does not contain a hyphen separator.
    #[must_use]
    pub fn get_issuer(&self) -> Venue {
        Venue::new(
            self.as_str()
                .split_once('-')
                .expect("Invalid account ID format")
                .0,
        )
    }
}

impl StrategyId {
    /// The sentinel strategy ID for orders discovered at the venue with no
    /// claiming strategy.
    #[must_use]
    pub fn external() -> Self {
        Self::new("EXTERNAL")
    }

    /// Returns whether this is the `EXTERNAL` sentinel strategy ID.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.as_str() == "EXTERNAL"
    }

    /// Returns the numerical tag portion of the strategy ID.
    ///
    /// # Panics
    ///
    /// Panics if the strategy ID does not contain a hyphen separator.
    #[must_use]
    pub fn get_tag(&self) -> &str {
        self.as_str()
            .rsplit_once('-')
            .expect("Invalid strategy ID format")
            .1
    }
}

impl TraderId {
    /// Returns the numerical tag portion of the trader ID.
    ///
    /// # Panics
    ///
    /// Panics if the trader ID does not contain a hyphen separator.
    #[must_use]
    pub fn get_tag(&self) -> &str {
        self.as_str()
            .rsplit_once('-')
            .expect("Invalid trader ID format")
            .1
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new("SIM-001")
    }
}

impl Default for StrategyId {
    fn default() -> Self {
        Self::new("S-001")
    }
}

impl Default for TraderId {
    fn default() -> Self {
        Self::new("TRADER-001")
    }
}

impl Default for PositionId {
    fn default() -> Self {
        Self::new("P-001")
    }
}

impl Default for VenueOrderId {
    fn default() -> Self {
        Self::new("NONE")
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
    fn test_account_id_issuer() {
        let account_id = AccountId::new("BINANCE-001");
        assert_eq!(account_id.get_issuer(), Venue::new("BINANCE"));
    }

    #[rstest]
    fn test_strategy_id_tag_and_external() {
        let strategy_id = StrategyId::new("EMACross-001");
        assert_eq!(strategy_id.get_tag(), "001");
        assert!(!strategy_id.is_external());
        assert!(StrategyId::external().is_external());
    }

    #[rstest]
    fn test_trader_id_tag() {
        let trader_id = TraderId::new("TESTER-000");
        assert_eq!(trader_id.get_tag(), "000");
    }

    #[rstest]
    #[should_panic(expected = "Condition failed")]
    fn test_empty_identifier_panics() {
        let _ = PositionId::new("");
    }

    #[rstest]
    fn test_serde_round_trip() {
        let client_id = ClientId::new("BINANCE");
        let json = serde_json::to_string(&client_id).unwrap();
        assert_eq!(json, "\"BINANCE\"");
        let deserialized: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, client_id);
    }
}
