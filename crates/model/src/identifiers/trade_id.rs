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

//! Represents a valid trade match ID (assigned by a trading venue).

use argo_core::correctness::{FAILED, check_valid_string};
use ustr::Ustr;

use crate::identifiers::macros::impl_identifier_traits;

/// Represents a valid trade match ID (assigned by a trading venue).
///
/// Maximum length is 36 characters, covering UUID-form venue trade IDs.
/// Unique within a position.
#[repr(C)]
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TradeId(Ustr);

impl TradeId {
    /// The maximum length of a trade ID string.
    pub const MAX_LEN: usize = 36;

    /// Creates a new [`TradeId`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// This function returns an error:
    /// - If `value` is not a valid string.
    /// - If `value` exceeds [`Self::MAX_LEN`] characters.
    pub fn new_checked<T: AsRef<str>>(value: T) -> anyhow::Result<Self> {
        let value = value.as_ref();
        check_valid_string(value, stringify!(value))?;
        if value.len() > Self::MAX_LEN {
            anyhow::bail!(
                "invalid `TradeId` '{value}': exceeded maximum length of {}",
                Self::MAX_LEN
            );
        }
        Ok(Self(Ustr::from(value)))
    }

    /// Creates a new [`TradeId`] instance.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not a valid string or exceeds the maximum length.
    pub fn new<T: AsRef<str>>(value: T) -> Self {
        Self::new_checked(value).expect(FAILED)
    }

    /// Returns the inner identifier value.
    #[must_use]
    pub fn inner(&self) -> Ustr {
        self.0
    }

    /// Returns the inner identifier value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new("1")
    }
}

impl_identifier_traits!(TradeId);

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_string_reprs() {
        let trade_id = TradeId::new("1234567890");
        assert_eq!(trade_id.as_str(), "1234567890");
        assert_eq!(format!("{trade_id}"), "1234567890");
    }

    #[rstest]
    fn test_max_len() {
        let value = "a".repeat(TradeId::MAX_LEN);
        assert!(TradeId::new_checked(value).is_ok());

        let value = "a".repeat(TradeId::MAX_LEN + 1);
        assert!(TradeId::new_checked(value).is_err());
    }
}
