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

//! Represents a valid client order ID (assigned by the Argo system).

use argo_core::correctness::{FAILED, check_predicate_false, check_valid_string};
use ustr::Ustr;

use crate::identifiers::macros::impl_identifier_traits;

/// Characters reserved as key delimiters by persistence backings.
const RESERVED_DELIMITERS: [char; 2] = [':', ';'];

/// Represents a valid client order ID (assigned by the Argo system).
///
/// Client order IDs are globally unique within a running system, and must not
/// contain delimiter characters reserved by persistence layers.
#[repr(C)]
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClientOrderId(Ustr);

impl ClientOrderId {
    /// Creates a new [`ClientOrderId`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// This function returns an error:
    /// - If `value` is not a valid string.
    /// - If `value` contains a reserved delimiter character (`:` or `;`).
    pub fn new_checked<T: AsRef<str>>(value: T) -> anyhow::Result<Self> {
        let value = value.as_ref();
        check_valid_string(value, stringify!(value))?;
        check_predicate_false(
            value.contains(RESERVED_DELIMITERS),
            &format!("invalid `ClientOrderId` '{value}': contained a reserved delimiter"),
        )?;
        Ok(Self(Ustr::from(value)))
    }

    /// Creates a new [`ClientOrderId`] instance.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not a valid string or contains a reserved delimiter.
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

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new("O-123456789")
    }
}

impl From<Ustr> for ClientOrderId {
    fn from(value: Ustr) -> Self {
        Self(value)
    }
}

impl_identifier_traits!(ClientOrderId);

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_string_reprs() {
        let id = ClientOrderId::new("O-20240210-1458-001-001-1");
        assert_eq!(id.as_str(), "O-20240210-1458-001-001-1");
        assert_eq!(format!("{id}"), "O-20240210-1458-001-001-1");
    }

    #[rstest]
    #[case("O-1:1")]
    #[case("O-1;1")]
    #[should_panic(expected = "Condition failed")]
    fn test_reserved_delimiter_rejected(#[case] value: &str) {
        let _ = ClientOrderId::new(value);
    }

    #[rstest]
    fn test_reserved_delimiter_checked() {
        assert!(ClientOrderId::new_checked("O-1:1").is_err());
        assert!(ClientOrderId::new_checked("O-11").is_ok());
    }
}
