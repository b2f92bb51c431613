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

//! Account balance types for cash and margin accounts.

use std::fmt::{Display, Formatter};

use argo_core::correctness::FAILED;
use serde::{Deserialize, Serialize};

use crate::{
    identifiers::InstrumentId,
    types::{Currency, Money},
};

/// Represents an account balance denominated in a particular currency.
///
/// Invariant: `free = total - locked`, and `free` is never negative once the
/// account is correctly initialized.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The currency of the balance.
    pub currency: Currency,
    /// The total account balance.
    pub total: Money,
    /// The account balance locked (assigned to pending orders).
    pub locked: Money,
    /// The account balance free for trading.
    pub free: Money,
}

impl AccountBalance {
    /// Creates a new [`AccountBalance`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// This function returns an error:
    /// - If the currencies of `total`, `locked` and `free` are not equal.
    /// - If `total` does not equal `locked + free`.
    /// - If `free` is negative.
    pub fn new_checked(total: Money, locked: Money, free: Money) -> anyhow::Result<Self> {
        if total.currency != locked.currency || total.currency != free.currency {
            anyhow::bail!(
                "invalid `AccountBalance`: currency mismatch across total/locked/free components"
            );
        }
        if total.raw != locked.raw + free.raw {
            anyhow::bail!(
                "invalid `AccountBalance`: total {total} != locked {locked} + free {free}"
            );
        }
        if free.is_negative() {
            anyhow::bail!("invalid `AccountBalance`: free balance was negative {free}");
        }
        Ok(Self {
            currency: total.currency,
            total,
            locked,
            free,
        })
    }

    /// Creates a new [`AccountBalance`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    pub fn new(total: Money, locked: Money, free: Money) -> Self {
        Self::new_checked(total, locked, free).expect(FAILED)
    }

    /// Creates a new [`AccountBalance`] with the full amount free.
    #[must_use]
    pub fn from_total(total: Money) -> Self {
        Self {
            currency: total.currency,
            total,
            locked: Money::zero(total.currency),
            free: total,
        }
    }
}

impl Display for AccountBalance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(total={}, locked={}, free={})",
            stringify!(AccountBalance),
            self.total,
            self.locked,
            self.free,
        )
    }
}

/// Represents the margin balance for an instrument on a margin account.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginBalance {
    /// The initial (order) margin requirement.
    pub initial: Money,
    /// The maintenance (position) margin requirement.
    pub maintenance: Money,
    /// The instrument ID for the margin.
    pub instrument_id: InstrumentId,
}

impl MarginBalance {
    /// Creates a new [`MarginBalance`] instance.
    ///
    /// # Panics
    ///
    /// Panics if the currencies of `initial` and `maintenance` are not equal.
    #[must_use]
    pub fn new(initial: Money, maintenance: Money, instrument_id: InstrumentId) -> Self {
        assert_eq!(
            initial.currency, maintenance.currency,
            "Margin currency mismatch"
        );
        Self {
            initial,
            maintenance,
            instrument_id,
        }
    }
}

impl Display for MarginBalance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(initial={}, maintenance={}, instrument_id={})",
            stringify!(MarginBalance),
            self.initial,
            self.maintenance,
            self.instrument_id,
        )
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
    fn test_new_valid() {
        let balance = AccountBalance::new(
            Money::from("100.00 USD"),
            Money::from("20.00 USD"),
            Money::from("80.00 USD"),
        );
        assert_eq!(balance.currency, Currency::USD());
        assert_eq!(balance.free, Money::from("80.00 USD"));
    }

    #[rstest]
    fn test_new_checked_inconsistent_sum() {
        let result = AccountBalance::new_checked(
            Money::from("100.00 USD"),
            Money::from("30.00 USD"),
            Money::from("80.00 USD"),
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn test_new_checked_currency_mismatch() {
        let result = AccountBalance::new_checked(
            Money::from("100.00 USD"),
            Money::from("20.00 EUR"),
            Money::from("80.00 USD"),
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn test_from_total() {
        let balance = AccountBalance::from_total(Money::from("100.00 USD"));
        assert_eq!(balance.locked, Money::from("0.00 USD"));
        assert_eq!(balance.free, balance.total);
    }
}
