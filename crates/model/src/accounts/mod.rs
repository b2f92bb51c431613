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

//! Account types for tracking balances and margin state.

pub mod cash;
pub mod margin;

use std::collections::HashMap;

pub use cash::CashAccount;
pub use margin::MarginAccount;
use serde::{Deserialize, Serialize};

use crate::{
    enums::AccountType,
    events::AccountState,
    identifiers::AccountId,
    types::{AccountBalance, Currency, Money},
};

/// The state fields and behavior common to all account types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountCore {
    /// The account ID (with the venue as issuer).
    pub id: AccountId,
    /// The account type.
    pub account_type: AccountType,
    /// The base currency for the account (`None` for multi-currency accounts).
    pub base_currency: Option<Currency>,
    /// The current balances per currency.
    pub balances: HashMap<Currency, AccountBalance>,
    /// If the account state is calculated by the Argo system (vs reported by the venue).
    pub calculate_account_state: bool,
    events: Vec<AccountState>,
}

impl AccountCore {
    /// Creates a new [`AccountCore`] instance from the initial account state event.
    #[must_use]
    pub fn new(event: AccountState, calculate_account_state: bool) -> Self {
        let mut core = Self {
            id: event.account_id,
            account_type: event.account_type,
            base_currency: event.base_currency,
            balances: HashMap::new(),
            calculate_account_state,
            events: Vec::new(),
        };
        core.apply(event);
        core
    }

    /// Applies the given account state event, replacing the carried balances.
    pub fn apply(&mut self, event: AccountState) {
        debug_assert_eq!(self.id, event.account_id);
        for balance in &event.balances {
            self.balances.insert(balance.currency, *balance);
        }
        self.events.push(event);
    }

    /// Returns all account state events applied to the account.
    #[must_use]
    pub fn events(&self) -> &[AccountState] {
        &self.events
    }

    /// Returns the count of account state events applied.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns the last account state event applied.
    ///
    /// # Panics
    ///
    /// Panics if the account has no events (invariant violation).
    #[must_use]
    pub fn last_event(&self) -> &AccountState {
        self.events.last().expect("Account had no events")
    }

    /// Returns the balance for the given currency (or the base currency).
    #[must_use]
    pub fn balance(&self, currency: Option<Currency>) -> Option<&AccountBalance> {
        let currency = currency.or(self.base_currency)?;
        self.balances.get(&currency)
    }

    /// Returns the total balance for the given currency.
    #[must_use]
    pub fn balance_total(&self, currency: Option<Currency>) -> Option<Money> {
        self.balance(currency).map(|b| b.total)
    }

    /// Returns the free balance for the given currency.
    #[must_use]
    pub fn balance_free(&self, currency: Option<Currency>) -> Option<Money> {
        self.balance(currency).map(|b| b.free)
    }

    /// Returns the locked balance for the given currency.
    #[must_use]
    pub fn balance_locked(&self, currency: Option<Currency>) -> Option<Money> {
        self.balance(currency).map(|b| b.locked)
    }

    /// Updates a single currency balance.
    pub fn update_balance(&mut self, balance: AccountBalance) {
        self.balances.insert(balance.currency, balance);
    }
}

/// A sum type covering all account types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AccountAny {
    Cash(CashAccount),
    Margin(MarginAccount),
}

impl AccountAny {
    /// Creates the appropriate account from the initial account state event.
    #[must_use]
    pub fn from_event(event: AccountState, calculate_account_state: bool) -> Self {
        match event.account_type {
            AccountType::Margin => {
                Self::Margin(MarginAccount::new(event, calculate_account_state))
            }
            _ => Self::Cash(CashAccount::new(event, calculate_account_state)),
        }
    }

    /// Returns the account ID.
    #[must_use]
    pub fn id(&self) -> AccountId {
        match self {
            Self::Cash(account) => account.core.id,
            Self::Margin(account) => account.core.id,
        }
    }

    /// Returns the account type.
    #[must_use]
    pub fn account_type(&self) -> AccountType {
        match self {
            Self::Cash(account) => account.core.account_type,
            Self::Margin(account) => account.core.account_type,
        }
    }

    /// Returns the base currency for the account, if single-currency.
    #[must_use]
    pub fn base_currency(&self) -> Option<Currency> {
        match self {
            Self::Cash(account) => account.core.base_currency,
            Self::Margin(account) => account.core.base_currency,
        }
    }

    /// Returns a reference to the common account core.
    #[must_use]
    pub const fn core(&self) -> &AccountCore {
        match self {
            Self::Cash(account) => &account.core,
            Self::Margin(account) => &account.core,
        }
    }

    /// Returns a mutable reference to the common account core.
    pub const fn core_mut(&mut self) -> &mut AccountCore {
        match self {
            Self::Cash(account) => &mut account.core,
            Self::Margin(account) => &mut account.core,
        }
    }

    /// Applies the given account state event.
    pub fn apply(&mut self, event: AccountState) {
        self.core_mut().apply(event);
    }

    /// Returns the last account state event applied.
    #[must_use]
    pub fn last_event(&self) -> &AccountState {
        self.core().last_event()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_core::{UUID4, UnixNanos};
    use rstest::rstest;

    use super::*;

    fn account_state(total: &str) -> AccountState {
        AccountState::new(
            AccountId::new("SIM-001"),
            AccountType::Cash,
            Some(Currency::USD()),
            vec![AccountBalance::from_total(Money::from(total))],
            vec![],
            true,
            UUID4::new(),
            UnixNanos::default(),
            UnixNanos::default(),
        )
    }

    #[rstest]
    fn test_from_event_cash() {
        let account = AccountAny::from_event(account_state("100000.00 USD"), true);
        assert_eq!(account.account_type(), AccountType::Cash);
        assert_eq!(
            account.core().balance_free(None),
            Some(Money::from("100000.00 USD"))
        );
    }

    #[rstest]
    fn test_apply_replaces_balances() {
        let mut account = AccountAny::from_event(account_state("100000.00 USD"), true);
        account.apply(account_state("90000.00 USD"));

        assert_eq!(
            account.core().balance_total(Some(Currency::USD())),
            Some(Money::from("90000.00 USD"))
        );
        assert_eq!(account.core().event_count(), 2);
    }
}
