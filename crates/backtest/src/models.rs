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

//! Fill and fee models for the simulated venue.

use argo_core::correctness::{FAILED, check_in_range_inclusive_f64};
use argo_model::{
    enums::LiquiditySide,
    instruments::{Instrument, InstrumentAny},
    types::{Money, Price, Quantity},
};
use rust_decimal::prelude::ToPrimitive;

/// A probabilistic model for simulated fill dynamics.
#[derive(Clone, Debug)]
pub struct FillModel {
    /// The probability of a limit order filling when its price is matched
    /// but not traded through (queue position uncertainty).
    pub prob_fill_on_limit: f64,
    /// The probability of a stop order triggering with one-tick slippage.
    pub prob_slippage: f64,
    /// The random seed for deterministic runs.
    pub random_seed: Option<u64>,
}

impl FillModel {
    /// Creates a new [`FillModel`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// Returns an error if any probability is outside [0, 1].
    pub fn new_checked(
        prob_fill_on_limit: f64,
        prob_slippage: f64,
        random_seed: Option<u64>,
    ) -> anyhow::Result<Self> {
        check_in_range_inclusive_f64(prob_fill_on_limit, 0.0, 1.0, "prob_fill_on_limit")?;
        check_in_range_inclusive_f64(prob_slippage, 0.0, 1.0, "prob_slippage")?;
        Ok(Self {
            prob_fill_on_limit,
            prob_slippage,
            random_seed,
        })
    }

    /// Creates a new [`FillModel`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[must_use]
    pub fn new(prob_fill_on_limit: f64, prob_slippage: f64, random_seed: Option<u64>) -> Self {
        Self::new_checked(prob_fill_on_limit, prob_slippage, random_seed).expect(FAILED)
    }
}

impl Default for FillModel {
    /// Creates a new default [`FillModel`] instance with no probabilistic
    /// behavior (deterministic replay).
    fn default() -> Self {
        Self::new(1.0, 0.0, None)
    }
}

/// Computes commissions from filled notional using the instrument's
/// maker/taker fee rates.
#[derive(Clone, Debug, Default)]
pub struct FeeModel;

impl FeeModel {
    /// Returns the commission for the given fill parameters.
    ///
    /// Liquidity side determines the applied rate: resting orders pay the
    /// maker fee, crossing orders pay the taker fee.
    #[must_use]
    pub fn commission(
        &self,
        instrument: &InstrumentAny,
        last_qty: Quantity,
        last_px: Price,
        liquidity_side: LiquiditySide,
    ) -> Money {
        let notional = instrument.calculate_notional_value(last_qty, last_px);
        let rate = match liquidity_side {
            LiquiditySide::Maker => instrument.maker_fee(),
            _ => instrument.taker_fee(),
        };
        Money::new(
            notional.as_f64() * rate.to_f64().unwrap_or(0.0),
            notional.currency,
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_model::{instruments::stubs::crypto_perpetual_btcusdt, types::Currency};
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_fill_model_validation() {
        assert!(FillModel::new_checked(1.5, 0.0, None).is_err());
        assert!(FillModel::new_checked(0.5, -0.1, None).is_err());
        assert!(FillModel::new_checked(0.5, 0.1, Some(42)).is_ok());
    }

    #[rstest]
    fn test_taker_commission() {
        let instrument = crypto_perpetual_btcusdt();
        let fee_model = FeeModel;
        // notional = 0.5 * 50000 = 25000; taker 4bps => 10.0
        let commission = fee_model.commission(
            &instrument,
            Quantity::from("0.500"),
            Price::from("50000.00"),
            LiquiditySide::Taker,
        );
        assert_eq!(commission, Money::new(10.0, Currency::USDT()));
    }

    #[rstest]
    fn test_maker_commission_lower() {
        let instrument = crypto_perpetual_btcusdt();
        let fee_model = FeeModel;
        let maker = fee_model.commission(
            &instrument,
            Quantity::from("0.500"),
            Price::from("50000.00"),
            LiquiditySide::Maker,
        );
        // maker 2bps => 5.0
        assert_eq!(maker, Money::new(5.0, Currency::USDT()));
    }
}
