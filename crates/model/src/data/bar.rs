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

//! Bar aggregate structures, data types and functionality.

use std::{
    fmt::{Debug, Display},
    hash::Hash,
    num::NonZeroUsize,
    str::FromStr,
};

use argo_core::{
    UnixNanos,
    correctness::{FAILED, check_predicate_true},
    datetime::NANOSECONDS_IN_MILLISECOND,
};
use chrono::{Duration, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::GetTsInit;
use crate::{
    enums::{AggregationSource, BarAggregation, PriceType},
    identifiers::InstrumentId,
    types::{Price, Quantity},
};

/// Represents a bar aggregation specification including a step, aggregation
/// method/rule and price type.
#[repr(C)]
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct BarSpecification {
    /// The step for binning samples for bar aggregation.
    pub step: NonZeroUsize,
    /// The type of bar aggregation.
    pub aggregation: BarAggregation,
    /// The price type to use for aggregation.
    pub price_type: PriceType,
}

impl BarSpecification {
    /// Creates a new [`BarSpecification`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// Returns an error if `step` is not positive (> 0).
    pub fn new_checked(
        step: usize,
        aggregation: BarAggregation,
        price_type: PriceType,
    ) -> anyhow::Result<Self> {
        let step = NonZeroUsize::new(step)
            .ok_or_else(|| anyhow::anyhow!("Invalid step: {step} (must be non-zero)"))?;
        Ok(Self {
            step,
            aggregation,
            price_type,
        })
    }

    /// Creates a new [`BarSpecification`] instance.
    ///
    /// # Panics
    ///
    /// Panics if `step` is not positive (> 0).
    #[must_use]
    pub fn new(step: usize, aggregation: BarAggregation, price_type: PriceType) -> Self {
        Self::new_checked(step, aggregation, price_type).expect(FAILED)
    }

    /// Returns the bar interval as a `TimeDelta`.
    ///
    /// # Panics
    ///
    /// Panics if the aggregation method is not time based.
    #[must_use]
    pub fn timedelta(&self) -> TimeDelta {
        let step = self.step.get() as i64;
        match self.aggregation {
            BarAggregation::Millisecond => Duration::milliseconds(step),
            BarAggregation::Second => Duration::seconds(step),
            BarAggregation::Minute => Duration::minutes(step),
            BarAggregation::Hour => Duration::hours(step),
            BarAggregation::Day => Duration::days(step),
            BarAggregation::Week => Duration::days(7 * step),
            _ => panic!(
                "Timedelta not supported for aggregation type: {:?}",
                self.aggregation
            ),
        }
    }

    /// Returns whether the aggregation method is time-driven.
    #[must_use]
    pub const fn is_time_aggregated(&self) -> bool {
        self.aggregation.is_time_aggregated()
    }
}

impl Display for BarSpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.step, self.aggregation, self.price_type)
    }
}

/// Returns the bar interval as `UnixNanos`.
///
/// # Panics
///
/// Panics if the aggregation method of the given `bar_type` is not time based.
#[must_use]
pub fn get_bar_interval_ns(bar_type: &BarType) -> UnixNanos {
    let spec = bar_type.spec();
    let interval_ns = match spec.aggregation {
        BarAggregation::Millisecond => spec.step.get() as u64 * NANOSECONDS_IN_MILLISECOND,
        _ => spec
            .timedelta()
            .num_nanoseconds()
            .expect("Invalid bar interval") as u64,
    };
    UnixNanos::from(interval_ns)
}

/// Represents a bar type including the instrument ID, bar specification and
/// aggregation source.
///
/// A composite bar type points at the source bar type its updates are
/// aggregated from (syntax `"TARGET@SOURCE"`).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BarType {
    Standard {
        /// The bar type's instrument ID.
        instrument_id: InstrumentId,
        /// The bar type's specification.
        spec: BarSpecification,
        /// The bar type's aggregation source.
        aggregation_source: AggregationSource,
    },
    Composite {
        /// The bar type's instrument ID.
        instrument_id: InstrumentId,
        /// The bar type's specification.
        spec: BarSpecification,
        /// The bar type's aggregation source.
        aggregation_source: AggregationSource,

        /// The composite step for binning samples for bar aggregation.
        composite_step: usize,
        /// The composite type of bar aggregation.
        composite_aggregation: BarAggregation,
        /// The composite bar type's aggregation source.
        composite_aggregation_source: AggregationSource,
    },
}

impl BarType {
    /// Creates a new standard [`BarType`] instance.
    #[must_use]
    pub fn new(
        instrument_id: InstrumentId,
        spec: BarSpecification,
        aggregation_source: AggregationSource,
    ) -> Self {
        Self::Standard {
            instrument_id,
            spec,
            aggregation_source,
        }
    }

    /// Creates a new composite [`BarType`] instance.
    #[must_use]
    pub fn new_composite(
        instrument_id: InstrumentId,
        spec: BarSpecification,
        aggregation_source: AggregationSource,

        composite_step: usize,
        composite_aggregation: BarAggregation,
        composite_aggregation_source: AggregationSource,
    ) -> Self {
        Self::Composite {
            instrument_id,
            spec,
            aggregation_source,

            composite_step,
            composite_aggregation,
            composite_aggregation_source,
        }
    }

    /// Returns whether this instance is a standard bar type.
    #[must_use]
    pub const fn is_standard(&self) -> bool {
        matches!(self, Self::Standard { .. })
    }

    /// Returns whether this instance is a composite bar type.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite { .. })
    }

    /// Returns the standard bar type component.
    #[must_use]
    pub fn standard(&self) -> Self {
        match self {
            &b @ Self::Standard { .. } => b,
            Self::Composite {
                instrument_id,
                spec,
                aggregation_source,
                ..
            } => Self::new(*instrument_id, *spec, *aggregation_source),
        }
    }

    /// Returns any composite bar type component (the source of the chain).
    #[must_use]
    pub fn composite(&self) -> Self {
        match self {
            &b @ Self::Standard { .. } => b, // Caller should check `is_composite` first
            Self::Composite {
                instrument_id,
                spec,
                aggregation_source: _,

                composite_step,
                composite_aggregation,
                composite_aggregation_source,
            } => Self::new(
                *instrument_id,
                BarSpecification::new(*composite_step, *composite_aggregation, spec.price_type),
                *composite_aggregation_source,
            ),
        }
    }

    /// Returns the [`InstrumentId`] for this bar type.
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        match self {
            Self::Standard { instrument_id, .. } | Self::Composite { instrument_id, .. } => {
                *instrument_id
            }
        }
    }

    /// Returns the [`BarSpecification`] for this bar type.
    #[must_use]
    pub fn spec(&self) -> BarSpecification {
        match self {
            Self::Standard { spec, .. } | Self::Composite { spec, .. } => *spec,
        }
    }

    /// Returns the [`AggregationSource`] for this bar type.
    #[must_use]
    pub fn aggregation_source(&self) -> AggregationSource {
        match self {
            Self::Standard {
                aggregation_source, ..
            }
            | Self::Composite {
                aggregation_source, ..
            } => *aggregation_source,
        }
    }
}

/// An error when parsing a [`BarType`] from a string.
#[derive(thiserror::Error, Debug)]
#[error("Error parsing `BarType` from '{input}', invalid token: '{token}' at position {position}")]
pub struct BarTypeParseError {
    input: String,
    token: String,
    position: usize,
}

impl FromStr for BarType {
    type Err = BarTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (standard, composite_str) = match s.split_once('@') {
            Some((standard, composite)) => (standard, Some(composite)),
            None => (s, None),
        };

        let pieces: Vec<&str> = standard.rsplitn(5, '-').collect();
        let rev_pieces: Vec<&str> = pieces.into_iter().rev().collect();
        if rev_pieces.len() != 5 {
            return Err(BarTypeParseError {
                input: s.to_string(),
                token: String::new(),
                position: 0,
            });
        }

        let instrument_id =
            InstrumentId::from_str(rev_pieces[0]).map_err(|_| BarTypeParseError {
                input: s.to_string(),
                token: rev_pieces[0].to_string(),
                position: 0,
            })?;
        let step = rev_pieces[1].parse().map_err(|_| BarTypeParseError {
            input: s.to_string(),
            token: rev_pieces[1].to_string(),
            position: 1,
        })?;
        let aggregation =
            BarAggregation::from_str(rev_pieces[2]).map_err(|_| BarTypeParseError {
                input: s.to_string(),
                token: rev_pieces[2].to_string(),
                position: 2,
            })?;
        let price_type = PriceType::from_str(rev_pieces[3]).map_err(|_| BarTypeParseError {
            input: s.to_string(),
            token: rev_pieces[3].to_string(),
            position: 3,
        })?;
        let aggregation_source =
            AggregationSource::from_str(rev_pieces[4]).map_err(|_| BarTypeParseError {
                input: s.to_string(),
                token: rev_pieces[4].to_string(),
                position: 4,
            })?;

        if let Some(composite_str) = composite_str {
            let composite_pieces: Vec<&str> = composite_str.rsplitn(3, '-').collect();
            let rev_composite_pieces: Vec<&str> = composite_pieces.into_iter().rev().collect();
            if rev_composite_pieces.len() != 3 {
                return Err(BarTypeParseError {
                    input: s.to_string(),
                    token: String::new(),
                    position: 5,
                });
            }

            let composite_step =
                rev_composite_pieces[0]
                    .parse()
                    .map_err(|_| BarTypeParseError {
                        input: s.to_string(),
                        token: rev_composite_pieces[0].to_string(),
                        position: 5,
                    })?;
            let composite_aggregation = BarAggregation::from_str(rev_composite_pieces[1])
                .map_err(|_| BarTypeParseError {
                    input: s.to_string(),
                    token: rev_composite_pieces[1].to_string(),
                    position: 6,
                })?;
            let composite_aggregation_source = AggregationSource::from_str(rev_composite_pieces[2])
                .map_err(|_| BarTypeParseError {
                    input: s.to_string(),
                    token: rev_composite_pieces[2].to_string(),
                    position: 7,
                })?;

            Ok(Self::new_composite(
                instrument_id,
                BarSpecification::new(step, aggregation, price_type),
                aggregation_source,
                composite_step,
                composite_aggregation,
                composite_aggregation_source,
            ))
        } else {
            Ok(Self::Standard {
                instrument_id,
                spec: BarSpecification::new(step, aggregation, price_type),
                aggregation_source,
            })
        }
    }
}

impl From<&str> for BarType {
    /// Creates a [`BarType`] from a string.
    ///
    /// # Panics
    ///
    /// Panics if the `value` string is not a valid bar type.
    fn from(value: &str) -> Self {
        Self::from_str(value).expect(FAILED)
    }
}

impl Display for BarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard {
                instrument_id,
                spec,
                aggregation_source,
            } => {
                write!(f, "{instrument_id}-{spec}-{aggregation_source}")
            }
            Self::Composite {
                instrument_id,
                spec,
                aggregation_source,

                composite_step,
                composite_aggregation,
                composite_aggregation_source,
            } => {
                write!(
                    f,
                    "{instrument_id}-{spec}-{aggregation_source}@{composite_step}-{composite_aggregation}-{composite_aggregation_source}",
                )
            }
        }
    }
}

impl Serialize for BarType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BarType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Represents an aggregated bar.
#[repr(C)]
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Bar {
    /// The bar type for this bar.
    pub bar_type: BarType,
    /// The bars open price.
    pub open: Price,
    /// The bars high price.
    pub high: Price,
    /// The bars low price.
    pub low: Price,
    /// The bars close price.
    pub close: Price,
    /// The bars volume.
    pub volume: Quantity,
    /// UNIX timestamp (nanoseconds) when the data event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the struct was initialized.
    pub ts_init: UnixNanos,
}

impl Bar {
    /// Creates a new [`Bar`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// This function returns an error:
    /// - If `high` is not >= `low`.
    /// - If `high` is not >= `close`.
    /// - If `low` is not <= `close`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_checked(
        bar_type: BarType,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> anyhow::Result<Self> {
        check_predicate_true(high >= low, "high >= low")?;
        check_predicate_true(high >= close, "high >= close")?;
        check_predicate_true(low <= close, "low <= close")?;

        Ok(Self {
            bar_type,
            open,
            high,
            low,
            close,
            volume,
            ts_event,
            ts_init,
        })
    }

    /// Creates a new [`Bar`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bar_type: BarType,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self::new_checked(bar_type, open, high, low, close, volume, ts_event, ts_init)
            .expect(FAILED)
    }

    /// Returns the instrument ID for the bar.
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        self.bar_type.instrument_id()
    }
}

impl Display for Bar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.bar_type, self.open, self.high, self.low, self.close, self.volume, self.ts_event
        )
    }
}

impl GetTsInit for Bar {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn bar_type_standard() -> BarType {
        BarType::new(
            InstrumentId::from("BTCUSDT-PERP.BINANCE"),
            BarSpecification::new(1, BarAggregation::Minute, PriceType::Last),
            AggregationSource::External,
        )
    }

    #[rstest]
    fn test_bar_spec_display() {
        let spec = BarSpecification::new(5, BarAggregation::Minute, PriceType::Last);
        assert_eq!(spec.to_string(), "5-MINUTE-LAST");
    }

    #[rstest]
    fn test_bar_spec_zero_step() {
        assert!(BarSpecification::new_checked(0, BarAggregation::Minute, PriceType::Last).is_err());
    }

    #[rstest]
    fn test_bar_type_standard_round_trip() {
        let input = "BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL";
        let bar_type = BarType::from(input);
        assert!(bar_type.is_standard());
        assert_eq!(bar_type.to_string(), input);
        assert_eq!(BarType::from_str(&bar_type.to_string()).unwrap(), bar_type);
    }

    #[rstest]
    fn test_bar_type_composite_round_trip() {
        let input = "6E.0.XCME-5-MINUTE-LAST-INTERNAL@1-MINUTE-EXTERNAL";
        let bar_type = BarType::from(input);
        assert!(bar_type.is_composite());
        assert_eq!(bar_type.to_string(), input);

        let standard = bar_type.standard();
        assert_eq!(
            standard.to_string(),
            "6E.0.XCME-5-MINUTE-LAST-INTERNAL".to_string()
        );
        let composite = bar_type.composite();
        assert_eq!(
            composite.to_string(),
            "6E.0.XCME-1-MINUTE-LAST-EXTERNAL".to_string()
        );
    }

    #[rstest]
    #[case("BTCUSDT-PERP.BINANCE-1-LIGHTYEAR-LAST-EXTERNAL")] // unknown unit
    #[case("BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-ELSEWHERE")] // unknown source
    #[case("BTCUSDT-PERP.BINANCE-1-MINUTE")] // too few tokens
    fn test_bar_type_parse_strict(#[case] input: &str) {
        assert!(BarType::from_str(input).is_err());
    }

    #[rstest]
    fn test_internal_external_distinct() {
        let internal = BarType::from("BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-INTERNAL");
        let external = BarType::from("BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL");
        assert_ne!(internal, external);
    }

    #[rstest]
    fn test_get_bar_interval_ns() {
        let bar_type = BarType::from("BTCUSDT-PERP.BINANCE-1-MINUTE-LAST-EXTERNAL");
        assert_eq!(get_bar_interval_ns(&bar_type).as_u64(), 60_000_000_000);

        let bar_type = BarType::from("BTCUSDT-PERP.BINANCE-100-MILLISECOND-LAST-EXTERNAL");
        assert_eq!(get_bar_interval_ns(&bar_type).as_u64(), 100_000_000);
    }

    #[rstest]
    fn test_bar_new_checked_ohlc_validation() {
        let bar_type = bar_type_standard();
        let result = Bar::new_checked(
            bar_type,
            Price::from("100.00"),
            Price::from("90.00"), // high < low
            Price::from("95.00"),
            Price::from("92.00"),
            Quantity::from("10"),
            UnixNanos::from(1),
            UnixNanos::from(2),
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn test_bar_serde_round_trip() {
        let bar = Bar::new(
            bar_type_standard(),
            Price::from("100.00"),
            Price::from("105.00"),
            Price::from("95.00"),
            Price::from("102.00"),
            Quantity::from("10"),
            UnixNanos::from(1),
            UnixNanos::from(2),
        );
        let json = serde_json::to_string(&bar).unwrap();
        let deserialized: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, bar);
    }
}
