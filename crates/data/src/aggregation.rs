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

//! Bar aggregation machinery.
//!
//! Aggregators are stateful objects consuming source ticks/bars and emitting
//! derived bars on bucket close. Time bars group updates onto an
//! origin-anchored time grid; threshold bars emit when their step threshold
//! is crossed, splitting oversized updates across buckets.

use argo_core::{
    UnixNanos,
    correctness::{self, FAILED},
    datetime::floor_to_interval_ns,
};
use argo_model::{
    data::{
        Bar, BarType, QuoteTick, TradeTick,
        bar::get_bar_interval_ns,
    },
    enums::AggregationSource,
    types::{Price, Quantity, fixed::FIXED_SCALAR, quantity::QuantityRaw},
};
use chrono::TimeDelta;

use crate::engine::config::DataEngineConfig;

/// The handler type receiving emitted bars.
pub type BarHandler = Box<dyn FnMut(Bar)>;

/// A stateful object consuming source ticks/bars and emitting derived bars.
pub trait BarAggregator {
    /// The [`BarType`] to be aggregated.
    fn bar_type(&self) -> BarType;
    /// Updates the aggregator with the given price and size.
    fn update(&mut self, price: Price, size: Quantity, ts_event: UnixNanos);
    /// Updates the aggregator with the given source bar.
    fn update_bar(&mut self, bar: Bar, volume: Quantity, ts_init: UnixNanos);
    /// Handles a time event closing the current bucket (time aggregation only).
    fn on_bucket_close(&mut self, ts_event: UnixNanos, ts_init: UnixNanos) {
        let _ = (ts_event, ts_init);
    }

    /// Updates the aggregator with the given quote.
    fn handle_quote(&mut self, quote: QuoteTick) {
        let spec = self.bar_type().spec();
        self.update(
            quote.extract_price(spec.price_type),
            quote.extract_size(spec.price_type),
            quote.ts_event,
        );
    }

    /// Updates the aggregator with the given trade.
    fn handle_trade(&mut self, trade: TradeTick) {
        self.update(trade.price, trade.size, trade.ts_event);
    }

    /// Updates the aggregator with the given bar.
    fn handle_bar(&mut self, bar: Bar) {
        self.update_bar(bar, bar.volume, bar.ts_init);
    }
}

/// Provides a generic bar builder for aggregation.
pub struct BarBuilder {
    bar_type: BarType,
    price_precision: u8,
    size_precision: u8,
    initialized: bool,
    ts_last: UnixNanos,
    count: usize,
    last_close: Option<Price>,
    open: Option<Price>,
    high: Option<Price>,
    low: Option<Price>,
    close: Option<Price>,
    volume: Quantity,
}

impl BarBuilder {
    /// Creates a new [`BarBuilder`] instance.
    ///
    /// # Panics
    ///
    /// Panics if `bar_type.aggregation_source` is not `INTERNAL`.
    #[must_use]
    pub fn new(bar_type: BarType, price_precision: u8, size_precision: u8) -> Self {
        correctness::check_equal(
            bar_type.aggregation_source(),
            AggregationSource::Internal,
            "bar_type.aggregation_source",
            "AggregationSource::Internal",
        )
        .expect(FAILED);

        Self {
            bar_type,
            price_precision,
            size_precision,
            initialized: false,
            ts_last: UnixNanos::default(),
            count: 0,
            last_close: None,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: Quantity::zero(size_precision),
        }
    }

    /// Returns whether the builder has received any update for the open bucket.
    #[must_use]
    pub const fn initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the count of updates in the open bucket.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns whether a previous close exists to carry through empty buckets.
    #[must_use]
    pub const fn has_last_close(&self) -> bool {
        self.last_close.is_some()
    }

    /// Updates the bar builder with the given price and size.
    pub fn update(&mut self, price: Price, size: Quantity, ts_event: UnixNanos) {
        if ts_event < self.ts_last {
            return; // Not applicable
        }

        if self.open.is_none() {
            self.open = Some(price);
            self.high = Some(price);
            self.low = Some(price);
            self.initialized = true;
        } else {
            if price > self.high.unwrap() {
                self.high = Some(price);
            }
            if price < self.low.unwrap() {
                self.low = Some(price);
            }
        }

        self.close = Some(price);
        self.volume = self.volume + size;
        self.count += 1;
        self.ts_last = ts_event;
    }

    /// Updates the bar builder with the given source bar.
    pub fn update_bar(&mut self, bar: Bar, volume: Quantity, ts_init: UnixNanos) {
        if ts_init < self.ts_last {
            return; // Not applicable
        }

        if self.open.is_none() {
            self.open = Some(bar.open);
            self.high = Some(bar.high);
            self.low = Some(bar.low);
            self.initialized = true;
        } else {
            if bar.high > self.high.unwrap() {
                self.high = Some(bar.high);
            }
            if bar.low < self.low.unwrap() {
                self.low = Some(bar.low);
            }
        }

        self.close = Some(bar.close);
        self.volume = self.volume + volume;
        self.count += 1;
        self.ts_last = ts_init;
    }

    /// Resets all stateful fields to their initial value.
    pub fn reset(&mut self) {
        self.open = None;
        self.high = None;
        self.low = None;
        self.close = None;
        self.volume = Quantity::zero(self.size_precision);
        self.count = 0;
    }

    /// Returns the aggregated bar at the last update time, and resets.
    pub fn build_now(&mut self) -> Bar {
        self.build(self.ts_last, self.ts_last)
    }

    /// Returns the aggregated bar with the given closing timestamps, and resets.
    ///
    /// An empty bucket carries the previous close through OHLC.
    pub fn build(&mut self, ts_event: UnixNanos, ts_init: UnixNanos) -> Bar {
        if self.open.is_none() {
            self.open = self.last_close;
            self.high = self.last_close;
            self.low = self.last_close;
            self.close = self.last_close;
        }

        if let (Some(close), Some(low)) = (self.close, self.low) {
            if close < low {
                self.low = Some(close);
            }
        }
        if let (Some(close), Some(high)) = (self.close, self.high) {
            if close > high {
                self.high = Some(close);
            }
        }

        // SAFETY: The open was checked, so all prices are Some
        let bar = Bar::new(
            self.bar_type,
            self.open.unwrap(),
            self.high.unwrap(),
            self.low.unwrap(),
            self.close.unwrap(),
            self.volume,
            ts_event,
            ts_init,
        );

        self.last_close = self.close;
        self.reset();
        bar
    }
}

/// The common core for bar aggregators.
pub struct BarAggregatorCore {
    bar_type: BarType,
    builder: BarBuilder,
    handler: BarHandler,
}

impl BarAggregatorCore {
    /// Creates a new [`BarAggregatorCore`] instance.
    #[must_use]
    pub fn new(
        bar_type: BarType,
        price_precision: u8,
        size_precision: u8,
        handler: BarHandler,
    ) -> Self {
        Self {
            bar_type,
            builder: BarBuilder::new(bar_type.standard(), price_precision, size_precision),
            handler,
        }
    }

    fn apply_update(&mut self, price: Price, size: Quantity, ts_event: UnixNanos) {
        self.builder.update(price, size, ts_event);
    }

    fn build_now_and_send(&mut self) {
        let bar = self.builder.build_now();
        (self.handler)(bar);
    }

    fn build_and_send(&mut self, ts_event: UnixNanos, ts_init: UnixNanos) {
        let bar = self.builder.build(ts_event, ts_init);
        (self.handler)(bar);
    }
}

/// Builds bars aggregated by tick count.
///
/// When the received tick count reaches the step threshold of the bar
/// specification, a bar is created and sent to the handler.
pub struct TickBarAggregator {
    core: BarAggregatorCore,
}

impl TickBarAggregator {
    /// Creates a new [`TickBarAggregator`] instance.
    #[must_use]
    pub fn new(
        bar_type: BarType,
        price_precision: u8,
        size_precision: u8,
        handler: BarHandler,
    ) -> Self {
        Self {
            core: BarAggregatorCore::new(bar_type, price_precision, size_precision, handler),
        }
    }
}

impl BarAggregator for TickBarAggregator {
    fn bar_type(&self) -> BarType {
        self.core.bar_type
    }

    fn update(&mut self, price: Price, size: Quantity, ts_event: UnixNanos) {
        self.core.apply_update(price, size, ts_event);
        let spec = self.core.bar_type.spec();

        if self.core.builder.count >= spec.step.get() {
            self.core.build_now_and_send();
        }
    }

    fn update_bar(&mut self, bar: Bar, volume: Quantity, ts_init: UnixNanos) {
        self.core.builder.update_bar(bar, volume, ts_init);
        let spec = self.core.bar_type.spec();

        if self.core.builder.count >= spec.step.get() {
            self.core.build_now_and_send();
        }
    }
}

/// Builds bars aggregated by traded volume.
///
/// Oversized updates spill over: the bucket closes at exactly the step
/// volume and the remainder feeds the next bucket.
pub struct VolumeBarAggregator {
    core: BarAggregatorCore,
}

impl VolumeBarAggregator {
    /// Creates a new [`VolumeBarAggregator`] instance.
    #[must_use]
    pub fn new(
        bar_type: BarType,
        price_precision: u8,
        size_precision: u8,
        handler: BarHandler,
    ) -> Self {
        Self {
            core: BarAggregatorCore::new(bar_type, price_precision, size_precision, handler),
        }
    }
}

impl BarAggregator for VolumeBarAggregator {
    fn bar_type(&self) -> BarType {
        self.core.bar_type
    }

    fn update(&mut self, price: Price, size: Quantity, ts_event: UnixNanos) {
        let mut raw_size_update = size.raw;
        let spec = self.core.bar_type.spec();
        let raw_step = (spec.step.get() as f64 * FIXED_SCALAR) as QuantityRaw;

        while raw_size_update > 0 {
            if self.core.builder.volume.raw + raw_size_update < raw_step {
                self.core.apply_update(
                    price,
                    Quantity::from_raw(raw_size_update, size.precision),
                    ts_event,
                );
                break;
            }

            let raw_size_diff = raw_step - self.core.builder.volume.raw;
            self.core.apply_update(
                price,
                Quantity::from_raw(raw_size_diff, size.precision),
                ts_event,
            );

            self.core.build_now_and_send();
            raw_size_update -= raw_size_diff;
        }
    }

    fn update_bar(&mut self, bar: Bar, volume: Quantity, ts_init: UnixNanos) {
        let mut raw_volume_update = volume.raw;
        let spec = self.core.bar_type.spec();
        let raw_step = (spec.step.get() as f64 * FIXED_SCALAR) as QuantityRaw;

        while raw_volume_update > 0 {
            if self.core.builder.volume.raw + raw_volume_update < raw_step {
                self.core.builder.update_bar(
                    bar,
                    Quantity::from_raw(raw_volume_update, volume.precision),
                    ts_init,
                );
                break;
            }

            let raw_volume_diff = raw_step - self.core.builder.volume.raw;
            self.core.builder.update_bar(
                bar,
                Quantity::from_raw(raw_volume_diff, volume.precision),
                ts_init,
            );

            self.core.build_now_and_send();
            raw_volume_update -= raw_volume_diff;
        }
    }
}

/// Builds bars aggregated by traded notional value.
///
/// When the cumulative value reaches the step threshold of the bar
/// specification, a bar is created and sent to the handler.
pub struct ValueBarAggregator {
    core: BarAggregatorCore,
    cum_value: f64,
}

impl ValueBarAggregator {
    /// Creates a new [`ValueBarAggregator`] instance.
    #[must_use]
    pub fn new(
        bar_type: BarType,
        price_precision: u8,
        size_precision: u8,
        handler: BarHandler,
    ) -> Self {
        Self {
            core: BarAggregatorCore::new(bar_type, price_precision, size_precision, handler),
            cum_value: 0.0,
        }
    }

    /// Returns the cumulative value for the open bucket.
    #[must_use]
    pub const fn get_cumulative_value(&self) -> f64 {
        self.cum_value
    }
}

impl BarAggregator for ValueBarAggregator {
    fn bar_type(&self) -> BarType {
        self.core.bar_type
    }

    fn update(&mut self, price: Price, size: Quantity, ts_event: UnixNanos) {
        let mut size_update = size.as_f64();
        let spec = self.core.bar_type.spec();

        while size_update > 0.0 {
            let value_update = price.as_f64() * size_update;
            if self.cum_value + value_update < spec.step.get() as f64 {
                self.cum_value += value_update;
                self.core
                    .apply_update(price, Quantity::new(size_update, size.precision), ts_event);
                break;
            }

            let value_diff = spec.step.get() as f64 - self.cum_value;
            let size_diff = size_update * (value_diff / value_update);
            self.core
                .apply_update(price, Quantity::new(size_diff, size.precision), ts_event);

            self.core.build_now_and_send();
            self.cum_value = 0.0;
            size_update -= size_diff;
        }
    }

    fn update_bar(&mut self, bar: Bar, volume: Quantity, ts_init: UnixNanos) {
        let mut volume_update = volume;
        let average_price = Price::new(
            (bar.high.as_f64() + bar.low.as_f64() + bar.close.as_f64()) / 3.0,
            self.core.builder.price_precision,
        );

        while volume_update.as_f64() > 0.0 {
            let value_update = average_price.as_f64() * volume_update.as_f64();
            if self.cum_value + value_update < self.core.bar_type.spec().step.get() as f64 {
                self.cum_value += value_update;
                self.core.builder.update_bar(bar, volume_update, ts_init);
                break;
            }

            let value_diff = self.core.bar_type.spec().step.get() as f64 - self.cum_value;
            let volume_diff = volume_update.as_f64() * (value_diff / value_update);
            self.core.builder.update_bar(
                bar,
                Quantity::new(volume_diff, volume_update.precision),
                ts_init,
            );

            self.core.build_now_and_send();
            self.cum_value = 0.0;
            volume_update = Quantity::new(
                volume_update.as_f64() - volume_diff,
                volume_update.precision,
            );
        }
    }
}

/// Builds bars aggregated by time buckets on an origin-anchored grid.
///
/// `bucket = floor((ts - origin_offset) / interval)` where `origin_offset`
/// defaults to start-of-day UTC. A bar is created and sent to the handler on
/// each bucket close (driven by a clock timer, or historically by update
/// timestamps crossing the bucket boundary).
pub struct TimeBarAggregator {
    core: BarAggregatorCore,
    interval_ns: UnixNanos,
    origin_offset: TimeDelta,
    timestamp_on_close: bool,
    build_with_no_updates: bool,
    current_bucket_start: Option<UnixNanos>,
}

impl TimeBarAggregator {
    /// Creates a new [`TimeBarAggregator`] instance.
    ///
    /// # Panics
    ///
    /// Panics if the aggregation method of `bar_type` is not time based.
    #[must_use]
    pub fn new(
        bar_type: BarType,
        price_precision: u8,
        size_precision: u8,
        handler: BarHandler,
        config: &DataEngineConfig,
    ) -> Self {
        assert!(
            bar_type.spec().is_time_aggregated(),
            "Aggregation not time based"
        );
        Self {
            core: BarAggregatorCore::new(bar_type, price_precision, size_precision, handler),
            interval_ns: get_bar_interval_ns(&bar_type),
            origin_offset: config.time_bars_origin_offset(),
            timestamp_on_close: config.bars_timestamp_on_close,
            build_with_no_updates: config.bars_build_with_no_updates,
            current_bucket_start: None,
        }
    }

    /// Returns the bucket interval in nanoseconds.
    #[must_use]
    pub const fn interval_ns(&self) -> UnixNanos {
        self.interval_ns
    }

    /// Returns the start of the bucket containing the given timestamp.
    #[must_use]
    pub fn bucket_start(&self, ts: UnixNanos) -> UnixNanos {
        floor_to_interval_ns(ts, self.interval_ns.as_u64(), self.origin_offset)
    }

    fn close_bucket(&mut self, bucket_start: UnixNanos, ts_init: UnixNanos) {
        if self.core.builder.count() == 0
            && (!self.build_with_no_updates || !self.core.builder.has_last_close())
        {
            return; // No updates and nothing to carry through
        }

        let bucket_close = bucket_start + self.interval_ns.as_u64();
        let ts_event = if self.timestamp_on_close {
            bucket_close
        } else {
            bucket_start
        };
        self.core.build_and_send(ts_event, ts_init.max(bucket_close));
    }

    fn roll_bucket(&mut self, ts: UnixNanos) {
        let bucket_start = self.bucket_start(ts);
        match self.current_bucket_start {
            None => self.current_bucket_start = Some(bucket_start),
            Some(current) if bucket_start > current => {
                // Close every elapsed bucket up to the new one
                let mut cursor = current;
                while cursor < bucket_start {
                    self.close_bucket(cursor, cursor + self.interval_ns.as_u64());
                    cursor += self.interval_ns.as_u64();
                    if !self.build_with_no_updates && self.core.builder.count() == 0 {
                        // Remaining elapsed buckets are empty, skip ahead
                        cursor = bucket_start;
                    }
                }
                self.current_bucket_start = Some(bucket_start);
            }
            Some(_) => {}
        }
    }
}

impl BarAggregator for TimeBarAggregator {
    fn bar_type(&self) -> BarType {
        self.core.bar_type
    }

    fn update(&mut self, price: Price, size: Quantity, ts_event: UnixNanos) {
        self.roll_bucket(ts_event);
        self.core.apply_update(price, size, ts_event);
    }

    fn update_bar(&mut self, bar: Bar, volume: Quantity, ts_init: UnixNanos) {
        // A close-stamped source bar on the bucket boundary belongs to the
        // closing bucket, not the opening one
        self.roll_bucket(UnixNanos::from(ts_init.saturating_sub(1)));
        self.core.builder.update_bar(bar, volume, ts_init);
    }

    fn on_bucket_close(&mut self, ts_event: UnixNanos, ts_init: UnixNanos) {
        // Timer-driven close for live/clocked aggregation
        let bucket_start = self.bucket_start(ts_event.saturating_sub(1).into());
        self.close_bucket(bucket_start, ts_init);
        self.current_bucket_start = Some(bucket_start + self.interval_ns.as_u64());
    }
}

/// Aggregates the given source bars (ascending `ts_init`) into the target
/// time bar type, for warming up from historical data.
///
/// Emission timestamps are the bucket close. The final in-progress bucket is
/// dropped (the partial bar filter).
#[must_use]
pub fn aggregate_time_bars_historical(
    source_bars: &[Bar],
    target: BarType,
    price_precision: u8,
    size_precision: u8,
    config: &DataEngineConfig,
) -> Vec<Bar> {
    use std::{cell::RefCell, rc::Rc};

    let out: Rc<RefCell<Vec<Bar>>> = Rc::new(RefCell::new(Vec::new()));
    let out_handler = out.clone();
    let handler: BarHandler = Box::new(move |bar| out_handler.borrow_mut().push(bar));
    let mut aggregator =
        TimeBarAggregator::new(target, price_precision, size_precision, handler, config);

    for bar in source_bars {
        aggregator.handle_bar(*bar);
    }

    // Close the final bucket only if the source data fully covers it: the
    // in-progress bucket must not be emitted as closed history
    if let Some(current) = aggregator.current_bucket_start {
        let bucket_close = current + aggregator.interval_ns.as_u64();
        if source_bars
            .last()
            .is_some_and(|bar| bar.ts_init >= bucket_close || bar.ts_event >= bucket_close)
        {
            aggregator.close_bucket(current, bucket_close);
        }
    }

    drop(aggregator);
    Rc::try_unwrap(out)
        .map(RefCell::into_inner)
        .unwrap_or_default()
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use argo_core::datetime::NANOSECONDS_IN_SECOND;
    use rstest::rstest;

    use super::*;

    const MINUTE_NS: u64 = 60 * NANOSECONDS_IN_SECOND;

    fn collecting_handler() -> (BarHandler, Rc<RefCell<Vec<Bar>>>) {
        let bars: Rc<RefCell<Vec<Bar>>> = Rc::new(RefCell::new(Vec::new()));
        let bars_clone = bars.clone();
        let handler: BarHandler = Box::new(move |bar| bars_clone.borrow_mut().push(bar));
        (handler, bars)
    }

    fn source_bar(bar_type: BarType, o: f64, h: f64, l: f64, c: f64, v: f64, ts: u64) -> Bar {
        Bar::new(
            bar_type,
            Price::new(o, 2),
            Price::new(h, 2),
            Price::new(l, 2),
            Price::new(c, 2),
            Quantity::new(v, 0),
            UnixNanos::from(ts),
            UnixNanos::from(ts),
        )
    }

    #[rstest]
    fn test_tick_bar_aggregator_emits_on_step() {
        let bar_type = BarType::from("ETHUSDT.BINANCE-3-TICK-LAST-INTERNAL");
        let (handler, bars) = collecting_handler();
        let mut aggregator = TickBarAggregator::new(bar_type, 2, 3, handler);

        for i in 1..=7_u64 {
            aggregator.update(
                Price::new(100.0 + i as f64, 2),
                Quantity::new(1.0, 3),
                UnixNanos::from(i),
            );
        }

        let bars = bars.borrow();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open, Price::new(101.0, 2));
        assert_eq!(bars[0].close, Price::new(103.0, 2));
        assert_eq!(bars[1].open, Price::new(104.0, 2));
        assert_eq!(bars[1].close, Price::new(106.0, 2));
    }

    #[rstest]
    fn test_volume_bar_aggregator_spills_oversized_update() {
        let bar_type = BarType::from("ETHUSDT.BINANCE-10-VOLUME-LAST-INTERNAL");
        let (handler, bars) = collecting_handler();
        let mut aggregator = VolumeBarAggregator::new(bar_type, 2, 0, handler);

        // A single 25-lot update closes two full buckets and leaves 5
        aggregator.update(
            Price::new(100.0, 2),
            Quantity::new(25.0, 0),
            UnixNanos::from(1),
        );

        let bars = bars.borrow();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].volume, Quantity::new(10.0, 0));
        assert_eq!(bars[1].volume, Quantity::new(10.0, 0));
    }

    #[rstest]
    fn test_value_bar_aggregator_emits_on_value() {
        let bar_type = BarType::from("ETHUSDT.BINANCE-1000-VALUE-LAST-INTERNAL");
        let (handler, bars) = collecting_handler();
        let mut aggregator = ValueBarAggregator::new(bar_type, 2, 3, handler);

        aggregator.update(
            Price::new(100.0, 2),
            Quantity::new(5.0, 3),
            UnixNanos::from(1),
        );
        assert_eq!(bars.borrow().len(), 0);
        assert!((aggregator.get_cumulative_value() - 500.0).abs() < 1e-9);

        aggregator.update(
            Price::new(100.0, 2),
            Quantity::new(6.0, 3),
            UnixNanos::from(2),
        );
        assert_eq!(bars.borrow().len(), 1);
    }

    #[rstest]
    fn test_time_bar_aggregator_closes_buckets_on_roll() {
        let bar_type = BarType::from("ETHUSDT.BINANCE-1-MINUTE-LAST-INTERNAL");
        let (handler, bars) = collecting_handler();
        let config = DataEngineConfig::default();
        let mut aggregator = TimeBarAggregator::new(bar_type, 2, 3, handler, &config);

        // Two updates in the first minute bucket, one in the second
        aggregator.update(Price::new(100.0, 2), Quantity::new(1.0, 3), UnixNanos::from(10));
        aggregator.update(
            Price::new(101.0, 2),
            Quantity::new(1.0, 3),
            UnixNanos::from(30 * NANOSECONDS_IN_SECOND),
        );
        aggregator.update(
            Price::new(102.0, 2),
            Quantity::new(1.0, 3),
            UnixNanos::from(MINUTE_NS + 10),
        );

        let bars = bars.borrow();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open, Price::new(100.0, 2));
        assert_eq!(bars[0].close, Price::new(101.0, 2));
        // Emission time is the bucket close
        assert_eq!(bars[0].ts_event, UnixNanos::from(MINUTE_NS));
    }

    #[rstest]
    fn test_aggregate_time_bars_historical_five_minute() {
        // One trading hour of 1-minute bars aggregates to 12 five-minute bars
        let source_type = BarType::from("6E.0.XCME-1-MINUTE-LAST-EXTERNAL");
        let target_type = BarType::from("6E.0.XCME-5-MINUTE-LAST-INTERNAL@1-MINUTE-EXTERNAL");
        let config = DataEngineConfig::default();

        let mut source = Vec::new();
        for i in 0..60_u64 {
            let ts = (i + 1) * MINUTE_NS; // Close-stamped source bars
            source.push(source_bar(
                source_type,
                100.0 + i as f64,
                101.0 + i as f64,
                99.0 + i as f64,
                100.5 + i as f64,
                10.0,
                ts,
            ));
        }

        let bars = aggregate_time_bars_historical(&source, target_type.standard(), 2, 0, &config);
        assert_eq!(bars.len(), 12);

        let first = &bars[0];
        assert_eq!(first.open, source[0].open);
        assert_eq!(first.close, source[4].close);
        assert_eq!(first.high, source[4].high); // Rising sequence
        assert_eq!(first.low, source[0].low);
        assert_eq!(first.volume, Quantity::new(50.0, 0));
        assert_eq!(first.ts_event, UnixNanos::from(5 * MINUTE_NS));
    }

    #[rstest]
    fn test_aggregate_time_bars_historical_drops_partial_bucket() {
        let source_type = BarType::from("6E.0.XCME-1-MINUTE-LAST-EXTERNAL");
        let target_type = BarType::from("6E.0.XCME-5-MINUTE-LAST-INTERNAL");
        let config = DataEngineConfig::default();

        // 7 one-minute bars: one full 5-minute bucket plus a partial one
        let mut source = Vec::new();
        for i in 0..7_u64 {
            let ts = (i + 1) * MINUTE_NS;
            source.push(source_bar(source_type, 100.0, 101.0, 99.0, 100.5, 10.0, ts));
        }

        let bars = aggregate_time_bars_historical(&source, target_type, 2, 0, &config);
        assert_eq!(bars.len(), 1); // In-progress bucket dropped
    }
}
