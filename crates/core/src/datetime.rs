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

//! Common data and time functions.

use chrono::{DateTime, Datelike, Duration, TimeDelta, Timelike, Utc};

use crate::nanos::UnixNanos;

/// Number of nanoseconds in one second.
pub const NANOSECONDS_IN_SECOND: u64 = 1_000_000_000;

/// Number of nanoseconds in one millisecond.
pub const NANOSECONDS_IN_MILLISECOND: u64 = 1_000_000;

/// Number of nanoseconds in one microsecond.
pub const NANOSECONDS_IN_MICROSECOND: u64 = 1_000;

/// Number of milliseconds in one second.
pub const MILLISECONDS_IN_SECOND: u64 = 1_000;

/// Converts seconds to nanoseconds (ns).
#[inline]
#[must_use]
pub fn secs_to_nanos(secs: f64) -> u64 {
    (secs * NANOSECONDS_IN_SECOND as f64) as u64
}

/// Converts seconds to milliseconds (ms).
#[inline]
#[must_use]
pub fn secs_to_millis(secs: f64) -> u64 {
    (secs * MILLISECONDS_IN_SECOND as f64) as u64
}

/// Converts milliseconds (ms) to nanoseconds (ns).
#[inline]
#[must_use]
pub const fn millis_to_nanos(millis: u64) -> u64 {
    millis * NANOSECONDS_IN_MILLISECOND
}

/// Converts nanoseconds (ns) to seconds.
#[inline]
#[must_use]
pub fn nanos_to_secs(nanos: u64) -> f64 {
    nanos as f64 / NANOSECONDS_IN_SECOND as f64
}

/// Converts nanoseconds (ns) to milliseconds (ms).
#[inline]
#[must_use]
pub const fn nanos_to_millis(nanos: u64) -> u64 {
    nanos / NANOSECONDS_IN_MILLISECOND
}

/// Returns the UTC midnight (start of day) for the given datetime.
#[must_use]
pub fn start_of_day_utc(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt - Duration::hours(dt.hour() as i64)
        - Duration::minutes(dt.minute() as i64)
        - Duration::seconds(dt.second() as i64)
        - Duration::nanoseconds(dt.nanosecond() as i64)
}

/// Returns the UTC start of the ISO week (Monday midnight) for the given datetime.
#[must_use]
pub fn start_of_week_utc(dt: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day_utc(dt) - TimeDelta::days(dt.weekday().num_days_from_monday() as i64)
}

/// Floors the given timestamp onto an origin-anchored time grid.
///
/// The bucket start is the greatest `origin + k * interval_ns <= ts` where the
/// origin is start-of-day UTC plus `origin_offset`.
///
/// # Panics
///
/// Panics if `interval_ns` is zero.
#[must_use]
pub fn floor_to_interval_ns(
    ts: UnixNanos,
    interval_ns: u64,
    origin_offset: TimeDelta,
) -> UnixNanos {
    assert!(interval_ns > 0, "`interval_ns` must be positive");

    let day_start = UnixNanos::from(start_of_day_utc(ts.to_datetime_utc()));
    let offset_ns = origin_offset.num_nanoseconds().unwrap_or(0);
    let origin = if offset_ns >= 0 {
        day_start + offset_ns as u64
    } else {
        day_start - offset_ns.unsigned_abs()
    };

    if ts < origin {
        // Anchor on the previous day's grid
        let prev_origin = origin - 86_400 * NANOSECONDS_IN_SECOND;
        let buckets = (ts - prev_origin).as_u64() / interval_ns;
        return prev_origin + buckets * interval_ns;
    }

    let buckets = (ts - origin).as_u64() / interval_ns;
    origin + buckets * interval_ns
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0.0, 0)]
    #[case(1.0, 1_000_000_000)]
    #[case(1.5, 1_500_000_000)]
    fn test_secs_to_nanos(#[case] secs: f64, #[case] expected: u64) {
        assert_eq!(secs_to_nanos(secs), expected);
    }

    #[rstest]
    fn test_millis_round_trip() {
        assert_eq!(millis_to_nanos(1_234), 1_234_000_000);
        assert_eq!(nanos_to_millis(1_234_000_000), 1_234);
    }

    #[rstest]
    fn test_start_of_day_utc() {
        let dt = Utc.with_ymd_and_hms(2024, 2, 10, 14, 58, 43).unwrap();
        let start = start_of_day_utc(dt);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap());
    }

    #[rstest]
    fn test_start_of_week_utc() {
        // 2024-02-10 is a Saturday; the week starts Monday 2024-02-05
        let dt = Utc.with_ymd_and_hms(2024, 2, 10, 14, 58, 43).unwrap();
        let start = start_of_week_utc(dt);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap());
    }

    #[rstest]
    fn test_floor_to_interval_ns_default_origin() {
        // 00:07:30 into the day with 5-minute buckets floors to 00:05:00
        let day = Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
        let ts = UnixNanos::from(day + Duration::seconds(450));
        let interval_ns = 300 * NANOSECONDS_IN_SECOND;
        let floored = floor_to_interval_ns(ts, interval_ns, TimeDelta::zero());
        assert_eq!(
            floored.to_datetime_utc(),
            Utc.with_ymd_and_hms(2024, 2, 10, 0, 5, 0).unwrap()
        );
    }

    #[rstest]
    fn test_floor_to_interval_ns_with_origin_offset() {
        // Origin offset 30s shifts the grid: 00:07:30 floors to 00:05:30
        let day = Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
        let ts = UnixNanos::from(day + Duration::seconds(450));
        let interval_ns = 300 * NANOSECONDS_IN_SECOND;
        let floored = floor_to_interval_ns(ts, interval_ns, TimeDelta::seconds(30));
        assert_eq!(
            floored.to_datetime_utc(),
            Utc.with_ymd_and_hms(2024, 2, 10, 0, 5, 30).unwrap()
        );
    }

    #[rstest]
    fn test_floor_to_interval_ns_before_origin() {
        // Timestamp before the shifted origin anchors on the previous day
        let day = Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
        let ts = UnixNanos::from(day + Duration::seconds(10));
        let interval_ns = 300 * NANOSECONDS_IN_SECOND;
        let floored = floor_to_interval_ns(ts, interval_ns, TimeDelta::seconds(30));
        assert_eq!(
            floored.to_datetime_utc(),
            Utc.with_ymd_and_hms(2024, 2, 9, 23, 55, 30).unwrap()
        );
    }
}
