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

//! The core `AtomicTime` real-time and static clocks.

use std::{
    ops::Deref,
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    datetime::{NANOSECONDS_IN_MICROSECOND, NANOSECONDS_IN_MILLISECOND, NANOSECONDS_IN_SECOND},
    nanos::UnixNanos,
};

static ATOMIC_CLOCK_REALTIME: OnceLock<AtomicTime> = OnceLock::new();
static ATOMIC_CLOCK_STATIC: OnceLock<AtomicTime> = OnceLock::new();

/// Returns a static reference to the global monotonic real-time clock.
pub fn get_atomic_clock_realtime() -> &'static AtomicTime {
    ATOMIC_CLOCK_REALTIME.get_or_init(|| AtomicTime::new(true, UnixNanos::default()))
}

/// Returns a static reference to the global static (manually set) clock.
pub fn get_atomic_clock_static() -> &'static AtomicTime {
    ATOMIC_CLOCK_STATIC.get_or_init(|| AtomicTime::new(false, UnixNanos::default()))
}

/// Returns the duration since the UNIX epoch from the system wall clock.
#[must_use]
pub fn duration_since_unix_epoch() -> std::time::Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Error calling `SystemTime::now.duration_since`")
}

/// Represents an atomic timekeeping structure.
///
/// [`AtomicTime`] can act as a real-time clock or static clock based on its mode.
/// It uses [`AtomicU64`] to atomically update the value using only immutable
/// references.
///
/// In real-time mode the clock is guaranteed to be monotonic: repeated reads
/// never go backwards even if the underlying system clock is adjusted.
#[repr(C)]
#[derive(Debug)]
pub struct AtomicTime {
    /// Atomic clock is operating in real-time mode if true, otherwise clock is operating in manual static mode.
    pub realtime: std::sync::atomic::AtomicBool,
    /// The last recorded time in UNIX nanoseconds for the clock.
    timestamp_ns: AtomicU64,
}

impl Deref for AtomicTime {
    type Target = AtomicU64;

    fn deref(&self) -> &Self::Target {
        &self.timestamp_ns
    }
}

impl AtomicTime {
    /// Creates a new [`AtomicTime`] instance.
    #[must_use]
    pub fn new(realtime: bool, time: UnixNanos) -> Self {
        Self {
            realtime: std::sync::atomic::AtomicBool::new(realtime),
            timestamp_ns: AtomicU64::new(time.as_u64()),
        }
    }

    /// Returns the current UNIX timestamp in nanoseconds (ns).
    #[must_use]
    pub fn get_time_ns(&self) -> UnixNanos {
        if self.realtime.load(Ordering::Relaxed) {
            self.time_since_epoch()
        } else {
            UnixNanos::from(self.timestamp_ns.load(Ordering::Relaxed))
        }
    }

    /// Returns the current UNIX timestamp in microseconds (μs).
    #[must_use]
    pub fn get_time_us(&self) -> u64 {
        self.get_time_ns().as_u64() / NANOSECONDS_IN_MICROSECOND
    }

    /// Returns the current UNIX timestamp in milliseconds (ms).
    #[must_use]
    pub fn get_time_ms(&self) -> u64 {
        self.get_time_ns().as_u64() / NANOSECONDS_IN_MILLISECOND
    }

    /// Returns the current UNIX timestamp in seconds.
    #[must_use]
    pub fn get_time(&self) -> f64 {
        self.get_time_ns().as_u64() as f64 / NANOSECONDS_IN_SECOND as f64
    }

    /// Sets the clock to the given UNIX `time` (static mode).
    pub fn set_time(&self, time: UnixNanos) {
        self.store(time.as_u64(), Ordering::Relaxed);
    }

    /// Increments the clock by the given `delta` and returns the new time (static mode).
    pub fn increment_time(&self, delta: u64) -> UnixNanos {
        UnixNanos::from(self.fetch_add(delta, Ordering::Relaxed) + delta)
    }

    /// Returns a monotonic wall-clock reading in UNIX nanoseconds.
    ///
    /// The returned value is at least one nanosecond greater than the last
    /// value observed through this function.
    pub fn time_since_epoch(&self) -> UnixNanos {
        let now = duration_since_unix_epoch().as_nanos() as u64;
        let last = self.load(Ordering::SeqCst) + 1;
        let time = now.max(last);
        self.store(time, Ordering::SeqCst);
        UnixNanos::from(time)
    }

    /// Switches the clock between real-time and static modes.
    pub fn make_realtime(&self, realtime: bool) {
        self.realtime.store(realtime, Ordering::Relaxed);
    }
}

impl Default for AtomicTime {
    /// Creates a new default [`AtomicTime`] instance.
    fn default() -> Self {
        Self::new(true, UnixNanos::default())
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
    fn test_static_mode_set_and_get() {
        let time = AtomicTime::new(false, UnixNanos::from(100));
        assert_eq!(time.get_time_ns(), UnixNanos::from(100));

        time.set_time(UnixNanos::from(1_000_000_500));
        assert_eq!(time.get_time_ns(), UnixNanos::from(1_000_000_500));
        assert_eq!(time.get_time_us(), 1_000_000);
        assert_eq!(time.get_time_ms(), 1_000);
    }

    #[rstest]
    fn test_increment_time() {
        let time = AtomicTime::new(false, UnixNanos::default());
        assert_eq!(time.increment_time(50), UnixNanos::from(50));
        assert_eq!(time.increment_time(50), UnixNanos::from(100));
    }

    #[rstest]
    fn test_realtime_monotonicity() {
        let time = AtomicTime::new(true, UnixNanos::default());
        let a = time.get_time_ns();
        let b = time.get_time_ns();
        let c = time.get_time_ns();
        assert!(b > a);
        assert!(c > b);
    }
}
