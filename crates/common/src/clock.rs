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

//! Real-time and static `Clock` implementations.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    ops::Deref,
};

use argo_core::{
    AtomicTime, UnixNanos,
    correctness::{check_positive_u64, check_predicate_true},
    time::get_atomic_clock_realtime,
};
use chrono::{DateTime, Utc};
use ustr::Ustr;

use crate::timer::{
    LiveTimer, TestTimer, TimeEvent, TimeEventCallback, TimeEventHandler, create_valid_interval,
};

/// A real-time or static clock with scheduled timers and callbacks.
///
/// An active timer is one which has not expired.
pub trait Clock: Debug {
    /// Returns the current date and time as a timezone-aware `DateTime<Utc>`.
    fn utc_now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp_ns().as_i64())
    }

    /// Returns the current UNIX timestamp in nanoseconds (ns).
    fn timestamp_ns(&self) -> UnixNanos;

    /// Returns the names of active timers in the clock.
    fn timer_names(&self) -> Vec<&str>;

    /// Returns the count of active timers in the clock.
    fn timer_count(&self) -> usize;

    /// Registers a default event handler for the clock. If a timer does not
    /// have an event handler, then this handler is used.
    fn register_default_handler(&mut self, callback: TimeEventCallback);

    /// Sets a timer to alert once at the specified time.
    ///
    /// Any existing timer registered under the same `name` is cancelled before
    /// the new alert is scheduled. If `allow_past` is true (the default) an
    /// alert time in the past fires immediately; otherwise it is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid, or `alert_time_ns` is in the
    /// past when not allowed.
    fn set_time_alert_ns(
        &mut self,
        name: &str,
        alert_time_ns: UnixNanos,
        callback: Option<TimeEventCallback>,
        allow_past: Option<bool>,
    ) -> anyhow::Result<()>;

    /// Sets a timer to fire time events at every interval between the start
    /// and optional stop time.
    ///
    /// Any existing timer registered under the same `name` is cancelled before
    /// the new timer is scheduled.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid, or `interval_ns` is not positive.
    #[allow(clippy::too_many_arguments)]
    fn set_timer_ns(
        &mut self,
        name: &str,
        interval_ns: u64,
        start_time_ns: Option<UnixNanos>,
        stop_time_ns: Option<UnixNanos>,
        callback: Option<TimeEventCallback>,
        allow_past: Option<bool>,
        fire_immediately: Option<bool>,
    ) -> anyhow::Result<()>;

    /// Returns the next time the timer `name` will fire, if the timer exists.
    fn next_time_ns(&self, name: &str) -> Option<UnixNanos>;

    /// Cancels the timer with `name`.
    fn cancel_timer(&mut self, name: &str);

    /// Cancels all timers.
    fn cancel_timers(&mut self);

    /// Resets the clock by clearing its internal state.
    fn reset(&mut self);
}

/// A static test clock.
///
/// Stores the current timestamp internally which can be advanced; advancing
/// collects the time events generated by active timers in `ts_event` order.
///
/// # Threading
///
/// This clock is thread-affine; use it only from the thread that created it.
#[derive(Debug)]
pub struct TestClock {
    time: AtomicTime,
    // BTreeMap ensures stable ordering when scanning timers in `advance_time`
    timers: BTreeMap<Ustr, TestTimer>,
    default_callback: Option<TimeEventCallback>,
    callbacks: HashMap<Ustr, TimeEventCallback>,
}

impl TestClock {
    /// Creates a new [`TestClock`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            time: AtomicTime::new(false, UnixNanos::default()),
            timers: BTreeMap::new(),
            default_callback: None,
            callbacks: HashMap::new(),
        }
    }

    /// Sets the clock to the given `to_time_ns`.
    pub fn set_time(&mut self, to_time_ns: UnixNanos) {
        self.time.set_time(to_time_ns);
    }

    /// Advances the internal clock to the specified `to_time_ns` and
    /// optionally sets the clock to that time.
    ///
    /// Active timers are advanced to `to_time_ns`, collecting any generated
    /// [`TimeEvent`]s sorted by `ts_event`. Expired timers are dropped.
    ///
    /// # Panics
    ///
    /// Panics if `to_time_ns` is less than the current internal clock time.
    pub fn advance_time(&mut self, to_time_ns: UnixNanos, set_time: bool) -> Vec<TimeEvent> {
        let from_time_ns = self.time.get_time_ns();

        // Time should be non-decreasing
        assert!(
            to_time_ns >= from_time_ns,
            "`to_time_ns` {to_time_ns} was < `from_time_ns` {from_time_ns}",
        );

        if set_time {
            self.time.set_time(to_time_ns);
        }

        let mut events: Vec<TimeEvent> = Vec::new();
        self.timers.retain(|_, timer| {
            timer.advance(to_time_ns).for_each(|event| {
                events.push(event);
            });

            !timer.is_expired()
        });

        events.sort_by(|a, b| a.ts_event.cmp(&b.ts_event));
        events
    }

    /// Matches the given `events` (sorted by `ts_event`) with their
    /// registered handlers, falling back to the default callback.
    ///
    /// # Panics
    ///
    /// Panics if no default callback is registered when required.
    #[must_use]
    pub fn match_handlers(&self, events: Vec<TimeEvent>) -> Vec<TimeEventHandler> {
        events
            .into_iter()
            .map(|event| {
                let callback = self.callbacks.get(&event.name).cloned().unwrap_or_else(|| {
                    self.default_callback
                        .clone()
                        .expect("Default callback should exist")
                });
                TimeEventHandler::new(event, callback)
            })
            .collect()
    }
}

impl Default for TestClock {
    /// Creates a new default [`TestClock`] instance.
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestClock {
    type Target = AtomicTime;

    fn deref(&self) -> &Self::Target {
        &self.time
    }
}

impl Clock for TestClock {
    fn timestamp_ns(&self) -> UnixNanos {
        self.time.get_time_ns()
    }

    fn timer_names(&self) -> Vec<&str> {
        self.timers
            .iter()
            .filter(|(_, timer)| !timer.is_expired())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    fn timer_count(&self) -> usize {
        self.timers
            .iter()
            .filter(|(_, timer)| !timer.is_expired())
            .count()
    }

    fn register_default_handler(&mut self, callback: TimeEventCallback) {
        self.default_callback = Some(callback);
    }

    fn set_time_alert_ns(
        &mut self,
        name: &str,
        mut alert_time_ns: UnixNanos,
        callback: Option<TimeEventCallback>,
        allow_past: Option<bool>,
    ) -> anyhow::Result<()> {
        argo_core::correctness::check_valid_string(name, stringify!(name))?;
        let name = Ustr::from(name);
        let allow_past = allow_past.unwrap_or(true);

        check_predicate_true(
            callback.is_some()
                || self.callbacks.contains_key(&name)
                || self.default_callback.is_some(),
            "No callbacks provided",
        )?;

        if let Some(callback) = callback {
            self.callbacks.insert(name, callback);
        }

        let ts_now = self.timestamp_ns();
        if alert_time_ns < ts_now {
            if allow_past {
                alert_time_ns = ts_now;
                log::warn!(
                    "Alert '{name}' was in the past, firing at current time {ts_now}",
                );
            } else {
                anyhow::bail!("Alert '{name}' time was in the past");
            }
        }

        // Cancel any existing timer with the same name
        self.timers.remove(&name);

        let interval_ns = create_valid_interval((alert_time_ns - ts_now).as_u64());
        let timer = TestTimer::new(name, interval_ns, ts_now, Some(alert_time_ns), false);
        self.timers.insert(name, timer);

        Ok(())
    }

    fn set_timer_ns(
        &mut self,
        name: &str,
        interval_ns: u64,
        start_time_ns: Option<UnixNanos>,
        stop_time_ns: Option<UnixNanos>,
        callback: Option<TimeEventCallback>,
        allow_past: Option<bool>,
        fire_immediately: Option<bool>,
    ) -> anyhow::Result<()> {
        argo_core::correctness::check_valid_string(name, stringify!(name))?;
        check_positive_u64(interval_ns, stringify!(interval_ns))?;
        let name = Ustr::from(name);
        let allow_past = allow_past.unwrap_or(true);
        let fire_immediately = fire_immediately.unwrap_or(false);

        check_predicate_true(
            callback.is_some() || self.default_callback.is_some(),
            "No callbacks provided",
        )?;

        if let Some(callback) = callback {
            self.callbacks.insert(name, callback);
        }

        let ts_now = self.timestamp_ns();
        let start_time_ns = match start_time_ns {
            Some(start) if start.as_u64() > 0 => start,
            _ => ts_now,
        };

        if !allow_past {
            let next_time = if fire_immediately {
                start_time_ns
            } else {
                start_time_ns + interval_ns
            };
            check_predicate_true(
                next_time >= ts_now,
                &format!("Timer '{name}' next event time was in the past"),
            )?;
        }

        self.timers.remove(&name);

        let interval_ns = create_valid_interval(interval_ns);
        let timer = TestTimer::new(name, interval_ns, start_time_ns, stop_time_ns, fire_immediately);
        self.timers.insert(name, timer);

        Ok(())
    }

    fn next_time_ns(&self, name: &str) -> Option<UnixNanos> {
        self.timers
            .get(&Ustr::from(name))
            .map(TestTimer::next_time_ns)
    }

    fn cancel_timer(&mut self, name: &str) {
        if let Some(mut timer) = self.timers.remove(&Ustr::from(name)) {
            timer.cancel();
        }
    }

    fn cancel_timers(&mut self) {
        for timer in self.timers.values_mut() {
            timer.cancel();
        }
        self.timers.clear();
    }

    fn reset(&mut self) {
        self.time.set_time(UnixNanos::default());
        self.timers.clear();
        self.callbacks.clear();
    }
}

/// A real-time clock which uses system time.
///
/// Timestamps are guaranteed to be unique and monotonically increasing.
///
/// # Threading
///
/// This clock is thread-affine; use it only from the thread that created it.
#[derive(Debug)]
pub struct LiveClock {
    time: &'static AtomicTime,
    timers: HashMap<Ustr, LiveTimer>,
    default_callback: Option<TimeEventCallback>,
}

impl LiveClock {
    /// Creates a new [`LiveClock`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            time: get_atomic_clock_realtime(),
            timers: HashMap::new(),
            default_callback: None,
        }
    }

    fn clean_expired_timers(&mut self) {
        self.timers.retain(|_, timer| !timer.is_expired());
    }
}

impl Default for LiveClock {
    /// Creates a new default [`LiveClock`] instance.
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for LiveClock {
    fn timestamp_ns(&self) -> UnixNanos {
        self.time.get_time_ns()
    }

    fn timer_names(&self) -> Vec<&str> {
        self.timers
            .iter()
            .filter(|(_, timer)| !timer.is_expired())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    fn timer_count(&self) -> usize {
        self.timers
            .iter()
            .filter(|(_, timer)| !timer.is_expired())
            .count()
    }

    fn register_default_handler(&mut self, callback: TimeEventCallback) {
        self.default_callback = Some(callback);
    }

    fn set_time_alert_ns(
        &mut self,
        name: &str,
        alert_time_ns: UnixNanos,
        callback: Option<TimeEventCallback>,
        allow_past: Option<bool>,
    ) -> anyhow::Result<()> {
        argo_core::correctness::check_valid_string(name, stringify!(name))?;
        let allow_past = allow_past.unwrap_or(true);

        let callback = match callback.or_else(|| self.default_callback.clone()) {
            Some(callback) => callback,
            None => anyhow::bail!("No callbacks provided"),
        };

        let ts_now = self.timestamp_ns();
        if alert_time_ns < ts_now && !allow_past {
            anyhow::bail!("Alert '{name}' time was in the past");
        }
        let alert_time_ns = alert_time_ns.max(ts_now);

        self.cancel_timer(name);

        let name = Ustr::from(name);
        let interval_ns = create_valid_interval((alert_time_ns - ts_now).as_u64());
        let mut timer = LiveTimer::new(name, interval_ns, ts_now, Some(alert_time_ns), callback);
        timer.start();

        self.clean_expired_timers();
        self.timers.insert(name, timer);
        Ok(())
    }

    fn set_timer_ns(
        &mut self,
        name: &str,
        interval_ns: u64,
        start_time_ns: Option<UnixNanos>,
        stop_time_ns: Option<UnixNanos>,
        callback: Option<TimeEventCallback>,
        allow_past: Option<bool>,
        fire_immediately: Option<bool>,
    ) -> anyhow::Result<()> {
        argo_core::correctness::check_valid_string(name, stringify!(name))?;
        check_positive_u64(interval_ns, stringify!(interval_ns))?;
        let allow_past = allow_past.unwrap_or(true);
        let _fire_immediately = fire_immediately.unwrap_or(false);

        let callback = match callback.or_else(|| self.default_callback.clone()) {
            Some(callback) => callback,
            None => anyhow::bail!("No callbacks provided"),
        };

        let ts_now = self.timestamp_ns();
        let start_time_ns = match start_time_ns {
            Some(start) if start.as_u64() > 0 => start,
            _ => ts_now,
        };

        if start_time_ns < ts_now && !allow_past {
            anyhow::bail!("Timer '{name}' start time was in the past");
        }

        self.cancel_timer(name);

        let name = Ustr::from(name);
        let interval_ns = create_valid_interval(interval_ns);
        let mut timer = LiveTimer::new(name, interval_ns, start_time_ns, stop_time_ns, callback);
        timer.start();

        self.clean_expired_timers();
        self.timers.insert(name, timer);
        Ok(())
    }

    fn next_time_ns(&self, name: &str) -> Option<UnixNanos> {
        self.timers
            .get(&Ustr::from(name))
            .map(LiveTimer::next_time_ns)
    }

    fn cancel_timer(&mut self, name: &str) {
        if let Some(mut timer) = self.timers.remove(&Ustr::from(name)) {
            timer.cancel();
        }
    }

    fn cancel_timers(&mut self) {
        for timer in self.timers.values_mut() {
            timer.cancel();
        }
        self.timers.clear();
    }

    fn reset(&mut self) {
        self.cancel_timers();
        self.default_callback = None;
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use rstest::rstest;

    use super::*;

    fn collecting_callback() -> (TimeEventCallback, Rc<RefCell<Vec<TimeEvent>>>) {
        let events: Rc<RefCell<Vec<TimeEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let events_clone = events.clone();
        let callback = TimeEventCallback::from(Rc::new(move |event: TimeEvent| {
            events_clone.borrow_mut().push(event);
        }) as Rc<dyn Fn(TimeEvent)>);
        (callback, events)
    }

    #[rstest]
    fn test_set_timer_and_advance() {
        let (callback, _) = collecting_callback();
        let mut clock = TestClock::new();
        clock.register_default_handler(callback);
        clock
            .set_timer_ns("TIMER-1", 100, None, None, None, None, None)
            .unwrap();

        assert_eq!(clock.timer_count(), 1);
        assert_eq!(clock.timer_names(), vec!["TIMER-1"]);

        let events = clock.advance_time(UnixNanos::from(300), true);
        assert_eq!(events.len(), 3);
        assert_eq!(clock.timestamp_ns(), UnixNanos::from(300));
    }

    #[rstest]
    fn test_advance_time_events_sorted_by_ts_event() {
        let (callback, _) = collecting_callback();
        let mut clock = TestClock::new();
        clock.register_default_handler(callback);
        clock
            .set_timer_ns("TIMER-A", 150, None, None, None, None, None)
            .unwrap();
        clock
            .set_timer_ns("TIMER-B", 100, None, None, None, None, None)
            .unwrap();

        let events = clock.advance_time(UnixNanos::from(300), true);
        let ts: Vec<u64> = events.iter().map(|e| e.ts_event.as_u64()).collect();
        assert_eq!(ts, vec![100, 150, 200, 300, 300]);
    }

    #[rstest]
    fn test_set_time_alert_fires_once() {
        let (callback, events) = collecting_callback();
        let mut clock = TestClock::new();
        clock
            .set_time_alert_ns("ALERT-1", UnixNanos::from(500), Some(callback), None)
            .unwrap();

        let fired = clock.advance_time(UnixNanos::from(1_000), true);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].ts_event, UnixNanos::from(500));
        assert_eq!(clock.timer_count(), 0);

        for handler in clock.match_handlers(fired) {
            handler.run();
        }
        assert_eq!(events.borrow().len(), 1);
    }

    #[rstest]
    fn test_set_time_alert_in_past_rejected() {
        let (callback, _) = collecting_callback();
        let mut clock = TestClock::new();
        clock.set_time(UnixNanos::from(1_000));
        let result =
            clock.set_time_alert_ns("ALERT-1", UnixNanos::from(500), Some(callback), Some(false));
        assert!(result.is_err());
    }

    #[rstest]
    fn test_cancel_timer() {
        let (callback, _) = collecting_callback();
        let mut clock = TestClock::new();
        clock.register_default_handler(callback);
        clock
            .set_timer_ns("TIMER-1", 100, None, None, None, None, None)
            .unwrap();
        clock.cancel_timer("TIMER-1");

        assert_eq!(clock.timer_count(), 0);
        assert!(clock.advance_time(UnixNanos::from(1_000), true).is_empty());
    }

    #[rstest]
    #[should_panic(expected = "was <")]
    fn test_advance_time_backwards_panics() {
        let mut clock = TestClock::new();
        clock.set_time(UnixNanos::from(1_000));
        let _ = clock.advance_time(UnixNanos::from(500), true);
    }
}
