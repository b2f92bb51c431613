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

//! Real-time and test timers for use with `Clock` implementations.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
    num::NonZeroU64,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering as AtomicOrdering},
    },
};

use argo_core::{
    UUID4, UnixNanos,
    correctness::{FAILED, check_valid_string},
    time::get_atomic_clock_realtime,
};
use tokio::{task::JoinHandle, time::Duration};
use ustr::Ustr;

/// Creates a valid nanoseconds interval that is guaranteed to be positive.
#[must_use]
pub fn create_valid_interval(interval_ns: u64) -> NonZeroU64 {
    NonZeroU64::new(std::cmp::max(interval_ns, 1)).expect("`interval_ns` must be positive")
}

/// Represents a time event occurring at the event timestamp.
///
/// A `TimeEvent` carries metadata such as the event's name, a unique event ID,
/// and timestamps indicating when the event was scheduled to occur and when it
/// was initialized.
#[repr(C)]
#[derive(Clone, Debug, Eq)]
pub struct TimeEvent {
    /// The event name, identifying the nature or purpose of the event.
    pub name: Ustr,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the instance was initialized.
    pub ts_init: UnixNanos,
}

impl TimeEvent {
    /// Creates a new [`TimeEvent`] instance.
    #[must_use]
    pub const fn new(name: Ustr, event_id: UUID4, ts_event: UnixNanos, ts_init: UnixNanos) -> Self {
        Self {
            name,
            event_id,
            ts_event,
            ts_init,
        }
    }
}

impl PartialEq for TimeEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event_id == other.event_id
    }
}

/// Reverse order for `TimeEvent` comparison to be used in a max heap.
impl PartialOrd for TimeEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reverse order for `TimeEvent` comparison to be used in a max heap.
impl Ord for TimeEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other.ts_event.cmp(&self.ts_event)
    }
}

impl Display for TimeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimeEvent(name={}, event_id={}, ts_event={}, ts_init={})",
            self.name, self.event_id, self.ts_event, self.ts_init
        )
    }
}

/// The callback type invoked when a time event fires.
pub type RustTimeEventCallback = dyn Fn(TimeEvent);

/// A shareable callback handling [`TimeEvent`]s.
#[derive(Clone)]
pub struct TimeEventCallback(Rc<RustTimeEventCallback>);

impl TimeEventCallback {
    /// Invokes the callback with the given `event`.
    pub fn call(&self, event: TimeEvent) {
        (self.0)(event);
    }
}

impl Debug for TimeEventCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TimeEventCallback")
    }
}

impl From<Rc<RustTimeEventCallback>> for TimeEventCallback {
    fn from(value: Rc<RustTimeEventCallback>) -> Self {
        Self(value)
    }
}

// SAFETY: Callbacks are only ever invoked from the owning thread's event loop
unsafe impl Send for TimeEventCallback {}
unsafe impl Sync for TimeEventCallback {}

/// Represents a time event and its associated handler.
#[derive(Clone, Debug)]
pub struct TimeEventHandler {
    /// The time event.
    pub event: TimeEvent,
    /// The callable handler for the event.
    pub callback: TimeEventCallback,
}

impl TimeEventHandler {
    /// Creates a new [`TimeEventHandler`] instance.
    #[must_use]
    pub const fn new(event: TimeEvent, callback: TimeEventCallback) -> Self {
        Self { event, callback }
    }

    /// Invokes the handler callback with its event.
    pub fn run(self) {
        let Self { event, callback } = self;
        callback.call(event);
    }
}

impl PartialEq for TimeEventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.event.ts_event == other.event.ts_event
    }
}

impl Eq for TimeEventHandler {}

impl PartialOrd for TimeEventHandler {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeEventHandler {
    fn cmp(&self, other: &Self) -> Ordering {
        self.event.ts_event.cmp(&other.event.ts_event)
    }
}

/// A test timer for use with a `TestClock`.
///
/// `TestTimer` simulates time progression in a controlled environment,
/// allowing for precise control over event generation in test scenarios.
#[derive(Clone, Copy, Debug)]
pub struct TestTimer {
    /// The name of the timer.
    pub name: Ustr,
    /// The interval between timer events in nanoseconds.
    pub interval_ns: NonZeroU64,
    /// The start time of the timer in UNIX nanoseconds.
    pub start_time_ns: UnixNanos,
    /// The optional stop time of the timer in UNIX nanoseconds.
    pub stop_time_ns: Option<UnixNanos>,
    next_time_ns: UnixNanos,
    is_expired: bool,
}

impl TestTimer {
    /// Creates a new [`TestTimer`] instance.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid string.
    #[must_use]
    pub fn new(
        name: Ustr,
        interval_ns: NonZeroU64,
        start_time_ns: UnixNanos,
        stop_time_ns: Option<UnixNanos>,
        fire_immediately: bool,
    ) -> Self {
        check_valid_string(name, stringify!(name)).expect(FAILED);

        let next_time_ns = if fire_immediately {
            start_time_ns
        } else {
            start_time_ns + interval_ns.get()
        };

        Self {
            name,
            interval_ns,
            start_time_ns,
            stop_time_ns,
            next_time_ns,
            is_expired: false,
        }
    }

    /// Returns the next time in UNIX nanoseconds when the timer will fire.
    #[must_use]
    pub const fn next_time_ns(&self) -> UnixNanos {
        self.next_time_ns
    }

    /// Returns whether the timer is expired.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.is_expired
    }

    /// Advances the test timer forward to the given time, generating a
    /// sequence of events. A [`TimeEvent`] is yielded for each time the next
    /// event time is <= the given `to_time_ns`.
    pub fn advance(&mut self, to_time_ns: UnixNanos) -> impl Iterator<Item = TimeEvent> + '_ {
        let advances = to_time_ns
            .saturating_sub(self.next_time_ns.as_u64() - self.interval_ns.get())
            / self.interval_ns.get();
        self.take(advances as usize).map(|(event, _)| event)
    }

    /// Cancels the timer (the timer will not generate further events).
    pub const fn cancel(&mut self) {
        self.is_expired = true;
    }
}

impl Iterator for TestTimer {
    type Item = (TimeEvent, UnixNanos);

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_expired {
            None
        } else {
            let item = (
                TimeEvent {
                    name: self.name,
                    event_id: UUID4::new(),
                    ts_event: self.next_time_ns,
                    ts_init: self.next_time_ns,
                },
                self.next_time_ns,
            );

            // If the current next event time has exceeded the stop time, expire
            if let Some(stop_time_ns) = self.stop_time_ns {
                if self.next_time_ns >= stop_time_ns {
                    self.is_expired = true;
                }
            }

            self.next_time_ns += self.interval_ns;

            Some(item)
        }
    }
}

/// A live timer for use with a `LiveClock`.
///
/// `LiveTimer` triggers events at specified intervals in a real-time
/// environment, using Tokio's async runtime to handle scheduling.
#[derive(Debug)]
pub struct LiveTimer {
    /// The name of the timer.
    pub name: Ustr,
    /// The interval between timer events in nanoseconds.
    pub interval_ns: NonZeroU64,
    /// The start time of the timer in UNIX nanoseconds.
    pub start_time_ns: UnixNanos,
    /// The optional stop time of the timer in UNIX nanoseconds.
    pub stop_time_ns: Option<UnixNanos>,
    next_time_ns: Arc<AtomicU64>,
    callback: TimeEventCallback,
    task_handle: Option<JoinHandle<()>>,
}

impl LiveTimer {
    /// Creates a new [`LiveTimer`] instance.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid string.
    #[must_use]
    pub fn new(
        name: Ustr,
        interval_ns: NonZeroU64,
        start_time_ns: UnixNanos,
        stop_time_ns: Option<UnixNanos>,
        callback: TimeEventCallback,
    ) -> Self {
        check_valid_string(name, stringify!(name)).expect(FAILED);

        Self {
            name,
            interval_ns,
            start_time_ns,
            stop_time_ns,
            next_time_ns: Arc::new(AtomicU64::new(
                start_time_ns.as_u64() + interval_ns.get(),
            )),
            callback,
            task_handle: None,
        }
    }

    /// Returns the next time in UNIX nanoseconds when the timer will fire.
    #[must_use]
    pub fn next_time_ns(&self) -> UnixNanos {
        UnixNanos::from(self.next_time_ns.load(AtomicOrdering::SeqCst))
    }

    /// Returns whether the timer is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(tokio::task::JoinHandle::is_finished)
    }

    /// Starts the timer on the async runtime.
    ///
    /// Events are generated at each interval and dispatched to the callback
    /// until the optional stop time is reached or the timer is canceled.
    pub fn start(&mut self) {
        let name = self.name;
        let interval_ns = self.interval_ns;
        let stop_time_ns = self.stop_time_ns;
        let next_time_atomic = self.next_time_ns.clone();
        let callback = self.callback.clone();

        let handle = tokio::task::spawn_local(async move {
            let clock = get_atomic_clock_realtime();
            loop {
                let next_time_ns = UnixNanos::from(next_time_atomic.load(AtomicOrdering::SeqCst));
                let now_ns = clock.get_time_ns();
                if next_time_ns > now_ns {
                    let delay = Duration::from_nanos((next_time_ns - now_ns).as_u64());
                    tokio::time::sleep(delay).await;
                }

                let ts_now = clock.get_time_ns();
                let event = TimeEvent::new(name, UUID4::new(), next_time_ns, ts_now);
                callback.call(event);

                let new_next = next_time_ns + interval_ns.get();
                next_time_atomic.store(new_next.as_u64(), AtomicOrdering::SeqCst);

                if let Some(stop_time_ns) = stop_time_ns {
                    if new_next > stop_time_ns {
                        break;
                    }
                }
            }
        });

        self.task_handle = Some(handle);
    }

    /// Cancels the timer (the timer will not generate further events).
    pub fn cancel(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
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
    fn test_test_timer_advance_generates_events() {
        let mut timer = TestTimer::new(
            Ustr::from("TEST-TIMER"),
            create_valid_interval(100),
            UnixNanos::default(),
            None,
            false,
        );

        let events: Vec<TimeEvent> = timer.advance(UnixNanos::from(350)).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].ts_event, UnixNanos::from(100));
        assert_eq!(events[2].ts_event, UnixNanos::from(300));
        assert_eq!(timer.next_time_ns(), UnixNanos::from(400));
    }

    #[rstest]
    fn test_test_timer_fire_immediately() {
        let mut timer = TestTimer::new(
            Ustr::from("TEST-TIMER"),
            create_valid_interval(100),
            UnixNanos::default(),
            None,
            true,
        );

        let events: Vec<TimeEvent> = timer.advance(UnixNanos::from(100)).collect();
        assert_eq!(events.len(), 2); // Fires at 0 and 100
        assert_eq!(events[0].ts_event, UnixNanos::default());
    }

    #[rstest]
    fn test_test_timer_stop_time_expires() {
        let mut timer = TestTimer::new(
            Ustr::from("TEST-TIMER"),
            create_valid_interval(100),
            UnixNanos::default(),
            Some(UnixNanos::from(200)),
            false,
        );

        let events: Vec<TimeEvent> = timer.advance(UnixNanos::from(1_000)).collect();
        assert_eq!(events.len(), 2);
        assert!(timer.is_expired());
    }

    #[rstest]
    fn test_test_timer_cancel() {
        let mut timer = TestTimer::new(
            Ustr::from("TEST-TIMER"),
            create_valid_interval(100),
            UnixNanos::default(),
            None,
            false,
        );
        timer.cancel();
        assert!(timer.is_expired());
        assert_eq!(timer.advance(UnixNanos::from(1_000)).count(), 0);
    }

    #[rstest]
    fn test_time_event_max_heap_ordering() {
        let event1 = TimeEvent::new(
            Ustr::from("A"),
            UUID4::new(),
            UnixNanos::from(100),
            UnixNanos::from(100),
        );
        let event2 = TimeEvent::new(
            Ustr::from("B"),
            UUID4::new(),
            UnixNanos::from(200),
            UnixNanos::from(200),
        );

        let mut heap = std::collections::BinaryHeap::new();
        heap.push(event2);
        heap.push(event1);

        // Earliest event pops first (reverse ordering)
        assert_eq!(heap.pop().unwrap().ts_event, UnixNanos::from(100));
    }
}
