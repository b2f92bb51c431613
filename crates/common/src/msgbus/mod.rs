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

//! A common in-memory `MessageBus` for loosely coupled message passing patterns.
//!
//! The bus provides a producer and consumer API for Pub/Sub, Req/Rep, as well
//! as direct point-to-point messaging to registered endpoints.
//!
//! Topics are hierarchical and dot-delimited. Subscription patterns support
//! wildcards:
//!  - `*` matches exactly one topic segment.
//!  - `#` matches zero or more topic segments.

pub mod handler;
pub mod switchboard;

use std::{
    any::Any,
    cell::{OnceCell, RefCell},
    fmt::Debug,
    hash::{Hash, Hasher},
    rc::Rc,
};

use argo_core::{UUID4, UnixNanos};
use handler::ShareableMessageHandler;
use indexmap::IndexMap;
use ustr::Ustr;

/// The maximum number of queued messages before backpressure is logged.
pub const BACKPRESSURE_QUEUE_BOUND: usize = 100_000;

/// Message direction marker: received.
pub const RECV: &str = "<--";
/// Message direction marker: sent.
pub const SENT: &str = "-->";
/// Message kind marker: command.
pub const CMD: &str = "[CMD]";
/// Message kind marker: event.
pub const EVT: &str = "[EVT]";
/// Message kind marker: request.
pub const REQ: &str = "[REQ]";
/// Message kind marker: response.
pub const RES: &str = "[RES]";

thread_local! {
    // Handlers hold `Rc`s and are driven by one logical event loop: the bus
    // is per-thread so each thread gets its own handlers
    static MESSAGE_BUS: OnceCell<Rc<RefCell<MessageBus>>> = const { OnceCell::new() };
}

/// Sets the message bus for this thread's event loop.
///
/// # Panics
///
/// Panics if a message bus has already been set for the thread.
pub fn set_message_bus(msgbus: Rc<RefCell<MessageBus>>) {
    MESSAGE_BUS.with(|cell| {
        assert!(
            cell.set(msgbus).is_ok(),
            "Failed to set `MessageBus`: already set",
        );
    });
}

/// Returns this thread's message bus, initializing a default instance on
/// first use.
pub fn get_message_bus() -> Rc<RefCell<MessageBus>> {
    MESSAGE_BUS.with(|cell| {
        cell.get_or_init(|| Rc::new(RefCell::new(MessageBus::default())))
            .clone()
    })
}

/// Sends the `message` to the handler registered at the `endpoint` address.
pub fn send(endpoint: &Ustr, message: &dyn Any) {
    let handler = get_message_bus().borrow().get_endpoint(endpoint).cloned();
    if let Some(handler) = handler {
        handler.0.handle(message);
    } else {
        log::error!("send: no endpoint registered at '{endpoint}'");
    }
}

/// Publishes the `message` to the `topic`, fanning out to all matching subscribers.
///
/// Delivery is FIFO per publisher per topic: each matching handler runs to
/// completion before the next message on that topic is delivered to it.
pub fn publish(topic: &Ustr, message: &dyn Any) {
    log::trace!("Publishing topic '{topic}'");
    let matching_subs = get_message_bus().borrow().matching_subscriptions(topic);

    for sub in matching_subs {
        sub.handler.0.handle(message);
    }
}

/// Registers the given `handler` for the `endpoint` address.
///
/// A single owner per endpoint: re-registering replaces atomically.
pub fn register<T: AsRef<str>>(endpoint: T, handler: ShareableMessageHandler) {
    log::debug!(
        "Registering endpoint '{}' with handler ID {}",
        endpoint.as_ref(),
        handler.id(),
    );

    // Updates value if key already exists
    get_message_bus()
        .borrow_mut()
        .endpoints
        .insert(Ustr::from(endpoint.as_ref()), handler);
}

/// Deregisters the handler for the `endpoint` address.
pub fn deregister(endpoint: &Ustr) {
    log::debug!("Deregistering endpoint '{endpoint}'");
    get_message_bus()
        .borrow_mut()
        .endpoints
        .shift_remove(endpoint);
}

/// Subscribes the given `handler` to the `topic` pattern.
///
/// Higher `priority` handlers fire first; ordering among equal priorities is
/// registration order.
pub fn subscribe<T: AsRef<str>>(topic: T, handler: ShareableMessageHandler, priority: Option<u8>) {
    log::debug!("Subscribing to topic '{}'", topic.as_ref());
    get_message_bus()
        .borrow_mut()
        .subscribe_topic(topic.as_ref(), handler, priority);
}

/// Unsubscribes the given `handler` from the `topic` pattern.
pub fn unsubscribe<T: AsRef<str>>(topic: T, handler: ShareableMessageHandler) {
    log::debug!("Unsubscribing from topic '{}'", topic.as_ref());
    let sub = Subscription::new(topic, handler, None);
    get_message_bus()
        .borrow_mut()
        .subscriptions
        .shift_remove(&sub);
}

/// Returns whether the given `handler` is subscribed to the `topic` pattern.
#[must_use]
pub fn is_subscribed<T: AsRef<str>>(topic: T, handler: ShareableMessageHandler) -> bool {
    let sub = Subscription::new(topic, handler, None);
    get_message_bus().borrow().subscriptions.contains_key(&sub)
}

/// Returns the count of subscribers matching the `topic`.
#[must_use]
pub fn subscriptions_count<T: AsRef<str>>(topic: T) -> usize {
    get_message_bus().borrow().subscriptions_count(topic)
}

/// Registers a response handler for the given request `correlation_id`.
pub fn register_response_handler(
    correlation_id: UUID4,
    handler: ShareableMessageHandler,
    deadline_ns: Option<UnixNanos>,
) {
    get_message_bus()
        .borrow_mut()
        .register_response_handler(correlation_id, handler, deadline_ns);
}

/// Routes a response `message` to the handler awaiting `correlation_id`.
///
/// Late responses for already-resolved (or garbage-collected) requests are
/// dropped with a debug log.
pub fn respond(correlation_id: &UUID4, message: &dyn Any) {
    let handler = get_message_bus()
        .borrow_mut()
        .take_response_handler(correlation_id);
    if let Some(handler) = handler {
        handler.0.handle(message);
    } else {
        log::debug!("respond: no handler awaiting correlation ID {correlation_id} (late or canceled)");
    }
}

/// Represents a subscription to a particular topic.
///
/// This is an internal type used by the message bus to organize topics and
/// their subscribers.
///
/// # Warnings
///
/// Assigning priority handling is an advanced feature which *shouldn't
/// normally be needed by most users*. **Only assign a higher priority to the
/// subscription if you are certain of what you're doing**. If an inappropriate
/// priority is assigned then the handler may receive messages before core
/// system components have been able to process necessary calculations and
/// produce potential side effects for logically sound behavior.
#[derive(Clone)]
pub struct Subscription {
    /// The shareable message handler for the subscription.
    pub handler: ShareableMessageHandler,
    /// A copy of the handler ID for faster equality checks.
    pub handler_id: Ustr,
    /// The topic pattern for the subscription.
    pub topic: Ustr,
    /// The priority for the subscription determines the ordering of handlers
    /// receiving messages being processed, higher priority handlers will
    /// receive messages before lower priority handlers.
    pub priority: u8,
    /// The registration sequence, breaking priority ties in insertion order.
    pub sequence: usize,
}

impl Subscription {
    /// Creates a new [`Subscription`] instance.
    #[must_use]
    pub fn new<T: AsRef<str>>(
        topic: T,
        handler: ShareableMessageHandler,
        priority: Option<u8>,
    ) -> Self {
        let handler_id = handler.id();

        Self {
            handler_id,
            topic: Ustr::from(topic.as_ref()),
            handler,
            priority: priority.unwrap_or(0),
            sequence: 0,
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Subscription {{ topic: {}, handler: {}, priority: {} }}",
            self.topic, self.handler_id, self.priority
        )
    }
}

impl PartialEq<Self> for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic && self.handler_id == other.handler_id
    }
}

impl Eq for Subscription {}

impl PartialOrd for Subscription {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Subscription {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl Hash for Subscription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.topic.hash(state);
        self.handler_id.hash(state);
    }
}

/// A generic message bus to facilitate various messaging patterns.
///
/// The bus provides both a producer and consumer API for Pub/Sub, Req/Rep, as
/// well as direct point-to-point messaging to registered endpoints.
pub struct MessageBus {
    /// The name for the message bus.
    pub name: String,
    /// The instance ID associated with the message bus.
    pub instance_id: UUID4,
    subscriptions: IndexMap<Subscription, ()>,
    endpoints: IndexMap<Ustr, ShareableMessageHandler>,
    correlation_index: IndexMap<UUID4, (ShareableMessageHandler, Option<UnixNanos>)>,
    sequence: usize,
}

impl MessageBus {
    /// Creates a new [`MessageBus`] instance.
    #[must_use]
    pub fn new(instance_id: UUID4, name: Option<String>) -> Self {
        Self {
            name: name.unwrap_or_else(|| stringify!(MessageBus).to_owned()),
            instance_id,
            subscriptions: IndexMap::new(),
            endpoints: IndexMap::new(),
            correlation_index: IndexMap::new(),
            sequence: 0,
        }
    }

    /// Returns the registered endpoint addresses.
    #[must_use]
    pub fn endpoints(&self) -> Vec<&str> {
        self.endpoints.keys().map(Ustr::as_str).collect()
    }

    /// Returns the topics for active subscriptions.
    #[must_use]
    pub fn topics(&self) -> Vec<&str> {
        self.subscriptions
            .keys()
            .map(|s| s.topic.as_str())
            .collect()
    }

    /// Returns whether there are subscribers matching the given `topic`.
    #[must_use]
    pub fn has_subscribers<T: AsRef<str>>(&self, topic: T) -> bool {
        let topic = Ustr::from(topic.as_ref());
        self.subscriptions
            .keys()
            .any(|sub| is_matching(&topic, &sub.topic))
    }

    /// Returns the count of subscribers matching the given `topic`.
    #[must_use]
    pub fn subscriptions_count<T: AsRef<str>>(&self, topic: T) -> usize {
        self.matching_subscriptions(&Ustr::from(topic.as_ref()))
            .len()
    }

    /// Returns whether there is a registered endpoint at the given address.
    #[must_use]
    pub fn is_registered<T: AsRef<str>>(&self, endpoint: T) -> bool {
        self.endpoints.contains_key(&Ustr::from(endpoint.as_ref()))
    }

    /// Returns the handler for the given `endpoint`.
    #[must_use]
    pub fn get_endpoint<T: AsRef<str>>(&self, endpoint: T) -> Option<&ShareableMessageHandler> {
        self.endpoints.get(&Ustr::from(endpoint.as_ref()))
    }

    /// Returns the subscriptions whose pattern matches the given `topic`,
    /// sorted by priority then registration order.
    #[must_use]
    pub fn matching_subscriptions(&self, topic: &Ustr) -> Vec<Subscription> {
        let mut matching_subs: Vec<Subscription> = self
            .subscriptions
            .keys()
            .filter(|sub| is_matching(topic, &sub.topic))
            .cloned()
            .collect();

        matching_subs.sort();
        matching_subs
    }

    fn subscribe_topic(
        &mut self,
        topic: &str,
        handler: ShareableMessageHandler,
        priority: Option<u8>,
    ) {
        let mut sub = Subscription::new(topic, handler, priority);
        if self.subscriptions.contains_key(&sub) {
            log::error!("{sub:?} already exists");
            return;
        }
        self.sequence += 1;
        sub.sequence = self.sequence;
        self.subscriptions.insert(sub, ());
    }

    /// Registers a response handler awaiting the given `correlation_id`.
    pub fn register_response_handler(
        &mut self,
        correlation_id: UUID4,
        handler: ShareableMessageHandler,
        deadline_ns: Option<UnixNanos>,
    ) {
        self.correlation_index
            .insert(correlation_id, (handler, deadline_ns));
    }

    /// Removes and returns the response handler for the given `correlation_id`.
    pub fn take_response_handler(
        &mut self,
        correlation_id: &UUID4,
    ) -> Option<ShareableMessageHandler> {
        self.correlation_index
            .shift_remove(correlation_id)
            .map(|(handler, _)| handler)
    }

    /// Removes the response handler for the given `correlation_id` without
    /// invoking it (request cancellation - any late response is ignored).
    pub fn cancel_request(&mut self, correlation_id: &UUID4) {
        self.correlation_index.shift_remove(correlation_id);
    }

    /// Returns the count of unresolved requests.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.correlation_index.len()
    }

    /// Garbage-collects unresolved requests whose deadline has passed,
    /// logging a warning for each.
    pub fn gc_requests(&mut self, ts_now: UnixNanos) {
        self.correlation_index.retain(|correlation_id, (_, deadline)| {
            match deadline {
                Some(deadline) if *deadline <= ts_now => {
                    log::warn!(
                        "Request {correlation_id} unresolved past deadline {deadline}, dropping",
                    );
                    false
                }
                _ => true,
            }
        });
    }

    /// Drops all unresolved requests (shutdown).
    pub fn clear_requests(&mut self) {
        self.correlation_index.clear();
    }
}

/// Matches a concrete dot-delimited `topic` against a subscription `pattern`.
///
/// Pattern wildcards:
///  - `*` matches exactly one topic segment.
///  - `#` matches zero or more topic segments.
#[must_use]
pub fn is_matching(topic: &Ustr, pattern: &Ustr) -> bool {
    let topic_segs: Vec<&str> = topic.split('.').collect();
    let pattern_segs: Vec<&str> = pattern.split('.').collect();

    let n = topic_segs.len();
    let m = pattern_segs.len();

    // table[i][j]: first i topic segments match first j pattern segments
    let mut table = vec![vec![false; m + 1]; n + 1];
    table[0][0] = true;

    for (j, seg) in pattern_segs.iter().enumerate() {
        if *seg == "#" {
            table[0][j + 1] = table[0][j];
        }
    }

    for i in 0..n {
        for (j, seg) in pattern_segs.iter().enumerate() {
            if *seg == "#" {
                table[i + 1][j + 1] = table[i][j + 1] || table[i + 1][j];
            } else if *seg == "*" || topic_segs[i] == *seg {
                table[i + 1][j + 1] = table[i][j];
            }
        }
    }

    table[n][m]
}

impl Default for MessageBus {
    /// Creates a new default [`MessageBus`] instance.
    fn default() -> Self {
        Self::new(UUID4::new(), None)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use rstest::rstest;

    use super::{handler::TypedMessageHandler, *};

    fn stub_handler(id: &str) -> ShareableMessageHandler {
        ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
            Some(id),
            |_msg: &String| {},
        )))
    }

    fn counting_handler(id: &str) -> (ShareableMessageHandler, Rc<RefCell<Vec<String>>>) {
        let received: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let received_clone = received.clone();
        let handler = ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
            Some(id),
            move |msg: &String| {
                received_clone.borrow_mut().push(msg.clone());
            },
        )));
        (handler, received)
    }

    #[rstest]
    fn test_new_bus() {
        let msgbus = MessageBus::new(UUID4::new(), None);
        assert_eq!(msgbus.name, stringify!(MessageBus));
        assert!(msgbus.endpoints().is_empty());
        assert!(msgbus.topics().is_empty());
    }

    #[rstest]
    #[case("data.quotes.BINANCE", "data.quotes.BINANCE", true)]
    #[case("data.quotes.BINANCE", "data.quotes.BYBIT", false)]
    #[case("data.quotes.BINANCE", "data.*.BINANCE", true)]
    #[case("data.quotes.BINANCE", "data.*", false)] // `*` is exactly one segment
    #[case("data.quotes.BINANCE", "data.#", true)]
    #[case("data.quotes.BINANCE", "#", true)]
    #[case("data.quotes.BINANCE", "data.#.BINANCE", true)]
    #[case("data.quotes", "data.#.BINANCE", false)]
    #[case("data.trades.BINANCE.ETHUSDT", "data.trades.*.*", true)]
    #[case("data.trades.BINANCE.ETHUSDT", "data.#.ETHUSDT", true)]
    #[case("data", "data.#", true)] // `#` matches zero segments
    #[case("data", "data.*", false)]
    #[case("events.order.S-001", "events.order.*", true)]
    fn test_is_matching(#[case] topic: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(
            is_matching(&Ustr::from(topic), &Ustr::from(pattern)),
            expected
        );
    }

    #[rstest]
    fn test_subscribe_and_match() {
        let mut msgbus = MessageBus::new(UUID4::new(), None);
        msgbus.subscribe_topic("data.quotes.*", stub_handler("h1"), None);

        assert!(msgbus.has_subscribers("data.quotes.BINANCE"));
        assert!(!msgbus.has_subscribers("data.trades.BINANCE"));
        assert_eq!(msgbus.subscriptions_count("data.quotes.BINANCE"), 1);
    }

    #[rstest]
    fn test_matching_subscriptions_priority_order() {
        let mut msgbus = MessageBus::new(UUID4::new(), None);
        msgbus.subscribe_topic("my-topic", stub_handler("h1"), None);
        msgbus.subscribe_topic("my-topic", stub_handler("h2"), None);
        msgbus.subscribe_topic("my-topic", stub_handler("h3"), Some(1));
        msgbus.subscribe_topic("my-topic", stub_handler("h4"), Some(2));

        let subs = msgbus.matching_subscriptions(&Ustr::from("my-topic"));
        assert_eq!(subs.len(), 4);
        assert_eq!(subs[0].handler_id, Ustr::from("h4"));
        assert_eq!(subs[1].handler_id, Ustr::from("h3"));
        // Equal priorities fire in registration order
        assert_eq!(subs[2].handler_id, Ustr::from("h1"));
        assert_eq!(subs[3].handler_id, Ustr::from("h2"));
    }

    #[rstest]
    fn test_duplicate_subscription_is_noop() {
        let mut msgbus = MessageBus::new(UUID4::new(), None);
        let handler = stub_handler("h1");
        msgbus.subscribe_topic("my-topic", handler.clone(), None);
        msgbus.subscribe_topic("my-topic", handler, None);

        assert_eq!(msgbus.subscriptions_count("my-topic"), 1);
    }

    #[rstest]
    fn test_endpoint_register_replace_deregister() {
        let mut msgbus = MessageBus::new(UUID4::new(), None);
        msgbus
            .endpoints
            .insert(Ustr::from("DataEngine.execute"), stub_handler("h1"));
        // Re-register replaces atomically
        msgbus
            .endpoints
            .insert(Ustr::from("DataEngine.execute"), stub_handler("h2"));

        assert_eq!(
            msgbus
                .get_endpoint("DataEngine.execute")
                .map(|handler| handler.id()),
            Some(Ustr::from("h2"))
        );

        msgbus.endpoints.shift_remove(&Ustr::from("DataEngine.execute"));
        assert!(!msgbus.is_registered("DataEngine.execute"));
    }

    #[rstest]
    fn test_response_handler_round_trip() {
        let mut msgbus = MessageBus::new(UUID4::new(), None);
        let (handler, received) = counting_handler("resp");
        let correlation_id = UUID4::new();

        msgbus.register_response_handler(correlation_id, handler, None);
        assert_eq!(msgbus.pending_requests(), 1);

        let taken = msgbus.take_response_handler(&correlation_id).unwrap();
        taken.0.handle(&"response-data".to_string());
        assert_eq!(received.borrow().len(), 1);
        assert_eq!(msgbus.pending_requests(), 0);

        // Late response: handler already consumed
        assert!(msgbus.take_response_handler(&correlation_id).is_none());
    }

    #[rstest]
    fn test_gc_requests_drops_expired() {
        let mut msgbus = MessageBus::new(UUID4::new(), None);
        msgbus.register_response_handler(
            UUID4::new(),
            stub_handler("r1"),
            Some(UnixNanos::from(100)),
        );
        msgbus.register_response_handler(UUID4::new(), stub_handler("r2"), None);

        msgbus.gc_requests(UnixNanos::from(200));
        assert_eq!(msgbus.pending_requests(), 1);
    }
}
