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

//! The `Trader` component managing strategy lifecycles and event wiring.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use argo_common::{
    actor::DataActor,
    component::Component,
    enums::ComponentTrigger,
    msgbus::{
        self,
        handler::{ShareableMessageHandler, TypedMessageHandler},
        switchboard,
    },
};
use argo_model::{
    events::{OrderEventAny, PositionEvent},
    identifiers::TraderId,
};

use crate::strategy::Strategy;

/// A registered strategy: the handle, its user component, and the pending
/// event queues which defer delivery while the component is re-entered.
struct RegisteredStrategy {
    strategy: Rc<RefCell<Strategy>>,
    actor: Rc<RefCell<dyn DataActor>>,
    pending_orders: Rc<RefCell<VecDeque<OrderEventAny>>>,
    pending_positions: Rc<RefCell<VecDeque<PositionEvent>>>,
}

fn drain_order_events(
    actor: &Rc<RefCell<dyn DataActor>>,
    pending: &Rc<RefCell<VecDeque<OrderEventAny>>>,
) {
    loop {
        let Ok(mut actor) = actor.try_borrow_mut() else {
            return; // Component busy: events deliver once it returns
        };
        let Some(event) = pending.borrow_mut().pop_front() else {
            return;
        };
        actor.on_order_event(&event);
    }
}

fn drain_position_events(
    actor: &Rc<RefCell<dyn DataActor>>,
    pending: &Rc<RefCell<VecDeque<PositionEvent>>>,
) {
    loop {
        let Ok(mut actor) = actor.try_borrow_mut() else {
            return;
        };
        let Some(event) = pending.borrow_mut().pop_front() else {
            return;
        };
        actor.on_position_event(&event);
    }
}

/// Manages a collection of strategies, driving lifecycle transitions exactly
/// once per transition and wiring order/position event delivery.
pub struct Trader {
    /// The trader ID.
    pub trader_id: TraderId,
    strategies: Vec<RegisteredStrategy>,
}

impl Trader {
    /// Creates a new [`Trader`] instance.
    #[must_use]
    pub const fn new(trader_id: TraderId) -> Self {
        Self {
            trader_id,
            strategies: Vec::new(),
        }
    }

    /// Returns the count of registered strategies.
    #[must_use]
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Adds the given strategy and its user component to the trader,
    /// subscribing the component to its order and position event topics.
    pub fn add_strategy(
        &mut self,
        strategy: Rc<RefCell<Strategy>>,
        actor: Rc<RefCell<dyn DataActor>>,
    ) {
        let strategy_id = strategy.borrow().strategy_id;
        let pending_orders: Rc<RefCell<VecDeque<OrderEventAny>>> =
            Rc::new(RefCell::new(VecDeque::new()));
        let pending_positions: Rc<RefCell<VecDeque<PositionEvent>>> =
            Rc::new(RefCell::new(VecDeque::new()));

        // Order events for the strategy route to `on_order_event`
        let actor_for_orders = actor.clone();
        let pending_for_orders = pending_orders.clone();
        let order_handler = ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
            Some(format!("{strategy_id}-order-events")),
            move |event: &OrderEventAny| {
                pending_for_orders.borrow_mut().push_back(event.clone());
                drain_order_events(&actor_for_orders, &pending_for_orders);
            },
        )));
        msgbus::subscribe(
            switchboard::get_order_events_topic(strategy_id),
            order_handler,
            None,
        );

        // Position events for the strategy route to `on_position_event`
        let actor_for_positions = actor.clone();
        let pending_for_positions = pending_positions.clone();
        let position_handler = ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
            Some(format!("{strategy_id}-position-events")),
            move |event: &PositionEvent| {
                pending_for_positions.borrow_mut().push_back(*event);
                drain_position_events(&actor_for_positions, &pending_for_positions);
            },
        )));
        msgbus::subscribe(
            switchboard::get_position_events_topic(strategy_id),
            position_handler,
            None,
        );

        log::info!("Added strategy {strategy_id}");
        self.strategies.push(RegisteredStrategy {
            strategy,
            actor,
            pending_orders,
            pending_positions,
        });
    }

    /// Drains any pending events deferred while components were busy.
    pub fn drain(&self) {
        for registered in &self.strategies {
            drain_order_events(&registered.actor, &registered.pending_orders);
            drain_position_events(&registered.actor, &registered.pending_positions);
        }
    }

    /// Starts all registered strategies (lifecycle callbacks run exactly once).
    pub fn start(&mut self) {
        for registered in &self.strategies {
            let mut strategy = registered.strategy.borrow_mut();
            if strategy.is_running() {
                continue;
            }
            if let Err(e) = strategy.transition_state(ComponentTrigger::Start) {
                log::error!("Error starting strategy: {e}");
                continue;
            }
            drop(strategy);

            registered.actor.borrow_mut().on_start();

            let mut strategy = registered.strategy.borrow_mut();
            if let Err(e) = strategy.transition_state(ComponentTrigger::StartCompleted) {
                log::error!("Error completing strategy start: {e}");
            }
        }
    }

    /// Stops all registered strategies.
    pub fn stop(&mut self) {
        for registered in &self.strategies {
            let mut strategy = registered.strategy.borrow_mut();
            if !strategy.is_running() {
                continue;
            }
            if let Err(e) = strategy.transition_state(ComponentTrigger::Stop) {
                log::error!("Error stopping strategy: {e}");
                continue;
            }
            drop(strategy);

            registered.actor.borrow_mut().on_stop();

            let mut strategy = registered.strategy.borrow_mut();
            if let Err(e) = strategy.transition_state(ComponentTrigger::StopCompleted) {
                log::error!("Error completing strategy stop: {e}");
            }
        }
    }

    /// Resets all registered strategies back to `READY`.
    pub fn reset(&mut self) {
        for registered in &self.strategies {
            let mut strategy = registered.strategy.borrow_mut();
            if let Err(e) = strategy.transition_state(ComponentTrigger::Reset) {
                log::error!("Error resetting strategy: {e}");
                continue;
            }
            drop(strategy);

            registered.actor.borrow_mut().on_reset();

            let mut strategy = registered.strategy.borrow_mut();
            strategy.order_factory.reset();
            if let Err(e) = strategy.transition_state(ComponentTrigger::ResetCompleted) {
                log::error!("Error completing strategy reset: {e}");
            }
        }
    }

    /// Disposes all registered strategies, releasing resources.
    pub fn dispose(&mut self) {
        for registered in &self.strategies {
            let mut strategy = registered.strategy.borrow_mut();
            if let Err(e) = strategy.transition_state(ComponentTrigger::Dispose) {
                log::error!("Error disposing strategy: {e}");
                continue;
            }
            drop(strategy);

            registered.actor.borrow_mut().on_dispose();

            let mut strategy = registered.strategy.borrow_mut();
            if let Err(e) = strategy.transition_state(ComponentTrigger::DisposeCompleted) {
                log::error!("Error completing strategy dispose: {e}");
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use argo_common::{cache::Cache, clock::TestClock, enums::ComponentState};
    use argo_model::identifiers::ComponentId;
    use rstest::rstest;

    use super::*;
    use crate::strategy::StrategyConfig;

    #[derive(Default)]
    struct RecordingActor {
        starts: usize,
        stops: usize,
        resets: usize,
    }

    impl DataActor for RecordingActor {
        fn component_id(&self) -> ComponentId {
            ComponentId::new("RecordingActor")
        }

        fn on_start(&mut self) {
            self.starts += 1;
        }

        fn on_stop(&mut self) {
            self.stops += 1;
        }

        fn on_reset(&mut self) {
            self.resets += 1;
        }
    }

    fn setup() -> (Trader, Rc<RefCell<Strategy>>, Rc<RefCell<RecordingActor>>) {
        let clock = Rc::new(RefCell::new(TestClock::new()));
        let cache = Rc::new(RefCell::new(Cache::default()));
        let strategy = Rc::new(RefCell::new(Strategy::new(
            TraderId::default(),
            StrategyConfig::default(),
            clock,
            cache,
        )));
        let actor = Rc::new(RefCell::new(RecordingActor::default()));

        let mut trader = Trader::new(TraderId::default());
        trader.add_strategy(strategy.clone(), actor.clone());
        (trader, strategy, actor)
    }

    #[rstest]
    fn test_lifecycle_callbacks_exactly_once() {
        let (mut trader, strategy, actor) = setup();

        trader.start();
        assert_eq!(strategy.borrow().state(), ComponentState::Running);
        assert_eq!(actor.borrow().starts, 1);

        // A second start is a no-op for running strategies
        trader.start();
        assert_eq!(actor.borrow().starts, 1);

        trader.stop();
        assert_eq!(strategy.borrow().state(), ComponentState::Stopped);
        assert_eq!(actor.borrow().stops, 1);

        trader.reset();
        assert_eq!(strategy.borrow().state(), ComponentState::Ready);
        assert_eq!(actor.borrow().resets, 1);
    }
}
