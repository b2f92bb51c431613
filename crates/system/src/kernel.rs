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

//! The `ArgoKernel` assembling and wiring the platform components.
//!
//! A process owns exactly one logical clock and one message bus: the kernel
//! enforces single-instance semantics at construction. All cross-component
//! flows are wired through bus endpoints; engine logic runs to completion per
//! event, with re-entrant commands deferred onto bounded queues drained at
//! the top of the event loop.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

use argo_common::{
    cache::Cache,
    clock::{Clock, LiveClock, TestClock},
    enums::Environment,
    logging::init_logging,
    messages::{data::{DataCommand, DataResponse}, execution::TradingCommand},
    msgbus::{
        self,
        handler::{ShareableMessageHandler, TypedMessageHandler},
        switchboard::{
            DATA_ENGINE_EXECUTE, DATA_ENGINE_RESPONSE, EXEC_ENGINE_EXECUTE, EXEC_ENGINE_PROCESS,
            RISK_ENGINE_EXECUTE,
        },
    },
    timer::{TimeEvent, TimeEventCallback},
};
use argo_core::UUID4;
use argo_data::engine::DataEngine;
use argo_execution::engine::ExecutionEngine;
use argo_model::{events::OrderEventAny, identifiers::TraderId};
use argo_portfolio::Portfolio;
use argo_risk::RiskEngine;
use argo_trading::Trader;

use crate::config::KernelConfig;

thread_local! {
    static KERNEL_INSTANTIATED: Cell<bool> = const { Cell::new(false) };
}

/// The core system kernel: owns the clock, cache, engines, portfolio and
/// trader, and wires the bus endpoints between them.
pub struct ArgoKernel {
    /// The environment context for the kernel.
    pub environment: Environment,
    /// The trader ID for the kernel.
    pub trader_id: TraderId,
    /// The unique instance ID for the kernel.
    pub instance_id: UUID4,
    /// The system clock (simulated or wall).
    pub clock: Rc<RefCell<dyn Clock>>,
    /// The system cache.
    pub cache: Rc<RefCell<Cache>>,
    /// The data engine.
    pub data_engine: Rc<RefCell<DataEngine>>,
    /// The execution engine.
    pub exec_engine: Rc<RefCell<ExecutionEngine>>,
    /// The risk engine.
    pub risk_engine: Rc<RefCell<RiskEngine>>,
    /// The portfolio.
    pub portfolio: Rc<RefCell<Portfolio>>,
    /// The trader managing strategies.
    pub trader: Trader,
    event_queue: Rc<RefCell<VecDeque<OrderEventAny>>>,
    exec_command_queue: Rc<RefCell<VecDeque<TradingCommand>>>,
    data_command_queue: Rc<RefCell<VecDeque<DataCommand>>>,
}

impl ArgoKernel {
    /// Creates a new [`ArgoKernel`] instance, constructing the clock for the
    /// configured environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a kernel has already been constructed for this
    /// thread (running multiple traders in one process is not supported).
    pub fn new(config: KernelConfig) -> anyhow::Result<Self> {
        let clock: Rc<RefCell<dyn Clock>> = match config.environment {
            Environment::Backtest => Rc::new(RefCell::new(TestClock::new())),
            _ => Rc::new(RefCell::new(LiveClock::new())),
        };
        Self::with_clock(config, clock)
    }

    /// Creates a new [`ArgoKernel`] instance with the given clock.
    ///
    /// # Errors
    ///
    /// Returns an error if a kernel has already been constructed for this
    /// thread.
    pub fn with_clock(
        config: KernelConfig,
        clock: Rc<RefCell<dyn Clock>>,
    ) -> anyhow::Result<Self> {
        KERNEL_INSTANTIATED.with(|instantiated| {
            if instantiated.get() {
                anyhow::bail!(
                    "An `ArgoKernel` is already constructed: running multiple traders in one \
                     process is not supported"
                );
            }
            instantiated.set(true);
            Ok(())
        })?;

        let instance_id = UUID4::new();

        if let Err(e) = init_logging(config.trader_id, instance_id, config.logging.clone()) {
            log::debug!("Logging not initialized: {e}");
        }

        let cache = Rc::new(RefCell::new(Cache::new(Some(config.cache.clone()), None)));
        let data_engine = Rc::new(RefCell::new(DataEngine::new(
            clock.clone(),
            cache.clone(),
            Some(config.data_engine.clone()),
        )));
        let exec_engine = Rc::new(RefCell::new(ExecutionEngine::new(
            clock.clone(),
            cache.clone(),
            Some(config.exec_engine.clone()),
        )));
        let risk_engine = Rc::new(RefCell::new(RiskEngine::new(
            clock.clone(),
            cache.clone(),
            Some(config.risk_engine.clone()),
        )));
        let portfolio = Rc::new(RefCell::new(Portfolio::new(
            clock.clone(),
            cache.clone(),
            Some(config.portfolio.clone()),
        )));

        let kernel = Self {
            environment: config.environment,
            trader_id: config.trader_id,
            instance_id,
            clock,
            cache,
            data_engine,
            exec_engine,
            risk_engine,
            portfolio,
            trader: Trader::new(config.trader_id),
            event_queue: Rc::new(RefCell::new(VecDeque::new())),
            exec_command_queue: Rc::new(RefCell::new(VecDeque::new())),
            data_command_queue: Rc::new(RefCell::new(VecDeque::new())),
        };

        kernel.register_endpoints();
        kernel.register_clock_handler();
        kernel.start_maintenance_timers(&config);
        log::info!(
            "Initialized ArgoKernel {} ({}) for {}",
            kernel.trader_id,
            kernel.instance_id,
            kernel.environment,
        );
        Ok(kernel)
    }

    fn register_endpoints(&self) {
        // Order events: queued then drained so matching-engine emissions
        // arriving mid-process preserve FIFO order without re-entrant borrows
        let event_queue = self.event_queue.clone();
        let exec_engine = self.exec_engine.clone();
        let portfolio = self.portfolio.clone();
        let exec_command_queue = self.exec_command_queue.clone();
        let exec_engine_for_commands = self.exec_engine.clone();

        let drain_events = {
            let event_queue = event_queue.clone();
            let exec_engine = exec_engine.clone();
            let portfolio = portfolio.clone();
            let exec_command_queue = exec_command_queue.clone();
            // Alternates events and commands until quiescent: commands
            // produce events, and event handlers may produce commands
            move || {
                loop {
                    let mut progressed = false;

                    loop {
                        let Ok(mut engine) = exec_engine.try_borrow_mut() else {
                            return; // An outer drain owns the engine
                        };
                        let Some(event) = event_queue.borrow_mut().pop_front() else {
                            break;
                        };
                        engine.process(&event);
                        drop(engine);
                        progressed = true;

                        // Fills flow through to the portfolio after position updates
                        if let OrderEventAny::Filled(fill) = &event {
                            if let Ok(mut portfolio) = portfolio.try_borrow_mut() {
                                portfolio.update_account_from_fill(fill);
                            }
                        }
                    }

                    {
                        let Ok(engine) = exec_engine.try_borrow() else {
                            return;
                        };
                        if let Some(command) = exec_command_queue.borrow_mut().pop_front() {
                            engine.execute(&command);
                            progressed = true;
                        }
                    }

                    if !progressed {
                        break;
                    }
                }
            }
        };

        let drain_for_process = drain_events.clone();
        msgbus::register(
            EXEC_ENGINE_PROCESS,
            ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
                Some("kernel-exec-process"),
                move |event: &OrderEventAny| {
                    let queued = {
                        let mut queue = event_queue.borrow_mut();
                        queue.push_back(event.clone());
                        queue.len()
                    };
                    if queued > msgbus::BACKPRESSURE_QUEUE_BOUND {
                        // Never drop events silently: drain asynchronously
                        log::warn!("Order event queue backpressure: {queued} events queued");
                    }
                    drain_for_process();
                },
            ))),
        );

        let drain_for_execute = drain_events;
        msgbus::register(
            EXEC_ENGINE_EXECUTE,
            ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
                Some("kernel-exec-execute"),
                move |command: &TradingCommand| {
                    exec_command_queue.borrow_mut().push_back(command.clone());
                    if exec_engine_for_commands.try_borrow().is_ok() {
                        drain_for_execute();
                    }
                },
            ))),
        );

        let risk_engine = self.risk_engine.clone();
        msgbus::register(
            RISK_ENGINE_EXECUTE,
            ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
                Some("kernel-risk-execute"),
                move |command: &TradingCommand| {
                    risk_engine.borrow().execute(command.clone());
                },
            ))),
        );

        let data_engine = self.data_engine.clone();
        let data_command_queue = self.data_command_queue.clone();
        msgbus::register(
            DATA_ENGINE_EXECUTE,
            ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
                Some("kernel-data-execute"),
                move |command: &DataCommand| {
                    data_command_queue.borrow_mut().push_back(command.clone());
                    // Drain immediately when the engine is free; otherwise the
                    // owning loop drains at the top of the next event
                    loop {
                        let Ok(mut engine) = data_engine.try_borrow_mut() else {
                            return;
                        };
                        let Some(command) = data_command_queue.borrow_mut().pop_front() else {
                            return;
                        };
                        engine.execute(command);
                    }
                },
            ))),
        );

        let data_engine = self.data_engine.clone();
        msgbus::register(
            DATA_ENGINE_RESPONSE,
            ShareableMessageHandler(Rc::new(TypedMessageHandler::new(
                Some("kernel-data-response"),
                move |response: &DataResponse| {
                    if let Ok(mut engine) = data_engine.try_borrow_mut() {
                        engine.response(response.clone());
                    }
                },
            ))),
        );
    }

    fn register_clock_handler(&self) {
        let data_engine = self.data_engine.clone();
        let callback = TimeEventCallback::from(Rc::new(move |event: TimeEvent| {
            if let Ok(mut engine) = data_engine.try_borrow_mut() {
                engine.handle_time_event(&event);
                engine.check_request_timeouts();
            }
        }) as Rc<dyn Fn(TimeEvent)>);
        self.clock.borrow_mut().register_default_handler(callback);
    }

    fn start_maintenance_timers(&self, config: &KernelConfig) {
        if self.environment != Environment::Backtest {
            if let Some(interval_secs) = config.exec_engine.reconciliation_interval_secs {
                let exec_engine = self.exec_engine.clone();
                let callback = TimeEventCallback::from(Rc::new(move |_event: TimeEvent| {
                    if let Ok(mut engine) = exec_engine.try_borrow_mut() {
                        engine.reconcile_all();
                    }
                }) as Rc<dyn Fn(TimeEvent)>);
                if let Err(e) = self.clock.borrow_mut().set_timer_ns(
                    "RECONCILIATION",
                    interval_secs * 1_000_000_000,
                    None,
                    None,
                    Some(callback),
                    None,
                    None,
                ) {
                    log::error!("Failed to start reconciliation timer: {e}");
                }
            }
        }

        if let Some(interval_secs) = self.portfolio.borrow().snapshot_interval_secs() {
            let portfolio = self.portfolio.clone();
            let callback = TimeEventCallback::from(Rc::new(move |_event: TimeEvent| {
                if let Ok(mut portfolio) = portfolio.try_borrow_mut() {
                    portfolio.snapshot_positions();
                }
            }) as Rc<dyn Fn(TimeEvent)>);
            if let Err(e) = self.clock.borrow_mut().set_timer_ns(
                "SNAPSHOT-POSITIONS",
                interval_secs * 1_000_000_000,
                None,
                None,
                Some(callback),
                None,
                None,
            ) {
                log::error!("Failed to start position snapshot timer: {e}");
            }
        }
    }

    /// Drains any deferred commands and events (call at the top of each
    /// event-loop iteration). Alternates queues until quiescent.
    pub fn drain_queues(&self) {
        loop {
            let mut progressed = false;

            loop {
                let Ok(mut engine) = self.data_engine.try_borrow_mut() else {
                    break;
                };
                let Some(command) = self.data_command_queue.borrow_mut().pop_front() else {
                    break;
                };
                engine.execute(command);
                progressed = true;
            }

            loop {
                let Ok(mut engine) = self.exec_engine.try_borrow_mut() else {
                    break;
                };
                let Some(event) = self.event_queue.borrow_mut().pop_front() else {
                    break;
                };
                engine.process(&event);
                drop(engine);
                progressed = true;
                if let OrderEventAny::Filled(fill) = &event {
                    if let Ok(mut portfolio) = self.portfolio.try_borrow_mut() {
                        portfolio.update_account_from_fill(fill);
                    }
                }
            }

            {
                if let Ok(engine) = self.exec_engine.try_borrow() {
                    if let Some(command) = self.exec_command_queue.borrow_mut().pop_front() {
                        engine.execute(&command);
                        progressed = true;
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        self.trader.drain();
    }

    /// Starts the kernel components and all strategies.
    pub fn start(&mut self) {
        log::info!("Starting ArgoKernel {}", self.trader_id);
        self.data_engine.borrow_mut().start();

        if self.environment != Environment::Backtest {
            // On start and every reconciliation interval, converge local
            // state with each venue's truth
            self.exec_engine.borrow_mut().reconcile_all();
        }

        self.trader.start();
    }

    /// Stops the kernel components and all strategies.
    pub fn stop(&mut self) {
        log::info!("Stopping ArgoKernel {}", self.trader_id);
        self.trader.stop();
        self.data_engine.borrow_mut().stop();
        self.cache.borrow_mut().flush_db();
    }

    /// Resets the kernel components back to a `READY` state.
    pub fn reset(&mut self) {
        self.trader.reset();
        self.data_engine.borrow_mut().reset();
        self.cache.borrow_mut().reset();
        self.clock.borrow_mut().reset();
    }

    /// Disposes the kernel, releasing all resources.
    pub fn dispose(&mut self) {
        self.trader.dispose();
        self.data_engine.borrow_mut().dispose();
    }
}

impl Drop for ArgoKernel {
    fn drop(&mut self) {
        KERNEL_INSTANTIATED.with(|instantiated| instantiated.set(false));
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
    fn test_single_instance_enforced() {
        let kernel = ArgoKernel::new(KernelConfig::default()).unwrap();
        assert_eq!(kernel.environment, Environment::Backtest);

        // A second kernel on the same thread is rejected
        let result = ArgoKernel::new(KernelConfig::default());
        assert!(result.is_err());

        drop(kernel);
        // After disposal a new kernel may be constructed
        let kernel = ArgoKernel::new(KernelConfig::default()).unwrap();
        drop(kernel);
    }
}
