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

//! The execution client fronting a `SimulatedExchange`.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use argo_common::messages::execution::{
    CancelAllOrders, CancelOrder, ModifyOrder, QueryOrder, SubmitOrder, SubmitOrderList,
    TradingCommand,
};
use argo_execution::client::ExecutionClient;
use argo_model::{
    enums::OmsType,
    identifiers::{AccountId, ClientId, Venue},
    reports::{FillReport, OrderStatusReport, PositionStatusReport},
};

use crate::exchange::SimulatedExchange;

/// An execution client forwarding commands to a [`SimulatedExchange`].
///
/// Commands enqueue on the exchange's venue-local command sink; when the
/// exchange is free they process immediately, otherwise the exchange drains
/// them at the end of its current data event.
pub struct BacktestExecutionClient {
    client_id: ClientId,
    exchange: Rc<RefCell<SimulatedExchange>>,
    command_sink: Rc<RefCell<VecDeque<TradingCommand>>>,
}

impl BacktestExecutionClient {
    /// Creates a new [`BacktestExecutionClient`] instance.
    #[must_use]
    pub fn new(exchange: Rc<RefCell<SimulatedExchange>>) -> Self {
        let client_id = ClientId::new(exchange.borrow().venue.as_str());
        let command_sink = exchange.borrow().command_sink();
        Self {
            client_id,
            exchange,
            command_sink,
        }
    }

    fn enqueue(&self, command: TradingCommand) {
        self.command_sink.borrow_mut().push_back(command);
        if let Ok(mut exchange) = self.exchange.try_borrow_mut() {
            exchange.process_queue();
        }
        // Otherwise the exchange drains its sink after the current event
    }
}

impl ExecutionClient for BacktestExecutionClient {
    fn client_id(&self) -> ClientId {
        self.client_id
    }

    fn account_id(&self) -> AccountId {
        self.exchange.borrow().account_id
    }

    fn venue(&self) -> Venue {
        self.exchange.borrow().venue
    }

    fn oms_type(&self) -> OmsType {
        self.exchange.borrow().oms_type
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn submit_order(&self, cmd: &SubmitOrder) -> anyhow::Result<()> {
        self.enqueue(TradingCommand::SubmitOrder(cmd.clone()));
        Ok(())
    }

    fn submit_order_list(&self, cmd: &SubmitOrderList) -> anyhow::Result<()> {
        self.enqueue(TradingCommand::SubmitOrderList(cmd.clone()));
        Ok(())
    }

    fn modify_order(&self, cmd: &ModifyOrder) -> anyhow::Result<()> {
        self.enqueue(TradingCommand::ModifyOrder(cmd.clone()));
        Ok(())
    }

    fn cancel_order(&self, cmd: &CancelOrder) -> anyhow::Result<()> {
        self.enqueue(TradingCommand::CancelOrder(cmd.clone()));
        Ok(())
    }

    fn cancel_all_orders(&self, cmd: &CancelAllOrders) -> anyhow::Result<()> {
        self.enqueue(TradingCommand::CancelAllOrders(cmd.clone()));
        Ok(())
    }

    fn query_order(&self, cmd: &QueryOrder) -> anyhow::Result<()> {
        self.enqueue(TradingCommand::QueryOrder(cmd.clone()));
        Ok(())
    }

    fn generate_order_status_reports(&self) -> anyhow::Result<Vec<OrderStatusReport>> {
        // The simulated venue's truth is the local state itself
        Ok(Vec::new())
    }

    fn generate_fill_reports(&self) -> anyhow::Result<Vec<FillReport>> {
        Ok(Vec::new())
    }

    fn generate_position_status_reports(&self) -> anyhow::Result<Vec<PositionStatusReport>> {
        Ok(Vec::new())
    }
}
