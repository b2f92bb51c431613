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

//! The `ExecutionClient` trait defining the venue-side execution interface.

use argo_common::messages::execution::{
    CancelAllOrders, CancelOrder, ModifyOrder, QueryOrder, SubmitOrder, SubmitOrderList,
};
use argo_core::UnixNanos;
use argo_model::{
    enums::OmsType,
    identifiers::{AccountId, ClientId, Venue},
    reports::{ExecutionMassStatus, FillReport, OrderStatusReport, PositionStatusReport},
};

/// A client providing order execution at a single venue.
///
/// Clients emit order events via the bus on the `events.order.*` topics, and
/// produce execution state reports for reconciliation. Clients own their
/// connection/session resources with guaranteed release on all exit paths.
pub trait ExecutionClient {
    /// Returns the client ID.
    fn client_id(&self) -> ClientId;
    /// Returns the account ID for the client's venue.
    fn account_id(&self) -> AccountId;
    /// Returns the venue the client executes at.
    fn venue(&self) -> Venue;
    /// Returns the native order management style for the venue.
    fn oms_type(&self) -> OmsType;
    /// Returns whether the client is connected.
    fn is_connected(&self) -> bool;

    /// Submits the given order to the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission fails at the client boundary.
    fn submit_order(&self, cmd: &SubmitOrder) -> anyhow::Result<()>;

    /// Submits the given order list to the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission fails at the client boundary.
    fn submit_order_list(&self, cmd: &SubmitOrderList) -> anyhow::Result<()>;

    /// Requests a modification of an existing order at the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails at the client boundary.
    fn modify_order(&self, cmd: &ModifyOrder) -> anyhow::Result<()>;

    /// Requests a cancellation of an existing order at the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails at the client boundary.
    fn cancel_order(&self, cmd: &CancelOrder) -> anyhow::Result<()>;

    /// Requests cancellation of all orders for an instrument at the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails at the client boundary.
    fn cancel_all_orders(&self, cmd: &CancelAllOrders) -> anyhow::Result<()>;

    /// Queries the current status of an order at the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails at the client boundary.
    fn query_order(&self, cmd: &QueryOrder) -> anyhow::Result<()>;

    /// Generates order status reports for reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if report generation fails.
    fn generate_order_status_reports(&self) -> anyhow::Result<Vec<OrderStatusReport>>;

    /// Generates fill reports for reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if report generation fails.
    fn generate_fill_reports(&self) -> anyhow::Result<Vec<FillReport>>;

    /// Generates position status reports for reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if report generation fails.
    fn generate_position_status_reports(&self) -> anyhow::Result<Vec<PositionStatusReport>>;

    /// Generates a full execution mass status for reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if report generation fails.
    fn generate_mass_status(&self, ts_init: UnixNanos) -> anyhow::Result<ExecutionMassStatus> {
        let mut mass_status = ExecutionMassStatus::new(
            self.client_id(),
            self.account_id(),
            self.venue(),
            ts_init,
            None,
        );
        for report in self.generate_order_status_reports()? {
            mass_status.add_order_report(report);
        }
        mass_status.add_fill_reports(self.generate_fill_reports()?);
        mass_status.add_position_reports(self.generate_position_status_reports()?);
        Ok(mass_status)
    }
}
