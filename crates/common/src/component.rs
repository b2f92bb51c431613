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

//! The component finite-state machine driving lifecycle transitions.

use crate::enums::{ComponentState, ComponentTrigger};

impl ComponentState {
    /// Processes the given `trigger`, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns an error if the trigger is invalid from the current state.
    pub fn transition(&self, trigger: &ComponentTrigger) -> anyhow::Result<Self> {
        let new_state = match (self, trigger) {
            (Self::PreInitialized, ComponentTrigger::Initialize) => Self::Ready,
            (Self::Ready, ComponentTrigger::Start) => Self::Starting,
            (Self::Ready, ComponentTrigger::Reset) => Self::Resetting,
            (Self::Ready, ComponentTrigger::Dispose) => Self::Disposing,
            (Self::Starting, ComponentTrigger::StartCompleted) => Self::Running,
            (Self::Starting, ComponentTrigger::Stop) => Self::Stopping,
            (Self::Running, ComponentTrigger::Stop) => Self::Stopping,
            (Self::Stopping, ComponentTrigger::StopCompleted) => Self::Stopped,
            (Self::Stopped, ComponentTrigger::Reset) => Self::Resetting,
            (Self::Stopped, ComponentTrigger::Start) => Self::Starting,
            (Self::Stopped, ComponentTrigger::Dispose) => Self::Disposing,
            (Self::Resetting, ComponentTrigger::ResetCompleted) => Self::Ready,
            (Self::Disposing, ComponentTrigger::DisposeCompleted) => Self::Disposed,
            _ => anyhow::bail!("Invalid state trigger {self} -> {trigger}"),
        };
        Ok(new_state)
    }
}

/// A system component with a managed lifecycle.
///
/// Lifecycle callbacks are invoked exactly once per transition by the owning
/// runner. Operations on a component should be rejected before it is
/// `RUNNING`.
pub trait Component {
    /// Returns the current component state.
    fn state(&self) -> ComponentState;

    /// Transitions the component state with the given trigger.
    ///
    /// # Errors
    ///
    /// Returns an error if the trigger is invalid from the current state.
    fn transition_state(&mut self, trigger: ComponentTrigger) -> anyhow::Result<()>;

    /// Returns whether the component is in a `READY` state.
    fn is_ready(&self) -> bool {
        self.state() == ComponentState::Ready
    }

    /// Returns whether the component is in a `RUNNING` state.
    fn is_running(&self) -> bool {
        self.state() == ComponentState::Running
    }

    /// Returns whether the component is in a `STOPPED` state.
    fn is_stopped(&self) -> bool {
        self.state() == ComponentState::Stopped
    }

    /// Returns whether the component is in a `DISPOSED` state.
    fn is_disposed(&self) -> bool {
        self.state() == ComponentState::Disposed
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
    fn test_full_lifecycle() {
        let mut state = ComponentState::PreInitialized;
        for trigger in [
            ComponentTrigger::Initialize,
            ComponentTrigger::Start,
            ComponentTrigger::StartCompleted,
            ComponentTrigger::Stop,
            ComponentTrigger::StopCompleted,
            ComponentTrigger::Reset,
            ComponentTrigger::ResetCompleted,
            ComponentTrigger::Dispose,
            ComponentTrigger::DisposeCompleted,
        ] {
            state = state.transition(&trigger).unwrap();
        }
        assert_eq!(state, ComponentState::Disposed);
    }

    #[rstest]
    fn test_reset_returns_to_ready() {
        let state = ComponentState::Stopped;
        let state = state.transition(&ComponentTrigger::Reset).unwrap();
        assert_eq!(state, ComponentState::Resetting);
        let state = state.transition(&ComponentTrigger::ResetCompleted).unwrap();
        assert_eq!(state, ComponentState::Ready);
    }

    #[rstest]
    fn test_invalid_trigger() {
        let state = ComponentState::PreInitialized;
        assert!(state.transition(&ComponentTrigger::Start).is_err());
    }
}
