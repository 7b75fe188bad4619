//! Alarm drivers - what feeds the bus.
//!
//! Two implementations exist:
//!
//! - [`SettingsDriver`](crate::SettingsDriver): follows the settings store
//!   and reconciles on every change
//! - [`SimulatorDriver`](crate::SimulatorDriver): injects two synthetic
//!   alarms once, for exercising the bus and the downstream scheduler

use crate::error::AgentError;
use crate::reconciler::Reconciler;
use async_trait::async_trait;
use bim_env::BusSink;

/// Which driver an agent was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Settings,
    Simulator,
}

impl DriverKind {
    pub fn name(&self) -> &'static str {
        match self {
            DriverKind::Settings => "settings",
            DriverKind::Simulator => "simulator",
        }
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A source of bus calls, run on the agent's event loop.
///
/// All methods are invoked from a single task; implementations need no
/// internal locking around the reconciler.
#[async_trait]
pub trait AlarmDriver: Send {
    fn kind(&self) -> DriverKind;

    /// Attaches to the alarm source and publishes the initial state.
    fn start(&mut self, reconciler: &mut Reconciler, bus: &dyn BusSink) -> Result<(), AgentError>;

    /// Handles every notification already queued, without waiting.
    ///
    /// Returns the number of notifications consumed.
    fn process_pending(&mut self, reconciler: &mut Reconciler, bus: &dyn BusSink) -> usize;

    /// Handles notifications until the source goes away.
    async fn run(&mut self, reconciler: &mut Reconciler, bus: &dyn BusSink) -> Result<(), AgentError>;

    /// Detaches from the source. Nothing is sent to the bus.
    fn stop(&mut self);
}
