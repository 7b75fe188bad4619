//! bim Clocks Core - mirrors the user's clock alarms onto the bim bus
//!
//! The settings store keeps a declarative list of alarms; the bim bus takes
//! imperative `add_alarm` / `remove_alarm` calls. This library bridges the
//! two:
//! 1. **Record extraction**: pull `id` / `ring_time` out of loosely typed records
//! 2. **Reconciliation**: diff each snapshot against what was already published
//! 3. **Drivers**: follow the settings store, or inject simulated alarms
//! 4. **Agent runtime**: pick a driver from the configuration and run it

pub mod agent_runtime;
pub mod driver;
pub mod error;
pub mod reconciler;
pub mod record;
pub mod settings_driver;
pub mod simulator;

// Re-export key types for convenience
pub use agent_runtime::{default_agent, AgentConfig, AlarmAgent, APP_ID};
pub use driver::{AlarmDriver, DriverKind};
pub use error::AgentError;
pub use reconciler::{AlarmState, PassReport, ReconcilePolicy, Reconciler};
pub use record::{extract, parse_ring_time, AlarmEntry, RecordError};
pub use settings_driver::SettingsDriver;
pub use simulator::SimulatorDriver;
