//! Outbound bim bus abstraction.

use crate::error::EnvError;
use crate::types::{AlarmId, Timestamp};
use serde::{Deserialize, Serialize};

/// The session bus endpoint that receives alarm registrations.
///
/// # Implementations
///
/// - **Production**: the hosting process's bus connection
/// - **Tests/Simulation**: [`RecordingBus`](crate::RecordingBus)
///
/// # Delivery
///
/// Both calls are fire-and-forget. Implementations must deliver them in
/// the order they were issued; the transport may queue internally.
/// An `Err` reports an immediate rejection only, success does not mean
/// the downstream scheduler has acted on the call.
pub trait BusSink: Send + Sync + 'static {
    /// Asks the downstream to wake for `clock_id` at `timestamp`.
    fn add_alarm(&self, clock_id: &AlarmId, timestamp: Timestamp) -> Result<(), EnvError>;

    /// Withdraws a previously registered wake.
    fn remove_alarm(&self, clock_id: &AlarmId) -> Result<(), EnvError>;

    /// Sends a call expressed as a value.
    fn dispatch(&self, call: &BusCall) -> Result<(), EnvError> {
        match call {
            BusCall::AddAlarm { clock_id, timestamp } => self.add_alarm(clock_id, *timestamp),
            BusCall::RemoveAlarm { clock_id } => self.remove_alarm(clock_id),
        }
    }
}

/// One outbound bus call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BusCall {
    AddAlarm { clock_id: AlarmId, timestamp: Timestamp },
    RemoveAlarm { clock_id: AlarmId },
}

impl BusCall {
    /// Builds an `add_alarm` call.
    pub fn add(clock_id: &str, timestamp: Timestamp) -> Option<Self> {
        AlarmId::new(clock_id).map(|clock_id| BusCall::AddAlarm { clock_id, timestamp })
    }

    /// Builds a `remove_alarm` call.
    pub fn remove(clock_id: &str) -> Option<Self> {
        AlarmId::new(clock_id).map(|clock_id| BusCall::RemoveAlarm { clock_id })
    }

    /// The alarm this call is about.
    pub fn clock_id(&self) -> &AlarmId {
        match self {
            BusCall::AddAlarm { clock_id, .. } | BusCall::RemoveAlarm { clock_id } => clock_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_call_wire_shape() {
        let call = BusCall::add("a", 1893456000).unwrap();
        let json = serde_json::to_string(&call).unwrap();
        assert_eq!(json, r#"{"method":"add_alarm","clock_id":"a","timestamp":1893456000}"#);

        let call = BusCall::remove("a").unwrap();
        let json = serde_json::to_string(&call).unwrap();
        assert_eq!(json, r#"{"method":"remove_alarm","clock_id":"a"}"#);
    }

    #[test]
    fn test_bus_call_rejects_empty_id() {
        assert!(BusCall::add("", 0).is_none());
        assert!(BusCall::remove("").is_none());
    }
}
