//! Bus sink writing one JSON object per call to stdout.

use bim_env::{AlarmId, BusCall, BusSink, EnvError, Timestamp};
use std::io::Write;

/// Writes `{"method":"add_alarm",...}` lines, flushed per call so a
/// downstream reader sees them immediately.
pub struct StdoutBus;

impl StdoutBus {
    fn send(&self, call: BusCall) -> Result<(), EnvError> {
        let line = serde_json::to_string(&call).map_err(|e| EnvError::bus(e.to_string()))?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)
            .and_then(|_| out.flush())
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::BrokenPipe => EnvError::BusClosed,
                _ => EnvError::bus(e.to_string()),
            })
    }
}

impl BusSink for StdoutBus {
    fn add_alarm(&self, clock_id: &AlarmId, timestamp: Timestamp) -> Result<(), EnvError> {
        self.send(BusCall::AddAlarm {
            clock_id: clock_id.clone(),
            timestamp,
        })
    }

    fn remove_alarm(&self, clock_id: &AlarmId) -> Result<(), EnvError> {
        self.send(BusCall::RemoveAlarm {
            clock_id: clock_id.clone(),
        })
    }
}
