//! Simulator driver - injects synthetic alarms for end-to-end testing.
//!
//! At start it sends two `add_alarm` calls under the agent's own
//! application id, a little under a minute and a little under two minutes
//! from now. The settings store is never consulted and the reconciler's
//! published set is left untouched.

use crate::driver::{AlarmDriver, DriverKind};
use crate::error::AgentError;
use crate::reconciler::Reconciler;
use async_trait::async_trait;
use bim_env::{AgentContext, AlarmId, BusSink, Timestamp};
use std::ops::Range;
use std::sync::Arc;
use tracing::{info, warn};

/// Offset window of the first synthetic alarm, in seconds.
pub const FIRST_OFFSET_SECS: Range<i64> = 30..60;

/// Offset window of the second synthetic alarm, in seconds.
pub const SECOND_OFFSET_SECS: Range<i64> = 80..120;

pub struct SimulatorDriver<Ctx: AgentContext> {
    context: Arc<Ctx>,
    clock_id: AlarmId,
    injected: Vec<Timestamp>,
}

impl<Ctx: AgentContext> SimulatorDriver<Ctx> {
    pub fn new(context: Arc<Ctx>, clock_id: AlarmId) -> Self {
        Self {
            context,
            clock_id,
            injected: Vec::new(),
        }
    }

    /// Timestamps sent so far (empty before `start`).
    pub fn injected(&self) -> &[Timestamp] {
        &self.injected
    }
}

#[async_trait]
impl<Ctx: AgentContext> AlarmDriver for SimulatorDriver<Ctx> {
    fn kind(&self) -> DriverKind {
        DriverKind::Simulator
    }

    fn start(&mut self, _reconciler: &mut Reconciler, bus: &dyn BusSink) -> Result<(), AgentError> {
        if !self.injected.is_empty() {
            return Err(AgentError::AlreadyStarted);
        }

        let now = self.context.unix_now();
        for window in [FIRST_OFFSET_SECS, SECOND_OFFSET_SECS] {
            let timestamp = now + self.context.random_range(window);
            info!("Simulating alarm {} at {} (now {})", self.clock_id, timestamp, now);
            if let Err(e) = bus.add_alarm(&self.clock_id, timestamp) {
                warn!("add_alarm({}, {}) failed: {}", self.clock_id, timestamp, e);
            }
            self.injected.push(timestamp);
        }
        Ok(())
    }

    fn process_pending(&mut self, _reconciler: &mut Reconciler, _bus: &dyn BusSink) -> usize {
        0
    }

    async fn run(&mut self, _reconciler: &mut Reconciler, _bus: &dyn BusSink) -> Result<(), AgentError> {
        if self.injected.is_empty() {
            return Err(AgentError::NotStarted);
        }
        Ok(())
    }

    fn stop(&mut self) {}
}
