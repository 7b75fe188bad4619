//! Core environment context trait for the clocks agent.

use crate::types::Timestamp;
use chrono::{DateTime, Utc};
use std::ops::Range;
use std::time::SystemTime;

/// The agent's window on time and randomness.
///
/// # Implementations
///
/// - **Production**: `SystemContext` - wall clock, thread-local RNG
/// - **Simulation**: `SimContext` (bim_sim) - virtual clock, `ChaCha8Rng(seed)`
///
/// Only the simulator driver draws on this today: it needs "now" and two
/// random offsets.
pub trait AgentContext: Send + Sync + 'static {
    /// Returns the wall-clock time.
    ///
    /// In simulation, this is a virtual clock anchored at a fixed epoch.
    fn system_time(&self) -> SystemTime;

    /// Returns the wall-clock time as whole seconds since the Unix epoch.
    fn unix_now(&self) -> Timestamp {
        DateTime::<Utc>::from(self.system_time()).timestamp()
    }

    /// Draws a value uniformly from `range` (end exclusive).
    ///
    /// `range` must not be empty.
    fn random_range(&self, range: Range<i64>) -> i64;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// Production is not seeded and returns 0.
    fn seed(&self) -> u64;
}
