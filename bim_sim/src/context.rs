//! Simulation context implementing AgentContext for deterministic runs.

use bim_env::AgentContext;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default epoch: 2024-01-01 00:00:00 UTC.
pub const DEFAULT_EPOCH_SECS: u64 = 1_704_067_200;

/// Simulation context backed by a virtual clock and a seeded RNG.
///
/// Clones share the clock and the RNG stream.
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since `epoch`)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Deterministic RNG for offsets
    rng: Arc<Mutex<ChaCha8Rng>>,

    /// Wall-clock time at virtual time 0
    epoch: SystemTime,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self::with_epoch(seed, UNIX_EPOCH + Duration::from_secs(DEFAULT_EPOCH_SECS))
    }

    /// Creates a context whose virtual time 0 maps to `epoch`.
    pub fn with_epoch(seed: u64, epoch: SystemTime) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            epoch,
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        *lock(&self.virtual_time_ns) += duration.as_nanos() as u64;
    }

    /// Returns the time elapsed on the virtual clock.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(*lock(&self.virtual_time_ns))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            rng: Arc::clone(&self.rng),
            epoch: self.epoch,
        }
    }
}

impl AgentContext for SimContext {
    fn system_time(&self) -> SystemTime {
        self.epoch + self.elapsed()
    }

    fn random_range(&self, range: Range<i64>) -> i64 {
        lock(&self.rng).gen_range(range)
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_context_time() {
        let ctx = SimContext::new(42);
        assert_eq!(ctx.unix_now(), DEFAULT_EPOCH_SECS as i64);

        ctx.advance_time(Duration::from_secs(1));
        assert_eq!(ctx.unix_now(), DEFAULT_EPOCH_SECS as i64 + 1);

        ctx.advance_time(Duration::from_millis(1500));
        assert_eq!(ctx.elapsed(), Duration::from_millis(2500));
        assert_eq!(ctx.unix_now(), DEFAULT_EPOCH_SECS as i64 + 2);
    }

    #[test]
    fn test_sim_context_deterministic_offsets() {
        let ctx1 = SimContext::new(42);
        let ctx2 = SimContext::new(42);

        let a: Vec<i64> = (0..8).map(|_| ctx1.random_range(30..60)).collect();
        let b: Vec<i64> = (0..8).map(|_| ctx2.random_range(30..60)).collect();

        assert_eq!(a, b);
        assert!(a.iter().all(|v| (30..60).contains(v)));
    }

    #[test]
    fn test_sim_context_seed() {
        let ctx = SimContext::new(12345);
        assert_eq!(ctx.seed(), 12345);
    }

    #[test]
    fn test_sim_context_clone_shares_time() {
        let ctx1 = SimContext::new(42);
        let ctx2 = ctx1.clone();

        ctx1.advance_time(Duration::from_secs(5));

        assert_eq!(ctx1.system_time(), ctx2.system_time());
    }
}
