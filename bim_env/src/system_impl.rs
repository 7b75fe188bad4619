//! Production implementation of AgentContext.

use crate::AgentContext;
use rand::Rng;
use std::ops::Range;
use std::sync::Arc;
use std::time::SystemTime;

/// Production context backed by the system clock and OS-seeded entropy.
pub struct SystemContext;

impl SystemContext {
    /// Creates a new SystemContext.
    pub fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentContext for SystemContext {
    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    fn random_range(&self, range: Range<i64>) -> i64 {
        rand::thread_rng().gen_range(range)
    }

    fn seed(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_system_context_unix_now() {
        let ctx = SystemContext::new();
        let expected = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
        let now = ctx.unix_now();

        assert!((now - expected).abs() <= 1);
    }

    #[test]
    fn test_system_context_random_range() {
        let ctx = SystemContext::new();
        for _ in 0..200 {
            let value = ctx.random_range(30..60);
            assert!((30..60).contains(&value));
        }
    }

    #[test]
    fn test_system_context_seed() {
        assert_eq!(SystemContext::new().seed(), 0);
    }
}
