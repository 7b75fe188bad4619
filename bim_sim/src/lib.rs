//! bim Clocks Simulation Harness
//!
//! Runs the real `AlarmAgent` against in-memory collaborators so every
//! bus call can be checked:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Harness                           │
//! │                                                          │
//! │  MemorySettings ──(notify)──► AlarmAgent ──► RecordingBus │
//! │                                   ▲                      │
//! │                             SimContext                   │
//! │                  (virtual clock + ChaCha8Rng(seed))      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use bim_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Mixed);
//! assert!(result.passed);
//! ```

mod context;
pub mod runner;
pub mod scenarios;

pub use context::{SimContext, DEFAULT_EPOCH_SECS};
pub use runner::{Harness, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
