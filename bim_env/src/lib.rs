//! bim Environment Abstraction Layer
//!
//! This crate provides the seams between the clocks agent and the world
//! around it, so the reconciliation core can run against the real session
//! (settings store + bim bus) or against in-memory collaborators in tests
//! and simulation.
//!
//! # Core Concept: Pull on Notify
//!
//! The settings source never pushes alarm data. It only signals that the
//! stored list changed; the consumer re-reads the full snapshot:
//!
//! ```text
//! SettingsSource ──(changed)──► Subscription ──► get_alarms() ──► Reconciler ──► BusSink
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bim_env::{BusSink, SettingsSource};
//!
//! async fn watch<Src: SettingsSource, Bus: BusSink>(source: &Src, bus: &Bus) {
//!     let mut subscription = source.subscribe()?;
//!     while subscription.changed().await {
//!         if let Some(snapshot) = source.get_alarms() {
//!             // diff against what was already published, drive the bus
//!         }
//!     }
//! }
//! ```

mod bus;
mod context;
mod error;
mod memory;
mod settings;
mod system_impl;
mod types;

pub use bus::{BusCall, BusSink};
pub use context::AgentContext;
pub use error::EnvError;
pub use memory::{MemorySettings, RecordingBus};
pub use settings::{ChangeNotifier, SettingsSource, Subscription};
pub use system_impl::SystemContext;
pub use types::{AlarmId, AlarmRecord, AlarmSnapshot, RecordValue, Timestamp};
