//! Agent Runtime - wires a driver, the reconciler and the bus together.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        AlarmAgent                           │
//! │  ┌──────────────────────┐      ┌─────────────────────────┐  │
//! │  │ driver: AlarmDriver  │─────►│ Reconciler              │  │
//! │  │  • SettingsDriver    │      │  • published set        │  │
//! │  │  • SimulatorDriver   │      └────────────┬────────────┘  │
//! │  └──────────┬───────────┘                   │               │
//! │             │        (simulator bypass)     ▼               │
//! │             └──────────────────────────► BusSink            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use bim_core::{AgentConfig, AlarmAgent};
//! use bim_env::SystemContext;
//!
//! let mut agent = AlarmAgent::new(AgentConfig::default(), SystemContext::shared(), settings, bus)?;
//! agent.start()?;
//! agent.run().await?;
//! ```

use crate::driver::{AlarmDriver, DriverKind};
use crate::error::AgentError;
use crate::reconciler::{ReconcilePolicy, Reconciler};
use crate::settings_driver::SettingsDriver;
use crate::simulator::SimulatorDriver;
use bim_env::{AgentContext, AlarmId, BusSink, SettingsSource};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::info;

/// Application id; the clock id of simulated alarms.
pub const APP_ID: &str = "org.bim.ClocksAgent";

/// Configuration for an alarm agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent's logical name (for logging)
    pub name: String,

    /// Application id, used as clock id by the simulator (default: `APP_ID`)
    pub app_id: String,

    /// Inject synthetic alarms instead of following the settings store
    pub simulate: bool,

    /// Reconciliation options
    pub policy: ReconcilePolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "bim-clocks".to_string(),
            app_id: APP_ID.to_string(),
            simulate: false,
            policy: ReconcilePolicy::default(),
        }
    }
}

impl AgentConfig {
    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// The clocks agent: one driver feeding one bus through one reconciler.
///
/// The driver is fixed at construction from `config.simulate`; the
/// configuration cannot change afterwards.
pub struct AlarmAgent {
    config: AgentConfig,
    bus: Arc<dyn BusSink>,
    reconciler: Reconciler,
    driver: Box<dyn AlarmDriver>,
    started: bool,
}

impl AlarmAgent {
    /// Creates an agent. Nothing is subscribed or sent until [`start`](Self::start).
    pub fn new<Ctx, Src, Bus>(
        config: AgentConfig,
        context: Arc<Ctx>,
        source: Arc<Src>,
        bus: Arc<Bus>,
    ) -> Result<Self, AgentError>
    where
        Ctx: AgentContext,
        Src: SettingsSource,
        Bus: BusSink,
    {
        let driver: Box<dyn AlarmDriver> = if config.simulate {
            let clock_id = AlarmId::new(config.app_id.as_str())
                .ok_or_else(|| AgentError::InvalidAppId(config.app_id.clone()))?;
            Box::new(SimulatorDriver::new(context, clock_id))
        } else {
            Box::new(SettingsDriver::new(source))
        };

        Ok(Self {
            reconciler: Reconciler::new(config.policy),
            config,
            bus,
            driver,
            started: false,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Whether this agent runs the simulator.
    pub fn simulate(&self) -> bool {
        self.config.simulate
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.driver.kind()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Attaches the driver: subscribes and reconciles once, or injects the
    /// simulated alarms.
    ///
    /// A subscription failure is returned and leaves the agent stopped.
    pub fn start(&mut self) -> Result<(), AgentError> {
        if self.started {
            return Err(AgentError::AlreadyStarted);
        }
        self.driver.start(&mut self.reconciler, self.bus.as_ref())?;
        self.started = true;
        info!(
            "Agent {} started with {} driver ({} alarms published)",
            self.config.name,
            self.driver.kind(),
            self.reconciler.len()
        );
        Ok(())
    }

    /// Runs the passes for notifications already queued. Never waits.
    pub fn process_pending(&mut self) -> usize {
        if !self.started {
            return 0;
        }
        self.driver.process_pending(&mut self.reconciler, self.bus.as_ref())
    }

    /// Runs the event loop until the source goes away, starting first if
    /// needed. Returns immediately for the simulator.
    pub async fn run(&mut self) -> Result<(), AgentError> {
        if !self.started {
            self.start()?;
        }
        self.driver.run(&mut self.reconciler, self.bus.as_ref()).await
    }

    /// Drops the subscription and forgets the published set without
    /// sending removals.
    pub fn shutdown(&mut self) {
        self.driver.stop();
        self.reconciler.clear();
        self.started = false;
        info!("Agent {} shut down", self.config.name);
    }
}

static DEFAULT_AGENT: OnceLock<Arc<Mutex<AlarmAgent>>> = OnceLock::new();

/// Returns the process-wide agent, building it with `init` on first use.
///
/// Later calls return the same agent and never run `init`, so the
/// configuration of the first successful call sticks for the lifetime of
/// the process. If `init` fails, nothing is stored.
pub fn default_agent<F>(init: F) -> Result<Arc<Mutex<AlarmAgent>>, AgentError>
where
    F: FnOnce() -> Result<AlarmAgent, AgentError>,
{
    if let Some(agent) = DEFAULT_AGENT.get() {
        return Ok(Arc::clone(agent));
    }
    let agent = Arc::new(Mutex::new(init()?));
    Ok(Arc::clone(DEFAULT_AGENT.get_or_init(|| agent)))
}
