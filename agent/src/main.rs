//! bim Clocks Agent - forwards the user's clock alarms to the bim bus
//!
//! This host wires the agent to:
//! - a settings store fed with JSON alarm lists on stdin
//! - a bus sink writing JSON calls to stdout
//!
//! Logs go to stderr. `BIM_SIMULATE` (any value) switches to the simulator;
//! `BIM_CONFIG` may point at a JSON `AgentConfig`.

use anyhow::{Context, Result};
use bim_core::{default_agent, AgentConfig, AlarmAgent};
use bim_env::{MemorySettings, SystemContext};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod stdin_feed;
mod stdout_bus;

use stdout_bus::StdoutBus;

fn load_config() -> Result<AgentConfig> {
    let mut config = match std::env::var("BIM_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse config file {}", path))?
        }
        Err(_) => AgentConfig::default(),
    };
    if std::env::var("BIM_SIMULATE").is_ok() {
        config.simulate = true;
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config()?;
    let settings = Arc::new(MemorySettings::new());
    let bus = Arc::new(StdoutBus);

    let agent = default_agent(|| {
        AlarmAgent::new(config, SystemContext::shared(), settings.clone(), bus.clone())
    })?;
    let mut agent = agent.lock().await;

    agent.start().context("agent failed to start")?;

    if agent.simulate() {
        info!("Simulated alarms sent, waiting for Ctrl-C");
        tokio::signal::ctrl_c().await?;
    } else {
        let feeder = tokio::spawn(stdin_feed::feed(settings.clone()));
        tokio::select! {
            result = agent.run() => result?,
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        }
        feeder.abort();
    }

    agent.shutdown();
    Ok(())
}
