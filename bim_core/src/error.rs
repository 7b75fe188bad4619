use bim_env::EnvError;
use thiserror::Error;

/// Errors surfaced by the agent to its hosting process.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Attaching to the settings source failed; the agent cannot run.
    #[error("failed to subscribe to settings source: {0}")]
    Subscribe(#[source] EnvError),

    #[error("invalid application id: {0:?}")]
    InvalidAppId(String),

    #[error("agent already started")]
    AlreadyStarted,

    #[error("agent not started")]
    NotStarted,
}
