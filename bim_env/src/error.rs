//! Error types for the bim environment abstraction.

use thiserror::Error;

/// Errors that can occur at the agent's environment seams.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The bus transport rejected a call
    #[error("Bus send failed: {0}")]
    BusSend(String),

    /// The bus connection is gone
    #[error("Bus closed")]
    BusClosed,

    /// Could not attach to the settings source
    #[error("Subscribe failed: {0}")]
    Subscribe(String),
}

impl EnvError {
    /// Creates a bus send error.
    pub fn bus(msg: impl Into<String>) -> Self {
        Self::BusSend(msg.into())
    }

    /// Creates a subscribe error.
    pub fn subscribe(msg: impl Into<String>) -> Self {
        Self::Subscribe(msg.into())
    }
}
