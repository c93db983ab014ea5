//! Error taxonomy shared by the dispatcher and backend adapters.

use thiserror::Error;

/// Errors surfaced by the dispatcher and backend adapters.
///
/// `Launch` is deliberately distinct from a terminal `Error` event: it means
/// the run never started, so callers can print installation guidance instead
/// of relaying it as agent output.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The external process or SDK entry point could not be started.
    #[error("could not launch '{command}': {reason}. Ensure the agent CLI is installed and on your PATH.")]
    Launch { command: String, reason: String },

    /// Unknown agent kind or missing required setting. Raised before any
    /// run starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure while driving a run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// True when the run could not be started at all.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }
}
