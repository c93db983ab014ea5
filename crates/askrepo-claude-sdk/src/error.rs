//! Error types for the Claude Code SDK.

use thiserror::Error;

/// Errors that can occur while driving a Claude Code query.
#[derive(Debug, Error)]
pub enum SdkError {
    /// The Claude CLI could not be started.
    #[error("failed to start Claude Code: {0}")]
    Spawn(#[source] std::io::Error),

    /// The Claude process exited abnormally.
    #[error("Claude Code exited with an error: {0}")]
    Process(String),

    /// I/O failure on the message stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SdkError {
    /// True when the SDK entry point never started.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn(_))
    }
}
