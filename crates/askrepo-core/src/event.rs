//! Normalized events emitted by backend adapters.
//!
//! Every backend, whatever its native output format, is reduced to this
//! three-shape vocabulary. The serde representation doubles as the NDJSON
//! wire format used by the HTTP streaming endpoint.

use serde::{Deserialize, Serialize};

/// A normalized event produced by a backend adapter during a run.
///
/// `Status` is non-terminal progress; `Result` and `Error` are terminal.
/// Adapters guarantee at most one terminal event per run and nothing after
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Human-readable progress description, e.g. "Reading file: main.rs".
    Status { status: String },

    /// The final answer in markdown. Terminal.
    Result {
        subtype: ResultSubtype,
        result: String,
    },

    /// A fatal condition. Terminal.
    Error { error: String },
}

/// Subtype discriminator carried by `Result` events on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSubtype {
    Success,
}

impl AgentEvent {
    /// Create a status event.
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status {
            status: text.into(),
        }
    }

    /// Create a terminal result event.
    pub fn result(text: impl Into<String>) -> Self {
        Self::Result {
            subtype: ResultSubtype::Success,
            result: text.into(),
        }
    }

    /// Create a terminal error event.
    pub fn error(text: impl Into<String>) -> Self {
        Self::Error { error: text.into() }
    }

    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result { .. } | Self::Error { .. })
    }

    /// The human-readable text carried by the event.
    pub fn text(&self) -> &str {
        match self {
            Self::Status { status } => status,
            Self::Result { result, .. } => result,
            Self::Error { error } => error,
        }
    }
}
