//! The closed set of supported backend variants.

use std::fmt;
use std::str::FromStr;

use crate::error::AgentError;

/// Which external agent backs a run.
///
/// Resolved exactly once from configuration at startup and immutable for
/// the process lifetime; it is never part of per-request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Cursor CLI, strict `type`/`subtype` NDJSON output.
    Cursor,
    /// Gemini CLI, lenient `init`/`message`/`result` NDJSON output.
    Gemini,
    /// Claude Code driven through its SDK crate.
    Claude,
}

impl AgentKind {
    /// The command invoked when no override is configured.
    pub fn default_command(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor-agent",
            Self::Gemini => "gemini",
            Self::Claude => "claude",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Gemini => "gemini",
            Self::Claude => "claude",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cursor" => Ok(Self::Cursor),
            "gemini" => Ok(Self::Gemini),
            "claude" => Ok(Self::Claude),
            other => Err(AgentError::Config(format!(
                "unknown agent kind '{other}' (expected one of: cursor, gemini, claude)"
            ))),
        }
    }
}
