//! Backend selection and the single entry point for starting runs.

use std::path::Path;

use askrepo_claude_sdk::ClaudeAgentClient;
use askrepo_core::{AgentError, AgentKind};
use tracing::info;
use uuid::Uuid;

use crate::claude;
use crate::cursor::CursorMapper;
use crate::gemini::GeminiMapper;
use crate::handle::RunHandle;
use crate::process::{self, ProcessSpec};
use crate::prompt;

/// Dispatches runs to the configured backend.
///
/// Constructed once at startup from resolved configuration and shared by
/// reference; the selected backend is immutable for the process lifetime.
/// Unknown kinds never get this far - `AgentKind` parsing fails eagerly in
/// the configuration layer.
#[derive(Debug, Clone)]
pub struct AgentDispatcher {
    kind: AgentKind,
    command: String,
    model: Option<String>,
}

impl AgentDispatcher {
    /// Build a dispatcher for the given kind.
    ///
    /// `command` overrides the kind's default executable; `model` is only
    /// meaningful for the SDK backend.
    pub fn new(kind: AgentKind, command: Option<String>, model: Option<String>) -> Self {
        let command = command.unwrap_or_else(|| kind.default_command().to_string());
        Self {
            kind,
            command,
            model,
        }
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Start a run for `(working_dir, prompt)`.
    ///
    /// The prompt is augmented with the read-only safety suffix before it
    /// reaches any backend. Returns the uniform [`RunHandle`]; a launch
    /// failure is reported here, before any events exist.
    pub fn start(&self, working_dir: &Path, prompt: &str) -> Result<RunHandle, AgentError> {
        let run_id = Uuid::new_v4();
        let prompt = prompt::augment(prompt);

        info!(
            run_id = %run_id,
            kind = %self.kind,
            working_dir = %working_dir.display(),
            prompt_len = prompt.len(),
            "Starting agent run"
        );

        match self.kind {
            AgentKind::Cursor => process::spawn_run(
                ProcessSpec {
                    program: self.command.clone(),
                    args: vec!["-p", "--output-format", "stream-json"],
                    working_dir: working_dir.to_path_buf(),
                    prompt,
                },
                CursorMapper::new(),
            ),
            AgentKind::Gemini => process::spawn_run(
                ProcessSpec {
                    program: self.command.clone(),
                    args: vec!["--output-format", "stream-json"],
                    working_dir: working_dir.to_path_buf(),
                    prompt,
                },
                GeminiMapper::new(),
            ),
            AgentKind::Claude => {
                let mut client = ClaudeAgentClient::new(&self.command);
                if let Some(model) = &self.model {
                    client = client.with_model(model);
                }
                claude::spawn_run(&client, &self.command, working_dir, &prompt)
            }
        }
    }
}
