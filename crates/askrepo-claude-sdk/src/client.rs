//! One-shot query execution against Claude Code.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SdkError;
use crate::types::ClaudeMessage;

/// Client for running one-shot Claude Code queries.
///
/// The command can be just "claude" for PATH lookup, or a full path.
#[derive(Debug, Clone)]
pub struct ClaudeAgentClient {
    command: String,
    model: Option<String>,
}

impl ClaudeAgentClient {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            model: None,
        }
    }

    /// Select a model instead of the CLI default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Start a query in the given working directory.
    ///
    /// Returns a [`Query`] streaming the native messages. Failure to start
    /// the CLI is reported here as [`SdkError::Spawn`]; everything after
    /// launch arrives through the query.
    pub fn query(&self, working_dir: &Path, prompt: &str) -> Result<Query, SdkError> {
        let mut cmd = self.build_command(working_dir, prompt);

        info!(
            command = %self.command,
            working_dir = %working_dir.display(),
            prompt_len = prompt.len(),
            "Starting Claude Code query"
        );

        let mut child = cmd.spawn().map_err(SdkError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SdkError::Process("failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SdkError::Process("failed to capture stderr".to_string()))?;

        let (tx, rx) = mpsc::channel(64);
        let completion = tokio::spawn(drive(child, stdout, stderr, tx));

        Ok(Query {
            messages: rx,
            completion,
        })
    }

    fn build_command(&self, working_dir: &Path, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("--output-format=stream-json");
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }
        cmd.arg("--print").arg(prompt);

        // One-shot mode: nothing is ever written to the CLI's stdin.
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .current_dir(working_dir)
            .kill_on_drop(true);
        cmd
    }
}

/// An in-flight query: a typed message stream plus a completion signal.
#[derive(Debug)]
pub struct Query {
    messages: mpsc::Receiver<ClaudeMessage>,
    completion: JoinHandle<Result<(), SdkError>>,
}

impl Query {
    /// Next native message, or `None` once the stream has ended.
    pub async fn next_message(&mut self) -> Option<ClaudeMessage> {
        self.messages.recv().await
    }

    /// Wait for the underlying call to finish.
    ///
    /// An `Err` means the call ended abnormally (non-zero exit, I/O
    /// failure) - the message stream may not contain a terminal result.
    pub async fn finish(self) -> Result<(), SdkError> {
        match self.completion.await {
            Ok(result) => result,
            Err(e) => Err(SdkError::Process(format!("query driver failed: {e}"))),
        }
    }

    /// Abort the query, killing the underlying call.
    pub fn abort(&self) {
        self.completion.abort();
    }
}

/// Read loop: parse stdout lines into messages, then reconcile the exit.
async fn drive(
    mut child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    tx: mpsc::Sender<ClaudeMessage>,
) -> Result<(), SdkError> {
    let stderr_task = tokio::spawn(collect_stderr(stderr));

    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    let mut message_count = 0u64;

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            debug!(total_messages = message_count, "Claude stdout closed (EOF)");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        message_count += 1;

        match serde_json::from_str::<ClaudeMessage>(trimmed) {
            Ok(message) => {
                if tx.send(message).await.is_err() {
                    debug!("Message receiver dropped, stopping read loop");
                    break;
                }
            }
            Err(e) => {
                let preview: String = trimmed.chars().take(200).collect();
                warn!(error = %e, preview = %preview, "Failed to parse Claude message");
            }
        }
    }

    let status = child.wait().await?;
    let stderr_text = stderr_task.await.unwrap_or_default();

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        let stderr_text = stderr_text.trim();
        let detail = if stderr_text.is_empty() {
            format!("exit code {code}")
        } else {
            format!("exit code {code}: {stderr_text}")
        };
        return Err(SdkError::Process(detail));
    }

    Ok(())
}

async fn collect_stderr(stderr: ChildStderr) -> String {
    let mut reader = BufReader::new(stderr);
    let mut buf = String::new();
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let trimmed = line.trim_end();
                if !trimmed.is_empty() {
                    warn!(stderr = %trimmed, "Claude stderr");
                }
                buf.push_str(&line);
            }
        }
    }
    buf
}
