//! Shared process plumbing for the CLI-backed adapters.
//!
//! Spawns the agent with stdout piped into the stream consumer, stdin
//! closed, and stderr captured for diagnostics only. Stdout is read in raw
//! chunks (not lines) so the decoder's partial-line buffering is exercised
//! exactly as the pipe delivers data.

use std::path::PathBuf;
use std::process::Stdio;

use askrepo_core::{AgentError, AgentEvent, LineMapper, StreamConsumer};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::handle::RunHandle;

/// A backend's line mapper plus its end-of-process policy.
pub(crate) trait ProcessMapper: LineMapper + Send + 'static {
    /// Synthesize the terminal event when the process closed without one.
    ///
    /// Only called when no terminal event was emitted; the run always ends
    /// with exactly one terminal outcome.
    fn on_exit(&mut self, exit_code: i32, stderr: &str) -> AgentEvent;
}

/// What to launch for one run.
pub(crate) struct ProcessSpec {
    pub program: String,
    pub args: Vec<&'static str>,
    pub working_dir: PathBuf,
    pub prompt: String,
}

/// Spawn the agent process and drive it to completion in the background.
///
/// A spawn failure is a launch failure, distinct from a terminal `Error`
/// event: the run never started.
pub(crate) fn spawn_run<M: ProcessMapper>(
    spec: ProcessSpec,
    mapper: M,
) -> Result<RunHandle, AgentError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .arg(&spec.prompt)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| AgentError::Launch {
        command: spec.program.clone(),
        reason: e.to_string(),
    })?;

    let stdout = child.stdout.take().ok_or_else(|| AgentError::Launch {
        command: spec.program.clone(),
        reason: "failed to capture stdout".to_string(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| AgentError::Launch {
        command: spec.program.clone(),
        reason: "failed to capture stderr".to_string(),
    })?;

    info!(program = %spec.program, working_dir = %spec.working_dir.display(), "Agent process spawned");

    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let driver = tokio::spawn(pump(child, stdout, stderr, mapper, tx, cancel.clone()));

    Ok(RunHandle::new(rx, driver, cancel))
}

/// Read stdout chunks through the consumer, relay events, reconcile exit.
async fn pump<M: ProcessMapper>(
    mut child: Child,
    mut stdout: ChildStdout,
    stderr: ChildStderr,
    mapper: M,
    tx: mpsc::Sender<AgentEvent>,
    cancel: CancellationToken,
) {
    let stderr_task = tokio::spawn(collect_stderr(stderr));

    let mut consumer = StreamConsumer::new(mapper);
    let mut buf = [0u8; 8192];
    let mut terminal_seen = false;
    let mut cancelled = false;

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Consumer went away, killing agent process");
                let _ = child.start_kill();
                cancelled = true;
                break;
            }
            read = stdout.read(&mut buf) => read,
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                for event in consumer.feed(&buf[..n]) {
                    // The run is over after the first terminal event; late
                    // native lines are logged and dropped.
                    if terminal_seen {
                        debug!(event = ?event, "Dropping event after terminal");
                        continue;
                    }
                    let is_terminal = event.is_terminal();
                    if tx.send(event).await.is_err() {
                        info!("Event receiver dropped, killing agent process");
                        let _ = child.start_kill();
                        cancelled = true;
                        break;
                    }
                    terminal_seen = terminal_seen || is_terminal;
                }
                if cancelled {
                    break;
                }
                // The run is complete once a terminal event is out; the
                // process gets no further say.
                if terminal_seen {
                    let _ = child.start_kill();
                    break;
                }
            }
            Err(e) => {
                error!(error = %e, "Error reading agent stdout");
                break;
            }
        }
    }

    if !terminal_seen && !cancelled {
        if let Some(event) = consumer.finish() {
            terminal_seen = event.is_terminal();
            let _ = tx.send(event).await;
        }
    }

    let status = child.wait().await;
    let stderr_text = stderr_task.await.unwrap_or_default();

    match status {
        Ok(status) => {
            let code = status.code().unwrap_or(-1);
            if terminal_seen || cancelled {
                if !status.success() {
                    debug!(exit_code = code, "Agent exited non-zero after run completed");
                }
            } else {
                let event = consumer.mapper_mut().on_exit(code, &stderr_text);
                let _ = tx.send(event).await;
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to reap agent process");
            if !terminal_seen && !cancelled {
                let _ = tx
                    .send(AgentEvent::error(format!(
                        "Failed to wait for agent process: {e}"
                    )))
                    .await;
            }
        }
    }
}

/// Stderr is diagnostic only: logged line by line, kept for exit handling,
/// never relayed as events.
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
                    warn!(stderr = %trimmed, "Agent stderr");
                }
                buf.push_str(&line);
            }
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorMapper;
    use crate::gemini::GeminiMapper;

    fn sh(script: &str) -> ProcessSpec {
        ProcessSpec {
            program: "sh".to_string(),
            args: vec!["-c"],
            working_dir: PathBuf::from("."),
            prompt: script.to_string(),
        }
    }

    async fn collect(mut handle: RunHandle) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }
        handle.finished().await;
        events
    }

    #[tokio::test]
    async fn test_strict_stream_end_to_end() {
        let script = r#"printf '%s\n' '{"type":"system","subtype":"init"}' '{"type":"result","subtype":"success","result":"done"}'"#;
        let handle = spawn_run(sh(script), CursorMapper::new()).unwrap();
        let events = collect(handle).await;
        assert_eq!(
            events,
            vec![AgentEvent::status("Starting…"), AgentEvent::result("done")]
        );
    }

    #[tokio::test]
    async fn test_nothing_after_terminal_event() {
        let script = r#"printf '%s\n' '{"type":"result","subtype":"success","result":"first"}' '{"type":"error","error":"late"}' '{"type":"status","status":"later"}'"#;
        let handle = spawn_run(sh(script), CursorMapper::new()).unwrap();
        let events = collect(handle).await;
        assert_eq!(events, vec![AgentEvent::result("first")]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_terminal_uses_stderr() {
        let script = "echo boom >&2; exit 3";
        let handle = spawn_run(sh(script), CursorMapper::new()).unwrap();
        let events = collect(handle).await;
        assert_eq!(events, vec![AgentEvent::error("boom")]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_with_empty_stderr() {
        let script = "exit 7";
        let handle = spawn_run(sh(script), CursorMapper::new()).unwrap();
        let events = collect(handle).await;
        assert_eq!(
            events,
            vec![AgentEvent::error("Process exited with code 7.")]
        );
    }

    #[tokio::test]
    async fn test_lenient_accumulates_assistant_text() {
        let script = r#"printf '%s\n' '{"type":"init"}' '{"type":"message","role":"assistant","content":"A"}' '{"type":"message","role":"assistant","content":"B"}' '{"type":"result","status":"success"}'"#;
        let handle = spawn_run(sh(script), GeminiMapper::new()).unwrap();
        let events = collect(handle).await;
        assert_eq!(
            events,
            vec![AgentEvent::status("Starting…"), AgentEvent::result("AB")]
        );
    }

    #[tokio::test]
    async fn test_lenient_exit_code_beats_partial_text() {
        let script = r#"printf '%s\n' '{"type":"message","role":"assistant","content":"partial"}'; echo boom >&2; exit 1"#;
        let handle = spawn_run(sh(script), GeminiMapper::new()).unwrap();
        let events = collect(handle).await;
        assert_eq!(
            events,
            vec![AgentEvent::error("Exit code 1. stderr:\nboom")]
        );
    }

    #[tokio::test]
    async fn test_launch_failure_is_not_an_event() {
        let spec = ProcessSpec {
            program: "askrepo-no-such-binary".to_string(),
            args: vec![],
            working_dir: PathBuf::from("."),
            prompt: "hi".to_string(),
        };
        let err = spawn_run(spec, CursorMapper::new()).unwrap_err();
        assert!(err.is_launch_failure());
    }

    #[tokio::test]
    async fn test_partial_terminal_line_flushed_at_eof() {
        // No trailing newline on the final line.
        let script = r#"printf '%s' '{"type":"result","subtype":"success","result":"flushed"}'"#;
        let handle = spawn_run(sh(script), CursorMapper::new()).unwrap();
        let events = collect(handle).await;
        assert_eq!(events, vec![AgentEvent::result("flushed")]);
    }
}
