//! SDK-backed adapter for Claude Code.
//!
//! Unlike the CLI adapters this one never touches process plumbing: it
//! drives a query through `askrepo-claude-sdk` and adapts the typed message
//! stream onto the normalized events. Errors while driving the call are
//! caught and converted into a terminal `Error` event; nothing propagates.

use std::path::Path;

use askrepo_claude_sdk::{ClaudeAgentClient, ClaudeMessage, Query};
use askrepo_core::{AgentError, AgentEvent};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::handle::RunHandle;

/// Start a run backed by the Claude Code SDK.
///
/// A query that cannot start at all surfaces as a launch failure, like a
/// CLI that is not installed.
pub(crate) fn spawn_run(
    client: &ClaudeAgentClient,
    command: &str,
    working_dir: &Path,
    prompt: &str,
) -> Result<RunHandle, AgentError> {
    let query = client
        .query(working_dir, prompt)
        .map_err(|e| AgentError::Launch {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let driver = tokio::spawn(drive(query, tx, cancel.clone()));

    Ok(RunHandle::new(rx, driver, cancel))
}

async fn drive(mut query: Query, tx: mpsc::Sender<AgentEvent>, cancel: CancellationToken) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Consumer went away, aborting SDK query");
                query.abort();
                return;
            }
            message = query.next_message() => message,
        };
        let Some(message) = message else { break };

        let Some(event) = map_message(&message) else {
            continue;
        };
        let is_terminal = event.is_terminal();
        if tx.send(event).await.is_err() {
            query.abort();
            return;
        }
        if is_terminal {
            // The run is complete; don't hold the stream open for SDK
            // teardown, and drop any late messages unread.
            query.abort();
            return;
        }
    }

    // The message stream ended without a terminal event: the call itself
    // decides between a clean-but-empty end and an SDK failure.
    let event = match query.finish().await {
        Ok(()) => AgentEvent::error("Agent call ended without a result."),
        Err(e) => {
            warn!(error = %e, "SDK call failed");
            AgentEvent::error(e.to_string())
        }
    };
    let _ = tx.send(event).await;
}

/// The SDK-side mapping table.
fn map_message(message: &ClaudeMessage) -> Option<AgentEvent> {
    match message {
        ClaudeMessage::System { .. } => {
            if message.is_init() {
                Some(AgentEvent::status("Starting…"))
            } else {
                None
            }
        }
        ClaudeMessage::Assistant { .. } => Some(AgentEvent::status("Preparing answer…")),
        ClaudeMessage::Result {
            is_error,
            errors,
            result,
            ..
        } => {
            if is_error.unwrap_or(false) {
                let text = if errors.is_empty() {
                    result
                        .as_ref()
                        .and_then(Value::as_str)
                        .unwrap_or("Agent call failed.")
                        .to_string()
                } else {
                    errors.join("; ")
                };
                Some(AgentEvent::error(text))
            } else {
                message.result_text().map(AgentEvent::result)
            }
        }
        ClaudeMessage::Unknown(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ClaudeMessage {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn test_init_maps_to_starting() {
        let msg = parse(r#"{"type":"system","subtype":"init","session_id":"s"}"#);
        assert_eq!(map_message(&msg), Some(AgentEvent::status("Starting…")));
    }

    #[test]
    fn test_non_init_system_is_dropped() {
        let msg = parse(r#"{"type":"system","subtype":"compact"}"#);
        assert_eq!(map_message(&msg), None);
    }

    #[test]
    fn test_success_result() {
        let msg = parse(r#"{"type":"result","subtype":"success","is_error":false,"result":"answer"}"#);
        assert_eq!(map_message(&msg), Some(AgentEvent::result("answer")));
    }

    #[test]
    fn test_error_result_joins_error_list() {
        let msg = parse(
            r#"{"type":"result","subtype":"error","is_error":true,"errors":["quota exceeded","retry later"]}"#,
        );
        assert_eq!(
            map_message(&msg),
            Some(AgentEvent::error("quota exceeded; retry later"))
        );
    }

    #[test]
    fn test_error_result_without_list_uses_placeholder() {
        let msg = parse(r#"{"type":"result","subtype":"error","is_error":true}"#);
        assert_eq!(map_message(&msg), Some(AgentEvent::error("Agent call failed.")));
    }

    #[test]
    fn test_unknown_messages_dropped() {
        let msg = parse(r#"{"type":"tool_progress","pct":10}"#);
        assert_eq!(map_message(&msg), None);
    }
}
