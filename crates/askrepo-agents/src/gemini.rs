//! Lenient-format mapper for the Gemini CLI's stream-json output.
//!
//! The native stream uses a different shape
//! (`type ∈ {init, message, tool_use, tool_result, result}`) and does not
//! carry the final answer in its terminal line: assistant text is
//! accumulated across `message` events and only released as a `Result`
//! when a terminal `result{status=success}` arrives. Lines that are not
//! recognizable JSON are shown verbatim as status updates and kept as a
//! raw-output fallback.

use askrepo_core::{AgentEvent, LineMapper};
use serde::Deserialize;
use serde_json::Value;

use crate::process::ProcessMapper;

const NO_OUTPUT_PLACEHOLDER: &str = "The agent returned no output.";

/// One line of the Gemini CLI's native output.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GeminiLine {
    Init {},
    Message {
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        content: Option<Value>,
    },
    ToolUse {
        #[serde(default)]
        name: Option<String>,
    },
    ToolResult {},
    Result {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        error: Option<Value>,
    },
}

/// Stateful mapper accumulating the assistant's answer.
#[derive(Debug, Default)]
pub(crate) struct GeminiMapper {
    answer: String,
    raw: String,
}

impl GeminiMapper {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn take_answer(&mut self) -> String {
        let answer = self.answer.trim().to_string();
        if answer.is_empty() {
            NO_OUTPUT_PLACEHOLDER.to_string()
        } else {
            answer
        }
    }
}

impl LineMapper for GeminiMapper {
    fn map_line(&mut self, line: &str) -> Option<AgentEvent> {
        let parsed: GeminiLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(_) => {
                // Not this backend's JSON: surface it verbatim and keep it
                // as the raw-output fallback.
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    return None;
                }
                self.raw.push_str(trimmed);
                self.raw.push('\n');
                return Some(AgentEvent::status(trimmed));
            }
        };

        match parsed {
            GeminiLine::Init {} => Some(AgentEvent::status("Starting…")),
            GeminiLine::Message { role, content } => {
                if role.as_deref() == Some("assistant") {
                    if let Some(text) = content.as_ref().and_then(Value::as_str) {
                        self.answer.push_str(text);
                    }
                }
                None
            }
            GeminiLine::ToolUse { name } => Some(AgentEvent::status(format!(
                "Running tool: {}",
                name.as_deref().unwrap_or("unknown")
            ))),
            GeminiLine::ToolResult {} => None,
            GeminiLine::Result { status, error } => {
                if status.as_deref() == Some("success") {
                    Some(AgentEvent::result(self.take_answer()))
                } else {
                    let text = match error {
                        Some(Value::String(s)) => s,
                        Some(other) => other.to_string(),
                        None => format!(
                            "Agent reported failure (status: {})",
                            status.as_deref().unwrap_or("unknown")
                        ),
                    };
                    Some(AgentEvent::error(text))
                }
            }
        }
    }
}

impl ProcessMapper for GeminiMapper {
    /// The process closed without a terminal native event. Exit-code
    /// failure always wins over partial success text; on a clean exit the
    /// accumulated answer is preferred, then raw stdout, then a
    /// placeholder.
    fn on_exit(&mut self, exit_code: i32, stderr: &str) -> AgentEvent {
        if exit_code != 0 {
            let stderr = stderr.trim();
            if stderr.is_empty() {
                return AgentEvent::error(format!("Process exited with code {exit_code}."));
            }
            return AgentEvent::error(format!("Exit code {exit_code}. stderr:\n{stderr}"));
        }

        let answer = self.answer.trim();
        if !answer.is_empty() {
            return AgentEvent::result(answer);
        }
        let raw = self.raw.trim();
        if !raw.is_empty() {
            return AgentEvent::result(raw);
        }
        AgentEvent::result(NO_OUTPUT_PLACEHOLDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulation_and_success_result() {
        let mut mapper = GeminiMapper::new();
        assert_eq!(
            mapper.map_line(r#"{"type":"init"}"#),
            Some(AgentEvent::status("Starting…"))
        );
        assert_eq!(
            mapper.map_line(r#"{"type":"message","role":"assistant","content":"A"}"#),
            None
        );
        assert_eq!(
            mapper.map_line(r#"{"type":"message","role":"assistant","content":"B"}"#),
            None
        );
        assert_eq!(
            mapper.map_line(r#"{"type":"result","status":"success"}"#),
            Some(AgentEvent::result("AB"))
        );
    }

    #[test]
    fn test_non_assistant_messages_ignored() {
        let mut mapper = GeminiMapper::new();
        assert_eq!(
            mapper.map_line(r#"{"type":"message","role":"user","content":"hi"}"#),
            None
        );
        assert_eq!(
            mapper.map_line(r#"{"type":"result","status":"success"}"#),
            Some(AgentEvent::result(NO_OUTPUT_PLACEHOLDER))
        );
    }

    #[test]
    fn test_tool_use_status() {
        let mut mapper = GeminiMapper::new();
        assert_eq!(
            mapper.map_line(r#"{"type":"tool_use","name":"read_file"}"#),
            Some(AgentEvent::status("Running tool: read_file"))
        );
        assert_eq!(mapper.map_line(r#"{"type":"tool_result"}"#), None);
    }

    #[test]
    fn test_failed_result_is_error() {
        let mut mapper = GeminiMapper::new();
        assert_eq!(
            mapper.map_line(r#"{"type":"result","status":"error","error":"quota"}"#),
            Some(AgentEvent::error("quota"))
        );
    }

    #[test]
    fn test_unparseable_line_shown_verbatim() {
        let mut mapper = GeminiMapper::new();
        assert_eq!(
            mapper.map_line("Loaded 3 MCP servers"),
            Some(AgentEvent::status("Loaded 3 MCP servers"))
        );
    }

    #[test]
    fn test_on_exit_failure_beats_partial_text() {
        let mut mapper = GeminiMapper::new();
        mapper.map_line(r#"{"type":"message","role":"assistant","content":"partial"}"#);
        assert_eq!(
            mapper.on_exit(1, "boom\n"),
            AgentEvent::error("Exit code 1. stderr:\nboom")
        );
    }

    #[test]
    fn test_on_exit_clean_prefers_accumulated_text() {
        let mut mapper = GeminiMapper::new();
        mapper.map_line(r#"{"type":"message","role":"assistant","content":"the answer"}"#);
        mapper.map_line("stray stdout");
        assert_eq!(mapper.on_exit(0, ""), AgentEvent::result("the answer"));
    }

    #[test]
    fn test_on_exit_clean_falls_back_to_raw_stdout() {
        let mut mapper = GeminiMapper::new();
        mapper.map_line("plain answer, no JSON at all");
        assert_eq!(
            mapper.on_exit(0, ""),
            AgentEvent::result("plain answer, no JSON at all")
        );
    }

    #[test]
    fn test_on_exit_clean_with_nothing_collected() {
        let mut mapper = GeminiMapper::new();
        assert_eq!(mapper.on_exit(0, ""), AgentEvent::result(NO_OUTPUT_PLACEHOLDER));
    }
}
