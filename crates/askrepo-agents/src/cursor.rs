//! Strict-format mapper for the Cursor CLI's stream-json output.
//!
//! The native stream is newline-delimited JSON with a `type`/`subtype`
//! discriminator. Every recognized line maps to exactly one normalized
//! event; unrecognized or malformed lines are dropped.

use askrepo_core::{AgentEvent, LineMapper};
use serde::Deserialize;
use serde_json::Value;

use crate::process::ProcessMapper;

/// One line of the Cursor CLI's native output.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CursorLine {
    System {
        #[serde(default)]
        subtype: Option<String>,
    },
    Thinking {
        #[serde(default)]
        subtype: Option<String>,
    },
    ToolCall {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        tool_call: Value,
    },
    Assistant {},
    Result {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<Value>,
    },
    Status {
        #[serde(default)]
        status: Option<Value>,
    },
    Error {
        #[serde(default)]
        error: Option<Value>,
    },
}

/// Stateless mapper for the strict format.
#[derive(Debug, Default)]
pub(crate) struct CursorMapper;

impl CursorMapper {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl LineMapper for CursorMapper {
    fn map_line(&mut self, line: &str) -> Option<AgentEvent> {
        let parsed: CursorLine = serde_json::from_str(line).ok()?;
        match parsed {
            CursorLine::System { subtype } => match subtype.as_deref() {
                Some("init") => Some(AgentEvent::status("Starting…")),
                _ => None,
            },
            CursorLine::Thinking { subtype } => match subtype.as_deref() {
                Some("delta") => Some(AgentEvent::status("Thinking…")),
                Some("completed") => Some(AgentEvent::status("Thinking completed.")),
                _ => None,
            },
            CursorLine::ToolCall { subtype, tool_call } => match subtype.as_deref() {
                Some("started") => Some(AgentEvent::status(tool_label(&tool_call))),
                Some("completed") => {
                    Some(AgentEvent::status(format!("{} — done.", tool_label(&tool_call))))
                }
                _ => None,
            },
            CursorLine::Assistant {} => Some(AgentEvent::status("Preparing answer…")),
            CursorLine::Result {
                subtype,
                result,
                error,
            } => match subtype.as_deref() {
                Some("success") => result
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(AgentEvent::result),
                // An agent-level error result is not terminal here: the
                // run still ends through the exit code.
                Some("error") => Some(AgentEvent::status(format!(
                    "Error: {}",
                    value_text(error.as_ref())
                ))),
                _ => None,
            },
            CursorLine::Status { status } => status
                .as_ref()
                .and_then(Value::as_str)
                .map(AgentEvent::status),
            CursorLine::Error { error } => error
                .as_ref()
                .and_then(Value::as_str)
                .map(AgentEvent::error),
        }
    }
}

impl ProcessMapper for CursorMapper {
    fn on_exit(&mut self, exit_code: i32, stderr: &str) -> AgentEvent {
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            AgentEvent::error(stderr)
        } else if exit_code != 0 {
            AgentEvent::error(format!("Process exited with code {exit_code}."))
        } else {
            AgentEvent::error("Process exited without producing a result.")
        }
    }
}

/// Human-readable label for a discriminated tool-call payload.
///
/// The payload is an object with a single key naming the tool kind
/// (`readToolCall`, `grepToolCall`, ...) whose value carries the `args`.
fn tool_label(tool_call: &Value) -> String {
    let Some((raw_kind, payload)) = tool_call.as_object().and_then(|o| o.iter().next()) else {
        return "Working…".to_string();
    };
    let kind = raw_kind.strip_suffix("ToolCall").unwrap_or(raw_kind);
    let args = payload.get("args");

    match kind {
        "read" => match arg_str(args, "path") {
            Some(path) => format!("Reading file: {}", basename(path)),
            None => "Reading file…".to_string(),
        },
        "grep" => match arg_str(args, "pattern") {
            Some(pattern) => match arg_str(args, "glob") {
                Some(glob) => format!("Searching for {pattern} in {glob}"),
                None => format!("Searching for {pattern}"),
            },
            None => "Searching…".to_string(),
        },
        "ls" => match arg_str(args, "path") {
            Some(path) => format!("Listing directory: {}", basename(path)),
            None => "Listing directory…".to_string(),
        },
        "codebaseSearch" => "Searching codebase".to_string(),
        "webSearch" => "Searching the web".to_string(),
        other => format!("{}…", humanize(other)),
    }
}

fn arg_str<'a>(args: Option<&'a Value>, key: &str) -> Option<&'a str> {
    args?.get(key)?.as_str()
}

/// Last non-empty path segment, accepting both `/` and `\` separators.
fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
}

/// "deleteFile" / "delete_file" -> "Delete file".
fn humanize(kind: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in kind.chars() {
        if ch == '_' || ch == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_ascii_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.push(ch.to_ascii_lowercase());
        } else {
            current.push(ch.to_ascii_lowercase());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut label = words.join(" ");
    if let Some(first) = label.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    label
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "unknown error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(line: &str) -> Option<AgentEvent> {
        CursorMapper::new().map_line(line)
    }

    #[test]
    fn test_system_init() {
        assert_eq!(
            map(r#"{"type":"system","subtype":"init"}"#),
            Some(AgentEvent::status("Starting…"))
        );
    }

    #[test]
    fn test_thinking_phases() {
        assert_eq!(
            map(r#"{"type":"thinking","subtype":"delta"}"#),
            Some(AgentEvent::status("Thinking…"))
        );
        assert_eq!(
            map(r#"{"type":"thinking","subtype":"completed"}"#),
            Some(AgentEvent::status("Thinking completed."))
        );
    }

    #[test]
    fn test_assistant_line() {
        assert_eq!(
            map(r#"{"type":"assistant","message":{"role":"assistant"}}"#),
            Some(AgentEvent::status("Preparing answer…"))
        );
    }

    #[test]
    fn test_success_result() {
        assert_eq!(
            map(r#"{"type":"result","subtype":"success","result":"done"}"#),
            Some(AgentEvent::result("done"))
        );
    }

    #[test]
    fn test_success_result_without_text_is_dropped() {
        assert_eq!(map(r#"{"type":"result","subtype":"success"}"#), None);
    }

    #[test]
    fn test_error_result_is_nonterminal_status() {
        assert_eq!(
            map(r#"{"type":"result","subtype":"error","error":"rate limited"}"#),
            Some(AgentEvent::status("Error: rate limited"))
        );
    }

    #[test]
    fn test_bare_status_and_error() {
        assert_eq!(
            map(r#"{"type":"status","status":"Indexing"}"#),
            Some(AgentEvent::status("Indexing"))
        );
        assert_eq!(
            map(r#"{"type":"error","error":"bad"}"#),
            Some(AgentEvent::error("bad"))
        );
    }

    #[test]
    fn test_unrecognized_and_malformed_lines_dropped() {
        assert_eq!(map(r#"{"type":"telemetry","ms":12}"#), None);
        assert_eq!(map(r#"{"no":"type"}"#), None);
        assert_eq!(map("not json at all"), None);
        assert_eq!(map(r#"{"type":"status","status":42}"#), None);
    }

    #[test]
    fn test_read_tool_label() {
        let line = r#"{"type":"tool_call","subtype":"started","tool_call":{"readToolCall":{"args":{"path":"/a/b/c.ts"}}}}"#;
        assert_eq!(map(line), Some(AgentEvent::status("Reading file: c.ts")));
    }

    #[test]
    fn test_read_tool_completed_label() {
        let line = r#"{"type":"tool_call","subtype":"completed","tool_call":{"readToolCall":{"args":{"path":"/a/b/c.ts"}}}}"#;
        assert_eq!(
            map(line),
            Some(AgentEvent::status("Reading file: c.ts — done."))
        );
    }

    #[test]
    fn test_grep_tool_labels() {
        let with_glob = r#"{"type":"tool_call","subtype":"started","tool_call":{"grepToolCall":{"args":{"pattern":"foo","glob":"*.rs"}}}}"#;
        assert_eq!(
            map(with_glob),
            Some(AgentEvent::status("Searching for foo in *.rs"))
        );
        let without_glob = r#"{"type":"tool_call","subtype":"started","tool_call":{"grepToolCall":{"args":{"pattern":"foo"}}}}"#;
        assert_eq!(
            map(without_glob),
            Some(AgentEvent::status("Searching for foo"))
        );
    }

    #[test]
    fn test_ls_and_search_tool_labels() {
        let ls = r#"{"type":"tool_call","subtype":"started","tool_call":{"lsToolCall":{"args":{"path":"src/views"}}}}"#;
        assert_eq!(map(ls), Some(AgentEvent::status("Listing directory: views")));
        let codebase = r#"{"type":"tool_call","subtype":"started","tool_call":{"codebaseSearchToolCall":{"args":{"query":"decoder"}}}}"#;
        assert_eq!(map(codebase), Some(AgentEvent::status("Searching codebase")));
        let web = r#"{"type":"tool_call","subtype":"started","tool_call":{"webSearchToolCall":{"args":{}}}}"#;
        assert_eq!(map(web), Some(AgentEvent::status("Searching the web")));
    }

    #[test]
    fn test_unknown_tool_is_humanized() {
        let line = r#"{"type":"tool_call","subtype":"started","tool_call":{"deleteFileToolCall":{"args":{"path":"x"}}}}"#;
        assert_eq!(map(line), Some(AgentEvent::status("Delete file…")));
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("a/b\\c.txt"), "c.txt");
        assert_eq!(basename("file.txt"), "file.txt");
        assert_eq!(basename("/a/b/"), "b");
        assert_eq!(basename("C:\\repo\\src\\main.rs"), "main.rs");
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("deleteFile"), "Delete file");
        assert_eq!(humanize("run_terminal_command"), "Run terminal command");
        assert_eq!(humanize("fetch"), "Fetch");
    }

    #[test]
    fn test_on_exit_prefers_stderr() {
        let mut mapper = CursorMapper::new();
        assert_eq!(mapper.on_exit(2, " cli blew up \n"), AgentEvent::error("cli blew up"));
        assert_eq!(
            mapper.on_exit(2, ""),
            AgentEvent::error("Process exited with code 2.")
        );
        assert_eq!(
            mapper.on_exit(0, ""),
            AgentEvent::error("Process exited without producing a result.")
        );
    }
}
