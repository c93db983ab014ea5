//! Type definitions for Claude Code stream-json messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level message from Claude Code stdout in one-shot streaming mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeMessage {
    /// System message; `subtype == "init"` marks session start.
    System {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        cwd: Option<String>,
    },

    /// Assistant response message.
    Assistant {
        message: AssistantMessage,
        #[serde(default)]
        session_id: Option<String>,
    },

    /// Terminal execution result.
    Result {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default, alias = "isError")]
        is_error: Option<bool>,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        errors: Vec<String>,
        #[serde(default, alias = "durationMs")]
        duration_ms: Option<u64>,
        #[serde(default, alias = "sessionId")]
        session_id: Option<String>,
    },

    /// Anything this SDK does not model (tool telemetry, control traffic).
    #[serde(untagged)]
    Unknown(Value),
}

impl ClaudeMessage {
    /// True for the `system`/`init` session-start message.
    pub fn is_init(&self) -> bool {
        matches!(self, Self::System { subtype: Some(s), .. } if s == "init")
    }

    /// The final answer text, when this is a successful terminal result.
    pub fn result_text(&self) -> Option<&str> {
        match self {
            Self::Result {
                is_error, result, ..
            } if !is_error.unwrap_or(false) => result.as_ref().and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Assistant message content.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentItem>,
}

impl AssistantMessage {
    /// Concatenated text content of the message.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|item| match item {
                ContentItem::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Content item in an assistant message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Text content.
    Text { text: String },

    /// Thinking/reasoning content.
    Thinking { thinking: String },

    /// Anything else (tool use blocks etc.).
    #[serde(untagged)]
    Other(Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_message_parsing() {
        let json = r#"{"type":"system","subtype":"init","session_id":"abc","model":"claude-sonnet-4-5"}"#;
        let msg: ClaudeMessage = serde_json::from_str(json).unwrap();
        assert!(msg.is_init());
    }

    #[test]
    fn test_assistant_message_text() {
        let json = r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"Hello "},{"type":"text","text":"world"}]}}"#;
        let msg: ClaudeMessage = serde_json::from_str(json).unwrap();
        if let ClaudeMessage::Assistant { message, .. } = msg {
            assert_eq!(message.text(), "Hello world");
        } else {
            panic!("Expected assistant message");
        }
    }

    #[test]
    fn test_success_result_text() {
        let json = r#"{"type":"result","subtype":"success","is_error":false,"result":"done","duration_ms":42}"#;
        let msg: ClaudeMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.result_text(), Some("done"));
    }

    #[test]
    fn test_error_result_has_no_text() {
        let json = r#"{"type":"result","subtype":"error","is_error":true,"errors":["quota exceeded","retry later"]}"#;
        let msg: ClaudeMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.result_text(), None);
        if let ClaudeMessage::Result { errors, .. } = msg {
            assert_eq!(errors.len(), 2);
        } else {
            panic!("Expected result message");
        }
    }

    #[test]
    fn test_unknown_message_fallback() {
        let json = r#"{"type":"tool_progress","tool":"Read","pct":40}"#;
        let msg: ClaudeMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClaudeMessage::Unknown(_)));
    }
}
