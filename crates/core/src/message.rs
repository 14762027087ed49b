//! Message and content-block domain types.
//!
//! These are the value objects that flow through the whole system:
//! the agent loop appends them to history, the context manager compacts
//! them, and the backend adapters translate them to provider wire formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user (also carries synthetic notices and nudges)
    User,
    /// The model
    Assistant,
    /// Results of tool calls, fed back to the model
    ToolResult,
}

/// One piece of message content.
///
/// An assistant message may mix `Text` and `ToolCall` blocks; a tool-result
/// message carries only `ToolResult` blocks, one per resolved call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolCall {
        /// Unique within the response that produced it
        id: String,
        name: String,
        /// Argument name -> value mapping, as declared by the tool's schema
        input: serde_json::Value,
    },
    ToolResult {
        /// References a `ToolCall` id emitted earlier in the same turn
        tool_call_id: String,
        content: String,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall { .. })
    }
}

/// A single turn of conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message from normalized content blocks.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a tool-result message carrying one block per resolved call.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::ToolResult,
            content: results,
            timestamp: Utc::now(),
        }
    }

    /// All text blocks joined with newlines.
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        parts.join("\n")
    }

    /// Whether any block is a tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.content.iter().any(ContentBlock::is_tool_call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello, agent!");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn assistant_message_with_tool_call() {
        let msg = Message::assistant(vec![
            ContentBlock::text("Let me check."),
            ContentBlock::ToolCall {
                id: "call_1".into(),
                name: "read_file".into(),
                input: serde_json::json!({"path": "src/main.rs"}),
            },
        ]);
        assert!(msg.has_tool_calls());
        assert_eq!(msg.text(), "Let me check.");
    }

    #[test]
    fn text_joins_multiple_blocks() {
        let msg = Message::assistant(vec![
            ContentBlock::text("first"),
            ContentBlock::text("second"),
        ]);
        assert_eq!(msg.text(), "first\nsecond");
    }

    #[test]
    fn serialization_roundtrip() {
        let msg = Message::tool_results(vec![ContentBlock::ToolResult {
            tool_call_id: "call_1".into(),
            content: "ok".into(),
        }]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"tool_result\""));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::ToolResult);
        assert_eq!(back.content, msg.content);
    }
}
