//! The normalized output of one backend invocation.

use serde::{Deserialize, Serialize};

use crate::message::ContentBlock;

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Final answer — no tools requested
    EndTurn,
    /// The model requested one or more tool calls
    ToolUse,
}

/// A normalized model response.
///
/// Invariant: `stop_reason == ToolUse` iff `content` contains at least one
/// `ToolCall` block. `new` derives the stop reason from the content, so the
/// invariant holds regardless of what the provider reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl ModelResponse {
    pub fn new(content: Vec<ContentBlock>, input_tokens: u32, output_tokens: u32) -> Self {
        let stop_reason = if content.iter().any(ContentBlock::is_tool_call) {
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        };
        Self {
            stop_reason,
            content,
            input_tokens,
            output_tokens,
        }
    }

    /// The tool-call blocks, in the order the model emitted them.
    pub fn tool_calls(&self) -> Vec<&ContentBlock> {
        self.content.iter().filter(|b| b.is_tool_call()).collect()
    }
}
