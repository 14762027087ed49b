//! Conversation history with bounded-size compaction.

use anvil_core::{Message, Role};
use tracing::debug;

/// The system prompt sent with every backend request.
pub const SYSTEM_PROMPT: &str = "\
You are a local coding assistant running in a terminal.
You help users understand, create, and modify code.

You have access to these tools:
- read_file: read the contents of any file
- write_file: create or overwrite a file with new content
- list_directory: list files in a directory
- run_bash: run any shell command (git, grep, python, tests, etc.)

Guidelines:
- Before making changes, read the relevant files first
- After making changes, verify by reading the file back or running tests
- Use run_bash for searching (grep, find), running tests, and git operations
- Be concise — show your work through tool use, not long explanations
- When writing files, always write the complete file content, not just the changed parts
";

/// Synthetic user message inserted where history was dropped.
const COMPACTION_NOTICE: &str =
    "[Context compacted: older messages removed to stay within limits]";

/// How many messages anchor the start of the conversation through
/// compaction (the original task context).
const HEAD_LEN: usize = 2;

/// Manages the conversation history passed to the model.
///
/// Compaction keeps the first [`HEAD_LEN`] messages and the most recent
/// half of the budget, inserting a notice where the middle was dropped.
/// The tail never starts on a tool-result message: it is extended backwards
/// until the paired assistant message is included, so the model never sees
/// a result without the call that produced it.
pub struct ContextManager {
    messages: Vec<Message>,
    max_messages: usize,
}

impl ContextManager {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages,
        }
    }

    /// Append a message to the history.
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// A snapshot of the current history.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether the history exceeds the configured budget.
    pub fn should_compact(&self) -> bool {
        self.messages.len() > self.max_messages
    }

    /// Drop the middle of the history, preserving head and tail.
    ///
    /// Returns true if anything was dropped. The result may exceed the
    /// target length when the tail had to be extended to keep a tool-call
    /// and its results together.
    pub fn compact(&mut self) -> bool {
        if !self.should_compact() {
            return false;
        }

        let keep_recent = self.max_messages / 2;
        let mut tail_start = self.messages.len() - keep_recent;

        // Never start the tail on a tool result
        while tail_start > HEAD_LEN && self.messages[tail_start].role == Role::ToolResult {
            tail_start -= 1;
        }

        if tail_start <= HEAD_LEN {
            return false;
        }

        let before = self.messages.len();
        let tail = self.messages.split_off(tail_start);
        self.messages.truncate(HEAD_LEN);
        self.messages.push(Message::user(COMPACTION_NOTICE));
        self.messages.extend(tail);

        debug!(before, after = self.messages.len(), "Compacted context");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::ContentBlock;

    fn user(n: usize) -> Message {
        Message::user(format!("user message {n}"))
    }

    fn assistant_text(n: usize) -> Message {
        Message::assistant(vec![ContentBlock::text(format!("assistant message {n}"))])
    }

    fn assistant_calling(id: &str) -> Message {
        Message::assistant(vec![ContentBlock::ToolCall {
            id: id.into(),
            name: "run_bash".into(),
            input: serde_json::json!({"command": "ls"}),
        }])
    }

    fn results_for(id: &str) -> Message {
        Message::tool_results(vec![ContentBlock::ToolResult {
            tool_call_id: id.into(),
            content: "ok".into(),
        }])
    }

    #[test]
    fn no_compaction_below_limit() {
        let mut ctx = ContextManager::new(40);
        for n in 0..40 {
            ctx.add(user(n));
        }
        assert!(!ctx.should_compact());
        assert!(!ctx.compact());
        assert_eq!(ctx.len(), 40);
    }

    #[test]
    fn compaction_keeps_head_notice_and_tail() {
        let mut ctx = ContextManager::new(40);
        for n in 0..45 {
            if n % 2 == 0 {
                ctx.add(user(n));
            } else {
                ctx.add(assistant_text(n));
            }
        }
        assert!(ctx.should_compact());
        assert!(ctx.compact());

        // head(2) + notice + most recent 20
        let messages = ctx.messages();
        assert_eq!(messages.len(), 23);
        assert_eq!(messages[0].text(), "user message 0");
        assert_eq!(messages[1].text(), "assistant message 1");
        assert!(messages[2].text().contains("Context compacted"));
        assert_eq!(messages[3].text(), "user message 25");
        assert_eq!(messages[22].text(), "assistant message 44");
    }

    #[test]
    fn tail_never_starts_on_tool_result() {
        let mut ctx = ContextManager::new(10);
        ctx.add(user(0));
        ctx.add(assistant_text(1));
        for n in 0..4 {
            ctx.add(user(n + 2));
            ctx.add(assistant_calling(&format!("call_{n}")));
            ctx.add(results_for(&format!("call_{n}")));
        }
        ctx.add(user(99));
        // 15 messages; naive tail of 5 would start on results_for("call_2")
        assert_eq!(ctx.len(), 15);
        assert!(ctx.compact());

        let messages = ctx.messages();
        // Tail extended by one to include the assistant with the call
        assert_eq!(messages.len(), 9);
        assert!(messages[3].has_tool_calls());
        assert_eq!(messages[3].role, anvil_core::Role::Assistant);
        assert_eq!(messages[4].role, anvil_core::Role::ToolResult);
    }

    #[test]
    fn compaction_is_idempotent_at_rest() {
        let mut ctx = ContextManager::new(10);
        for n in 0..15 {
            ctx.add(user(n));
        }
        assert!(ctx.compact());
        let after_first = ctx.len();
        assert!(!ctx.compact());
        assert_eq!(ctx.len(), after_first);
    }

    #[test]
    fn system_prompt_names_all_tools() {
        for tool in ["read_file", "write_file", "list_directory", "run_bash"] {
            assert!(SYSTEM_PROMPT.contains(tool), "missing {tool}");
        }
    }
}
