//! The agent loop: backend calls and tool execution until end of turn.

use std::sync::Arc;

use anvil_core::{Backend, ContentBlock, Error, Message, ToolRegistry};
use tracing::{debug, info};

use crate::context::{ContextManager, SYSTEM_PROMPT};
use crate::sink::TurnSink;

/// Sent once per turn when the model answers in text without having called
/// any tool.
const NUDGE: &str = "You must call a tool to complete this request. \
Do not describe or simulate the result — call the appropriate tool directly.";

/// Token counts accumulated across a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub requests: u64,
}

/// Drives one user request to completion against a backend and a tool set.
///
/// The loop owns the conversation history for its session. A turn ends when
/// the model responds without tool calls (after at most one nudge); a
/// backend failure aborts the turn with the history still consistent — the
/// user message stays, no partial assistant message is recorded.
pub struct AgentLoop {
    backend: Arc<dyn Backend>,
    tools: Arc<ToolRegistry>,
    context: ContextManager,
    system_prompt: String,
    usage: TokenUsage,
}

impl AgentLoop {
    pub fn new(
        backend: Arc<dyn Backend>,
        tools: Arc<ToolRegistry>,
        max_context_messages: usize,
    ) -> Self {
        Self {
            backend,
            tools,
            context: ContextManager::new(max_context_messages),
            system_prompt: SYSTEM_PROMPT.to_string(),
            usage: TokenUsage::default(),
        }
    }

    /// Replace the default system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Token usage accumulated over the whole session.
    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    /// The conversation history as currently held.
    pub fn history(&self) -> Vec<Message> {
        self.context.messages()
    }

    /// Process one user message, running the inner loop until end of turn.
    pub async fn run_turn(
        &mut self,
        user_input: &str,
        sink: &mut dyn TurnSink,
    ) -> Result<(), Error> {
        self.context.add(Message::user(user_input));

        let definitions = self.tools.definitions();
        let mut tools_used = 0usize;
        let mut nudged = false;

        loop {
            if self.context.should_compact() && self.context.compact() {
                sink.notice("context compacted");
            }

            let history = self.context.messages();
            debug!(messages = history.len(), "Requesting model response");
            let response = self
                .backend
                .chat(&history, &definitions, &self.system_prompt)
                .await?;

            self.usage.requests += 1;
            self.usage.input_tokens += u64::from(response.input_tokens);
            self.usage.output_tokens += u64::from(response.output_tokens);

            self.context.add(Message::assistant(response.content.clone()));

            let calls: Vec<(String, String, serde_json::Value)> = response
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolCall { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            if calls.is_empty() {
                // A text-only answer before any tool ran gets one nudge
                if tools_used == 0 && !nudged {
                    nudged = true;
                    debug!("Model answered without tools, nudging once");
                    self.context.add(Message::user(NUDGE));
                    continue;
                }

                let text = Message::assistant(response.content).text();
                if !text.is_empty() {
                    sink.text(&text);
                }
                info!(tools_used, "Turn complete");
                return Ok(());
            }

            tools_used += calls.len();
            let mut results = Vec::with_capacity(calls.len());
            for (id, name, input) in calls {
                sink.tool_call(&name, &input);
                let content = self.tools.dispatch(&name, input).await;
                results.push(ContentBlock::ToolResult {
                    tool_call_id: id,
                    content,
                });
            }
            self.context.add(Message::tool_results(results));
        }
    }
}
