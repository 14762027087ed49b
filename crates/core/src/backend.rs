//! Backend trait — the abstraction over model providers.
//!
//! A Backend knows how to send the normalized conversation history plus tool
//! schemas to one provider and translate the reply back into a
//! [`ModelResponse`]. The agent loop only talks to this trait.
//!
//! Implementations: Anthropic Messages API, OpenAI-compatible chat
//! completions (llama.cpp server, OpenAI, vLLM, ...).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::message::Message;
use crate::response::ModelResponse;

/// A tool definition sent to the model so it knows what it can call.
///
/// Immutable after registration; adapters translate `parameters` into the
/// provider's schema wrapper without altering it, so encode → decode is
/// identity on all three fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the accepted arguments
    pub parameters: serde_json::Value,
}

/// One model invocation against a configured provider endpoint.
#[async_trait]
pub trait Backend: Send + Sync {
    /// A human-readable name for this backend (e.g. "anthropic", "llama.cpp").
    fn name(&self) -> &str;

    /// Execute exactly one model call.
    ///
    /// `history` is the full (already compacted) message sequence; `tools`
    /// are all tools the model may call this turn; `system` is the
    /// instruction string carried out-of-band, not part of history.
    async fn chat(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
        system: &str,
    ) -> std::result::Result<ModelResponse, BackendError>;
}
