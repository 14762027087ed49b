//! Anthropic native backend adapter.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as a top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks;
//!   tool-result messages fold into user-role messages on the wire

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use anvil_core::{
    Backend, BackendError, ContentBlock, Message, ModelResponse, Role, ToolDefinition,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Messages API backend.
pub struct AnthropicBackend {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            client,
        }
    }

    /// Create with a custom base URL (for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert normalized messages to Anthropic API format.
    fn to_api_messages(history: &[Message]) -> Vec<AnthropicMessage> {
        let mut result = Vec::new();

        for msg in history {
            match msg.role {
                Role::User => {
                    result.push(AnthropicMessage {
                        role: "user".into(),
                        content: AnthropicContent::Text(msg.text()),
                    });
                }
                Role::Assistant => {
                    if !msg.has_tool_calls() {
                        result.push(AnthropicMessage {
                            role: "assistant".into(),
                            content: AnthropicContent::Text(msg.text()),
                        });
                        continue;
                    }
                    // Assistant message with tool-use blocks; empty text is
                    // omitted rather than sent as an empty block
                    let mut blocks = Vec::new();
                    for block in &msg.content {
                        match block {
                            ContentBlock::Text { text } if !text.is_empty() => {
                                blocks.push(ApiBlock::Text { text: text.clone() });
                            }
                            ContentBlock::ToolCall { id, name, input } => {
                                blocks.push(ApiBlock::ToolUse {
                                    id: id.clone(),
                                    name: name.clone(),
                                    input: input.clone(),
                                });
                            }
                            _ => {}
                        }
                    }
                    result.push(AnthropicMessage {
                        role: "assistant".into(),
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
                Role::ToolResult => {
                    // Anthropic carries tool results as user-role content blocks
                    let blocks = msg
                        .content
                        .iter()
                        .filter_map(|block| match block {
                            ContentBlock::ToolResult {
                                tool_call_id,
                                content,
                            } => Some(ApiBlock::ToolResult {
                                tool_use_id: tool_call_id.clone(),
                                content: content.clone(),
                            }),
                            _ => None,
                        })
                        .collect();
                    result.push(AnthropicMessage {
                        role: "user".into(),
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
            }
        }

        result
    }

    /// Convert tool definitions to Anthropic format
    /// (`parameters` becomes `input_schema`).
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect()
    }

    /// Normalize an Anthropic API response.
    fn to_model_response(resp: AnthropicResponse) -> ModelResponse {
        debug!(stop_reason = ?resp.stop_reason, "Anthropic reported stop reason");

        let content = resp
            .content
            .into_iter()
            .map(|block| match block {
                ResponseBlock::Text { text } => ContentBlock::Text { text },
                ResponseBlock::ToolUse { id, name, input } => {
                    ContentBlock::ToolCall { id, name, input }
                }
            })
            .collect();

        ModelResponse::new(content, resp.usage.input_tokens, resp.usage.output_tokens)
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
        system: &str,
    ) -> std::result::Result<ModelResponse, BackendError> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": Self::to_api_messages(history),
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
        }

        debug!(backend = "anthropic", model = %self.model, messages = history.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(e.to_string())
                } else {
                    BackendError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(BackendError::RateLimited { retry_after_secs: 5 });
        }
        if status == 401 || status == 403 {
            return Err(BackendError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(BackendError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse = response.json().await.map_err(|e| {
            BackendError::MalformedResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        Ok(Self::to_model_response(api_resp))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ApiBlock>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// Missing usage counters default to 0 — never fail a call over them.
#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::StopReason;

    fn tool_call_block() -> ContentBlock {
        ContentBlock::ToolCall {
            id: "toolu_123".into(),
            name: "list_directory".into(),
            input: serde_json::json!({"path": "src"}),
        }
    }

    #[test]
    fn constructor() {
        let backend = AnthropicBackend::new("sk-ant-test", "claude-sonnet-4-20250514", 8192);
        assert_eq!(backend.name(), "anthropic");
        assert_eq!(backend.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let backend = AnthropicBackend::new("sk-ant-test", "m", 1024)
            .with_base_url("https://custom.proxy.com/");
        assert_eq!(backend.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn message_conversion_user_assistant() {
        let history = vec![
            Message::user("Hello"),
            Message::assistant(vec![ContentBlock::text("Hi!")]),
        ];
        let api_msgs = AnthropicBackend::to_api_messages(&history);
        assert_eq!(api_msgs.len(), 2);
        assert_eq!(api_msgs[0].role, "user");
        assert_eq!(api_msgs[1].role, "assistant");
        match &api_msgs[1].content {
            AnthropicContent::Text(t) => assert_eq!(t, "Hi!"),
            _ => panic!("Expected text content"),
        }
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let msg = Message::assistant(vec![
            ContentBlock::text("Let me look"),
            tool_call_block(),
        ]);
        let api_msgs = AnthropicBackend::to_api_messages(&[msg]);
        match &api_msgs[0].content {
            AnthropicContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 2);
                match &blocks[1] {
                    ApiBlock::ToolUse { id, name, .. } => {
                        assert_eq!(id, "toolu_123");
                        assert_eq!(name, "list_directory");
                    }
                    _ => panic!("Expected tool_use block"),
                }
            }
            _ => panic!("Expected blocks content"),
        }
    }

    #[test]
    fn tool_call_only_assistant_keeps_calls() {
        // Assistant messages with no text must still carry the tool calls
        let msg = Message::assistant(vec![tool_call_block()]);
        let api_msgs = AnthropicBackend::to_api_messages(&[msg]);
        match &api_msgs[0].content {
            AnthropicContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 1);
                assert!(matches!(blocks[0], ApiBlock::ToolUse { .. }));
            }
            _ => panic!("Expected blocks content"),
        }
    }

    #[test]
    fn tool_results_fold_into_user_message() {
        let msg = Message::tool_results(vec![
            ContentBlock::ToolResult {
                tool_call_id: "toolu_123".into(),
                content: "src/\nCargo.toml".into(),
            },
            ContentBlock::ToolResult {
                tool_call_id: "toolu_456".into(),
                content: "ok".into(),
            },
        ]);
        let api_msgs = AnthropicBackend::to_api_messages(&[msg]);
        assert_eq!(api_msgs.len(), 1);
        assert_eq!(api_msgs[0].role, "user");
        match &api_msgs[0].content {
            AnthropicContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 2);
                match &blocks[0] {
                    ApiBlock::ToolResult { tool_use_id, .. } => {
                        assert_eq!(tool_use_id, "toolu_123")
                    }
                    _ => panic!("Expected tool_result block"),
                }
            }
            _ => panic!("Expected blocks content"),
        }
    }

    #[test]
    fn tool_definition_roundtrip() {
        let def = ToolDefinition {
            name: "read_file".into(),
            description: "Read a file".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "path": {"type": "string"} },
                "required": ["path"]
            }),
        };
        let api_tools = AnthropicBackend::to_api_tools(std::slice::from_ref(&def));
        // Encode then decode back to the neutral shape — identity
        let decoded = ToolDefinition {
            name: api_tools[0].name.clone(),
            description: api_tools[0].description.clone(),
            parameters: api_tools[0].input_schema.clone(),
        };
        assert_eq!(decoded, def);
    }

    #[test]
    fn parse_text_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "content": [{"type": "text", "text": "Hello!"}],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        let mr = AnthropicBackend::to_model_response(resp);
        assert_eq!(mr.stop_reason, StopReason::EndTurn);
        assert_eq!(mr.input_tokens, 10);
        assert_eq!(mr.output_tokens, 5);
        assert_eq!(mr.content, vec![ContentBlock::text("Hello!")]);
    }

    #[test]
    fn parse_tool_use_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "text", "text": "Let me list it"},
                    {"type": "tool_use", "id": "toolu_abc", "name": "list_directory", "input": {"path": "."}}
                ],
                "usage": {"input_tokens": 20, "output_tokens": 10},
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let mr = AnthropicBackend::to_model_response(resp);
        assert_eq!(mr.stop_reason, StopReason::ToolUse);
        assert_eq!(mr.tool_calls().len(), 1);
    }

    #[test]
    fn missing_usage_defaults_to_zero() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{"content": [{"type": "text", "text": "hi"}]}"#,
        )
        .unwrap();
        let mr = AnthropicBackend::to_model_response(resp);
        assert_eq!(mr.input_tokens, 0);
        assert_eq!(mr.output_tokens, 0);
    }

    #[tokio::test]
    async fn chat_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "content": [{"type": "text", "text": "Hello from mock"}],
                    "usage": {"input_tokens": 12, "output_tokens": 4},
                    "stop_reason": "end_turn"
                }"#,
            )
            .create_async()
            .await;

        let backend = AnthropicBackend::new("sk-ant-test", "claude-sonnet-4-20250514", 1024)
            .with_base_url(server.url());

        let history = vec![Message::user("Hello")];
        let resp = backend.chat(&history, &[], "You are helpful").await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.stop_reason, StopReason::EndTurn);
        assert_eq!(resp.input_tokens, 12);
        assert_eq!(resp.content, vec![ContentBlock::text("Hello from mock")]);
    }

    #[tokio::test]
    async fn chat_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body(r#"{"error": {"type": "authentication_error"}}"#)
            .create_async()
            .await;

        let backend =
            AnthropicBackend::new("sk-ant-bad", "m", 1024).with_base_url(server.url());
        let err = backend
            .chat(&[Message::user("hi")], &[], "sys")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn chat_unparseable_body_is_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let backend = AnthropicBackend::new("sk-ant-test", "m", 1024).with_base_url(server.url());
        let err = backend
            .chat(&[Message::user("hi")], &[], "sys")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MalformedResponse(_)));
    }
}
