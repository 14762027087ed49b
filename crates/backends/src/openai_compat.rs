//! OpenAI-compatible backend adapter.
//!
//! Works with llama.cpp's built-in server and any other endpoint exposing
//! `/v1/chat/completions` with the OpenAI tool-calling schema (OpenAI,
//! vLLM, Together, ...).
//!
//! Wire-format differences from the normalized model handled here:
//! - System prompt travels as a leading `system`-role message
//! - Tool-result messages unfold into one `tool`-role message per result
//! - Tool-call arguments are a JSON *string*, parsed on decode

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use anvil_core::{
    Backend, BackendError, ContentBlock, Message, ModelResponse, Role, ToolDefinition,
};

/// An OpenAI-compatible chat-completions backend.
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            client,
        }
    }

    /// A llama.cpp server on its default port (convenience constructor).
    pub fn llama_cpp(base_url: Option<&str>, max_tokens: u32) -> Self {
        Self::new(
            "llama.cpp",
            base_url.unwrap_or("http://localhost:8080/v1"),
            "sk-no-key", // llama.cpp ignores the key but requires the header
            "local",
            max_tokens,
        )
    }

    /// Convert normalized history (plus the out-of-band system prompt) to
    /// OpenAI API messages.
    fn to_api_messages(history: &[Message], system: &str) -> Vec<ApiMessage> {
        let mut result = vec![ApiMessage {
            role: "system".into(),
            content: Some(system.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }];

        for msg in history {
            match msg.role {
                Role::User => result.push(ApiMessage {
                    role: "user".into(),
                    content: Some(msg.text()),
                    tool_calls: None,
                    tool_call_id: None,
                }),
                Role::Assistant => {
                    let text = msg.text();
                    let tool_calls: Vec<ApiToolCall> = msg
                        .content
                        .iter()
                        .filter_map(|block| match block {
                            ContentBlock::ToolCall { id, name, input } => Some(ApiToolCall {
                                id: id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: name.clone(),
                                    arguments: input.to_string(),
                                },
                            }),
                            _ => None,
                        })
                        .collect();

                    result.push(ApiMessage {
                        // Empty text encodes as absent content, never dropping the calls
                        role: "assistant".into(),
                        content: if text.is_empty() { None } else { Some(text) },
                        tool_calls: if tool_calls.is_empty() {
                            None
                        } else {
                            Some(tool_calls)
                        },
                        tool_call_id: None,
                    });
                }
                Role::ToolResult => {
                    // One tool-role message per result block, order preserved
                    for block in &msg.content {
                        if let ContentBlock::ToolResult {
                            tool_call_id,
                            content,
                        } = block
                        {
                            result.push(ApiMessage {
                                role: "tool".into(),
                                content: Some(content.clone()),
                                tool_calls: None,
                                tool_call_id: Some(tool_call_id.clone()),
                            });
                        }
                    }
                }
            }
        }

        result
    }

    /// Convert tool definitions to the OpenAI function wrapper.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Normalize the first choice of an API response.
    fn to_model_response(resp: ApiResponse) -> Result<ModelResponse, BackendError> {
        let choice = resp.choices.into_iter().next().ok_or_else(|| {
            BackendError::MalformedResponse("No choices in response".into())
        })?;

        debug!(finish_reason = ?choice.finish_reason, "Provider reported finish reason");

        let mut content = Vec::new();
        if let Some(text) = choice.message.content
            && !text.is_empty()
        {
            content.push(ContentBlock::Text { text });
        }
        for tc in choice.message.tool_calls.unwrap_or_default() {
            let input: serde_json::Value =
                serde_json::from_str(&tc.function.arguments).map_err(|e| {
                    BackendError::MalformedResponse(format!(
                        "Malformed tool-call arguments for '{}': {e}",
                        tc.function.name
                    ))
                })?;
            content.push(ContentBlock::ToolCall {
                id: tc.id,
                name: tc.function.name,
                input,
            });
        }

        let (input_tokens, output_tokens) = resp
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(ModelResponse::new(content, input_tokens, output_tokens))
    }
}

#[async_trait]
impl Backend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
        system: &str,
    ) -> std::result::Result<ModelResponse, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": Self::to_api_messages(history, system),
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(tools));
        }

        debug!(backend = %self.name, model = %self.model, messages = history.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
                "Invalid API key or insufficient permissions".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(BackendError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: ApiResponse = response.json().await.map_err(|e| {
            BackendError::MalformedResponse(format!("Failed to parse response: {e}"))
        })?;

        Self::to_model_response(api_resp)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
