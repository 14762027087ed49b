//! Tool trait and registry — the dispatch point for agent capabilities.
//!
//! Tools are what let the agent act in the world: run shell commands,
//! read and write files, list directories. The registry is populated once
//! at startup and read-only afterwards; dispatch never raises — every
//! failure becomes an error-tagged string the model can see and react to.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

use crate::backend::ToolDefinition;
use crate::error::ToolError;

/// Default bound on a single tool execution.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// A named capability the model can invoke with schema-described arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g. "run_bash", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool. The returned string becomes the tool-result
    /// content verbatim.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<String, ToolError>;

    /// Convert this tool into a definition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The agent loop uses this to get tool definitions for the model and to
/// resolve requested tool calls. One registry per process; safe to share
/// read-only across sessions.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }

    /// Set the per-call execution bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool. Replaces any existing tool with the same name.
    /// Call only during startup; the table is immutable afterwards.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions, for sending to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Resolve one tool call to its result content.
    ///
    /// Never fails: an unknown tool, a failing tool, or a timeout all yield
    /// an `[error:<kind>] <message>` string that is surfaced to the model as
    /// a normal tool result.
    pub async fn dispatch(&self, name: &str, input: serde_json::Value) -> String {
        let Some(tool) = self.tools.get(name) else {
            let err = ToolError::NotFound(name.to_string());
            return Self::error_result(&err);
        };

        match tokio::time::timeout(self.timeout, tool.execute(input)).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(tool = %name, error = %err, "Tool execution failed");
                Self::error_result(&err)
            }
            Err(_elapsed) => {
                let err = ToolError::Timeout {
                    tool_name: name.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                };
                warn!(tool = %name, timeout_secs = self.timeout.as_secs(), "Tool timed out");
                Self::error_result(&err)
            }
        }
    }

    fn error_result(err: &ToolError) -> String {
        format!("[error:{}] {err}", err.kind())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
        ) -> std::result::Result<String, ToolError> {
            let text = arguments["text"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
            Ok(text.to_string())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
        ) -> std::result::Result<String, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "failing".into(),
                reason: "deliberate".into(),
            })
        }
    }

    struct SleepyTool;

    #[async_trait]
    impl Tool for SleepyTool {
        fn name(&self) -> &str {
            "sleepy"
        }
        fn description(&self) -> &str {
            "Sleeps longer than the timeout"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(
            &self,
            _arguments: serde_json::Value,
        ) -> std::result::Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".into())
        }
    }

    fn registry() -> ToolRegistry {
        let mut r = ToolRegistry::new();
        r.register(Box::new(EchoTool));
        r.register(Box::new(FailingTool));
        r
    }

    #[test]
    fn register_and_lookup() {
        let r = registry();
        assert!(r.get("echo").is_some());
        assert!(r.get("nonexistent").is_none());
        assert_eq!(r.names().len(), 2);
    }

    #[test]
    fn definitions_expose_schema() {
        let r = registry();
        let defs = r.definitions();
        let echo = defs.iter().find(|d| d.name == "echo").unwrap();
        assert_eq!(echo.parameters["required"], serde_json::json!(["text"]));
    }

    #[tokio::test]
    async fn dispatch_returns_output_verbatim() {
        let r = registry();
        let out = r.dispatch("echo", serde_json::json!({"text": "hello"})).await;
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_is_error_tagged() {
        let r = registry();
        let out = r.dispatch("nonexistent", serde_json::json!({})).await;
        assert!(out.starts_with("[error:unknown_tool]"), "got: {out}");
    }

    #[tokio::test]
    async fn dispatch_failing_tool_is_error_tagged() {
        let r = registry();
        let out = r.dispatch("failing", serde_json::json!({})).await;
        assert!(out.starts_with("[error:execution_failed]"), "got: {out}");
        assert!(out.contains("deliberate"));
    }

    #[tokio::test]
    async fn dispatch_invalid_arguments_is_error_tagged() {
        let r = registry();
        let out = r.dispatch("echo", serde_json::json!({})).await;
        assert!(out.starts_with("[error:invalid_arguments]"), "got: {out}");
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_times_out() {
        let mut r = ToolRegistry::new().with_timeout(Duration::from_millis(50));
        r.register(Box::new(SleepyTool));
        let out = r.dispatch("sleepy", serde_json::json!({})).await;
        assert!(out.starts_with("[error:timeout]"), "got: {out}");
    }
}
