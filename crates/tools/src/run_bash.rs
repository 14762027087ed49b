//! Shell execution tool.
//!
//! Runs commands through `sh -c` in the workspace directory. Output folds
//! stderr and a non-zero exit code into the result text so the model sees
//! everything in one string.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use anvil_core::{Tool, ToolError};
use tokio::process::Command;
use tracing::{debug, warn};

const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

pub struct RunBashTool {
    workspace: PathBuf,
    /// Upper bound on a single command; model-requested timeouts above
    /// this are clamped to it.
    max_timeout_secs: u64,
}

impl RunBashTool {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            max_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }

    /// Set the bound on a single command execution.
    pub fn with_max_timeout(mut self, secs: u64) -> Self {
        self.max_timeout_secs = secs;
        self
    }
}

#[async_trait]
impl Tool for RunBashTool {
    fn name(&self) -> &str {
        "run_bash"
    }

    fn description(&self) -> &str {
        "Run a bash command and return its output. Use this for searching (grep, find), running tests, git operations, and executing scripts."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to run"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 30; values above the configured bound are clamped)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let command = args["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;
        let timeout_secs = args["timeout"]
            .as_u64()
            .unwrap_or(self.max_timeout_secs)
            .min(self.max_timeout_secs);

        debug!(command = %command, cwd = %self.workspace.display(), "Executing shell command");

        // kill_on_drop: a timed-out command must not keep running and land
        // its side effects after the timeout was reported
        let fut = Command::new("sh")
            .args(["-c", command])
            .current_dir(&self.workspace)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), fut)
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: "run_bash".into(),
                timeout_secs,
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "run_bash".into(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut result = stdout.to_string();
        if !stderr.is_empty() {
            result.push_str(&format!("\n[stderr]\n{stderr}"));
        }
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            result.push_str(&format!("\n[exit code: {code}]"));
        }

        let trimmed = result.trim();
        if trimmed.is_empty() {
            Ok("(no output)".into())
        } else {
            Ok(trimmed.to_string())
        }
    }
}
