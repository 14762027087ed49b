//! Directory listing tool.
//!
//! Output is line-oriented for the model: directories first with a `/ `
//! prefix, files indented, both groups sorted by name.

use std::path::PathBuf;

use async_trait::async_trait;
use anvil_core::{Tool, ToolError};

pub struct ListDirectoryTool {
    workspace: PathBuf,
}

impl ListDirectoryTool {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List files and directories at the given path."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path to list (default: current directory)"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let path = args["path"].as_str().unwrap_or(".");
        let resolved = crate::resolve(&self.workspace, path);

        let mut reader =
            tokio::fs::read_dir(&resolved)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "list_directory".into(),
                    reason: format!("{}: {e}", resolved.display()),
                })?;

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "list_directory".into(),
                reason: e.to_string(),
            })?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if is_dir {
                dirs.push(name);
            } else {
                files.push(name);
            }
        }

        dirs.sort();
        files.sort();

        let mut lines: Vec<String> = dirs.into_iter().map(|n| format!("/ {n}")).collect();
        lines.extend(files.into_iter().map(|n| format!("  {n}")));

        if lines.is_empty() {
            Ok("(empty directory)".into())
        } else {
            Ok(lines.join("\n"))
        }
    }
}
