//! File write tool — creates parent directories as needed.

use std::path::PathBuf;

use async_trait::async_trait;
use anvil_core::{Tool, ToolError};
use tracing::debug;

pub struct WriteFileTool {
    workspace: PathBuf,
}

impl WriteFileTool {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it (and any parent directories) if it doesn't exist."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let content = args["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let resolved = crate::resolve(&self.workspace, path);

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "write_file".into(),
                    reason: format!("creating {}: {e}", parent.display()),
                })?;
        }

        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "write_file".into(),
                reason: format!("{}: {e}", resolved.display()),
            })?;

        debug!(path = %resolved.display(), bytes = content.len(), "Wrote file");
        Ok(format!("File written: {path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path());

        let output = tool
            .execute(serde_json::json!({
                "path": "nested/deep/out.txt",
                "content": "payload"
            }))
            .await
            .unwrap();

        assert_eq!(output, "File written: nested/deep/out.txt");
        let written = std::fs::read_to_string(dir.path().join("nested/deep/out.txt")).unwrap();
        assert_eq!(written, "payload");
    }

    #[tokio::test]
    async fn overwrite_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "old").unwrap();

        let tool = WriteFileTool::new(dir.path());
        tool.execute(serde_json::json!({"path": "f.txt", "content": "new"}))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn missing_content_argument() {
        let tool = WriteFileTool::new(".");
        let result = tool.execute(serde_json::json!({"path": "x.txt"})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
