//! Built-in coding tools for anvil.
//!
//! Four tools cover the coding-assistant loop: `read_file`, `write_file`,
//! `list_directory`, and `run_bash`. Every tool resolves relative paths
//! against an explicit workspace directory passed at construction, so two
//! sessions with different working directories never interfere.

pub mod list_directory;
pub mod read_file;
pub mod run_bash;
pub mod write_file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anvil_core::ToolRegistry;

pub use list_directory::ListDirectoryTool;
pub use read_file::ReadFileTool;
pub use run_bash::RunBashTool;
pub use write_file::WriteFileTool;

/// Headroom the registry's dispatch bound gets over the command bound, so
/// `run_bash`'s own timeout always fires first and reports the limit that
/// was actually applied.
const DISPATCH_GRACE: Duration = Duration::from_secs(5);

/// Build a registry with the full built-in tool set.
///
/// `timeout` bounds a single command; the registry's outer dispatch bound
/// sits [`DISPATCH_GRACE`] above it as a safety net for the other tools.
pub fn default_registry(workspace: impl Into<PathBuf>, timeout: Duration) -> ToolRegistry {
    let workspace = workspace.into();
    let mut registry = ToolRegistry::new().with_timeout(timeout + DISPATCH_GRACE);
    registry.register(Box::new(ReadFileTool::new(workspace.clone())));
    registry.register(Box::new(WriteFileTool::new(workspace.clone())));
    registry.register(Box::new(ListDirectoryTool::new(workspace.clone())));
    registry.register(Box::new(
        RunBashTool::new(workspace).with_max_timeout(timeout.as_secs()),
    ));
    registry
}

/// Resolve a possibly-relative path against the workspace directory.
pub(crate) fn resolve(workspace: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        workspace.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_all_tools() {
        let registry = default_registry(".", Duration::from_secs(30));
        let mut names = registry.names();
        names.sort();
        assert_eq!(
            names,
            vec!["list_directory", "read_file", "run_bash", "write_file"]
        );
    }

    #[test]
    fn relative_paths_resolve_against_workspace() {
        let resolved = resolve(Path::new("/work"), "src/main.rs");
        assert_eq!(resolved, PathBuf::from("/work/src/main.rs"));
    }

    #[test]
    fn absolute_paths_pass_through() {
        let resolved = resolve(Path::new("/work"), "/etc/hosts");
        assert_eq!(resolved, PathBuf::from("/etc/hosts"));
    }

    #[tokio::test]
    async fn dispatch_timeout_reports_command_bound() {
        let dir = tempfile::tempdir().unwrap();
        let registry = default_registry(dir.path(), Duration::from_secs(1));

        // Asking for more than the bound still times out at the bound, and
        // the reported limit is the one that was applied
        let out = registry
            .dispatch(
                "run_bash",
                serde_json::json!({"command": "sleep 3", "timeout": 60}),
            )
            .await;
        assert!(out.starts_with("[error:timeout]"), "got: {out}");
        assert!(out.contains("after 1s"), "got: {out}");
    }
}
