//! Error types for the anvil domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! has its own error enum; backend failures abort the current turn while
//! tool failures are absorbed into the conversation as error-tagged results.

use thiserror::Error;

/// The top-level error type for agent operations.
///
/// Deliberately narrow: tool failures never reach this level (dispatch
/// absorbs them into error-tagged results), so only backend and
/// configuration failures can abort a turn.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure talking to a model provider. Never retried by the loop; ends the
/// current turn and propagates to the host.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failure inside a dispatched tool. Always caught at the dispatch boundary
/// and converted into an error-tagged string result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

impl ToolError {
    /// Short machine-readable kind, used as the error-tag prefix in
    /// tool-result strings surfaced to the model.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "unknown_tool",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::Timeout { .. } => "timeout",
            Self::InvalidArguments(_) => "invalid_arguments",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_displays_status() {
        let err = Error::Backend(BackendError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn config_error_display() {
        let err = Error::Config("unknown backend 'bedrock'".into());
        assert!(err.to_string().contains("unknown backend"));
    }

    #[test]
    fn tool_error_kinds() {
        assert_eq!(ToolError::NotFound("x".into()).kind(), "unknown_tool");
        assert_eq!(
            ToolError::Timeout {
                tool_name: "run_bash".into(),
                timeout_secs: 30
            }
            .kind(),
            "timeout"
        );
        assert_eq!(
            ToolError::InvalidArguments("missing 'path'".into()).kind(),
            "invalid_arguments"
        );
    }
}
