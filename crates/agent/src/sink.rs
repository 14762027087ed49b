//! Output sink for turn progress.
//!
//! The loop reports what it does through this trait so the CLI can print
//! to the terminal while tests capture everything in memory.

use serde_json::Value;

/// Receives the observable events of one turn.
pub trait TurnSink: Send {
    /// Final assistant text for the turn.
    fn text(&mut self, text: &str);

    /// A tool is about to be executed.
    fn tool_call(&mut self, name: &str, input: &Value);

    /// An out-of-band note (e.g. context compaction).
    fn notice(&mut self, text: &str);
}

/// Prints turn progress to stdout, the way the interactive CLI shows it.
pub struct StdoutSink;

impl TurnSink for StdoutSink {
    fn text(&mut self, text: &str) {
        println!("{text}");
    }

    fn tool_call(&mut self, name: &str, input: &Value) {
        println!("  [tool] {name}({})", args_preview(input));
    }

    fn notice(&mut self, text: &str) {
        println!("[{text}]");
    }
}

/// Render tool arguments as a short `key=value` list.
fn args_preview(input: &Value) -> String {
    match input.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", "),
        None => input.to_string(),
    }
}
