//! The anvil agent: a bounded-context tool-calling loop.
//!
//! [`AgentLoop::run_turn`] drives one user request to completion: it calls
//! the backend, executes any requested tools, feeds results back, and
//! repeats until the model answers in plain text. [`ContextManager`] keeps
//! the conversation history under a message budget by compacting the middle
//! when it grows too long.

pub mod context;
pub mod loop_runner;
pub mod sink;

pub use context::{ContextManager, SYSTEM_PROMPT};
pub use loop_runner::{AgentLoop, TokenUsage};
pub use sink::{StdoutSink, TurnSink};
