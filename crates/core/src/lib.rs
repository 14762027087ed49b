//! # anvil-core
//!
//! Domain types, traits, and error definitions for the anvil agent runtime.
//! This crate defines the normalized message model that all backends and the
//! agent loop speak; provider-specific wire formats never leak past the
//! `anvil-backends` crate.
//!
//! Every subsystem boundary is a trait here (`Backend`, `Tool`) so that
//! implementations can be swapped via configuration and tested with mocks.

pub mod backend;
pub mod error;
pub mod message;
pub mod response;
pub mod tool;

pub use backend::{Backend, ToolDefinition};
pub use error::{BackendError, Error, Result, ToolError};
pub use message::{ContentBlock, Message, Role};
pub use response::{ModelResponse, StopReason};
pub use tool::{Tool, ToolRegistry};
