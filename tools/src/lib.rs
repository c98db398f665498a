//! C8 Tool Handler Registry (spec.md §4.8).

pub mod handlers;
pub mod registry;
pub mod types;

pub use registry::{ToolExecutionResult, ToolHandler, ToolRegistry, DEFAULT_TOOL_TIMEOUT_SECONDS};
pub use types::{ToolArgs, ToolOutput, ToolType};
