pub mod knowledge;
pub mod runtime;
pub mod tools;

pub use knowledge::Knowledge;
pub use runtime::AgentRuntime;
pub use tools::{Tool, ToolContext, ToolOutput};
