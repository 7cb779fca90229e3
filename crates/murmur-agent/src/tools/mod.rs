use async_trait::async_trait;
use murmur_common::Result;

pub mod media;
pub mod messaging;

pub use media::GenerateImageTool;
pub use messaging::SendMessageTool;

/// A callable capability exposed to the chat model.
///
/// A tool's only channel back to the model is its text return value, so
/// implementations convert their own failures into error text instead of
/// propagating; the runtime additionally downgrades any residual `Err` the
/// same way.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema for the tool's arguments.
    fn input_schema(&self) -> serde_json::Value;

    async fn execute(&self, context: &ToolContext, args: serde_json::Value) -> Result<ToolOutput>;
}

/// Per-invocation context handed to a tool.
pub struct ToolContext {
    pub thread_id: String,
}

/// Text result handed back to the model.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}
