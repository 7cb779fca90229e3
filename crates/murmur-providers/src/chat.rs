use async_trait::async_trait;
use murmur_common::{ChatMessage, Result, ToolDefinition};

/// Trait for chat model backends (Azure OpenAI, OpenAI, ...).
///
/// Given an ordered message history and an optional tool set, a provider
/// returns exactly one new assistant message. When `tools` is non-empty the
/// provider binds them so the model may answer with tool-call requests
/// instead of plain text; a provider without tool support simply ignores the
/// slice and behaves as a plain question/answer model.
#[async_trait]
pub trait ChatProvider: Send + Sync + std::fmt::Debug {
    /// Provider identifier (e.g. "azure", "openai").
    fn provider_id(&self) -> &str;

    /// Produce the next message for the given history.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage>;
}
