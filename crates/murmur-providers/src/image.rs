use async_trait::async_trait;
use murmur_common::Result;

/// Trait for image-generation backends.
///
/// `generate` returns whatever the backend hands back: a plain `http(s)` URL,
/// a `data:image/...;base64,` payload, or bare base64 bytes. The image tool
/// normalizes and persists the result.
#[async_trait]
pub trait ImageProvider: Send + Sync + std::fmt::Debug {
    /// Provider identifier (e.g. "azure-flux").
    fn provider_id(&self) -> &str;

    /// Generate an image for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
