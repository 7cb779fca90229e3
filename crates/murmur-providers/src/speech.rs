use async_trait::async_trait;
use bytes::Bytes;
use murmur_common::Result;

/// Trait for speech-to-text backends.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Provider identifier (e.g. "azure-whisper").
    fn provider_id(&self) -> &str;

    /// Transcribe an audio payload to text.
    async fn transcribe(&self, audio: Bytes, content_type: &str) -> Result<String>;
}
