use async_trait::async_trait;
use murmur_common::Result;

/// Send-only interface for delivering outbound messages through a channel.
///
/// Designed to be wrapped in `Arc` and shared across tasks (webhook
/// background rounds, the model's outbound-message tool).
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Unique identifier for this channel type.
    fn channel_type(&self) -> &str;

    /// Deliver a text message, optionally attaching one media URL.
    async fn send_text(&self, to: &str, body: &str, media_url: Option<&str>) -> Result<()>;
}
