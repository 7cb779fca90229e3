use async_trait::async_trait;
use murmur_common::{ChatMessage, Error, Result, ToolDefinition};
use murmur_config::AppConfig;
use reqwest::Client;

use crate::chat::ChatProvider;
use crate::wire;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug)]
pub struct OpenAiChatProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiChatProvider {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config
            .openai
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".to_string()))?;

        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.openai.model.clone(),
            base_url: OPENAI_API_URL.to_string(),
        })
    }

    /// Override the full request URL (tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatProvider {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage> {
        let body = wire::build_request(Some(self.model.clone()), messages, tools);

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "OpenAI API returned {status}: {error_text}"
            )));
        }

        let wire_response: wire::WireResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("failed to parse OpenAI response: {e}")))?;

        wire::parse_response(wire_response)
    }
}
