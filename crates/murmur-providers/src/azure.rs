use async_trait::async_trait;
use murmur_common::{ChatMessage, Error, Result, ToolDefinition};
use murmur_config::AppConfig;
use reqwest::Client;

use crate::chat::ChatProvider;
use crate::wire;

/// Azure OpenAI chat deployment. Speaks the OpenAI chat-completions wire
/// format against a deployment-scoped endpoint with `api-key` auth.
#[derive(Debug)]
pub struct AzureChatProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    deployment: String,
    base_url: Option<String>,
}

impl AzureChatProvider {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let azure = &config.azure;
        let (Some(endpoint), Some(api_key), Some(deployment)) = (
            azure.endpoint.clone(),
            azure.api_key.clone(),
            azure.deployment.clone(),
        ) else {
            return Err(Error::Config(
                "Missing required environment variables: AZURE_OPENAI_ENDPOINT, \
                 AZURE_OPENAI_API_KEY, AZURE_OPENAI_DEPLOYMENT_NAME"
                    .to_string(),
            ));
        };

        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key,
            api_version: azure.api_version.clone(),
            deployment,
            base_url: None,
        })
    }

    /// Override the full request URL (tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn request_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.endpoint.trim_end_matches('/'),
                self.deployment,
                self.api_version
            ),
        }
    }
}

#[async_trait]
impl ChatProvider for AzureChatProvider {
    fn provider_id(&self) -> &str {
        "azure"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage> {
        // Azure routes by deployment, so the body carries no model name.
        let body = wire::build_request(None, messages, tools);

        let response = self
            .client
            .post(self.request_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Azure OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Azure OpenAI API returned {status}: {error_text}"
            )));
        }

        let wire_response: wire::WireResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("failed to parse Azure OpenAI response: {e}")))?;

        wire::parse_response(wire_response)
    }
}
