use async_trait::async_trait;
use murmur_common::{Error, Result};
use murmur_config::AppConfig;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::image::ImageProvider;

/// Black Forest Labs FLUX deployment on Azure AI Foundry.
#[derive(Debug)]
pub struct AzureFluxProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    /// Full URL override; derived from the endpoint when unset.
    flux_url: Option<String>,
}

impl AzureFluxProvider {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let azure = &config.azure;
        let (Some(endpoint), Some(api_key), Some(deployment)) = (
            azure.endpoint.clone(),
            azure.api_key.clone(),
            azure.flux_deployment.clone(),
        ) else {
            return Err(Error::Config(
                "Missing required environment variables for Azure Flux: \
                 AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_API_KEY, AZURE_OPENAI_FLUX_DEPLOYMENT"
                    .to_string(),
            ));
        };

        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key,
            deployment,
            flux_url: azure.flux_url.clone(),
        })
    }

    /// Override the full request URL (tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.flux_url = Some(base_url);
        self
    }

    fn request_url(&self) -> String {
        match &self.flux_url {
            Some(url) => url.clone(),
            None => {
                // Image models live on the AI Foundry host, not the OpenAI one.
                let base = self
                    .endpoint
                    .replace("cognitiveservices.azure.com", "services.ai.azure.com");
                format!(
                    "{}/providers/blackforestlabs/v1/{}?api-version=preview",
                    base.trim_end_matches('/'),
                    self.deployment
                )
            }
        }
    }
}

#[async_trait]
impl ImageProvider for AzureFluxProvider {
    fn provider_id(&self) -> &str {
        "azure-flux"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.request_url();
        info!("targeting image API: {url}");

        let payload = json!({
            "prompt": prompt,
            "width": 1024,
            "height": 1024,
            "n": 1,
            "model": "FLUX.2-pro",
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("image generation request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "image API returned {status}: {error_text}"
            )));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("failed to parse image response: {e}")))?;

        if let Some(item) = data["data"].as_array().and_then(|items| items.first()) {
            if let Some(b64) = item["b64_json"].as_str() {
                return Ok(format!("data:image/png;base64,{b64}"));
            }
            if let Some(url) = item["url"].as_str() {
                return Ok(url.to_string());
            }
        }

        Err(Error::Provider(
            "image content (url/b64_json) not found in response".to_string(),
        ))
    }
}
