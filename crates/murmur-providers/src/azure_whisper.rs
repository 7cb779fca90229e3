use async_trait::async_trait;
use bytes::Bytes;
use murmur_common::{Error, Result};
use murmur_config::AppConfig;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::speech::SpeechProvider;

/// Azure OpenAI Whisper deployment for audio transcription.
pub struct AzureWhisperProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    deployment: String,
    base_url: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl AzureWhisperProvider {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let azure = &config.azure;
        let (Some(endpoint), Some(api_key), Some(deployment)) = (
            azure.endpoint.clone(),
            azure.api_key.clone(),
            azure.whisper_deployment.clone(),
        ) else {
            return Err(Error::Config(
                "Missing required environment variables for Azure Whisper: \
                 AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_API_KEY, AZURE_OPENAI_WHISPER_DEPLOYMENT"
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
                "{}/openai/deployments/{}/audio/transcriptions?api-version={}",
                self.endpoint.trim_end_matches('/'),
                self.deployment,
                self.api_version
            ),
        }
    }
}

#[async_trait]
impl SpeechProvider for AzureWhisperProvider {
    fn provider_id(&self) -> &str {
        "azure-whisper"
    }

    async fn transcribe(&self, audio: Bytes, content_type: &str) -> Result<String> {
        let part = Part::bytes(audio.to_vec())
            .file_name("audio.ogg")
            .mime_str(content_type)
            .map_err(|e| Error::Provider(format!("invalid audio content type: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.request_url())
            .header("api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("transcription request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "transcription API returned {status}: {error_text}"
            )));
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("failed to parse transcription response: {e}")))?;

        Ok(transcription.text)
    }
}
