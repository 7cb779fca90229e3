use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use murmur_common::Result;
use murmur_media::{public_image_url, store_generated_image};
use murmur_providers::ImageProvider;
use serde_json::json;
use tracing::warn;

use crate::tools::{Tool, ToolContext, ToolOutput};

/// Tool that generates an image via the configured image provider, persists
/// it under the generated-images directory, and returns a markdown image
/// reference the client can render.
pub struct GenerateImageTool {
    provider: Arc<dyn ImageProvider>,
    images_dir: PathBuf,
    base_url: Option<String>,
}

impl GenerateImageTool {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        images_dir: PathBuf,
        base_url: Option<String>,
    ) -> Self {
        Self {
            provider,
            images_dir,
            base_url,
        }
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &'static str {
        "generate_image"
    }

    fn description(&self) -> &'static str {
        "Generates an image based on the user's prompt and returns a markdown \
         image link to display to the user."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "A descriptive text prompt for the image generation."
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: serde_json::Value) -> Result<ToolOutput> {
        let Some(prompt) = args["prompt"].as_str().filter(|p| !p.trim().is_empty()) else {
            return Ok(ToolOutput::error("missing or invalid 'prompt' argument"));
        };

        let payload = match self.provider.generate(prompt).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("image generation failed: {e}");
                return Ok(ToolOutput::error(format!("Error generating image: {e}")));
            }
        };

        if payload.is_empty() {
            return Ok(ToolOutput::error("Error: Image content not found in response."));
        }

        // A provider may hand back a public URL directly; pass it through.
        if payload.starts_with("http") && !payload.starts_with("data:image") {
            return Ok(ToolOutput::text(format!("![Generated Image]({payload})")));
        }

        // Base64 payloads are decoded and saved locally so we can serve them.
        let images_dir = self.images_dir.clone();
        let stored =
            tokio::task::spawn_blocking(move || store_generated_image(&images_dir, &payload))
                .await
                .map_err(|e| murmur_common::Error::Media(format!("image task panicked: {e}")));

        match stored {
            Ok(Ok(filename)) => {
                let url = public_image_url(self.base_url.as_deref(), &filename);
                Ok(ToolOutput::text(format!("![Generated Image]({url})")))
            }
            Ok(Err(e)) | Err(e) => {
                warn!("failed to store generated image: {e}");
                Ok(ToolOutput::error(format!("Error generating image: {e}")))
            }
        }
    }
}
