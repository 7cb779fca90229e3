use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use murmur_agent::tools::GenerateImageTool;
use murmur_agent::{Tool, ToolContext};
use murmur_common::Result;
use murmur_providers::ImageProvider;
use serde_json::json;

#[derive(Debug)]
struct StubImageProvider {
    payload: String,
}

#[async_trait]
impl ImageProvider for StubImageProvider {
    fn provider_id(&self) -> &str {
        "stub-image"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.payload.clone())
    }
}

fn sample_png_base64() -> String {
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 128, 0, 120]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .unwrap();
    BASE64.encode(png)
}

fn context() -> ToolContext {
    ToolContext {
        thread_id: "t1".to_string(),
    }
}

async fn run_tool(payload: String, base_url: Option<String>) -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let tool = GenerateImageTool::new(
        Arc::new(StubImageProvider { payload }),
        dir.path().to_path_buf(),
        base_url,
    );
    let output = tool
        .execute(&context(), json!({"prompt": "a green square"}))
        .await
        .unwrap();
    assert!(!output.is_error, "{}", output.content);
    (output.content, dir)
}

#[tokio::test]
async fn test_data_uri_payload_yields_markdown_reference() {
    let payload = format!("data:image/png;base64,{}", sample_png_base64());
    let (content, dir) = run_tool(payload, None).await;

    assert!(content.starts_with("![Generated Image](/static/generated_images/"));
    assert!(content.ends_with(".jpg)"));

    // Exactly one flattened JPEG landed in the images directory.
    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_bare_base64_payload_yields_markdown_reference() {
    let (content, _dir) = run_tool(sample_png_base64(), None).await;
    assert!(content.starts_with("![Generated Image](/static/generated_images/"));
    assert!(content.ends_with(".jpg)"));
}

#[tokio::test]
async fn test_base_url_builds_absolute_reference() {
    let payload = format!("data:image/png;base64,{}", sample_png_base64());
    let (content, _dir) = run_tool(payload, Some("https://bot.example.com/".to_string())).await;
    assert!(
        content.starts_with("![Generated Image](https://bot.example.com/static/generated_images/")
    );
}

#[tokio::test]
async fn test_provider_url_passes_through() {
    let (content, dir) = run_tool("https://cdn.example.com/img.png".to_string(), None).await;
    assert_eq!(content, "![Generated Image](https://cdn.example.com/img.png)");
    // Nothing is persisted for pass-through URLs.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invalid_payload_reports_error_text() {
    let dir = tempfile::tempdir().unwrap();
    let tool = GenerateImageTool::new(
        Arc::new(StubImageProvider {
            payload: "!!not-base64!!".to_string(),
        }),
        dir.path().to_path_buf(),
        None,
    );
    let output = tool
        .execute(&context(), json!({"prompt": "anything"}))
        .await
        .unwrap();

    assert!(output.is_error);
    assert!(output.content.starts_with("Error generating image:"));
}

#[tokio::test]
async fn test_missing_prompt_reports_error_text() {
    let dir = tempfile::tempdir().unwrap();
    let tool = GenerateImageTool::new(
        Arc::new(StubImageProvider {
            payload: String::new(),
        }),
        dir.path().to_path_buf(),
        None,
    );
    let output = tool.execute(&context(), json!({})).await.unwrap();
    assert!(output.is_error);
    assert!(output.content.contains("prompt"));
}
