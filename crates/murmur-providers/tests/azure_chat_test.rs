use axum::{Json, Router, extract::State, routing::post};
use murmur_common::{ChatMessage, ChatRole, ToolDefinition};
use murmur_config::AppConfig;
use murmur_providers::{AzureChatProvider, ChatProvider};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct Captured {
    last_body: Arc<Mutex<Option<serde_json::Value>>>,
}

async fn start_mock_server(captured: Captured) -> (SocketAddr, oneshot::Sender<()>) {
    let (tx, rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route(
            "/openai/deployments/test-deploy/chat/completions",
            post(mock_completions),
        )
        .with_state(captured);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, tx)
}

async fn mock_completions(
    State(captured): State<Captured>,
    Json(payload): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let has_tools = payload["tools"]
        .as_array()
        .map(|t| !t.is_empty())
        .unwrap_or(false);
    *captured.last_body.lock().unwrap() = Some(payload);

    if has_tools {
        Json(json!({
            "id": "chatcmpl-1",
            "model": "test-deploy",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "generate_image",
                            "arguments": "{\"prompt\":\"a red fox\"}"
                        }
                    }]
                }
            }]
        }))
    } else {
        Json(json!({
            "id": "chatcmpl-1",
            "model": "test-deploy",
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": "Hello world"}
            }]
        }))
    }
}

fn azure_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.azure.endpoint = Some("https://example.cognitiveservices.azure.com".to_string());
    config.azure.api_key = Some("test-key".to_string());
    config.azure.deployment = Some("test-deploy".to_string());
    config
}

#[tokio::test]
async fn test_azure_complete_plain_text() {
    let captured = Captured::default();
    let (addr, _shutdown_tx) = start_mock_server(captured.clone()).await;
    let base_url = format!(
        "http://{addr}/openai/deployments/test-deploy/chat/completions?api-version=2024-02-15-preview"
    );

    let provider = AzureChatProvider::from_config(&azure_config())
        .unwrap()
        .with_base_url(base_url);

    let history = vec![
        ChatMessage::system("You are a test assistant."),
        ChatMessage::user("Hello"),
    ];
    let reply = provider.complete(&history, &[]).await.unwrap();

    assert_eq!(reply.role, ChatRole::Assistant);
    assert_eq!(reply.content, "Hello world");
    assert!(reply.tool_calls.is_empty());

    let body = captured.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Hello");
    assert!(body.get("tools").is_none());
}

#[tokio::test]
async fn test_azure_complete_with_tools_returns_tool_calls() {
    let captured = Captured::default();
    let (addr, _shutdown_tx) = start_mock_server(captured.clone()).await;
    let base_url =
        format!("http://{addr}/openai/deployments/test-deploy/chat/completions?api-version=preview");

    let provider = AzureChatProvider::from_config(&azure_config())
        .unwrap()
        .with_base_url(base_url);

    let tools = vec![ToolDefinition {
        name: "generate_image".to_string(),
        description: "Generate an image from a text prompt".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {"prompt": {"type": "string"}},
            "required": ["prompt"]
        }),
    }];

    let reply = provider
        .complete(&[ChatMessage::user("draw a fox")], &tools)
        .await
        .unwrap();

    assert_eq!(reply.tool_calls.len(), 1);
    let call = &reply.tool_calls[0];
    assert_eq!(call.id, "call_1");
    assert_eq!(call.name, "generate_image");
    assert_eq!(call.arguments["prompt"], "a red fox");

    // The tool set must be bound into the request body.
    let body = captured.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["tools"][0]["function"]["name"], "generate_image");
}

#[tokio::test]
async fn test_azure_construction_fails_without_credentials() {
    let err = AzureChatProvider::from_config(&AppConfig::default()).unwrap_err();
    assert!(matches!(err, murmur_common::Error::Config(_)));
    assert!(err.to_string().contains("AZURE_OPENAI_ENDPOINT"));
}
