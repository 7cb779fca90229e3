//! OpenAI chat-completions wire format, shared by the Azure and OpenAI
//! chat providers (Azure deployments speak the same request/response shape).

use murmur_common::{ChatMessage, ChatRole, Error, Result, ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct WireRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
}

#[derive(Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    /// JSON-encoded arguments string, per the OpenAI protocol.
    pub arguments: String,
}

#[derive(Serialize)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunctionDefinition,
}

#[derive(Serialize)]
pub struct WireFunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Deserialize)]
pub struct WireResponse {
    pub choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
pub struct WireChoice {
    pub message: WireResponseMessage,
}

#[derive(Deserialize)]
pub struct WireResponseMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<WireToolCall>>,
}

/// Build a wire request from a message history and tool set.
pub fn build_request(
    model: Option<String>,
    messages: &[ChatMessage],
    tools: &[ToolDefinition],
) -> WireRequest {
    let messages = messages.iter().map(to_wire_message).collect();

    let tools = if tools.is_empty() {
        None
    } else {
        Some(
            tools
                .iter()
                .map(|t| WireTool {
                    kind: "function",
                    function: WireFunctionDefinition {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    },
                })
                .collect(),
        )
    };

    WireRequest {
        model,
        messages,
        tools,
    }
}

fn to_wire_message(msg: &ChatMessage) -> WireMessage {
    match msg.role {
        ChatRole::System => WireMessage {
            role: "system",
            content: Some(msg.content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        ChatRole::User => WireMessage {
            role: "user",
            content: Some(msg.content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        ChatRole::Assistant => {
            let tool_calls = if msg.tool_calls.is_empty() {
                None
            } else {
                Some(
                    msg.tool_calls
                        .iter()
                        .map(|call| WireToolCall {
                            id: call.id.clone(),
                            kind: "function".to_string(),
                            function: WireFunctionCall {
                                name: call.name.clone(),
                                arguments: serde_json::to_string(&call.arguments)
                                    .unwrap_or_default(),
                            },
                        })
                        .collect(),
                )
            };
            WireMessage {
                role: "assistant",
                // The protocol allows a null content on pure tool-call turns.
                content: if msg.content.is_empty() && tool_calls.is_some() {
                    None
                } else {
                    Some(msg.content.clone())
                },
                tool_calls,
                tool_call_id: None,
            }
        }
        ChatRole::Tool => WireMessage {
            role: "tool",
            content: Some(msg.content.clone()),
            tool_calls: None,
            tool_call_id: msg.tool_call_id.clone(),
        },
    }
}

/// Convert the first choice of a wire response into a `ChatMessage`.
pub fn parse_response(response: WireResponse) -> Result<ChatMessage> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Provider("no choices in chat completion response".to_string()))?;

    let content = choice.message.content.unwrap_or_default();
    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            // Malformed argument JSON is preserved as a string so the tool can
            // report it back to the model instead of the round failing.
            let arguments = serde_json::from_str(&tc.function.arguments)
                .unwrap_or(serde_json::Value::String(tc.function.arguments));
            ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments,
            }
        })
        .collect::<Vec<_>>();

    if tool_calls.is_empty() {
        Ok(ChatMessage::assistant(content))
    } else {
        Ok(ChatMessage::tool_request(content, tool_calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_and_tool_messages_serialize() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hi"),
            ChatMessage::tool_result("call_1", "42"),
        ];
        let request = build_request(Some("gpt-4o".to_string()), &messages, &[]);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][2]["role"], "tool");
        assert_eq!(value["messages"][2]["tool_call_id"], "call_1");
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_tool_definitions_become_function_entries() {
        let tools = vec![ToolDefinition {
            name: "generate_image".to_string(),
            description: "make a picture".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        }];
        let request = build_request(None, &[ChatMessage::user("hi")], &tools);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "generate_image");
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_7",
                        "type": "function",
                        "function": {"name": "generate_image", "arguments": "{\"prompt\":\"a fox\"}"}
                    }]
                }
            }]
        });
        let response: WireResponse = serde_json::from_value(raw).unwrap();
        let msg = parse_response(response).unwrap();

        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].name, "generate_image");
        assert_eq!(msg.tool_calls[0].arguments["prompt"], "a fox");
    }

    #[test]
    fn test_parse_plain_response() {
        let raw = serde_json::json!({
            "choices": [{"message": {"content": "hi there"}}]
        });
        let response: WireResponse = serde_json::from_value(raw).unwrap();
        let msg = parse_response(response).unwrap();

        assert!(msg.tool_calls.is_empty());
        assert_eq!(msg.content, "hi there");
    }
}
