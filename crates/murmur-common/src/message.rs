use serde::{Deserialize, Serialize};

/// One turn in a conversation. Immutable once appended to a thread's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    /// Text content. May be empty when the turn is a pure tool invocation.
    pub content: String,
    /// Tool invocations requested by the model. Empty for non-tool turns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For `Tool` turns: the id of the originating tool call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A structured request, emitted by the chat model, to invoke a named
/// capability with structured arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A capability surfaced to the chat model: name, natural-language
/// description, and a JSON Schema for its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// An assistant turn that requests one or more tool invocations.
    pub fn tool_request(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// A tool-result turn tagged with the originating call id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_roles() {
        assert_eq!(ChatMessage::system("s").role, ChatRole::System);
        assert_eq!(ChatMessage::user("u").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("a").role, ChatRole::Assistant);

        let result = ChatMessage::tool_result("call_1", "done");
        assert_eq!(result.role, ChatRole::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_tool_request_carries_calls() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "generate_image".to_string(),
            arguments: serde_json::json!({"prompt": "a fox"}),
        };
        let msg = ChatMessage::tool_request("", vec![call]);
        assert_eq!(msg.tool_calls.len(), 1);
        assert!(msg.content.is_empty());
    }

    #[test]
    fn test_message_roundtrips_through_json() {
        let msg = ChatMessage::tool_request(
            "thinking",
            vec![ToolCall {
                id: "call_9".to_string(),
                name: "send_message".to_string(),
                arguments: serde_json::json!({"to": "+15550100", "message": "hi"}),
            }],
        );
        let raw = serde_json::to_string(&msg).unwrap();
        let back: ChatMessage = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.role, ChatRole::Assistant);
        assert_eq!(back.tool_calls[0].name, "send_message");
        assert_eq!(back.tool_calls[0].arguments["to"], "+15550100");
    }
}
